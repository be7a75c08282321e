// ABOUTME: Error types for the terminal session bridge
// Every variant is recovered inside the bridge and surfaced as an on-screen notice

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Instance identifier is empty")]
    InvalidTarget,

    #[error("Invalid dashboard origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("Failed to open transport: {0}")]
    TransportConstruction(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Not connected")]
    NotConnected,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
