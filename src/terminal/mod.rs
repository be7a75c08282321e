// ABOUTME: Terminal module bridging an instance's remote shell into a display surface
// Provides the session state machine, WebSocket transport, demo fallback and emulator

pub mod bridge;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod simulator;
pub mod surface;
pub mod terminal_emulator;
#[doc(hidden)]
pub mod testing;
pub mod transport;
pub mod websocket_client;

pub use bridge::{BridgeOptions, TerminalBridge};
pub use error::BridgeError;
pub use protocol::{ConnectionState, ConnectionStatus};
pub use runtime::{spawn_bridge, BridgeHandle};
pub use surface::{DisplaySurface, SurfaceEvent, TerminalSize};
pub use terminal_emulator::{EmulatorSurface, TerminalEmulator, TerminalView};
pub use websocket_client::WebSocketConnector;
