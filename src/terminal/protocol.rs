// ABOUTME: WebSocket protocol definitions for the instance terminal endpoint
// JSON text frames in both directions, discriminated by a "type" field

use serde::{Deserialize, Serialize};

// ============================================
// Client → Terminal Service Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Raw keystroke data exactly as the display surface produced it
    Input { data: String },
    Resize { cols: u16, rows: u16 },
}

impl ClientMessage {
    /// Create an input message
    pub fn input(data: impl Into<String>) -> Self {
        ClientMessage::Input { data: data.into() }
    }

    /// Create a resize message
    pub fn resize(cols: u16, rows: u16) -> Self {
        ClientMessage::Resize { cols, rows }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================
// Terminal Service → Client Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Output { data: String },
    Error { message: String },
    Exit {
        /// Wide enough for Windows NTSTATUS values
        #[serde(default)]
        code: Option<i64>,
    },
}

/// Result of decoding one inbound text frame.
///
/// The backend is allowed to send unframed text; anything that is not valid
/// JSON is kept as [`Inbound::RawText`] and rendered literally. Well-formed
/// JSON carrying a `type` this client does not know is reported as
/// [`Inbound::Unrecognized`] so the caller can skip it. An `exit` frame always
/// ends the session, so one with unreadable fields decodes as an exit without
/// a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(ServerMessage),
    RawText(String),
    Unrecognized(String),
}

impl Inbound {
    pub fn parse(payload: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(_) => return Inbound::RawText(payload.to_string()),
        };

        let Some(kind) = value.get("type").and_then(|t| t.as_str()).map(str::to_string) else {
            // Valid JSON but not a framed message (a bare string, number, ...)
            return Inbound::RawText(payload.to_string());
        };

        match serde_json::from_value::<ServerMessage>(value) {
            Ok(message) => Inbound::Message(message),
            Err(_) if kind == "exit" => Inbound::Message(ServerMessage::Exit { code: None }),
            Err(_) => Inbound::Unrecognized(kind),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Inbound::RawText(_))
    }
}

// ============================================
// Connection State
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Failed => "Failed",
        }
    }
}

/// Externally observable connection tuple handed to status observers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub is_connecting: bool,
    pub last_error: Option<String>,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState, last_error: Option<String>) -> Self {
        Self {
            state,
            is_connected: state == ConnectionState::Connected,
            is_connecting: state == ConnectionState::Connecting,
            last_error,
        }
    }

    /// The manual reconnect action is only offered while idle on both fronts
    pub fn can_reconnect(&self) -> bool {
        !self.is_connected && !self.is_connecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_outbound_shapes() {
        let input: serde_json::Value =
            serde_json::from_str(&ClientMessage::input("ls\r").to_json().unwrap()).unwrap();
        assert_eq!(input, json!({"type": "input", "data": "ls\r"}));

        let resize: serde_json::Value =
            serde_json::from_str(&ClientMessage::resize(80, 24).to_json().unwrap()).unwrap();
        assert_eq!(resize, json!({"type": "resize", "cols": 80, "rows": 24}));
    }

    #[test]
    fn test_inbound_framed_messages() {
        assert_eq!(
            Inbound::parse(r#"{"type":"output","data":"hello\r\n"}"#),
            Inbound::Message(ServerMessage::Output {
                data: "hello\r\n".to_string()
            })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"error","message":"no such container"}"#),
            Inbound::Message(ServerMessage::Error {
                message: "no such container".to_string()
            })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"exit","code":1}"#),
            Inbound::Message(ServerMessage::Exit { code: Some(1) })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"exit"}"#),
            Inbound::Message(ServerMessage::Exit { code: None })
        );
    }

    #[test]
    fn test_inbound_exit_codes() {
        assert_eq!(
            Inbound::parse(r#"{"type":"exit","code":3221225477}"#),
            Inbound::Message(ServerMessage::Exit {
                code: Some(3_221_225_477)
            })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"exit","code":-1}"#),
            Inbound::Message(ServerMessage::Exit { code: Some(-1) })
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"exit","code":"SIGKILL"}"#),
            Inbound::Message(ServerMessage::Exit { code: None })
        );
    }

    #[test]
    fn test_inbound_malformed_is_raw_text() {
        assert_eq!(
            Inbound::parse("total 0\r\n"),
            Inbound::RawText("total 0\r\n".to_string())
        );
        assert_eq!(
            Inbound::parse(r#"{"type":"output","data":"#),
            Inbound::RawText(r#"{"type":"output","data":"#.to_string())
        );
        assert!(Inbound::parse("42").is_raw());
    }

    #[test]
    fn test_inbound_unknown_type() {
        assert_eq!(
            Inbound::parse(r#"{"type":"pong"}"#),
            Inbound::Unrecognized("pong".to_string())
        );
        // Known type with the wrong payload shape is not rendered either
        assert_eq!(
            Inbound::parse(r#"{"type":"output"}"#),
            Inbound::Unrecognized("output".to_string())
        );
    }

    #[test]
    fn test_status_flags_follow_state() {
        let connecting = ConnectionStatus::new(ConnectionState::Connecting, None);
        assert!(connecting.is_connecting);
        assert!(!connecting.is_connected);
        assert!(!connecting.can_reconnect());

        let failed = ConnectionStatus::new(ConnectionState::Failed, Some("refused".into()));
        assert!(failed.can_reconnect());
        assert_eq!(failed.last_error.as_deref(), Some("refused"));
    }
}
