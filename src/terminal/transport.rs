// ABOUTME: Transport seam between the bridge and a duplex message connection
// Defines connector/link traits, epoch-tagged events and endpoint URL construction

use crate::terminal::error::BridgeError;
use tokio::sync::mpsc;
use url::Url;

/// Default endpoint path; `{instance_id}` is replaced by the target id.
pub const DEFAULT_PATH_TEMPLATE: &str = "/api/v1/instances/{instance_id}/terminal";

const INSTANCE_PLACEHOLDER: &str = "{instance_id}";

/// Monotonic counter identifying one connection attempt. Events carrying an
/// older epoch belong to a transport that has already been torn down.
pub type Epoch = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Open,
    Message(String),
    Error(String),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub epoch: Epoch,
    pub kind: TransportEventKind,
}

impl TransportEvent {
    pub fn new(epoch: Epoch, kind: TransportEventKind) -> Self {
        Self { epoch, kind }
    }
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// An open (or opening) duplex connection, owned by exactly one session.
pub trait TransportLink: Send {
    fn send(&mut self, text: String) -> Result<(), BridgeError>;

    /// Close the connection. Must be safe to call more than once.
    fn close(&mut self);
}

/// Opens transports. Completion is reported asynchronously through `events`.
pub trait Connector: Send + Sync {
    fn open(
        &self,
        url: &Url,
        epoch: Epoch,
        events: TransportEventSender,
    ) -> Result<Box<dyn TransportLink>, BridgeError>;
}

/// Build the terminal endpoint for `instance_id` on the dashboard origin.
///
/// `https` origins become `wss`, `http` origins become `ws`. The instance id is
/// percent-encoded as a single path segment.
pub fn terminal_url(origin: &str, path_template: &str, instance_id: &str) -> Result<Url, BridgeError> {
    let instance_id = instance_id.trim();
    if instance_id.is_empty() {
        return Err(BridgeError::InvalidTarget);
    }

    let invalid = |reason: &str| BridgeError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| invalid("cannot switch to a websocket scheme"))?;
    url.set_query(None);
    url.set_fragment(None);

    let mut segments: Vec<&str> = path_template
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment == INSTANCE_PLACEHOLDER {
                instance_id
            } else {
                segment
            }
        })
        .collect();
    if !path_template.contains(INSTANCE_PLACEHOLDER) {
        segments.push(instance_id);
    }

    url.path_segments_mut()
        .map_err(|()| invalid("origin cannot carry a path"))?
        .clear()
        .extend(segments);

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_secure_origin_upgrades_to_wss() {
        let url = terminal_url("https://dash.omnicloud.dev", DEFAULT_PATH_TEMPLATE, "i-42").unwrap();
        assert_eq!(url.as_str(), "wss://dash.omnicloud.dev/api/v1/instances/i-42/terminal");
    }

    #[test]
    fn test_plain_origin_keeps_port() {
        let url = terminal_url("http://localhost:8080", DEFAULT_PATH_TEMPLATE, "i-42").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8080/api/v1/instances/i-42/terminal");
    }

    #[test]
    fn test_origin_path_and_query_are_replaced() {
        let url = terminal_url("https://dash.omnicloud.dev/apps?tab=1#x", "/ws/{instance_id}", "i-7").unwrap();
        assert_eq!(url.as_str(), "wss://dash.omnicloud.dev/ws/i-7");
    }

    #[test]
    fn test_template_without_placeholder_appends_id() {
        let url = terminal_url("http://localhost", "/terminal", "abc").unwrap();
        assert_eq!(url.as_str(), "ws://localhost/terminal/abc");
    }

    #[test]
    fn test_instance_id_is_encoded() {
        let url = terminal_url("http://localhost", DEFAULT_PATH_TEMPLATE, "web/1 a").unwrap();
        assert_eq!(url.path(), "/api/v1/instances/web%2F1%20a/terminal");
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            terminal_url("http://localhost", DEFAULT_PATH_TEMPLATE, "  "),
            Err(BridgeError::InvalidTarget)
        ));
        assert!(matches!(
            terminal_url("not a url", DEFAULT_PATH_TEMPLATE, "i-1"),
            Err(BridgeError::InvalidOrigin { .. })
        ));
        assert!(matches!(
            terminal_url("ftp://files.example.com", DEFAULT_PATH_TEMPLATE, "i-1"),
            Err(BridgeError::InvalidOrigin { .. })
        ));
    }
}
