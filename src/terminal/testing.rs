// ABOUTME: In-memory display surface and connector fakes for exercising the bridge
// Clones share state so tests can observe a surface or connector after handing it off

use crate::terminal::{
    error::BridgeError,
    surface::{ansi, DisplaySurface, TerminalSize},
    transport::{Connector, Epoch, TransportEvent, TransportEventKind, TransportEventSender, TransportLink},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct SurfaceRecord {
    writes: Vec<String>,
    clears: usize,
    fit_calls: usize,
    size: TerminalSize,
    pending_fit: Option<TerminalSize>,
    disposed: bool,
    writes_after_dispose: usize,
}

/// Display surface that records everything written to it.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    inner: Arc<Mutex<SurfaceRecord>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<String> {
        lock(&self.inner).writes.clone()
    }

    /// Everything written since the last clear, concatenated
    pub fn transcript(&self) -> String {
        lock(&self.inner).writes.concat()
    }

    /// Transcript split on line endings with color codes removed
    pub fn lines(&self) -> Vec<String> {
        ansi::strip(&self.transcript())
            .split("\r\n")
            .map(str::to_string)
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        lock(&self.inner).clears
    }

    pub fn fit_calls(&self) -> usize {
        lock(&self.inner).fit_calls
    }

    /// Make the next `fit` report `size` as the new geometry
    pub fn set_pending_fit(&self, size: TerminalSize) {
        lock(&self.inner).pending_fit = Some(size);
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.inner).disposed
    }

    pub fn writes_after_dispose(&self) -> usize {
        lock(&self.inner).writes_after_dispose
    }
}

impl DisplaySurface for RecordingSurface {
    fn write(&mut self, text: &str) {
        let mut record = lock(&self.inner);
        if record.disposed {
            record.writes_after_dispose += 1;
        }
        record.writes.push(text.to_string());
    }

    fn clear(&mut self) {
        let mut record = lock(&self.inner);
        record.clears += 1;
        record.writes.clear();
    }

    fn size(&self) -> TerminalSize {
        lock(&self.inner).size
    }

    fn fit(&mut self) -> Option<TerminalSize> {
        let mut record = lock(&self.inner);
        record.fit_calls += 1;
        let size = record.pending_fit.take()?;
        if size == record.size {
            return None;
        }
        record.size = size;
        Some(size)
    }

    fn dispose(&mut self) {
        lock(&self.inner).disposed = true;
    }
}

#[derive(Debug)]
struct OpenedTransport {
    url: String,
    epoch: Epoch,
    sent: Vec<String>,
    closed: bool,
    events: TransportEventSender,
}

#[derive(Debug, Default)]
struct ConnectorLog {
    opened: Vec<OpenedTransport>,
    fail_next: Option<String>,
}

/// Connector whose transports are driven by the test.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    log: Arc<Mutex<ConnectorLog>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail synchronously
    pub fn fail_next_open(&self, reason: &str) {
        lock(&self.log).fail_next = Some(reason.to_string());
    }

    pub fn open_count(&self) -> usize {
        lock(&self.log).opened.len()
    }

    /// Transports opened and not yet closed
    pub fn live_count(&self) -> usize {
        lock(&self.log).opened.iter().filter(|t| !t.closed).count()
    }

    pub fn urls(&self) -> Vec<String> {
        lock(&self.log).opened.iter().map(|t| t.url.clone()).collect()
    }

    pub fn is_closed(&self, index: usize) -> bool {
        lock(&self.log).opened.get(index).is_some_and(|t| t.closed)
    }

    /// Raw frames sent on transport `index`
    pub fn sent(&self, index: usize) -> Vec<String> {
        lock(&self.log)
            .opened
            .get(index)
            .map(|t| t.sent.clone())
            .unwrap_or_default()
    }

    pub fn sent_json(&self, index: usize) -> Vec<serde_json::Value> {
        self.sent(index)
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    /// Build an event as transport `index` would report it
    pub fn event(&self, index: usize, kind: TransportEventKind) -> TransportEvent {
        let epoch = lock(&self.log).opened.get(index).map_or(0, |t| t.epoch);
        TransportEvent::new(epoch, kind)
    }

    /// Deliver an event through the channel transport `index` was given
    pub fn emit(&self, index: usize, kind: TransportEventKind) {
        let log = lock(&self.log);
        if let Some(transport) = log.opened.get(index) {
            let _ = transport.events.send(TransportEvent::new(transport.epoch, kind));
        }
    }
}

struct FakeLink {
    index: usize,
    log: Arc<Mutex<ConnectorLog>>,
}

impl TransportLink for FakeLink {
    fn send(&mut self, text: String) -> Result<(), BridgeError> {
        let mut log = lock(&self.log);
        match log.opened.get_mut(self.index) {
            Some(transport) if !transport.closed => {
                transport.sent.push(text);
                Ok(())
            }
            _ => Err(BridgeError::NotConnected),
        }
    }

    fn close(&mut self) {
        if let Some(transport) = lock(&self.log).opened.get_mut(self.index) {
            transport.closed = true;
        }
    }
}

impl Connector for FakeConnector {
    fn open(
        &self,
        url: &Url,
        epoch: Epoch,
        events: TransportEventSender,
    ) -> Result<Box<dyn TransportLink>, BridgeError> {
        let mut log = lock(&self.log);
        if let Some(reason) = log.fail_next.take() {
            return Err(BridgeError::TransportConstruction(reason));
        }

        log.opened.push(OpenedTransport {
            url: url.to_string(),
            epoch,
            sent: Vec::new(),
            closed: false,
            events,
        });
        Ok(Box::new(FakeLink {
            index: log.opened.len() - 1,
            log: self.log.clone(),
        }))
    }
}
