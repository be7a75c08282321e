// ABOUTME: Terminal session bridge owning one remote shell session and its display surface
// Drives the Idle/Connecting/Connected/Disconnected/Failed state machine and the demo fallback

use crate::models::InstanceTarget;
use crate::terminal::{
    error::BridgeError,
    protocol::{ClientMessage, ConnectionState, ConnectionStatus, Inbound, ServerMessage},
    simulator::DemoShell,
    surface::{ansi, DisplaySurface, SurfaceEvent, TerminalSize},
    transport::{
        terminal_url, Connector, Epoch, TransportEvent, TransportEventKind, TransportEventReceiver,
        TransportEventSender, TransportLink, DEFAULT_PATH_TEMPLATE,
    },
};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

pub type StatusCallback = Box<dyn FnMut(&ConnectionStatus) + Send>;

/// Connection settings for a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Dashboard origin the endpoint is resolved against (e.g. `https://dash.example.com`)
    pub origin: String,
    pub path_template: String,
    pub auto_connect: bool,
    /// How long `Connecting` may last before the attempt is failed
    pub connect_timeout: Duration,
    /// Quiet period that coalesces fit requests
    pub fit_debounce: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            origin: "http://localhost:8080".to_string(),
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            auto_connect: true,
            connect_timeout: Duration::from_secs(10),
            fit_debounce: Duration::from_millis(100),
        }
    }
}

/// Where keystroke and resize events from the surface currently go.
/// A single slot, so rebinding replaces the previous handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputRoute {
    Detached,
    Transport,
    Simulator,
}

pub struct TerminalBridge<S: DisplaySurface> {
    session_id: Uuid,
    target: InstanceTarget,
    options: BridgeOptions,

    surface: S,
    connector: Box<dyn Connector>,

    /// Sender cloned into every transport; receiver is drained by the runtime
    events_tx: TransportEventSender,
    events_rx: Option<TransportEventReceiver>,

    state: ConnectionState,
    last_error: Option<String>,
    transport: Option<Box<dyn TransportLink>>,
    epoch: Epoch,

    route: InputRoute,
    shell: Option<DemoShell>,

    connect_deadline: Option<Instant>,
    fit_deadline: Option<Instant>,

    on_status: Option<StatusCallback>,
    last_reported: Option<ConnectionStatus>,
    disposed: bool,
}

impl<S: DisplaySurface> TerminalBridge<S> {
    pub fn new(
        target: InstanceTarget,
        options: BridgeOptions,
        surface: S,
        connector: Box<dyn Connector>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        debug!("Creating terminal bridge {} for instance {}", session_id, target.id);

        Self {
            session_id,
            target,
            options,
            surface,
            connector,
            events_tx,
            events_rx: Some(events_rx),
            state: ConnectionState::Idle,
            last_error: None,
            transport: None,
            epoch: 0,
            route: InputRoute::Detached,
            shell: None,
            connect_deadline: None,
            fit_deadline: None,
            on_status: None,
            last_reported: None,
            disposed: false,
        }
    }

    /// Register the observer invoked on every status change
    pub fn set_status_callback(&mut self, callback: StatusCallback) {
        self.on_status = Some(callback);
    }

    /// Hand the transport event stream to whoever drives the bridge
    pub fn take_transport_events(&mut self) -> Option<TransportEventReceiver> {
        self.events_rx.take()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn target(&self) -> &InstanceTarget {
        &self.target
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::new(self.state, self.last_error.clone())
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Epoch of the most recent connection attempt
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_simulating(&self) -> bool {
        self.route == InputRoute::Simulator
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Demo shell input buffer, when the fallback is active
    pub fn pending_demo_input(&self) -> Option<&str> {
        self.shell.as_ref().map(DemoShell::current_command)
    }

    /// Publish the initial status and auto-connect when configured
    pub fn mount(&mut self) {
        if self.disposed {
            return;
        }
        self.report_status();
        if self.options.auto_connect && self.target.is_known() {
            self.connect();
        }
    }

    pub fn connect(&mut self) {
        if self.disposed {
            return;
        }

        self.teardown_transport();
        self.leave_fallback();
        self.epoch += 1;
        self.last_error = None;
        self.state = ConnectionState::Connecting;
        info!(
            "Session {}: connecting to instance {} (attempt {})",
            self.session_id, self.target.id, self.epoch
        );
        self.surface.writeln(&ansi::paint(
            ansi::CYAN,
            &format!("Connecting to instance {}...", self.target.id),
        ));
        self.report_status();

        match self.open_transport() {
            Ok(link) => {
                self.transport = Some(link);
                self.connect_deadline = Some(Instant::now() + self.options.connect_timeout);
            }
            Err(e) => self.fail(&e),
        }
    }

    fn open_transport(&self) -> Result<Box<dyn TransportLink>, BridgeError> {
        let url = terminal_url(&self.options.origin, &self.options.path_template, &self.target.id)?;
        debug!("Session {}: terminal endpoint {}", self.session_id, url);
        self.connector.open(&url, self.epoch, self.events_tx.clone())
    }

    /// Close any transport and force `Disconnected`. Safe from every state.
    pub fn disconnect(&mut self) {
        if self.disposed {
            return;
        }

        let had_transport = self.teardown_transport();
        self.leave_fallback();
        self.state = ConnectionState::Disconnected;
        if had_transport {
            info!("Session {}: disconnected by caller", self.session_id);
            self.surface
                .writeln(&ansi::paint(ansi::YELLOW, "Disconnected."));
        }
        self.report_status();
    }

    pub fn reconnect(&mut self) {
        self.disconnect();
        self.connect();
    }

    pub fn clear(&mut self) {
        if !self.disposed {
            self.surface.clear();
        }
    }

    /// Ask for a refit once the debounce window has passed without new requests
    pub fn request_fit(&mut self, now: Instant) {
        if !self.disposed {
            self.fit_deadline = Some(now + self.options.fit_debounce);
        }
    }

    /// Earliest pending timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.connect_deadline, self.fit_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire every timer due at `now`
    pub fn poll_timers(&mut self, now: Instant) {
        if self.disposed {
            return;
        }

        if self.connect_deadline.is_some_and(|deadline| deadline <= now) {
            self.connect_deadline = None;
            if self.state == ConnectionState::Connecting {
                warn!("Session {}: connect attempt timed out", self.session_id);
                self.fail(&BridgeError::Timeout(self.options.connect_timeout));
            }
        }

        if self.fit_deadline.is_some_and(|deadline| deadline <= now) {
            self.fit_deadline = None;
            if let Some(size) = self.surface.fit() {
                debug!("Surface refit to {}x{}", size.cols, size.rows);
                self.handle_surface_event(SurfaceEvent::Resize(size));
            }
        }
    }

    /// Route a keystroke or resize from the display surface
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        if self.disposed {
            return;
        }

        match (self.route, event) {
            (InputRoute::Transport, SurfaceEvent::Data(data)) => {
                self.send(&ClientMessage::input(data));
            }
            (InputRoute::Transport, SurfaceEvent::Resize(size)) => {
                self.send(&ClientMessage::resize(size.cols, size.rows));
            }
            (InputRoute::Simulator, SurfaceEvent::Data(data)) => {
                if let Some(shell) = self.shell.as_mut() {
                    shell.feed(&data, &mut self.surface);
                }
            }
            (InputRoute::Simulator | InputRoute::Detached, _) => {
                trace!("Ignoring surface event while input is not routed");
            }
        }
    }

    fn send(&mut self, message: &ClientMessage) {
        let Some(link) = self.transport.as_mut() else {
            return;
        };
        let result = message
            .to_json()
            .map_err(BridgeError::from)
            .and_then(|json| link.send(json));
        if let Err(e) = result {
            warn!("Session {}: failed to send {:?}: {}", self.session_id, message, e);
        }
    }

    /// Apply one event from a transport. Events from superseded or closed
    /// transports are dropped.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.disposed || event.epoch != self.epoch || self.transport.is_none() {
            trace!("Dropping stale transport event {:?}", event.kind);
            return;
        }

        match (self.state, event.kind) {
            (ConnectionState::Connecting, TransportEventKind::Open) => self.on_open(),
            (ConnectionState::Connected, TransportEventKind::Message(text)) => self.on_message(&text),
            (ConnectionState::Connecting | ConnectionState::Connected, TransportEventKind::Error(reason)) => {
                self.fail(&BridgeError::Transport(reason));
            }
            (ConnectionState::Connecting, TransportEventKind::Close) => {
                self.fail(&BridgeError::Transport(
                    "connection closed before it was established".to_string(),
                ));
            }
            (ConnectionState::Connected, TransportEventKind::Close) => self.on_closed(),
            (state, kind) => {
                debug!("Ignoring transport event {:?} in state {:?}", kind, state);
            }
        }
    }

    fn on_open(&mut self) {
        info!(
            "Session {}: connected to instance {}",
            self.session_id, self.target.id
        );
        self.connect_deadline = None;
        self.last_error = None;
        self.state = ConnectionState::Connected;

        self.surface.writeln(&ansi::paint(
            ansi::BOLD_GREEN,
            &format!("Connected to instance {}", self.target.id),
        ));
        for line in self.target.detail_lines() {
            self.surface.writeln(&ansi::paint(ansi::DIM, &line));
        }
        self.surface.writeln("");

        self.route = InputRoute::Transport;

        // Fits applied while connecting had no transport to reach
        let size = self.surface.size();
        if size != TerminalSize::default() {
            debug!("Session {}: announcing size {}x{}", self.session_id, size.cols, size.rows);
            self.send(&ClientMessage::resize(size.cols, size.rows));
        }

        self.report_status();
    }

    fn on_message(&mut self, text: &str) {
        match Inbound::parse(text) {
            Inbound::Message(ServerMessage::Output { data }) => self.surface.write(&data),
            Inbound::Message(ServerMessage::Error { message }) => {
                warn!("Session {}: remote error: {}", self.session_id, message);
                self.surface
                    .writeln(&ansi::paint(ansi::RED, &format!("Error: {message}")));
            }
            Inbound::Message(ServerMessage::Exit { code }) => {
                info!("Session {}: remote process exited with {:?}", self.session_id, code);
                let line = code.map_or_else(
                    || "Process exited".to_string(),
                    |code| format!("Process exited with code {code}"),
                );
                self.surface.write("\r\n");
                self.surface.writeln(&ansi::paint(ansi::YELLOW, &line));
                self.on_closed();
            }
            Inbound::RawText(text) => self.surface.write(&text),
            Inbound::Unrecognized(kind) => {
                debug!("Session {}: skipping message of type '{}'", self.session_id, kind);
            }
        }
    }

    fn on_closed(&mut self) {
        info!("Session {}: connection closed", self.session_id);
        self.teardown_transport();
        self.route = InputRoute::Detached;
        self.state = ConnectionState::Disconnected;
        self.surface
            .writeln(&ansi::paint(ansi::YELLOW, "Connection closed."));
        self.report_status();
    }

    fn fail(&mut self, err: &BridgeError) {
        error!("Session {}: connection failed: {}", self.session_id, err);
        self.teardown_transport();
        self.last_error = Some(err.to_string());
        self.state = ConnectionState::Failed;

        self.surface.write("\r\n");
        self.surface
            .writeln(&ansi::paint(ansi::RED, &format!("Connection failed: {err}")));
        self.surface.writeln(&ansi::paint(
            ansi::YELLOW,
            "Starting demo mode. Commands are simulated locally; type 'help' for a list.",
        ));
        self.surface.writeln("");

        let shell = DemoShell::new(&self.target.id);
        shell.prompt(&mut self.surface);
        self.shell = Some(shell);
        self.route = InputRoute::Simulator;

        self.report_status();
    }

    fn leave_fallback(&mut self) {
        self.shell = None;
        self.route = InputRoute::Detached;
    }

    /// Close and drop the current transport. Returns whether one existed.
    fn teardown_transport(&mut self) -> bool {
        self.connect_deadline = None;
        match self.transport.take() {
            Some(mut link) => {
                link.close();
                true
            }
            None => false,
        }
    }

    fn report_status(&mut self) {
        let status = self.status();
        if self.last_reported.as_ref() == Some(&status) {
            return;
        }
        if let Some(callback) = self.on_status.as_mut() {
            callback(&status);
        }
        self.last_reported = Some(status);
    }

    /// Unmount: detach input, close the transport, then dispose the surface.
    /// Every later call is a no-op.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        debug!("Session {}: disposing bridge", self.session_id);

        self.leave_fallback();
        self.teardown_transport();
        self.fit_deadline = None;
        self.surface.dispose();

        self.on_status = None;
        self.state = ConnectionState::Disconnected;
        self.disposed = true;
    }
}

impl<S: DisplaySurface> Drop for TerminalBridge<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
