// ABOUTME: Async driver running a terminal bridge on a single tokio task
// Serializes host commands, transport events and timers; exposes a handle to the host

use crate::terminal::{
    bridge::TerminalBridge,
    protocol::ConnectionStatus,
    surface::{DisplaySurface, SurfaceEvent, TerminalSize},
};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests the host can make of a running bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCommand {
    Connect,
    Disconnect,
    Reconnect,
    Clear,
    Fit,
    Surface(SurfaceEvent),
    Shutdown,
}

/// Host-side handle to a bridge task.
///
/// Every operation is fire-and-forget. Once the task has stopped, commands
/// are dropped and the last published status remains readable.
pub struct BridgeHandle {
    commands: mpsc::UnboundedSender<BridgeCommand>,
    status: watch::Receiver<ConnectionStatus>,
    task: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn connect(&self) {
        self.send(BridgeCommand::Connect);
    }

    pub fn disconnect(&self) {
        self.send(BridgeCommand::Disconnect);
    }

    pub fn reconnect(&self) {
        self.send(BridgeCommand::Reconnect);
    }

    pub fn clear(&self) {
        self.send(BridgeCommand::Clear);
    }

    /// Request a refit after a layout change; bursts are coalesced
    pub fn fit(&self) {
        self.send(BridgeCommand::Fit);
    }

    /// Forward keystroke data as the display surface would
    pub fn send_data(&self, data: impl Into<String>) {
        self.send(BridgeCommand::Surface(SurfaceEvent::Data(data.into())));
    }

    pub fn resize(&self, size: TerminalSize) {
        self.send(BridgeCommand::Surface(SurfaceEvent::Resize(size)));
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Tear the session down and wait for the bridge task to finish
    pub async fn shutdown(mut self) {
        self.send(BridgeCommand::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Bridge task ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: BridgeCommand) {
        if self.commands.send(command).is_err() {
            debug!("Bridge task has stopped; dropping command");
        }
    }
}

/// Mount `bridge` on a new tokio task and return its handle
pub fn spawn_bridge<S>(mut bridge: TerminalBridge<S>) -> BridgeHandle
where
    S: DisplaySurface + 'static,
{
    let (command_tx, mut command_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(bridge.status());

    bridge.set_status_callback(Box::new(move |status| {
        let _ = status_tx.send(status.clone());
    }));

    let mut events = bridge.take_transport_events().unwrap_or_else(|| {
        warn!("Transport events already taken; transport signals will be ignored");
        mpsc::unbounded_channel().1
    });

    let task = tokio::spawn(async move {
        info!("Bridge task started for session {}", bridge.session_id());
        bridge.mount();

        loop {
            let deadline = bridge.next_deadline();
            tokio::select! {
                command = command_rx.recv() => match command {
                    Some(BridgeCommand::Shutdown) | None => break,
                    Some(command) => apply_command(&mut bridge, command),
                },
                Some(event) = events.recv() => bridge.handle_transport_event(event),
                () = sleep_until(deadline) => bridge.poll_timers(Instant::now()),
            }
        }

        bridge.dispose();
        info!("Bridge task stopped for session {}", bridge.session_id());
    });

    BridgeHandle {
        commands: command_tx,
        status: status_rx,
        task: Some(task),
    }
}

fn apply_command<S: DisplaySurface>(bridge: &mut TerminalBridge<S>, command: BridgeCommand) {
    match command {
        BridgeCommand::Connect => bridge.connect(),
        BridgeCommand::Disconnect => bridge.disconnect(),
        BridgeCommand::Reconnect => bridge.reconnect(),
        BridgeCommand::Clear => bridge.clear(),
        BridgeCommand::Fit => bridge.request_fit(Instant::now()),
        BridgeCommand::Surface(event) => bridge.handle_surface_event(event),
        BridgeCommand::Shutdown => bridge.dispose(),
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
