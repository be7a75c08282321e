// ABOUTME: Console application state and the glue between key events and the bridge handle

use crate::app::events::AppEvent;
use crate::models::InstanceTarget;
use crate::terminal::{
    BridgeHandle, ConnectionStatus, TerminalEmulator, TerminalSize,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: usize = 10;

pub struct ConsoleState {
    pub target: InstanceTarget,
    pub status: ConnectionStatus,
    pub emulator: Arc<Mutex<TerminalEmulator>>,
    pub should_quit: bool,
    /// `Ctrl-]` was pressed; the next key selects a console action
    pub command_prefix: bool,
    /// Inner size of the terminal pane from the last layout pass
    pub viewport: Option<TerminalSize>,
}

impl ConsoleState {
    pub fn new(target: InstanceTarget, emulator: Arc<Mutex<TerminalEmulator>>) -> Self {
        Self {
            target,
            status: ConnectionStatus::default(),
            emulator,
            should_quit: false,
            command_prefix: false,
            viewport: None,
        }
    }

    pub fn emulator(&self) -> MutexGuard<'_, TerminalEmulator> {
        self.emulator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ConsoleApp {
    pub state: ConsoleState,
    handle: BridgeHandle,
}

impl ConsoleApp {
    pub fn new(state: ConsoleState, handle: BridgeHandle) -> Self {
        Self { state, handle }
    }

    /// Pull the latest connection status published by the bridge
    pub fn tick(&mut self) {
        let status = self.handle.status();
        if status != self.state.status {
            debug!("Console status now {:?}", status.state);
            self.state.status = status;
        }
    }

    /// Record the pane size after layout; a change triggers a coalesced fit
    pub fn set_viewport(&mut self, size: TerminalSize) {
        if self.state.viewport == Some(size) {
            return;
        }
        self.state.viewport = Some(size);
        self.state.emulator().set_viewport(size);
        self.handle.fit();
    }

    pub fn process_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => {
                info!("Quit requested");
                self.state.should_quit = true;
            }
            AppEvent::Reconnect => self.handle.reconnect(),
            AppEvent::Disconnect => self.handle.disconnect(),
            AppEvent::Clear => self.handle.clear(),
            AppEvent::ScrollUp => self.state.emulator().scroll_up(SCROLL_STEP),
            AppEvent::ScrollDown => self.state.emulator().scroll_down(SCROLL_STEP),
            AppEvent::Input(data) => self.handle.send_data(data),
            AppEvent::LayoutChanged => self.handle.fit(),
        }
    }

    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}
