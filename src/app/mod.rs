// ABOUTME: Console application structure: state, key handling and bridge wiring

pub mod events;
pub mod state;

pub use events::{AppEvent, EventHandler, COMMAND_PREFIX};
pub use state::{ConsoleApp, ConsoleState};
