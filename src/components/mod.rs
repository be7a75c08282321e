// ABOUTME: UI components for the console TUI

pub mod console_layout;

pub use console_layout::{footer_hints, status_chip, ConsoleLayout};
