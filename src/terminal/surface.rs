// ABOUTME: Display surface abstraction the bridge renders into
// Any terminal emulator (or a test fake) can sit behind this trait

/// Visible geometry of a display surface, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Raw events produced by the display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Keystroke data, already encoded as terminal bytes
    Data(String),
    Resize(TerminalSize),
}

/// The bridge is the sole writer to a surface and owns it until disposal.
pub trait DisplaySurface: Send {
    fn write(&mut self, text: &str);

    fn writeln(&mut self, text: &str) {
        self.write(text);
        self.write("\r\n");
    }

    fn clear(&mut self);

    fn size(&self) -> TerminalSize;

    /// Recompute the visible row/column count. Returns the new size only when
    /// it differs from the previous one.
    fn fit(&mut self) -> Option<TerminalSize>;

    fn dispose(&mut self);
}

/// ANSI sequences used for transcript notices.
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD_GREEN: &str = "\x1b[1;32m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const BLUE: &str = "\x1b[34m";

    pub fn paint(color: &str, text: &str) -> String {
        format!("{color}{text}{RESET}")
    }

    /// Drop CSI escape sequences, leaving printable text
    pub fn strip(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' && chars.peek() == Some(&'[') {
                chars.next();
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }
}
