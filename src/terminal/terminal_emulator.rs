// ABOUTME: vt100-backed display surface and ratatui widget for the instance terminal
// Processes ANSI escape codes, tracks scrollback, and renders the screen into the TUI

use crate::terminal::surface::{DisplaySurface, TerminalSize};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Widget},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Terminal state shared between the bridge (writer) and the UI (renderer)
pub struct TerminalEmulator {
    /// VT100 parser for processing ANSI escape codes
    parser: vt100::Parser,
    size: TerminalSize,

    /// Size of the pane the UI last laid out; applied on the next fit
    viewport: Option<TerminalSize>,
    scrollback_len: usize,
    disposed: bool,
}

impl TerminalEmulator {
    pub fn new(size: TerminalSize, scrollback_len: usize) -> Self {
        Self {
            parser: vt100::Parser::new(size.rows, size.cols, scrollback_len),
            size,
            viewport: None,
            scrollback_len,
            disposed: false,
        }
    }

    /// Process terminal output data
    pub fn process_output(&mut self, data: &str) {
        if self.disposed {
            return;
        }
        trace!("Terminal emulator processing {} bytes of output", data.len());
        self.parser.process(data.as_bytes());
        // New output snaps the view back to the live screen
        self.scroll_to_bottom();
    }

    pub fn clear(&mut self) {
        self.parser = vt100::Parser::new(self.size.rows, self.size.cols, self.scrollback_len);
    }

    pub fn resize(&mut self, size: TerminalSize) {
        self.size = size;
        self.parser.set_size(size.rows, size.cols);
    }

    pub fn set_viewport(&mut self, size: TerminalSize) {
        self.viewport = Some(size);
    }

    /// Adopt the last laid-out viewport; returns the size when it changed
    pub fn fit(&mut self) -> Option<TerminalSize> {
        let target = self.viewport?;
        if target == self.size || target.cols == 0 || target.rows == 0 {
            return None;
        }
        self.resize(target);
        Some(target)
    }

    pub fn size(&self) -> TerminalSize {
        self.size
    }

    pub fn scroll_up(&mut self, n: usize) {
        let offset = self.parser.screen().scrollback();
        self.parser.set_scrollback(offset.saturating_add(n));
    }

    pub fn scroll_down(&mut self, n: usize) {
        let offset = self.parser.screen().scrollback();
        self.parser.set_scrollback(offset.saturating_sub(n));
    }

    pub fn scroll_to_bottom(&mut self) {
        self.parser.set_scrollback(0);
    }

    pub fn scroll_offset(&self) -> usize {
        self.parser.screen().scrollback()
    }

    /// Visible screen text, without attributes
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Convert VT100 screen to ratatui Text
    fn screen_to_text(&self) -> Text<'static> {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        let mut lines = Vec::with_capacity(rows as usize);

        for row in 0..rows {
            let mut spans = Vec::new();
            let mut current_style = Style::default();
            let mut current_text = String::new();

            for col in 0..cols {
                let Some(cell) = screen.cell(row, col) else {
                    current_text.push(' ');
                    continue;
                };
                let cell_style = Self::cell_to_style(cell);

                // If style changed, push current span and start new one
                if cell_style != current_style && !current_text.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut current_text), current_style));
                }
                current_style = cell_style;

                if cell.has_contents() {
                    current_text.push_str(&cell.contents());
                } else if !cell.is_wide_continuation() {
                    current_text.push(' ');
                }
            }

            if !current_text.is_empty() {
                spans.push(Span::styled(current_text, current_style));
            }
            lines.push(Line::from(spans));
        }

        Text::from(lines)
    }

    /// Convert VT100 cell attributes to ratatui Style
    fn cell_to_style(cell: &vt100::Cell) -> Style {
        let mut style = Style::default();

        style = match cell.fgcolor() {
            vt100::Color::Default => style,
            vt100::Color::Idx(n) => style.fg(Self::ansi_to_ratatui_color(n)),
            vt100::Color::Rgb(r, g, b) => style.fg(Color::Rgb(r, g, b)),
        };

        style = match cell.bgcolor() {
            vt100::Color::Default => style,
            vt100::Color::Idx(n) => style.bg(Self::ansi_to_ratatui_color(n)),
            vt100::Color::Rgb(r, g, b) => style.bg(Color::Rgb(r, g, b)),
        };

        if cell.bold() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if cell.italic() {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if cell.underline() {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if cell.inverse() {
            style = style.add_modifier(Modifier::REVERSED);
        }

        style
    }

    /// Convert ANSI color index to ratatui Color
    fn ansi_to_ratatui_color(idx: u8) -> Color {
        match idx {
            0 => Color::Black,
            1 => Color::Red,
            2 => Color::Green,
            3 => Color::Yellow,
            4 => Color::Blue,
            5 => Color::Magenta,
            6 => Color::Cyan,
            7 => Color::Gray,
            8 => Color::DarkGray,
            9 => Color::LightRed,
            10 => Color::LightGreen,
            11 => Color::LightYellow,
            12 => Color::LightBlue,
            13 => Color::LightMagenta,
            14 => Color::LightCyan,
            15 => Color::White,
            n => Color::Indexed(n),
        }
    }
}

fn lock(emulator: &Mutex<TerminalEmulator>) -> MutexGuard<'_, TerminalEmulator> {
    emulator.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`DisplaySurface`] over a shared emulator; the UI keeps another clone to render
#[derive(Clone)]
pub struct EmulatorSurface {
    emulator: Arc<Mutex<TerminalEmulator>>,
}

impl EmulatorSurface {
    pub fn new(emulator: Arc<Mutex<TerminalEmulator>>) -> Self {
        Self { emulator }
    }
}

impl DisplaySurface for EmulatorSurface {
    fn write(&mut self, text: &str) {
        lock(&self.emulator).process_output(text);
    }

    fn clear(&mut self) {
        lock(&self.emulator).clear();
    }

    fn size(&self) -> TerminalSize {
        lock(&self.emulator).size()
    }

    fn fit(&mut self) -> Option<TerminalSize> {
        lock(&self.emulator).fit()
    }

    fn dispose(&mut self) {
        lock(&self.emulator).dispose();
    }
}

/// Borrowed rendering of an emulator inside a bordered block
pub struct TerminalView<'a> {
    emulator: &'a TerminalEmulator,
    title: String,
    focused: bool,
}

impl<'a> TerminalView<'a> {
    pub fn new(emulator: &'a TerminalEmulator) -> Self {
        Self {
            emulator,
            title: String::from("Terminal"),
            focused: true,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for TerminalView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL)
            .border_style(border_style);

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        Paragraph::new(self.emulator.screen_to_text()).render(inner, buf);

        let screen = self.emulator.parser.screen();
        let scroll_offset = self.emulator.scroll_offset();

        // Render cursor if visible and at bottom
        if !screen.hide_cursor() && scroll_offset == 0 {
            let (cursor_row, cursor_col) = screen.cursor_position();
            let cursor_x = inner.left() + cursor_col.min(inner.width - 1);
            let cursor_y = inner.top() + cursor_row.min(inner.height - 1);
            buf.get_mut(cursor_x, cursor_y)
                .set_style(Style::default().add_modifier(Modifier::REVERSED));
        }

        if scroll_offset > 0 {
            let indicator = format!(" ▲ {scroll_offset} lines above ");
            buf.set_string(
                area.left() + 2,
                area.top(),
                indicator,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            );
        }
    }
}
