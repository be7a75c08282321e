// ABOUTME: Offline demo shell used when the terminal backend cannot be reached
// Echoes keystrokes locally and answers a fixed table of canned commands

use crate::terminal::surface::{ansi, DisplaySurface};
use std::iter::Peekable;
use std::str::Chars;

const ENTER: char = '\r';
const BACKSPACE: char = '\x7f';
const CTRL_C: char = '\x03';
const ESCAPE: char = '\x1b';

/// What a demo command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Lines(Vec<String>),
    Clear,
}

/// Local line editor plus canned command table. Never touches the host.
#[derive(Debug, Clone)]
pub struct DemoShell {
    hostname: String,
    current_command: String,
}

impl DemoShell {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            current_command: String::new(),
        }
    }

    pub fn current_command(&self) -> &str {
        &self.current_command
    }

    pub fn prompt(&self, surface: &mut dyn DisplaySurface) {
        surface.write(&format!(
            "{}:{}$ ",
            ansi::paint(ansi::GREEN, &format!("app@{}", self.hostname)),
            ansi::paint(ansi::BLUE, "/app")
        ));
    }

    /// Interpret one chunk of keystroke data from the display surface
    pub fn feed(&mut self, data: &str, surface: &mut dyn DisplaySurface) {
        let mut chars = data.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                // Arrow keys, function keys and Alt chords have no meaning here
                ESCAPE => skip_escape_sequence(&mut chars),
                ENTER => self.submit(surface),
                BACKSPACE => {
                    if self.current_command.pop().is_some() {
                        surface.write("\x08 \x08");
                    }
                }
                CTRL_C => {
                    surface.write("^C\r\n");
                    self.current_command.clear();
                    self.prompt(surface);
                }
                ' '..='~' => {
                    self.current_command.push(c);
                    let mut echo = [0u8; 4];
                    surface.write(c.encode_utf8(&mut echo));
                }
                _ => {}
            }
        }
    }

    fn submit(&mut self, surface: &mut dyn DisplaySurface) {
        surface.write("\r\n");
        let line = std::mem::take(&mut self.current_command);
        let line = line.trim();
        if !line.is_empty() {
            match self.run(line) {
                CommandOutput::Lines(lines) => {
                    for line in lines {
                        surface.writeln(&line);
                    }
                }
                CommandOutput::Clear => surface.clear(),
            }
        }
        self.prompt(surface);
    }

    /// Answer a command from the fixed table
    pub fn run(&self, line: &str) -> CommandOutput {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return CommandOutput::Lines(Vec::new());
        };
        let args: Vec<&str> = words.collect();

        let lines: Vec<String> = match command {
            "help" => vec![
                "Demo mode: the instance terminal is unavailable.".to_string(),
                "Available commands: help, ls, pwd, whoami, ps, echo, date, uname, hostname, clear, exit"
                    .to_string(),
            ],
            "ls" => vec![format!(
                "{}  {}  node_modules  package.json  README.md",
                ansi::paint(ansi::BLUE, "dist"),
                ansi::paint(ansi::BLUE, "src")
            )],
            "pwd" => vec!["/app".to_string()],
            "whoami" => vec!["app".to_string()],
            "ps" => vec![
                "  PID TTY          TIME CMD".to_string(),
                "    1 ?        00:00:03 node".to_string(),
                "   27 pts/0    00:00:00 sh".to_string(),
                "   31 pts/0    00:00:00 ps".to_string(),
            ],
            "echo" => vec![args.join(" ")],
            "date" => vec![chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()],
            "uname" => {
                if args.contains(&"-a") {
                    vec![format!(
                        "Linux {} 5.15.0-omnicloud #1 SMP x86_64 GNU/Linux",
                        self.hostname
                    )]
                } else {
                    vec!["Linux".to_string()]
                }
            }
            "hostname" => vec![self.hostname.clone()],
            "clear" => return CommandOutput::Clear,
            "exit" => vec![ansi::paint(
                ansi::YELLOW,
                "Demo mode has no session to exit. Use Reconnect to try the instance again.",
            )],
            other => vec![format!("{other}: command not found")],
        };

        CommandOutput::Lines(lines)
    }
}

/// Consume the rest of an escape sequence whose ESC was already read:
/// a CSI (`ESC [ ... final`), an SS3 (`ESC O x`) or a single Alt-prefixed key.
fn skip_escape_sequence(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        Some('[') => {
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
        }
        Some('O') => {
            chars.next();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::testing::RecordingSurface;
    use pretty_assertions::assert_eq;

    fn lines(output: CommandOutput) -> Vec<String> {
        match output {
            CommandOutput::Lines(lines) => lines.iter().map(|l| ansi::strip(l)).collect(),
            CommandOutput::Clear => panic!("expected lines"),
        }
    }

    #[test]
    fn test_command_table() {
        let shell = DemoShell::new("i-42");
        assert_eq!(lines(shell.run("pwd")), vec!["/app"]);
        assert_eq!(lines(shell.run("whoami")), vec!["app"]);
        assert_eq!(lines(shell.run("echo hello   world")), vec!["hello world"]);
        assert_eq!(lines(shell.run("hostname")), vec!["i-42"]);
        assert_eq!(lines(shell.run("uname")), vec!["Linux"]);
        assert!(lines(shell.run("uname -a"))[0].contains("i-42"));
        assert!(lines(shell.run("ls"))[0].contains("package.json"));
        assert_eq!(lines(shell.run("ps")).len(), 4);
        assert_eq!(shell.run("clear"), CommandOutput::Clear);
    }

    #[test]
    fn test_unknown_command() {
        let shell = DemoShell::new("i-42");
        assert_eq!(
            lines(shell.run("rm -rf /")),
            vec!["rm: command not found"]
        );
    }

    #[test]
    fn test_typing_and_enter() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("pwd", &mut surface);
        assert_eq!(shell.current_command(), "pwd");

        shell.feed("\r", &mut surface);
        assert_eq!(shell.current_command(), "");
        assert!(surface.lines().iter().any(|line| line == "/app"));
    }

    #[test]
    fn test_backspace_on_empty_buffer() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("\x7f\x7f", &mut surface);
        assert_eq!(shell.current_command(), "");
        assert!(surface.writes().is_empty());

        shell.feed("lsx\x7f", &mut surface);
        assert_eq!(shell.current_command(), "ls");
        assert_eq!(surface.writes().last().map(String::as_str), Some("\x08 \x08"));
    }

    #[test]
    fn test_blank_enter_reprints_prompt() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("   \r", &mut surface);
        assert_eq!(shell.current_command(), "");
        assert!(surface.transcript().ends_with("$ "));
        assert!(!surface.transcript().contains("command not found"));
    }

    #[test]
    fn test_ctrl_c_discards_line() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("whoam\x03", &mut surface);
        assert_eq!(shell.current_command(), "");
        assert!(surface.transcript().contains("^C"));
    }

    #[test]
    fn test_escape_sequences_are_ignored() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("\x1b[A", &mut surface);
        assert_eq!(shell.current_command(), "");
        assert!(surface.writes().is_empty());
    }

    #[test]
    fn test_escape_sequences_inside_pasted_chunk() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("ls\x1b[A", &mut surface);
        assert_eq!(shell.current_command(), "ls");

        shell.feed("\x1b[1;5C -l\x1bOP\x1bb", &mut surface);
        assert_eq!(shell.current_command(), "ls -l");
        assert_eq!(surface.transcript(), "ls -l");
    }

    #[test]
    fn test_clear_command_clears_surface() {
        let mut surface = RecordingSurface::new();
        let mut shell = DemoShell::new("i-42");

        shell.feed("clear\r", &mut surface);
        assert_eq!(surface.clear_count(), 1);
    }
}
