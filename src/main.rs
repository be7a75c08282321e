// ABOUTME: Main entry point for the OmniCloud console CLI and terminal UI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use omni_console::{
    app::{AppEvent, ConsoleApp, ConsoleState, EventHandler},
    components::ConsoleLayout,
    config::AppConfig,
    models::InstanceTarget,
    terminal::{
        spawn_bridge, EmulatorSurface, TerminalBridge, TerminalEmulator, TerminalSize,
        WebSocketConnector,
    },
};
use ratatui::{prelude::*, Terminal};
use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "omni-console", version, about = "Interactive terminal for OmniCloud instances")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open an interactive terminal on a running instance
    Attach(AttachArgs),
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[derive(Debug, Args)]
struct AttachArgs {
    /// Identifier of the target instance
    instance_id: String,

    /// Dashboard origin, e.g. https://dash.example.com
    #[arg(long)]
    origin: Option<String>,

    #[arg(long)]
    container_address: Option<String>,

    #[arg(long)]
    uptime: Option<String>,

    /// CPU usage in percent, shown in the connection banner
    #[arg(long)]
    cpu: Option<f32>,

    #[arg(long)]
    memory: Option<String>,

    /// Start idle instead of connecting immediately
    #[arg(long)]
    no_auto_connect: bool,

    #[arg(long)]
    connect_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::ShowConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Attach(args) => {
            apply_overrides(&mut config, &args);
            setup_logging()?;
            setup_panic_handler();

            let target = InstanceTarget::new(args.instance_id)
                .with_resources(args.cpu, args.memory);
            let target = match args.container_address {
                Some(address) => target.with_container_address(address),
                None => target,
            };
            let target = match args.uptime {
                Some(uptime) => target.with_uptime(uptime),
                None => target,
            };

            run_console(&config, target).await
        }
    }
}

fn apply_overrides(config: &mut AppConfig, args: &AttachArgs) {
    if let Some(origin) = &args.origin {
        config.dashboard.origin.clone_from(origin);
    }
    if args.no_auto_connect {
        config.terminal.auto_connect = false;
    }
    if let Some(timeout) = args.connect_timeout_ms {
        config.terminal.connect_timeout_ms = timeout;
    }
}

async fn run_console(config: &AppConfig, target: InstanceTarget) -> Result<()> {
    info!("Attaching console to instance {}", target.id);

    let emulator = Arc::new(Mutex::new(TerminalEmulator::new(
        TerminalSize::default(),
        config.terminal.scrollback,
    )));
    let bridge = TerminalBridge::new(
        target.clone(),
        config.bridge_options(),
        EmulatorSurface::new(emulator.clone()),
        Box::new(WebSocketConnector::new()),
    );
    let handle = spawn_bridge(bridge);
    let mut app = ConsoleApp::new(ConsoleState::new(target, emulator), handle);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown().await;
    result
}

fn run_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut ConsoleApp) -> Result<()> {
    let layout = ConsoleLayout::new();
    let poll_interval = Duration::from_millis(30);

    loop {
        app.tick();

        let mut viewport = None;
        terminal.draw(|frame| {
            viewport = Some(layout.render(frame, &app.state));
        })?;
        if let Some(size) = viewport {
            app.set_viewport(size);
        }

        if event::poll(poll_interval)? {
            match event::read()? {
                Event::Key(key_event) => {
                    if let Some(app_event) = EventHandler::handle_key_event(key_event, &mut app.state) {
                        app.process_event(app_event);
                    }
                }
                Event::Paste(text) => app.process_event(AppEvent::Input(text)),
                Event::Resize(_, _) => app.process_event(AppEvent::LayoutChanged),
                Event::Mouse(_) | Event::FocusGained | Event::FocusLost => {}
            }
        }

        if app.state.should_quit {
            break;
        }
    }

    Ok(())
}

fn setup_logging() -> Result<()> {
    use std::fs::OpenOptions;
    use tracing_subscriber::prelude::*;

    let log_dir = AppConfig::log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_file = log_dir.join(format!(
        "omni-console-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to create log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(Mutex::new(file))
                .with_ansi(false), // No ANSI colors in log file
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "omni_console=info".into()),
        )
        .init();

    Ok(())
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        // Restore the terminal before reporting the panic
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stderr(), LeaveAlternateScreen);

        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
