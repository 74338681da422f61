use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::bail;
use clap::{Parser, Subcommand};
use pengwm::common::config::{Config, config_file, restore_file};
use pengwm::common::log;
use pengwm::layout_engine::Direction;
use pengwm::session::Session;
use pengwm::sys::geometry::Rect;
use pengwm::sys::headless::HeadlessWindowServer;
use pengwm::sys::screen::DisplayId;
use pengwm::sys::window_server::{WindowId, WindowServer, pid_t};
use pengwm::wm_controller::{ManagedWindow, WmCommand, WmController};
use serde::Serialize;
use tracing::warn;

const DEFAULT_DISPLAY: Rect = Rect::from_xywh(0.0, 0.0, 1440.0, 900.0);

#[derive(Parser)]
#[command(name = "pengwm")]
#[command(about = "Binary space partitioning tiling window manager")]
struct Cli {
    /// Session file holding the layout and the known windows.
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Configuration file to use instead of ~/.pengwm/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// A single line typed into `pengwm shell`.
#[derive(Parser)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session with one workspace per display
    Init {
        /// Display bounds as x,y,width,height. May be repeated.
        #[arg(long = "display")]
        displays: Vec<Rect>,
        /// Replace an existing session
        #[arg(long)]
        force: bool,
    },
    /// Open a window (simulated window server)
    Open {
        #[arg(long)]
        pid: pid_t,
        #[arg(long)]
        app: String,
        #[arg(long, default_value = "100,100,640,480")]
        frame: Rect,
    },
    /// Close a window (simulated window server)
    Close { window: u32 },
    /// List managed windows
    List,
    /// Manage every visible window and apply the layout
    Tile,
    /// Focus the window in a direction
    Focus { direction: Direction },
    /// Swap the focused window with its neighbour
    Swap { direction: Direction },
    /// Grow the focused window
    Grow,
    /// Shrink the focused window
    Shrink,
    /// Manage the windows of a process
    Add { pid: pid_t },
    /// Stop managing the windows of a process
    Remove { pid: pid_t },
    /// Show workspaces and managed windows
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Print the BSP tree of every display
    Tree,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
    /// Read commands from stdin, one per line
    Shell,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    WriteDefault {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct StatusReport<'a> {
    focused: Option<WindowId>,
    workspaces: Vec<WorkspaceStatus>,
    managed: Vec<&'a ManagedWindow>,
}

#[derive(Serialize)]
struct WorkspaceStatus {
    display: DisplayId,
    bounds: Rect,
    windows: Vec<WindowId>,
}

fn main() {
    let cli = Cli::parse();

    log::init_logging();
    install_panic_hook();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let state_path = cli.state.unwrap_or_else(restore_file);
    let config_path = cli.config.unwrap_or_else(config_file);

    match cli.command {
        Commands::Init { displays, force } => {
            if state_path.exists() && !force {
                bail!(
                    "session {} already exists; pass --force to replace it",
                    state_path.display()
                );
            }
            let displays = if displays.is_empty() { vec![DEFAULT_DISPLAY] } else { displays };
            let session = Session::new(load_config(&config_path)?, displays)?;
            session.save(&state_path)?;
            println!(
                "Initialized {} workspace(s)",
                session.controller.layout().workspaces().len()
            );
        }
        Commands::Config { action } => match action.unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => print!("{}", load_config(&config_path)?.to_toml_string()?),
            ConfigCommands::WriteDefault { force } => {
                if config_path.exists() && !force {
                    bail!("{} already exists; pass --force to overwrite it", config_path.display());
                }
                Config::write_default(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
        Commands::Shell => {
            let mut session = Session::load(&state_path, load_config(&config_path)?)?;
            shell(&mut session)?;
            session.save(&state_path)?;
        }
        command => {
            let mut session = Session::load(&state_path, load_config(&config_path)?)?;
            execute(&mut session, command)?;
            session.save(&state_path)?;
        }
    }
    Ok(())
}

/// Reads the configuration, repairing invalid values with a warning.
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::read_or_default(path)?;
    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            warn!("Config: {issue}");
        }
        let fixes = config.auto_fix_values();
        warn!("Applied {fixes} config fix(es)");
    }
    Ok(config)
}

fn execute(session: &mut Session, command: Commands) -> anyhow::Result<()> {
    let Session { controller, server } = session;
    let auto_tile = controller.config().settings.auto_tile;

    match command {
        Commands::Open { pid, app, frame } => {
            let id = server.open_window(pid, &app, frame);
            println!("Opened window {id}");
        }
        Commands::Close { window } => {
            let id = WindowId::new(window);
            if !server.close_window(id) {
                bail!("no window {window}");
            }
            if controller.forget_closed_windows(&*server) > 0 && auto_tile {
                controller.tile(server);
            }
            println!("Closed window {id}");
        }
        Commands::List => {
            let managed: Vec<_> = controller.managed_windows().collect();
            println!("Managed Windows ({} total):", managed.len());
            println!("{:<8} {:<20} {:<8} Frame", "ID", "Application", "PID");
            for w in managed {
                println!("{:<8} {:<20} {:<8} {}", w.id, w.app_name, w.pid, w.frame);
            }
        }
        Commands::Tile => {
            controller.forget_closed_windows(&*server);
            controller.organize_existing_windows(&*server);
            let report = controller.tile(server);
            println!("Tiled {} window(s)", report.placed);
            if report.failed > 0 {
                println!("{} window(s) could not be placed", report.failed);
            }
        }
        Commands::Focus { direction } => match controller.focus(server, direction) {
            Some(id) => {
                let app = controller.managed_window(id).map(|w| w.app_name.as_str()).unwrap_or("?");
                println!("Focused window {id} ({app})");
            }
            None => println!("No window found in direction '{direction}'"),
        },
        Commands::Swap { direction } => {
            let response = controller.handle_command(server, &WmCommand::Swap(direction));
            if !response.needs_retile {
                println!("No window found in direction '{direction}'");
            }
        }
        Commands::Grow => resize(controller, server, WmCommand::IncreaseSize),
        Commands::Shrink => resize(controller, server, WmCommand::DecreaseSize),
        Commands::Add { pid } => match controller.add_windows_for_pid(server, pid) {
            0 => println!("No new windows found for PID {pid}"),
            n => println!("Added {n} window(s) from PID {pid}"),
        },
        Commands::Remove { pid } => match controller.close_windows_for_pid(server, pid) {
            0 => println!("No windows found for PID {pid}"),
            n => println!("Removed {n} window(s) from PID {pid}"),
        },
        Commands::Status { json } => {
            let layout = controller.layout();
            let report = StatusReport {
                focused: server.focused_window(),
                workspaces: layout
                    .workspaces()
                    .iter()
                    .map(|ws| WorkspaceStatus {
                        display: ws.display(),
                        bounds: ws.bounds(),
                        windows: ws.tree().windows(),
                    })
                    .collect(),
                managed: controller.managed_windows().collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for ws in &report.workspaces {
                    println!("{} {}: {} window(s)", ws.display, ws.bounds, ws.windows.len());
                }
                match report.focused {
                    Some(id) => println!("Focused: {id}"),
                    None => println!("Focused: none"),
                }
            }
        }
        Commands::Tree => {
            for ws in controller.layout().workspaces().iter() {
                println!("{}:", ws.display());
                print!("{}", ws.tree().draw_tree());
            }
        }
        Commands::Init { .. } | Commands::Config { .. } | Commands::Shell => {
            bail!("not available inside the shell");
        }
    }
    Ok(())
}

fn resize(controller: &mut WmController, server: &mut HeadlessWindowServer, command: WmCommand) {
    if !controller.handle_command(server, &command).needs_retile {
        println!("Nothing to resize");
    }
}

fn shell(session: &mut Session) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            _ => {}
        }
        match ShellLine::try_parse_from(words) {
            Ok(parsed) => {
                if let Err(e) = execute(session, parsed.command) {
                    println!("Error: {e:#}");
                }
            }
            Err(e) => println!("{e}"),
        }
        stdout.flush()?;
    }
    Ok(())
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic so a half-applied command never reaches the session file.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
