//! Keygate binary.
//!
//! # Usage
//!
//! ```bash
//! # Print the digest to configure
//! keygate digest letmein
//!
//! # Type into the gate from stdin
//! KEYGATE_TARGET_DIGEST=<hex> keygate --debug-status --notifications
//!
//! # One-shot session management
//! keygate login letmein
//! keygate status
//! keygate logout
//! ```
//!
//! In `run` mode every stdin line is typed as ambient keystrokes. A line
//! starting with `>` is typed into a focused text field instead, and lines
//! starting with `:` are commands: `:login <password>`, `:logout`,
//! `:route <path>`. Keystrokes and commands reach the gate in stdin order.
//!
//! `login` and `logout` exit non-zero when the session file could not be
//! updated.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::{Parser, Subcommand};
use keygate_core::{Keystroke, NotificationPermission, digest};
use keygate_runtime::{
    DEFAULT_STATE_FILE, DriverCommand, Frontend, GateDriver, KeyboardHub, RuntimeConfig,
    RuntimeError,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Hidden keystroke-triggered admin gate
#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(about = "Hidden keystroke-triggered admin gate")]
#[command(version)]
struct Args {
    /// Hex-encoded SHA-256 digest of the secret
    #[arg(long, env = "KEYGATE_TARGET_DIGEST", hide_env_values = true)]
    target_digest: Option<String>,

    /// Session file
    #[arg(long, env = "KEYGATE_STATE_FILE", default_value = DEFAULT_STATE_FILE)]
    state_file: PathBuf,

    /// Storage key for the authenticated flag
    #[arg(long, default_value = keygate_core::config::DEFAULT_STORAGE_KEY)]
    storage_key: String,

    /// Route navigated to after login
    #[arg(long, default_value = keygate_core::config::DEFAULT_ADMIN_ROUTE)]
    admin_route: String,

    /// Delay between login and navigation, in milliseconds
    #[arg(long, default_value = "500")]
    navigation_delay_ms: u64,

    /// Print the debug status line on every state change
    #[arg(long)]
    debug_status: bool,

    /// Treat notification permission as granted
    #[arg(long)]
    notifications: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read keystrokes from stdin (default)
    Run,
    /// Print the hex digest of a passphrase
    Digest {
        /// Passphrase to hash
        passphrase: String,
    },
    /// Log in with an explicit password
    Login {
        /// Password to check
        password: String,
    },
    /// End the persisted admin session
    Logout,
    /// Show whether the persisted session is authenticated
    Status,
}

impl Args {
    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            target_digest: self.target_digest.clone(),
            state_file: self.state_file.clone(),
            storage_key: self.storage_key.clone(),
            admin_route: self.admin_route.clone(),
            navigation_delay: Duration::from_millis(self.navigation_delay_ms),
            debug_status: self.debug_status,
        }
    }
}

/// Frontend writing to the terminal.
struct TerminalFrontend {
    permission: NotificationPermission,
    route: String,
}

impl TerminalFrontend {
    fn write_line(line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{line}")
    }
}

impl Frontend for TerminalFrontend {
    fn notification_permission(&self) -> NotificationPermission {
        self.permission
    }

    fn current_route(&self) -> Option<String> {
        Some(self.route.clone())
    }

    fn notify(&mut self, title: &str, body: &str) {
        if let Err(e) = Self::write_line(&format!("[notification] {title}: {body}")) {
            tracing::warn!("notification not shown: {}", e);
        }
    }

    fn navigate(&mut self, route: &str) -> Result<(), RuntimeError> {
        Self::write_line(&format!("[navigate] {} -> {}", self.route, route)).map_err(|e| {
            RuntimeError::Navigation { route: route.to_string(), reason: e.to_string() }
        })?;
        self.route = route.to_string();
        Ok(())
    }

    fn show_status(&mut self, line: &str) {
        if let Err(e) = Self::write_line(line) {
            tracing::warn!("status not shown: {}", e);
        }
    }
}

/// One parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Keys(Vec<Keystroke>),
    Command(DriverCommand),
    Unknown(String),
}

fn parse_line(line: &str) -> Input {
    if let Some(command) = line.strip_prefix(':') {
        let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
        return match (name, arg.trim()) {
            ("login", password) => Input::Command(DriverCommand::ForceLogin(password.to_string())),
            ("logout", _) => Input::Command(DriverCommand::Logout),
            ("route", path) if !path.is_empty() => {
                Input::Command(DriverCommand::RouteChanged(path.to_string()))
            },
            _ => Input::Unknown(name.to_string()),
        };
    }

    match line.strip_prefix('>') {
        Some(text) => Input::Keys(text.chars().map(Keystroke::text_input).collect()),
        None => Input::Keys(line.chars().map(Keystroke::ambient).collect()),
    }
}

/// Forward stdin to the command channel until EOF, keystrokes included.
async fn pump_stdin(commands: mpsc::UnboundedSender<DriverCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let sent = match parse_line(&line) {
                    Input::Keys(keys) => keys
                        .into_iter()
                        .all(|key| commands.send(DriverCommand::Type(key)).is_ok()),
                    Input::Command(command) => commands.send(command).is_ok(),
                    Input::Unknown(name) => {
                        tracing::warn!("unknown command :{}", name);
                        true
                    },
                };
                if !sent {
                    break;
                }
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("stdin read failed: {}", e);
                break;
            },
        }
    }

    tracing::debug!("stdin closed");
}

async fn run(args: &Args, config: &RuntimeConfig) -> Result<(), RuntimeError> {
    let controller = config.controller()?;
    let frontend = TerminalFrontend {
        permission: if args.notifications {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        },
        route: "/".to_string(),
    };
    let mut driver = GateDriver::new(controller, frontend, config.status_view());

    // Stdin carries keystrokes as commands; the hub stays open for other
    // keystroke sources embedded alongside the terminal.
    let hub = KeyboardHub::new();
    let subscription = hub.attach();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(pump_stdin(tx));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    driver.run(subscription, rx, shutdown).await;
    drop(hub);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config = args.runtime_config();
    let mut out = io::stdout();

    match &args.command {
        None | Some(Command::Run) => {
            tracing::info!("keygate starting, session file {}", config.state_file.display());
            run(&args, &config).await?;
        },

        Some(Command::Digest { passphrase }) => {
            writeln!(out, "{}", digest::digest_hex(passphrase))?;
        },

        Some(Command::Login { password }) => match config.login_once(password) {
            Ok(true) => writeln!(out, "authenticated")?,
            Ok(false) => {
                writeln!(out, "rejected")?;
                return Ok(ExitCode::FAILURE);
            },
            Err(e) => {
                tracing::error!("login failed: {}", e);
                return Ok(ExitCode::FAILURE);
            },
        },

        Some(Command::Logout) => match config.logout_once() {
            Ok(was_authenticated) => {
                writeln!(out, "{}", if was_authenticated { "logged out" } else { "not logged in" })?;
            },
            Err(e) => {
                tracing::error!("logout failed: {}", e);
                return Ok(ExitCode::FAILURE);
            },
        },

        Some(Command::Status) => {
            let controller = config.controller()?;
            let state = if controller.is_authenticated() { "authenticated" } else { "locked" };
            writeln!(out, "{state} ({})", config.state_file.display())?;
        },
    }

    Ok(ExitCode::SUCCESS)
}
