//! VS Code Remote: command-line front end.
//!
//! Keeps a WebSocket open to the editor-side listener and sends one editor
//! command per line read from stdin.
//!
//! # Usage
//!
//! ```text
//! vscrx-remote [OPTIONS]
//!
//! Options:
//!   --address <HOST>            Editor address; saved for the next run
//!   --config <PATH>             Config file [default: platform config dir]
//!   --reconnect-delay-ms <MS>   Wait before reconnecting [default: 2000]
//! ```
//!
//! | Variable        | Description                       |
//! |-----------------|-----------------------------------|
//! | `VSCRX_ADDRESS` | Same as `--address`               |
//! | `VSCRX_CONFIG`  | Same as `--config`                |
//! | `RUST_LOG`      | Log filter (overrides `log_level`)|
//!
//! # Stdin commands
//!
//! ```text
//! ip <HOST>     save the address and connect to it
//! status        print the connection status
//! list          print the control buttons
//! <button>      press a button by token, 1-based number, or label
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vscrx_core::EditorCommand;
use vscrx_remote::application::ConnectionConfig;
use vscrx_remote::infrastructure::storage::config::{config_file_path, load_config_from};
use vscrx_remote::infrastructure::storage::{ConnectionSettings, TomlAddressStore};
use vscrx_remote::infrastructure::ui_bridge::{
    get_status, home_view, press_command, restore_saved_address, save_settings, HomeViewDto,
    RemoteAppState, SettingsDto, ADDRESS_NOT_SET_NOTICE,
};
use vscrx_remote::infrastructure::websocket_event_loop;

/// How long shutdown waits for the closing handshake with the editor.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Remote control for VS Code over WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "vscrx-remote",
    about = "Send editor commands to VS Code over a self-healing WebSocket",
    version
)]
struct Cli {
    /// Editor address (IP or hostname).  Saved as the new default.
    #[arg(long, env = "VSCRX_ADDRESS")]
    address: Option<String>,

    /// Path of the config file that also stores the address.
    #[arg(long, env = "VSCRX_CONFIG")]
    config: Option<PathBuf>,

    /// Milliseconds to wait before reconnecting after a drop.
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given and no platform config dir"),
        }
    }

    /// Applies command-line overrides on top of the file settings.
    fn into_connection_config(self, settings: &ConnectionSettings) -> ConnectionConfig {
        let mut config = settings.to_connection_config();
        if let Some(ms) = self.reconnect_delay_ms {
            config.reconnect_delay = Duration::from_millis(ms);
        }
        config
    }
}

// ── Stdin commands ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Empty,
    SetAddress(String),
    Status,
    List,
    Press(String),
}

fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    if let Some(rest) = line.strip_prefix("ip ") {
        return Line::SetAddress(rest.trim().to_string());
    }
    match line {
        "ip" => Line::SetAddress(String::new()),
        "status" => Line::Status,
        "list" => Line::List,
        other => Line::Press(resolve_button(other)),
    }
}

/// Maps a button number or label to its token.  Anything else is passed
/// through as a raw token.
fn resolve_button(input: &str) -> String {
    if let Ok(n) = input.parse::<usize>() {
        if let Some(cmd) = n.checked_sub(1).and_then(|i| EditorCommand::ALL.get(i)) {
            return cmd.token().to_string();
        }
    }
    EditorCommand::from_label(input)
        .map(|cmd| cmd.token().to_string())
        .unwrap_or_else(|| input.to_string())
}

async fn run_repl(state: std::sync::Arc<RemoteAppState>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_line(&line) {
            Line::Empty => {}
            Line::SetAddress(address) => {
                let result = save_settings(state.clone(), SettingsDto { address }).await;
                println!("{}", result.data.or(result.error).unwrap_or_default());
            }
            Line::Status => {
                if let Some(status) = get_status(state.clone()).await.data {
                    println!("Connection Status: {} {}", status.connection_status, status.address);
                }
            }
            Line::List => match home_view(state.clone()).await.data {
                Some(HomeViewDto::NeedsAddress { message }) => println!("{message}"),
                Some(HomeViewDto::Controls { buttons }) => {
                    for (i, button) in buttons.iter().enumerate() {
                        println!("{:>2}. {:<16} {}", i + 1, button.label, button.token);
                    }
                }
                None => {}
            },
            Line::Press(token) => {
                let result = press_command(state.clone(), token.clone()).await;
                match result.error {
                    Some(message) => println!("{message}"),
                    None => println!("sent {token}"),
                }
            }
        }
    }

    info!("stdin closed");
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// A current-thread runtime is enough: one event loop task owns the
/// connection, and the rest is waiting on stdin and timers.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;
    let file_config = load_config_from(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the level from the config file applies.  Logs
    // go to stderr so they do not mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file_config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli_address = cli.address.clone();
    let connection = cli.into_connection_config(&file_config.connection);
    info!(
        "VS Code Remote starting: config={}, port={}, reconnect={:?}",
        config_path.display(),
        connection.port,
        connection.reconnect_delay
    );

    // ── Connection core ───────────────────────────────────────────────────────
    let (event_loop, remote) = websocket_event_loop(connection);
    let loop_task = tokio::spawn(event_loop.run());
    let state = RemoteAppState::new(remote.clone(), TomlAddressStore::new(&config_path));

    // Print every status change.
    let mut status_rx = remote.subscribe();
    tokio::spawn(async move {
        loop {
            let status = *status_rx.borrow_and_update();
            println!("Connection Status: {status}");
            if status_rx.changed().await.is_err() {
                break;
            }
        }
    });

    match cli_address {
        Some(address) => {
            let result = save_settings(state.clone(), SettingsDto { address }).await;
            if let Some(e) = result.error {
                error!("could not use --address: {e}");
            }
        }
        None => {
            let result = restore_saved_address(state.clone()).await;
            match (result.data, result.error) {
                (Some(None), _) => println!("{ADDRESS_NOT_SET_NOTICE}"),
                (_, Some(e)) => error!("could not read saved address: {e}"),
                _ => {}
            }
        }
    }

    // ── Main loop ─────────────────────────────────────────────────────────────
    tokio::select! {
        result = run_repl(state) => result?,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        },
    }

    // The loop closes the session on shutdown; wait for the close frame to
    // go out before the runtime is dropped.
    remote.shutdown().await;
    let manager = loop_task.await.context("event loop task panicked")?;
    manager.into_transport().drain_sessions(SHUTDOWN_GRACE).await;

    info!("VS Code Remote stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
