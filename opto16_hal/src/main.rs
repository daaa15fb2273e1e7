//! # opto16 Binary
//!
//! Command-line front end for 16-channel opto-isolated input boards.
//!
//! # Usage
//!
//! ```bash
//! # Read all channels of the board at stack level 2
//! opto16 read --stack 2 --channel 0
//!
//! # Read channel 5 from the simulated bus, verbose logging
//! opto16 -s -v read --stack 0 --channel 5
//!
//! # List boards present on the bus
//! opto16 list
//!
//! # Serve JSON-lines requests from stdin using a config file
//! opto16 --config /etc/opto16/opto16.toml serve
//! ```

use clap::{Parser, Subcommand};
use opto16_common::bus::{BusError, I2cBus};
use opto16_common::config::{AppConfig, ConfigLoader};
use opto16_hal::discovery::discover_boards;
use opto16_hal::host::{CollectingSink, JsonLineSink};
use opto16_hal::node::{Message, NodeStatus, OptoInputNode};
use opto16_hal::{AddressResolver, BusRegistry};
use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// opto16 - reader for 16-channel opto-isolated input boards
#[derive(Parser, Debug)]
#[command(name = "opto16")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Reader for 16-channel opto-isolated input boards on the I2C bus")]
#[command(long_about = None)]
struct Args {
    /// Path to configuration file (opto16.toml). Defaults are used without it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Force simulation driver
    #[arg(short = 's', long)]
    simulate: bool,

    /// Bus driver to use (overrides [bus].driver)
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one channel (1..16) or all channels (0) of a board
    Read {
        /// Board stack level (0..7); falls back to [node].stack
        #[arg(long, allow_hyphen_values = true)]
        stack: Option<String>,

        /// Channel (1..16, 0 = all); falls back to [node].channel
        #[arg(long, allow_hyphen_values = true)]
        channel: Option<String>,

        /// Print the raw register word instead of the decoded value
        #[arg(long)]
        raw: bool,
    },

    /// List boards connected to the bus
    List,

    /// Handle newline-delimited JSON messages from stdin until EOF or a signal
    Serve,
}

fn main() {
    if let Err(e) = run() {
        error!("opto16 failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, &AppConfig::default());
            return Err(e);
        }
    };

    setup_tracing(&args, &config);
    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let driver = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else if let Some(name) = &args.driver {
        name.clone()
    } else {
        config.bus.driver.clone()
    };

    let registry = BusRegistry::with_builtin_drivers();
    let node = OptoInputNode::open_with(config.node.clone(), &registry, &driver, &config.bus)?;

    let outcome = match args.command {
        Command::Read {
            stack,
            channel,
            raw,
        } => cmd_read(&node, stack, channel, raw),
        Command::List => {
            cmd_list(&node);
            Ok(())
        }
        Command::Serve => cmd_serve(&node),
    };

    // The bus is released whatever the command did.
    let closed = node.close();
    info!("opto16 shutdown complete");
    finish(outcome, closed)
}

/// Combine the command outcome with the bus release. The command's own
/// error is reported first.
fn finish(
    outcome: Result<(), Box<dyn std::error::Error>>,
    closed: Result<(), BusError>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = &closed {
        error!("Failed to release bus: {}", e);
    }
    outcome?;
    closed?;
    Ok(())
}

/// Load and validate the config file, or defaults without one.
fn load_config(args: &Args) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => AppConfig::load(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?,
        None => AppConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn cmd_read(
    node: &OptoInputNode<Box<dyn I2cBus>>,
    stack: Option<String>,
    channel: Option<String>,
    raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let msg = Message {
        stack: stack.map(Value::from),
        channel: channel.map(Value::from),
        ..Message::default()
    };

    if raw {
        // Only the stack matters for a raw read.
        let msg = Message {
            channel: msg.channel.or(Some(Value::from(0))),
            ..msg
        };
        let resolved = AddressResolver::default().resolve_request(node.config(), &msg)?;
        let word = node.reader().read_raw(resolved.address)?;
        println!("0x{word:04x}");
        return Ok(());
    }

    let mut sink = CollectingSink::default();
    node.on_input(msg, &mut sink);

    if let Some(sent) = sink.sent.pop() {
        println!("{}", sent.payload);
        return Ok(());
    }
    if let Some((err, _)) = sink.errors.pop() {
        return Err(err.into());
    }
    match sink.last_status() {
        Some(NodeStatus::Fault(text)) => Err(text.clone().into()),
        _ => Err("request produced no result".into()),
    }
}

fn cmd_list(node: &OptoInputNode<Box<dyn I2cBus>>) {
    let boards = discover_boards(node.reader());
    println!("{} board(s) detected", boards.len());
    if !boards.is_empty() {
        let ids: Vec<String> = boards.iter().map(u8::to_string).collect();
        println!("Id: {}", ids.join(" "));
    }
}

/// How often `serve` checks the shutdown flag while stdin is idle.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

fn cmd_serve(
    node: &OptoInputNode<Box<dyn I2cBus>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    // stdin blocks, so it is read on its own thread.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    info!("Serving requests from stdin");
    let stdout = io::stdout();
    let mut sink = JsonLineSink::new(stdout.lock());

    while running.load(Ordering::SeqCst) {
        let line = match rx.recv_timeout(SIGNAL_POLL) {
            Ok(line) => line?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(&line) {
            Ok(msg) => node.on_input(msg, &mut sink),
            Err(e) => warn!("Ignoring malformed message: {}", e),
        }
    }

    let (forwarded, failed) = sink.counts();
    info!("Served {} message(s), {} failed", forwarded, failed);
    if let NodeStatus::Fault(text) = sink.current_status() {
        warn!("Last request left status: {}", text);
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and config.
fn setup_tracing(args: &Args, config: &AppConfig) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.shared.log_level.into()
    };

    // Logs go to stderr so stdout carries only results.
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_wins_over_release_error() {
        let err = finish(Err("read failed".into()), Err(BusError::Closed)).unwrap_err();
        assert_eq!(err.to_string(), "read failed");

        let err = finish(Ok(()), Err(BusError::Closed)).unwrap_err();
        assert_eq!(err.to_string(), BusError::Closed.to_string());

        assert!(finish(Ok(()), Ok(())).is_ok());
    }
}
