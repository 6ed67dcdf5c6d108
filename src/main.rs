//! MIDI Surface host
//!
//! Monitors a MIDI byte stream, converts binary MIDI to hex text, or drives
//! the configured bankable controls from a script or an interactive prompt.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod sniffer;

use crate::cli::Outcome;
use crate::sniffer::{Decoder, Monitor};
use midi_surface::config::{AppConfig, ConfigWatcher, OutputConfig, OutputFormat, WireFormat};
use midi_surface::interface::{DebugMidiInterface, MidiOutput, SerialMidiInterface};
use midi_surface::parser::encode_hex;
use midi_surface::surface::Surface;
use midi_surface::transport::StreamTransport;

const READ_CHUNK: usize = 1024;

/// MIDI Surface - MIDI stream monitor and bankable control surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (hot reloaded)
    #[arg(short, long, env = "MIDI_SURFACE_CONFIG")]
    config: Option<String>,

    /// Read MIDI input from a file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// Input is hex text
    #[arg(long, conflicts_with = "binary")]
    hex: bool,

    /// Input is binary MIDI
    #[arg(long)]
    binary: bool,

    /// Convert binary input to hex text
    #[arg(long, conflicts_with_all = ["script", "repl"])]
    to_hex: bool,

    /// Print decoded messages as JSON lines
    #[arg(long)]
    json: bool,

    /// Run a gesture script (press/release/bank commands)
    #[arg(long, conflicts_with = "repl")]
    script: Option<String>,

    /// Interactive gesture prompt
    #[arg(long)]
    repl: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.log_json)?;

    info!("Starting MIDI Surface v{}...", env!("CARGO_PKG_VERSION"));

    let (watcher, config) = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            let (watcher, config) = ConfigWatcher::new(path).await?;
            (Some(watcher), config)
        }
        None => {
            info!("No configuration file, using defaults");
            (None, AppConfig::default())
        }
    };

    if args.to_hex {
        let reader = open_input(args.input.as_deref()).await?;
        return run_to_hex(reader, shutdown_signal()).await;
    }

    if args.script.is_some() || args.repl {
        let lines = match &args.script {
            Some(path) => script_lines(cli::read_script(path).await?),
            None => cli::spawn_repl(),
        };
        let surface = Surface::new(&config)?;
        info!("Surface ready: bank {} of {}", surface.bank().setting(), surface.bank().bank_count());
        let output = build_output(&config.output);
        return run_surface(surface, output, lines, watcher, shutdown_signal()).await;
    }

    let format = if args.hex {
        WireFormat::Hex
    } else if args.binary {
        WireFormat::Binary
    } else {
        config.input.format
    };
    let reader = open_input(args.input.as_deref()).await?;
    let decoder = Decoder::new(format, config.input.parser_config());
    run_monitor(reader, decoder, Monitor::new(args.json), shutdown_signal()).await?;

    info!("MIDI Surface shutdown complete");
    Ok(())
}

async fn open_input(path: Option<&str>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input: {}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

/// Output interface writing to stdout in the configured wire format
fn build_output(config: &OutputConfig) -> Box<dyn MidiOutput> {
    let transport = StreamTransport::new(io::empty(), io::stdout());
    match config.format {
        OutputFormat::Binary => Box::new(
            SerialMidiInterface::new(transport).with_running_status_output(config.running_status),
        ),
        OutputFormat::Debug => Box::new(DebugMidiInterface::new(transport)),
    }
}

fn script_lines(lines: Vec<String>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(lines.len().max(1));
    tokio::spawn(async move {
        for line in lines {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_monitor(
    mut reader: Box<dyn AsyncRead + Unpin + Send>,
    mut decoder: Decoder,
    monitor: Monitor,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    monitor.print_header();
    let mut buf = [0u8; READ_CHUNK];
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = read.context("Failed to read MIDI input")?;
                if n == 0 {
                    info!("End of input");
                    break;
                }
                for message in decoder.feed(&buf[..n])? {
                    monitor.print(&message);
                }
            }

            _ = &mut shutdown => break,
        }
    }

    Ok(())
}

async fn run_to_hex(
    mut reader: Box<dyn AsyncRead + Unpin + Send>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut buf = [0u8; READ_CHUNK];
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => {
                let n = read.context("Failed to read MIDI input")?;
                if n == 0 {
                    break;
                }
                stdout.write_all(encode_hex(&buf[..n]).as_bytes()).await?;
            }

            _ = &mut shutdown => break,
        }
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

async fn run_surface(
    mut surface: Surface,
    mut output: Box<dyn MidiOutput>,
    mut lines: mpsc::Receiver<String>,
    mut config_watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                match cli::execute_line(&mut surface, &line, output.as_mut()) {
                    Ok(Outcome::Done) => {}
                    Ok(Outcome::Status(status)) => eprintln!("{}", status),
                    Ok(Outcome::Quit) => break,
                    Err(e) => warn!("{:#}", e),
                }
            }

            Some(new_config) = next_config(&mut config_watcher) => {
                info!("Configuration file changed, reloading...");
                match surface.update_config(new_config) {
                    Ok(()) => info!("Configuration applied, bank {}", surface.bank().setting()),
                    Err(e) => warn!("Failed to apply config (keeping old config): {:#}", e),
                }
            }

            _ = &mut shutdown => break,
        }
    }

    let held = surface.held();
    if !held.is_empty() {
        warn!("Exiting with controls still held: {:?}", held);
    }
    Ok(())
}

async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // stdout carries decoded MIDI, logs go to stderr
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
