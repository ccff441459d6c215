//! serialmon - a split-screen serial line monitor
//!
//! The upper half of the terminal shows what the device sends, the lower
//! half what you type. Every byte in both directions, and every change of
//! the RTS/DTR/CTS/DSR lines, is written to a session log named after the
//! start time (`YYYY_MM_DD_HHMM.txt`).
//!
//! # Quick Start
//!
//! ```text
//! serialmon /dev/ttyUSB0 115200
//! serialmon COM3 9600 --log-dir logs
//! serialmon --list
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Ctrl+R | Toggle RTS |
//! | Ctrl+D | Toggle DTR |
//! | Esc | Discard the next keystroke |
//! | Ctrl+C | Quit |

mod config;
mod core;
mod ui;

#[cfg(test)]
mod testing;

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::port::{self, SerialPortLink};
use crate::core::session::{Monitor, MonitorOptions};
use crate::core::transcript::SessionLog;
use crate::ui::{Layout, Renderer};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default, PartialEq)]
struct Options {
    port: String,
    baud: String,
    log_dir: Option<PathBuf>,
}

/// What the command line asks for
#[derive(Debug, PartialEq)]
enum Command {
    Monitor(Options),
    ListPorts,
    Help,
    Version,
}

fn print_usage() {
    eprintln!("usage: serialmon [OPTIONS] <serial port> <baudrate>");
}

fn print_help() {
    eprintln!("serialmon {} - split-screen serial line monitor", VERSION);
    eprintln!();
    print_usage();
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --log-dir <DIR>   Write the session log to DIR");
    eprintln!("  -l, --list            List available serial ports");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  Ctrl+R                Toggle RTS");
    eprintln!("  Ctrl+D                Toggle DTR");
    eprintln!("  Esc                   Discard the next keystroke");
    eprintln!("  Ctrl+C                Quit");
    eprintln!();
    eprintln!("Configuration: ~/.serialmon/config.toml");
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut options = Options::default();
    let mut positional = Vec::new();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-v" | "--version" => return Ok(Command::Version),
            "-l" | "--list" => return Ok(Command::ListPorts),
            "-d" | "--log-dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing log directory argument".to_string());
                }
                options.log_dir = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    match positional.as_slice() {
        [port, baud] => {
            options.port = port.clone();
            options.baud = baud.clone();
            Ok(Command::Monitor(options))
        }
        [] | [_] => Err("not enough arguments".to_string()),
        _ => Err("too many arguments".to_string()),
    }
}

/// Send diagnostics to ~/.serialmon/serialmon.log; the terminal belongs to the UI
fn init_tracing(config: &Config) {
    let log_path = config::app_dir()
        .map(|dir| dir.join("serialmon.log"))
        .unwrap_or_else(|| PathBuf::from("serialmon.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.trace_level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn list_ports() -> anyhow::Result<()> {
    let ports = port::available_ports()?;
    if ports.is_empty() {
        eprintln!("No serial ports found");
    }
    for name in ports {
        println!("{}", name);
    }
    Ok(())
}

/// Open everything, run the loop, tear down in order
fn run_monitor(options: Options, config: &Config) -> anyhow::Result<()> {
    // Configuration errors surface before the terminal is touched
    let baud = port::parse_baud(&options.baud)?;
    let (cols, rows) = Renderer::terminal_size().context("Failed to query terminal size")?;
    let layout = Layout::new(cols, rows).map_err(|e| anyhow!(e))?;

    let link = SerialPortLink::open(&options.port, baud)?;

    let log_dir = options.log_dir.unwrap_or_else(|| config.log_dir());
    let log = SessionLog::create(&log_dir, chrono::Local::now())
        .with_context(|| format!("Failed to create session log in {}", log_dir.display()))?;
    let log_path = log.path().map(|p| p.display().to_string()).unwrap_or_default();

    let monitor_options = MonitorOptions {
        port_name: link.name().to_string(),
        rx_marker: config.markers.rx.clone(),
        tx_marker: config.markers.tx.clone(),
        poll_interval: config.poll_interval(),
    };

    let screen = Renderer::init().context("Failed to initialize terminal")?;
    let mut monitor = Monitor::new(link, screen, log, layout, monitor_options);

    let result = monitor.draw_frame().and_then(|_| monitor.run());
    let closed = monitor.shutdown();

    if let Err(ref e) = result {
        error!("Session ended with error: {:#}", e);
    } else {
        info!("Session ended");
    }
    result?;
    closed?;

    eprintln!("Session log: {}", log_path);
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} - usage: serialmon <serial port> <baudrate>", e);
            std::process::exit(1);
        }
    };

    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_tracing(&config);
    info!("serialmon {} starting...", VERSION);
    if let Some(e) = config_error {
        warn!("{}", e);
        eprintln!("Warning: {}", e);
    }

    let result = match command {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            eprintln!("serialmon {}", VERSION);
            Ok(())
        }
        Command::ListPorts => list_ports(),
        Command::Monitor(options) => run_monitor(options, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
