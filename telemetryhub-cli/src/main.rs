// TelemetryHub CLI - Gateway runner and device console
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # TelemetryHub CLI
//!
//! Runs a gateway pipeline against the simulated device, or opens an
//! interactive console on a gateway and its device's serial command
//! interface.
//!
//! ## Usage
//!
//! ```bash
//! # Monitor a gateway for 10 seconds with defaults
//! telemetryhub
//!
//! # Load options from a config file
//! telemetryhub --config telemetryhub.conf --duration 30
//!
//! # Interactive console
//! telemetryhub --console
//! ```

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use telemetryhub::{DeviceState, SerialPortSim};
use telemetryhub_gateway::{GatewayConfig, GatewayCore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// TelemetryHub gateway runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (key = value lines)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Producer sleep between iterations, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Queue capacity (0 = unbounded)
    #[arg(long)]
    queue_size: Option<usize>,

    /// Publish every Nth accepted sample
    #[arg(long)]
    cloud_interval: Option<u64>,

    /// Latch the device after this many samples (0 disables)
    #[arg(long)]
    fault_after: Option<u32>,

    /// How long to run the gateway, in seconds
    #[arg(short, long, default_value = "10")]
    duration: u64,

    /// Open an interactive console instead of a timed run
    #[arg(long)]
    console: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match GatewayConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => GatewayConfig::default(),
    };

    // Command-line overrides win over the config file
    if let Some(interval) = args.interval_ms {
        config.sampling_interval_ms = interval;
    }
    if let Some(queue_size) = args.queue_size {
        config.queue_size = queue_size;
    }
    if let Some(cloud_interval) = args.cloud_interval {
        config.cloud_sample_interval = cloud_interval.max(1);
    }
    if let Some(fault_after) = args.fault_after {
        config.fault_after_samples = fault_after;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("TelemetryHub v{}", telemetryhub::VERSION);

    if args.console {
        run_console(&config);
    } else {
        run_gateway(&config, Duration::from_secs(args.duration));
    }
}

/// Run the pipeline and report state until the duration elapses or the
/// device latches.
fn run_gateway(config: &GatewayConfig, duration: Duration) {
    let mut core = GatewayCore::from_config(config);

    core.start();
    info!("gateway running for {:?}", duration);

    let tick = Duration::from_millis(500);
    let mut elapsed = Duration::ZERO;
    while elapsed < duration {
        std::thread::sleep(tick);
        elapsed += tick;

        let status = core.status();
        match &status.latest_sample {
            Some(sample) => info!(
                state = %status.state,
                sequence = sample.sequence_id,
                value = sample.value,
                "tick"
            ),
            None => info!(state = %status.state, "tick (no sample yet)"),
        }

        if status.state == DeviceState::SafeState {
            warn!("device reached SafeState, stopping early");
            break;
        }
    }

    core.stop();
    println!("{}", core.metrics().report());
}

/// Interactive console: drives a gateway pipeline and its device's
/// serial command interface from stdin.
fn run_console(config: &GatewayConfig) {
    let mut core = GatewayCore::from_config(config);
    let device = core.device();
    let serial = Arc::new(SerialPortSim::new());
    device.bind_bus(serial.clone());

    println!("TelemetryHub gateway console");
    print_console_help();

    let stdin = io::stdin();
    loop {
        print!("[{}] > ", core.device_state());
        let _ = io::stdout().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "exit" => break,
            "help" => print_console_help(),
            "start" => {
                core.start();
                println!("Pipeline running. Device state: {}", core.device_state());
            }
            "stop" => {
                core.stop();
                println!("Pipeline stopped. Device state: {}", core.device_state());
            }
            "sample" => match device.read_sample() {
                Some(sample) => println!(
                    "Sample: value={:.3} {}, seq={}",
                    sample.value, sample.unit, sample.sequence_id
                ),
                None => println!("No sample available (state: {})", core.device_state()),
            },
            "metrics" => println!("{}", core.metrics().report()),
            command => {
                serial.inject(command);
                let _ = device.process_serial_commands();
                match serial.collect_response() {
                    Some(response) => println!("Response: {response}"),
                    None => println!("No response from device"),
                }
            }
        }
    }

    core.stop();
    println!("Exiting.");
}

fn print_console_help() {
    println!(
        "\nSerial commands:\n\
         \x20 CALIBRATE       - Re-zero counters (only when measuring)\n\
         \x20 GET_STATUS      - Report device state and sequence number\n\
         \x20 SET_RATE=<ms>   - Set sampling rate (10-10000 ms)\n\
         \x20 RESET           - Force the device back to Idle\n\
         Local commands:\n\
         \x20 start           - Start the gateway pipeline\n\
         \x20 stop            - Stop the gateway pipeline\n\
         \x20 sample          - Read one telemetry sample directly\n\
         \x20 metrics         - Print the pipeline metrics report\n\
         \x20 help            - Show this help message\n\
         \x20 quit            - Exit program\n"
    );
}
