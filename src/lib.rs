//! # TelemetryHub - Edge Telemetry Device Layer
//!
//! Simulated sensor device with a polymorphic bus interface, designed for
//! testing telemetry pipelines without hardware.
//!
//! ## Key Features
//!
//! - **Device state machine**: Idle / Measuring / Error / SafeState with
//!   explicit operator recovery
//! - **Fault injection**: deterministic sample-count faults and
//!   probabilistic sensor/communication errors
//! - **Bus abstraction**: UART, I2C and SPI behind a two-operation trait
//! - **Serial command interface**: CALIBRATE, GET_STATUS, SET_RATE, RESET
//!
//! ## Quick Start
//!
//! ```rust
//! use telemetryhub::{Device, DeviceState};
//!
//! let device = Device::new();
//! device.start();
//! assert_eq!(device.state(), DeviceState::Measuring);
//!
//! // Samples carry monotonically increasing sequence ids
//! let sample = device.read_sample().unwrap();
//! assert_eq!(sample.sequence_id, 0);
//! let sample = device.read_sample().unwrap();
//! assert_eq!(sample.sequence_id, 1);
//!
//! device.stop();
//! assert_eq!(device.state(), DeviceState::Idle);
//! ```
//!
//! ## Modules
//!
//! - [`sample`]: Telemetry sample record
//! - [`bus`]: Bus trait, simulated UART, I2C/SPI stubs
//! - [`device`]: Device state machine, sampling, fault injection
//! - [`command`]: Serial command parsing and replies

// Modules
pub mod bus;
pub mod command;
pub mod device;
pub mod error;
pub mod sample;

// Re-exports for convenient access
pub use bus::{Bus, BusKind, I2cBus, SerialPortSim, SpiBus};
pub use command::Command;
pub use device::{Device, DeviceState, FaultMode};
pub use error::CommandError;
pub use sample::TelemetrySample;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capacity of each simulated bus buffer in bytes
pub const MAX_BUS_BUFFER_SIZE: usize = 4096;

/// Maximum bytes consumed from the bus per command-processing pass
pub const COMMAND_WINDOW_SIZE: usize = 256;

/// Lowest accepted sampling rate in milliseconds
pub const MIN_SAMPLING_RATE_MS: u64 = 10;

/// Highest accepted sampling rate in milliseconds
pub const MAX_SAMPLING_RATE_MS: u64 = 10_000;
