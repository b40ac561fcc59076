// TelemetryHub Gateway - Telemetry pipeline layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # TelemetryHub Gateway
//!
//! The pipeline layer of TelemetryHub: a bounded drop-oldest sample
//! queue, a producer/consumer worker pair around the simulated device,
//! periodic sink publication and a circuit-breaker failure policy.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use telemetryhub_gateway::{GatewayCore, MemorySink};
//!
//! let sink = Arc::new(MemorySink::new());
//!
//! let mut core = GatewayCore::new();
//! core.set_sampling_interval(Duration::from_millis(10));
//! core.set_queue_capacity(100);
//! core.set_sink(sink.clone(), 2);
//!
//! core.start();
//! std::thread::sleep(Duration::from_millis(100));
//! core.stop();
//!
//! // The sink saw the Idle -> Measuring transition
//! assert!(sink.status_count() >= 1);
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod queue;
pub mod sink;

// Re-exports for convenient access
pub use config::{GatewayConfig, SinkKind};
pub use error::{GatewayError, Result, SinkError};
pub use gateway::{GatewayCore, GatewayStatus};
pub use metrics::MetricsSnapshot;
pub use queue::TelemetryQueue;
pub use sink::{LogSink, MemorySink, TelemetrySink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
