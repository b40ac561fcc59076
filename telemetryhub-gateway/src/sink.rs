// TelemetryHub Gateway - Telemetry pipeline layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sink contract
//!
//! The downstream interface the pipeline publishes through. Retry,
//! batching and transport concerns belong to the implementer; the
//! producer never retries a failed call, it logs the error and keeps
//! the pipeline alive.

use crate::error::SinkError;
use parking_lot::Mutex;
use telemetryhub::{DeviceState, TelemetrySample};
use tracing::info;

/// Downstream consumer of samples and status transitions
///
/// Both calls are synchronous from the producer's point of view.
pub trait TelemetrySink: Send + Sync {
    /// Publish one sample
    fn push_sample(&self, sample: &TelemetrySample) -> Result<(), SinkError>;

    /// Publish a device state transition
    fn push_status(&self, state: DeviceState) -> Result<(), SinkError>;
}

/// Sink that publishes through the process logger
///
/// The transport-free default for config-driven gateways; concrete
/// wire publishers live with the embedding application.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a logging sink
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for LogSink {
    fn push_sample(&self, sample: &TelemetrySample) -> Result<(), SinkError> {
        info!(
            sequence = sample.sequence_id,
            value = sample.value,
            unit = %sample.unit,
            "publish sample"
        );
        Ok(())
    }

    fn push_status(&self, state: DeviceState) -> Result<(), SinkError> {
        info!(state = %state, "publish status");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemorySinkState {
    samples: Vec<TelemetrySample>,
    statuses: Vec<DeviceState>,
    failing: bool,
}

/// In-memory sink recording everything published to it
///
/// Useful for tests and local runs; a `failing` toggle simulates an
/// unreachable downstream.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemorySinkState>,
}

impl MemorySink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples published so far
    pub fn samples(&self) -> Vec<TelemetrySample> {
        self.state.lock().samples.clone()
    }

    /// Status transitions published so far
    pub fn statuses(&self) -> Vec<DeviceState> {
        self.state.lock().statuses.clone()
    }

    /// Number of samples published
    pub fn sample_count(&self) -> usize {
        self.state.lock().samples.len()
    }

    /// Number of status transitions published
    pub fn status_count(&self) -> usize {
        self.state.lock().statuses.len()
    }

    /// Make every publication fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }
}

impl TelemetrySink for MemorySink {
    fn push_sample(&self, sample: &TelemetrySample) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(SinkError::Unavailable("memory sink failing".to_string()));
        }
        state.samples.push(sample.clone());
        Ok(())
    }

    fn push_status(&self, status: DeviceState) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(SinkError::Unavailable("memory sink failing".to_string()));
        }
        state.statuses.push(status);
        Ok(())
    }
}
