//! Telemetry sample record
//!
//! The immutable measurement record produced by the device and moved
//! through the gateway pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped scalar measurement
///
/// `sequence_id` increases monotonically within a single measurement
/// session and resets when the device (re)starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Acquisition time
    pub timestamp: DateTime<Utc>,
    /// Measured value
    pub value: f64,
    /// Unit of measurement
    pub unit: String,
    /// Position within the current measurement session
    pub sequence_id: u32,
}

impl TelemetrySample {
    /// Create a sample stamped with the current time
    pub fn new(value: f64, unit: impl Into<String>, sequence_id: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
            unit: unit.into(),
            sequence_id,
        }
    }
}
