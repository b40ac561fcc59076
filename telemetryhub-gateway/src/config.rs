// TelemetryHub Gateway - Telemetry pipeline layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Gateway configuration
//!
//! Options are loaded from a line-oriented `key = value` file. `#` and
//! `;` start comments, keys are case-insensitive and unrecognized keys
//! are ignored so config files can carry options for other tools.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use telemetryhub::FaultMode;

/// Sink selection for config-driven gateways
///
/// Wire publishers (REST, pub/sub) belong to the embedding application;
/// the config only chooses between no sink and the logging sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SinkKind {
    /// No sink; samples stop at the latest-sample cache
    None,
    /// Publish through the process logger
    #[default]
    Log,
}

/// Gateway-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Producer sleep between iterations, in milliseconds
    pub sampling_interval_ms: u64,

    /// Queue capacity; 0 means unbounded
    pub queue_size: usize,

    /// Publish every Nth accepted sample to the sink
    pub cloud_sample_interval: u64,

    /// Consecutive read failures before the circuit breaker trips
    pub max_consecutive_failures: u32,

    /// Deterministic device fault threshold; 0 disables it
    pub fault_after_samples: u32,

    /// Fault injection mode for the simulated device
    pub fault_mode: FaultMode,

    /// Probability of an injected fault, clamped to [0, 1]
    pub error_probability: f64,

    /// Which sink the gateway publishes through
    pub sink: SinkKind,

    /// Log filter directive (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 100,
            queue_size: 0,
            cloud_sample_interval: 5,
            max_consecutive_failures: 5,
            fault_after_samples: 8,
            fault_mode: FaultMode::None,
            error_probability: 0.0,
            sink: SinkKind::Log,
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse configuration from `key = value` text
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();

        for line in text.lines() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "sampling_interval_ms" => {
                    config.sampling_interval_ms = parse_option(&key, value)?;
                }
                "queue_size" => {
                    config.queue_size = parse_option(&key, value)?;
                }
                "cloud_sample_interval" => {
                    let interval: u64 = parse_option(&key, value)?;
                    config.cloud_sample_interval = interval.max(1);
                }
                "max_consecutive_failures" => {
                    let threshold: u32 = parse_option(&key, value)?;
                    config.max_consecutive_failures = threshold.max(1);
                }
                "fault_after_samples" => {
                    config.fault_after_samples = parse_option(&key, value)?;
                }
                "fault_mode" => {
                    config.fault_mode = parse_fault_mode(value).ok_or_else(|| {
                        GatewayError::InvalidOption {
                            key: key.clone(),
                            value: value.to_string(),
                        }
                    })?;
                }
                "error_probability" => {
                    let probability: f64 = parse_option(&key, value)?;
                    config.error_probability = probability.clamp(0.0, 1.0);
                }
                "sink" => {
                    config.sink = parse_sink_kind(value).ok_or_else(|| {
                        GatewayError::InvalidOption {
                            key: key.clone(),
                            value: value.to_string(),
                        }
                    })?;
                }
                "log_level" => {
                    config.log_level = value.to_ascii_lowercase();
                }
                // Unknown keys are ignored
                _ => {}
            }
        }

        Ok(config)
    }
}

fn strip_comment(line: &str) -> &str {
    let end = line
        .find(|c: char| c == '#' || c == ';')
        .unwrap_or(line.len());
    &line[..end]
}

fn parse_option<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| GatewayError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_fault_mode(value: &str) -> Option<FaultMode> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Some(FaultMode::None),
        "random_sensor_errors" | "random" => Some(FaultMode::RandomSensorErrors),
        "communication_failure" | "communication" => Some(FaultMode::CommunicationFailure),
        "both" => Some(FaultMode::Both),
        _ => None,
    }
}

fn parse_sink_kind(value: &str) -> Option<SinkKind> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Some(SinkKind::None),
        "log" => Some(SinkKind::Log),
        _ => None,
    }
}
