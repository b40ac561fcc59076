// TelemetryHub Gateway - Telemetry pipeline layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Error types for the gateway

use thiserror::Error;

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration file could not be read
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration option carried an unusable value
    #[error("Invalid value for {key}: {value}")]
    InvalidOption { key: String, value: String },

    /// Sink rejected a publication
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors raised by sink implementations
///
/// The producer never propagates these; a failed publication is logged
/// and the pipeline moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Downstream endpoint not reachable
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Downstream endpoint refused the payload
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
