//! Error types for the device layer

use thiserror::Error;

/// Errors produced while interpreting a serial command
///
/// The `Display` text of each variant is exactly the message carried by
/// the corresponding `ERROR:` reply on the bus.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Command was empty after trimming whitespace
    #[error("Empty command")]
    Empty,

    /// Command verb not recognized
    #[error("Unknown command")]
    Unknown,

    /// SET_RATE argument was not a number
    #[error("Invalid rate value")]
    InvalidRate,

    /// SET_RATE argument outside the accepted range
    #[error("Rate must be 10-10000 ms")]
    RateOutOfRange,
}
