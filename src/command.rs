//! Serial command parsing
//!
//! Commands arrive over the bus as ASCII, newline-terminated. Parsing
//! trims surrounding whitespace (terminator included) before dispatch,
//! so `CMD`, `CMD\n` and `  CMD  ` are equivalent.

use crate::error::CommandError;
use crate::{MAX_SAMPLING_RATE_MS, MIN_SAMPLING_RATE_MS};

/// A parsed serial command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Re-zero the sequence and failure counters (Measuring only)
    Calibrate,
    /// Report the current state and sequence number
    GetStatus,
    /// Force the device back to Idle and zero all counters
    Reset,
    /// Change the sampling rate, in milliseconds
    SetRate(u64),
}

impl Command {
    /// Parse a raw command window into a command
    ///
    /// A `SetRate` is only produced for rates within
    /// [`MIN_SAMPLING_RATE_MS`]..=[`MAX_SAMPLING_RATE_MS`]; out-of-range
    /// and non-numeric arguments map to distinct errors so the reply can
    /// tell the sender which rule was violated.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(CommandError::Empty);
        }

        match text {
            "CALIBRATE" => Ok(Command::Calibrate),
            "GET_STATUS" => Ok(Command::GetStatus),
            "RESET" => Ok(Command::Reset),
            _ => {
                if let Some(arg) = text.strip_prefix("SET_RATE=") {
                    let rate: u64 = arg.trim().parse().map_err(|_| CommandError::InvalidRate)?;
                    if !(MIN_SAMPLING_RATE_MS..=MAX_SAMPLING_RATE_MS).contains(&rate) {
                        return Err(CommandError::RateOutOfRange);
                    }
                    Ok(Command::SetRate(rate))
                } else {
                    Err(CommandError::Unknown)
                }
            }
        }
    }
}
