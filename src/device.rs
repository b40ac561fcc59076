// TelemetryHub - Edge telemetry gateway
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Device state machine and sampling
//!
//! The simulated sensor device. It produces a fake waveform while
//! Measuring, supports deterministic and probabilistic fault injection,
//! and interprets serial commands arriving over a bound [`Bus`].
//!
//! State is guarded by the device's own mutex, so the device can be
//! shared between a sampling thread and a control surface. Callers must
//! not hold any other pipeline lock while invoking device methods.

use crate::bus::Bus;
use crate::command::Command;
use crate::sample::TelemetrySample;
use crate::COMMAND_WINDOW_SIZE;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Device operating states
///
/// `Error` and `SafeState` are latched fault states: only an explicit
/// [`Device::reset`] leaves them, and `start` while latched is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceState {
    /// Powered but not sampling
    #[default]
    Idle,
    /// Actively producing samples
    Measuring,
    /// Latched fault
    Error,
    /// Latched fault requiring operator reset
    SafeState,
}

impl DeviceState {
    /// Stable textual name, as used in serial replies
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Idle => "Idle",
            DeviceState::Measuring => "Measuring",
            DeviceState::Error => "Error",
            DeviceState::SafeState => "SafeState",
        }
    }

    /// Check whether this is a latched fault state
    pub fn is_faulted(&self) -> bool {
        matches!(self, DeviceState::Error | DeviceState::SafeState)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fault injection modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaultMode {
    /// No injected faults
    #[default]
    None,
    /// Probabilistic sample-read failures
    RandomSensorErrors,
    /// Probabilistic loss of serial command windows
    CommunicationFailure,
    /// Both sensor and communication failures
    Both,
}

impl FaultMode {
    fn affects_sensor(&self) -> bool {
        matches!(self, FaultMode::RandomSensorErrors | FaultMode::Both)
    }

    fn affects_communication(&self) -> bool {
        matches!(self, FaultMode::CommunicationFailure | FaultMode::Both)
    }
}

struct DeviceInner {
    state: DeviceState,
    sequence: u32,
    consecutive_failures: u32,
    error_count: u32,
    samples_before_fault: u32,
    fault_mode: FaultMode,
    error_probability: f64,
    sampling_rate_ms: u64,
    rng: StdRng,
    noise: Normal<f64>,
    bus: Option<Arc<dyn Bus>>,
}

impl DeviceInner {
    fn make_sample(&mut self) -> TelemetrySample {
        // Fake waveform: 42 + slow sine + Gaussian noise
        let t = f64::from(self.sequence) / 10.0;
        let value = 42.0 + t.sin() + self.noise.sample(&mut self.rng);

        let sample = TelemetrySample {
            timestamp: Utc::now(),
            value,
            unit: "arb.units".to_string(),
            sequence_id: self.sequence,
        };
        self.sequence += 1;
        sample
    }

    fn zero_counters(&mut self) {
        self.sequence = 0;
        self.consecutive_failures = 0;
        self.error_count = 0;
    }

    fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Calibrate => {
                if self.state == DeviceState::Measuring {
                    self.sequence = 0;
                    self.consecutive_failures = 0;
                    "OK: Calibrated".to_string()
                } else {
                    "ERROR: Device not measuring".to_string()
                }
            }
            Command::GetStatus => format!("STATUS: {}, Seq={}", self.state, self.sequence),
            Command::Reset => {
                self.state = DeviceState::Idle;
                self.zero_counters();
                "OK: Reset to Idle".to_string()
            }
            Command::SetRate(ms) => {
                self.sampling_rate_ms = ms;
                format!("OK: Rate set to {ms} ms")
            }
        }
    }
}

/// Simulated sensor device
///
/// All methods take `&self`; the internal mutex makes the device safe
/// to share across threads via `Arc`.
pub struct Device {
    inner: Mutex<DeviceInner>,
}

impl Device {
    /// Create a device with fault injection disabled
    pub fn new() -> Self {
        Self::with_faults(0, FaultMode::None, 0.0)
    }

    /// Create a device with a fault profile
    ///
    /// `samples_before_fault` of 0 disables the deterministic fault;
    /// otherwise the device latches into SafeState once that many
    /// samples have been produced in a session. `error_probability` is
    /// clamped to [0, 1].
    pub fn with_faults(
        samples_before_fault: u32,
        fault_mode: FaultMode,
        error_probability: f64,
    ) -> Self {
        Self {
            inner: Mutex::new(DeviceInner {
                state: DeviceState::Idle,
                sequence: 0,
                consecutive_failures: 0,
                error_count: 0,
                samples_before_fault,
                fault_mode,
                error_probability: error_probability.clamp(0.0, 1.0),
                sampling_rate_ms: 100,
                rng: StdRng::from_entropy(),
                noise: Normal::new(0.0, 0.1).unwrap(),
                bus: None,
            }),
        }
    }

    /// Begin measuring
    ///
    /// Only allowed from Idle; latched fault states do not auto-recover.
    /// Entering Measuring zeroes the sequence and failure counters.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.state == DeviceState::Idle {
            inner.zero_counters();
            inner.state = DeviceState::Measuring;
            debug!("device started measuring");
        }
    }

    /// Stop measuring
    ///
    /// Only allowed from Measuring; otherwise ignored.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state == DeviceState::Measuring {
            inner.state = DeviceState::Idle;
            debug!("device stopped");
        }
    }

    /// Recover a latched device back to Idle
    ///
    /// Returns true iff the device was in Error or SafeState. Requires
    /// explicit operator action; `start` alone never leaves a fault
    /// state.
    pub fn reset(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_faulted() {
            inner.state = DeviceState::Idle;
            inner.zero_counters();
            debug!("device reset to Idle");
            true
        } else {
            false
        }
    }

    /// Current state
    pub fn state(&self) -> DeviceState {
        self.inner.lock().state
    }

    /// Sequence id the next sample would carry
    pub fn sequence(&self) -> u32 {
        self.inner.lock().sequence
    }

    /// Consecutive failed reads since the last successful sample
    pub fn consecutive_failure_count(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Total failed reads in the current session
    pub fn error_count(&self) -> u32 {
        self.inner.lock().error_count
    }

    /// Sampling rate target last accepted via SET_RATE, in milliseconds
    pub fn sampling_rate_ms(&self) -> u64 {
        self.inner.lock().sampling_rate_ms
    }

    /// Attach a bus for serial command processing
    pub fn bind_bus(&self, bus: Arc<dyn Bus>) {
        self.inner.lock().bus = Some(bus);
    }

    /// Latch the device into SafeState
    ///
    /// Used by the pipeline's failure policy after too many consecutive
    /// read failures. Only a Measuring device can be latched this way.
    pub fn force_safe_state(&self) {
        let mut inner = self.inner.lock();
        if inner.state == DeviceState::Measuring {
            inner.state = DeviceState::SafeState;
            warn!("device forced into SafeState");
        }
    }

    /// Try to read one sample
    ///
    /// Returns `None` outside Measuring, on an injected sensor fault
    /// (state unchanged, failure counters bumped), or when the
    /// deterministic fault threshold latches the device into SafeState.
    pub fn read_sample(&self) -> Option<TelemetrySample> {
        let mut inner = self.inner.lock();
        if inner.state != DeviceState::Measuring {
            return None;
        }

        if inner.fault_mode.affects_sensor() {
            let draw: f64 = inner.rng.gen();
            if draw < inner.error_probability {
                inner.consecutive_failures += 1;
                inner.error_count += 1;
                trace!(
                    consecutive = inner.consecutive_failures,
                    "injected sensor read failure"
                );
                return None;
            }
        }

        if inner.samples_before_fault > 0 && inner.sequence >= inner.samples_before_fault {
            warn!(
                sequence = inner.sequence,
                "sample limit reached, latching SafeState"
            );
            inner.state = DeviceState::SafeState;
            return None;
        }

        inner.consecutive_failures = 0;
        Some(inner.make_sample())
    }

    /// Process one serial command window, if any
    ///
    /// Reads up to [`COMMAND_WINDOW_SIZE`] bytes from the bound bus,
    /// interprets them as one whitespace-trimmed command and writes the
    /// newline-terminated reply back to the bus. The reply is also
    /// returned to the caller. Returns `None` when no bus is bound,
    /// nothing is pending, or an injected communication failure drops
    /// this poll.
    pub fn process_serial_commands(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let bus = inner.bus.clone()?;

        if inner.fault_mode.affects_communication() {
            let draw: f64 = inner.rng.gen();
            if draw < inner.error_probability {
                trace!("injected communication failure, dropping command window");
                return None;
            }
        }

        let raw = bus.read(COMMAND_WINDOW_SIZE);
        if raw.is_empty() {
            return None;
        }

        let text = String::from_utf8_lossy(&raw);
        let reply = match Command::parse(&text) {
            Ok(command) => inner.execute(command),
            Err(e) => format!("ERROR: {e}"),
        };

        let mut framed = reply.clone().into_bytes();
        framed.push(b'\n');
        if !bus.write(&framed) {
            warn!("bus write failed, discarding reply");
        }

        Some(reply)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
