// TelemetryHub Gateway - Telemetry pipeline layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Gateway pipeline
//!
//! [`GatewayCore`] owns one device and one queue and coordinates a
//! producer thread (samples the device, pushes to the queue, publishes
//! to the sink) and a consumer thread (drains the queue into the
//! latest-sample cache).
//!
//! Lock domains are kept disjoint: the queue mutex, the device mutex
//! and the latest-sample mutex are never held at the same time by any
//! thread.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use telemetryhub_gateway::GatewayCore;
//!
//! let mut core = GatewayCore::new();
//! core.set_sampling_interval(Duration::from_millis(10));
//! core.set_queue_capacity(100);
//!
//! core.start();
//! std::thread::sleep(Duration::from_millis(100));
//! core.stop();
//!
//! let metrics = core.metrics();
//! assert!(metrics.samples_processed > 0);
//! ```

use crate::config::{GatewayConfig, SinkKind};
use crate::metrics::MetricsSnapshot;
use crate::queue::TelemetryQueue;
use crate::sink::{LogSink, TelemetrySink};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use telemetryhub::{Device, DeviceState, TelemetrySample};
use tracing::{debug, info, warn};

/// Read-only view for status surfaces
///
/// `latest_sample` is the most recently *consumed* sample, which can
/// lag the most recently produced one when the queue drops heads.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    /// Current device state
    pub state: DeviceState,
    /// Most recently consumed sample, if any
    pub latest_sample: Option<TelemetrySample>,
}

struct ProducerContext {
    device: Arc<Device>,
    queue: Arc<TelemetryQueue>,
    sink: Option<Arc<dyn TelemetrySink>>,
    running: Arc<AtomicBool>,
    sample_interval: Duration,
    publish_every: u64,
    failure_threshold: u32,
    samples_processed: Arc<AtomicU64>,
    accepted: Arc<AtomicU64>,
    prev_state: DeviceState,
}

struct ConsumerContext {
    queue: Arc<TelemetryQueue>,
    latest: Arc<Mutex<Option<TelemetrySample>>>,
    samples_consumed: Arc<AtomicU64>,
}

/// Telemetry pipeline coordinator
///
/// Owns the device and the queue for their entire lifetime; the sink is
/// shared with the caller. `start`/`stop` are idempotent and `stop` is
/// always invoked on drop.
pub struct GatewayCore {
    device: Arc<Device>,
    queue: Arc<TelemetryQueue>,
    latest: Arc<Mutex<Option<TelemetrySample>>>,
    running: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    consumer: Option<JoinHandle<()>>,
    sink: Option<Arc<dyn TelemetrySink>>,
    sample_interval: Duration,
    queue_capacity: usize,
    publish_every: u64,
    failure_threshold: u32,
    samples_processed: Arc<AtomicU64>,
    samples_consumed: Arc<AtomicU64>,
    accepted: Arc<AtomicU64>,
    started_at: Instant,
}

impl GatewayCore {
    /// Create a gateway around a fault-free default device
    pub fn new() -> Self {
        Self::with_device(Device::new())
    }

    /// Create a gateway around a specific device
    pub fn with_device(device: Device) -> Self {
        Self {
            device: Arc::new(device),
            queue: Arc::new(TelemetryQueue::new()),
            latest: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            producer: None,
            consumer: None,
            sink: None,
            sample_interval: Duration::from_millis(100),
            queue_capacity: 0,
            publish_every: 5,
            failure_threshold: 5,
            samples_processed: Arc::new(AtomicU64::new(0)),
            samples_consumed: Arc::new(AtomicU64::new(0)),
            accepted: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Create a gateway from configuration
    ///
    /// Builds the device with the configured fault profile and applies
    /// every pipeline knob, attaching the configured sink ([`LogSink`]
    /// unless the config selects `sink = none`).
    pub fn from_config(config: &GatewayConfig) -> Self {
        let device = Device::with_faults(
            config.fault_after_samples,
            config.fault_mode,
            config.error_probability,
        );

        let mut core = Self::with_device(device);
        core.sample_interval = Duration::from_millis(config.sampling_interval_ms);
        core.queue_capacity = config.queue_size;
        core.publish_every = config.cloud_sample_interval.max(1);
        core.failure_threshold = config.max_consecutive_failures.max(1);
        if config.sink == SinkKind::Log {
            core.sink = Some(Arc::new(LogSink));
        }
        core
    }

    /// Producer sleep between iterations (takes effect at next start)
    pub fn set_sampling_interval(&mut self, interval: Duration) {
        self.sample_interval = interval;
    }

    /// Queue capacity, 0 = unbounded (applied when the pipeline starts)
    pub fn set_queue_capacity(&mut self, capacity: usize) {
        self.queue_capacity = capacity;
    }

    /// Consecutive read failures tolerated before the circuit breaker
    /// latches the device into SafeState (takes effect at next start)
    pub fn set_failure_threshold(&mut self, max_failures: u32) {
        self.failure_threshold = max_failures.max(1);
    }

    /// Attach a sink, publishing every `every_nth` accepted sample
    ///
    /// Status transitions are always published; `every_nth` is floored
    /// at 1. Takes effect at next start.
    pub fn set_sink(&mut self, sink: Arc<dyn TelemetrySink>, every_nth: u64) {
        self.sink = Some(sink);
        self.publish_every = every_nth.max(1);
    }

    /// Handle to the owned device, for control surfaces and bus binding
    pub fn device(&self) -> Arc<Device> {
        self.device.clone()
    }

    /// Start the pipeline
    ///
    /// No-op when already running. Transitions the device to Measuring,
    /// applies the configured queue capacity and spawns exactly one
    /// producer and one consumer thread.
    pub fn start(&mut self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        info!("starting gateway pipeline");

        let prev_state = self.device.state();
        self.device.start();
        self.queue.reopen();
        self.queue.set_capacity(self.queue_capacity);

        let producer_ctx = ProducerContext {
            device: self.device.clone(),
            queue: self.queue.clone(),
            sink: self.sink.clone(),
            running: self.running.clone(),
            sample_interval: self.sample_interval,
            publish_every: self.publish_every,
            failure_threshold: self.failure_threshold,
            samples_processed: self.samples_processed.clone(),
            accepted: self.accepted.clone(),
            prev_state,
        };
        self.producer = Some(thread::spawn(move || producer_loop(producer_ctx)));

        let consumer_ctx = ConsumerContext {
            queue: self.queue.clone(),
            latest: self.latest.clone(),
            samples_consumed: self.samples_consumed.clone(),
        };
        self.consumer = Some(thread::spawn(move || consumer_loop(consumer_ctx)));
    }

    /// Stop the pipeline and join both workers
    ///
    /// Safe from any state and after any number of prior stops.
    pub fn stop(&mut self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        info!("stopping gateway pipeline");

        self.queue.shutdown();
        self.device.stop();

        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                warn!("producer thread panicked");
            }
        }
        if let Some(handle) = self.consumer.take() {
            if handle.join().is_err() {
                warn!("consumer thread panicked");
            }
        }

        debug!("gateway pipeline stopped");
    }

    /// Whether the pipeline is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Recover a latched device back to Idle
    ///
    /// Refused while the pipeline is running; returns true iff the
    /// device left Error or SafeState.
    pub fn reset_device(&self) -> bool {
        if self.is_running() {
            warn!("reset refused while pipeline is running");
            return false;
        }
        self.device.reset()
    }

    /// Current device state
    pub fn device_state(&self) -> DeviceState {
        self.device.state()
    }

    /// Most recently consumed sample, if any
    pub fn latest_sample(&self) -> Option<TelemetrySample> {
        self.latest.lock().clone()
    }

    /// Status snapshot for read-only surfaces
    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            state: self.device.state(),
            latest_sample: self.latest_sample(),
        }
    }

    /// Samples taken off the queue by the consumer
    pub fn samples_consumed(&self) -> u64 {
        self.samples_consumed.load(Ordering::Relaxed)
    }

    /// Point-in-time metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            samples_dropped: self.queue.dropped(),
            queue_depth: self.queue.len(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for GatewayCore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GatewayCore {
    fn drop(&mut self) {
        self.stop();
    }
}

fn producer_loop(mut ctx: ProducerContext) {
    debug!("producer thread started");

    let mut consecutive_read_failures: u32 = 0;

    while ctx.running.load(Ordering::SeqCst) {
        let state = ctx.device.state();

        if let Some(sink) = &ctx.sink {
            if state != ctx.prev_state {
                if let Err(e) = sink.push_status(state) {
                    warn!(error = %e, "status publish failed");
                }
                ctx.prev_state = state;
            }
        }

        if state.is_faulted() {
            info!(state = %state, "device latched, producer exiting");
            break;
        }

        if state != DeviceState::Measuring {
            thread::sleep(ctx.sample_interval);
            continue;
        }

        match ctx.device.read_sample() {
            Some(sample) => {
                ctx.queue.push(sample.clone());
                ctx.samples_processed.fetch_add(1, Ordering::Relaxed);
                let accepted = ctx.accepted.fetch_add(1, Ordering::Relaxed) + 1;
                consecutive_read_failures = 0;

                if let Some(sink) = &ctx.sink {
                    if accepted % ctx.publish_every == 0 {
                        if let Err(e) = sink.push_sample(&sample) {
                            warn!(error = %e, sequence = sample.sequence_id, "sample publish failed");
                        }
                    }
                }
            }
            None => {
                if ctx.device.state() == DeviceState::Measuring {
                    consecutive_read_failures += 1;
                    if consecutive_read_failures >= ctx.failure_threshold {
                        warn!(
                            failures = consecutive_read_failures,
                            threshold = ctx.failure_threshold,
                            "circuit breaker tripped, latching device"
                        );
                        ctx.device.force_safe_state();
                    }
                }
            }
        }

        // Always pace at the loop tail, sample or not
        thread::sleep(ctx.sample_interval);
    }

    debug!("producer thread exiting");
}

fn consumer_loop(ctx: ConsumerContext) {
    debug!("consumer thread started");

    while let Some(sample) = ctx.queue.pop() {
        {
            let mut latest = ctx.latest.lock();
            *latest = Some(sample.clone());
        }
        ctx.samples_consumed.fetch_add(1, Ordering::Relaxed);
        debug!(
            sequence = sample.sequence_id,
            value = sample.value,
            "sample consumed"
        );
    }

    debug!("consumer thread exiting after queue shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_gateway_is_idle() {
        let core = GatewayCore::new();
        assert!(!core.is_running());
        assert_eq!(core.device_state(), DeviceState::Idle);
        assert!(core.latest_sample().is_none());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut core = GatewayCore::new();
        core.stop();
        core.stop();
        assert!(!core.is_running());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut core = GatewayCore::new();
        core.set_sampling_interval(Duration::from_millis(10));

        core.start();
        core.start();
        assert!(core.is_running());

        core.stop();
        assert!(!core.is_running());
    }

    #[test]
    fn test_metrics_snapshot_before_start() {
        let core = GatewayCore::new();
        let metrics = core.metrics();
        assert_eq!(metrics.samples_processed, 0);
        assert_eq!(metrics.samples_dropped, 0);
        assert_eq!(metrics.queue_depth, 0);
    }

    #[test]
    fn test_from_config_applies_knobs() {
        let config = GatewayConfig {
            sampling_interval_ms: 20,
            queue_size: 7,
            cloud_sample_interval: 3,
            max_consecutive_failures: 2,
            fault_after_samples: 4,
            ..Default::default()
        };

        let core = GatewayCore::from_config(&config);
        assert_eq!(core.sample_interval, Duration::from_millis(20));
        assert_eq!(core.queue_capacity, 7);
        assert_eq!(core.publish_every, 3);
        assert_eq!(core.failure_threshold, 2);
    }

    #[test]
    fn test_from_config_attaches_configured_sink() {
        let core = GatewayCore::from_config(&GatewayConfig::default());
        assert!(core.sink.is_some());

        let config = GatewayConfig {
            sink: SinkKind::None,
            ..Default::default()
        };
        let core = GatewayCore::from_config(&config);
        assert!(core.sink.is_none());
    }

    #[test]
    fn test_reset_device_refused_while_running() {
        let mut core = GatewayCore::new();
        core.set_sampling_interval(Duration::from_millis(10));
        core.start();

        assert!(!core.reset_device());
        core.stop();
    }
}
