//! Pipeline metrics snapshot

use serde::{Deserialize, Serialize};

/// Point-in-time view of the pipeline's counters
///
/// `samples_processed` counts pushes attempted by the producer, not
/// samples consumed; drop-oldest evictions show up in `samples_dropped`.
/// `queue_depth` is best-effort and may be stale by the time the caller
/// reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Samples pushed toward the queue by the producer
    pub samples_processed: u64,
    /// Samples evicted by drop-oldest overflow
    pub samples_dropped: u64,
    /// Queue depth at snapshot time
    pub queue_depth: usize,
    /// Wall time since the gateway was constructed, in seconds
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// Generate a human-readable report
    pub fn report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== TelemetryHub Gateway Metrics ===\n\n");
        report.push_str(&format!("Samples processed: {}\n", self.samples_processed));
        report.push_str(&format!("Samples dropped: {}\n", self.samples_dropped));
        report.push_str(&format!("Queue depth: {}\n", self.queue_depth));
        report.push_str(&format!("Uptime: {} s\n", self.uptime_seconds));

        if self.samples_processed > 0 {
            let drop_percent =
                (self.samples_dropped as f64 / self.samples_processed as f64) * 100.0;
            report.push_str(&format!("Drop rate: {:.1}%\n", drop_percent));
        }

        report
    }
}
