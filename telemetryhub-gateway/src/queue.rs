// TelemetryHub Gateway - Telemetry pipeline layer
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Bounded, thread-safe sample queue
//!
//! FIFO between the sampling producer and the publishing consumer.
//! When bounded and full, a push evicts the head (the oldest sample):
//! at the edge the freshest value carries the most diagnostic worth, so
//! the queue bounds memory by discarding history, never by blocking the
//! producer.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use telemetryhub::TelemetrySample;
use tracing::{debug, trace};

struct QueueInner {
    items: VecDeque<TelemetrySample>,
    /// 0 means unbounded
    capacity: usize,
    shutdown: bool,
    dropped: u64,
}

/// Bounded drop-oldest FIFO with shutdown semantics
///
/// `push` never fails or blocks; `pop` blocks until an item arrives or
/// shutdown is signalled. After shutdown no new items are admitted and
/// `pop` drains the remainder before returning `None`.
pub struct TelemetryQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl TelemetryQueue {
    /// Create an unbounded queue
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a queue bounded to `capacity` items (0 = unbounded)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                capacity,
                shutdown: false,
                dropped: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a sample, evicting the oldest when bounded and full
    ///
    /// Silently discards the sample after shutdown.
    pub fn push(&self, sample: TelemetrySample) {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return;
        }

        if inner.capacity > 0 && inner.items.len() >= inner.capacity {
            inner.items.pop_front();
            inner.dropped += 1;
            trace!(dropped = inner.dropped, "queue full, dropped oldest sample");
        }

        inner.items.push_back(sample);
        drop(inner);
        self.available.notify_one();
    }

    /// Take the head, blocking until an item arrives or shutdown
    ///
    /// Returns `None` only once shutdown has been signalled and the
    /// queue is empty.
    pub fn pop(&self) -> Option<TelemetrySample> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(sample) = inner.items.pop_front() {
                return Some(sample);
            }
            if inner.shutdown {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Signal that no more items will be produced; wakes all waiters
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return;
        }
        inner.shutdown = true;
        debug!(pending = inner.items.len(), "queue shutdown signalled");
        drop(inner);
        self.available.notify_all();
    }

    /// Clear the shutdown flag and discard stale items for a new session
    pub fn reopen(&self) {
        let mut inner = self.inner.lock();
        inner.shutdown = false;
        inner.items.clear();
    }

    /// Update the capacity; does not retroactively trim
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.lock().capacity = capacity;
    }

    /// Current depth (may be stale by the time the caller reads it)
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the queue currently holds no items
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Number of samples evicted by drop-oldest overflow
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    /// Whether shutdown has been signalled
    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shutdown
    }
}

impl Default for TelemetryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn make_sample(seq: u32) -> TelemetrySample {
        TelemetrySample::new(f64::from(seq), "test", seq)
    }

    #[test]
    fn test_unbounded_queue_accepts_all_in_order() {
        let queue = TelemetryQueue::new();

        for seq in 0..100 {
            queue.push(make_sample(seq));
        }
        assert_eq!(queue.len(), 100);

        for seq in 0..100 {
            let sample = queue.pop().unwrap();
            assert_eq!(sample.sequence_id, seq);
        }
    }

    #[test]
    fn test_bounded_queue_drops_oldest() {
        let queue = TelemetryQueue::with_capacity(3);

        for seq in [1, 2, 3, 4, 5] {
            queue.push(make_sample(seq));
        }

        assert_eq!(queue.pop().unwrap().sequence_id, 3);
        assert_eq!(queue.pop().unwrap().sequence_id, 4);
        assert_eq!(queue.pop().unwrap().sequence_id, 5);
        assert_eq!(queue.dropped(), 2);
    }

    #[test]
    fn test_capacity_one_keeps_newest() {
        let queue = TelemetryQueue::with_capacity(1);

        queue.push(make_sample(10));
        queue.push(make_sample(20));
        queue.push(make_sample(30));

        assert_eq!(queue.pop().unwrap().sequence_id, 30);
        assert_eq!(queue.dropped(), 2);
    }

    #[test]
    fn test_set_capacity_at_runtime_does_not_trim() {
        let queue = TelemetryQueue::new();

        queue.push(make_sample(1));
        queue.push(make_sample(2));
        queue.push(make_sample(3));

        queue.set_capacity(2);
        assert_eq!(queue.len(), 3);

        // New pushes now apply the bound
        queue.push(make_sample(4));
        queue.push(make_sample(5));

        assert_eq!(queue.pop().unwrap().sequence_id, 3);
        assert_eq!(queue.pop().unwrap().sequence_id, 4);
        assert_eq!(queue.pop().unwrap().sequence_id, 5);
    }

    #[test]
    fn test_shutdown_stops_accepting_pushes() {
        let queue = TelemetryQueue::with_capacity(5);

        queue.push(make_sample(1));
        queue.push(make_sample(2));
        queue.shutdown();

        queue.push(make_sample(3)); // discarded

        assert_eq!(queue.pop().unwrap().sequence_id, 1);
        assert_eq!(queue.pop().unwrap().sequence_id, 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let queue = TelemetryQueue::new();
        queue.shutdown();
        queue.shutdown();
        assert!(queue.is_shut_down());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_pop_on_empty_shut_down_queue_returns_none() {
        let queue = TelemetryQueue::with_capacity(10);
        queue.shutdown();
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_reopen_clears_shutdown_and_stale_items() {
        let queue = TelemetryQueue::new();
        queue.push(make_sample(1));
        queue.shutdown();

        queue.reopen();
        assert!(!queue.is_shut_down());
        assert!(queue.is_empty());

        queue.push(make_sample(2));
        assert_eq!(queue.pop().unwrap().sequence_id, 2);
    }

    #[test]
    fn test_pop_blocks_until_push() {
        let queue = Arc::new(TelemetryQueue::new());

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(std::time::Duration::from_millis(50));
        queue.push(make_sample(42));

        let sample = consumer.join().unwrap().unwrap();
        assert_eq!(sample.sequence_id, 42);
    }

    #[test]
    fn test_shutdown_unblocks_waiting_consumer() {
        let queue = Arc::new(TelemetryQueue::new());

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop())
        };

        thread::sleep(std::time::Duration::from_millis(50));
        queue.shutdown();

        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let queue = Arc::new(TelemetryQueue::with_capacity(100));
        let consumed = Arc::new(AtomicU32::new(0));

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for seq in 0..1000 {
                    queue.push(make_sample(seq));
                }
                queue.shutdown();
            })
        };

        let consumer = {
            let queue = queue.clone();
            let consumed = consumed.clone();
            thread::spawn(move || {
                let mut last_seq: Option<u32> = None;
                while let Some(sample) = queue.pop() {
                    // Drops create gaps but never reorder
                    if let Some(last) = last_seq {
                        assert!(sample.sequence_id > last);
                    }
                    last_seq = Some(sample.sequence_id);
                    consumed.fetch_add(1, Ordering::Relaxed);
                }
            })
        };

        producer.join().unwrap();
        consumer.join().unwrap();

        let total = consumed.load(Ordering::Relaxed);
        assert!(total > 0);
        assert_eq!(u64::from(1000 - total), queue.dropped());
    }

    #[test]
    fn test_multiple_producers_one_bounded_queue() {
        let queue = Arc::new(TelemetryQueue::with_capacity(50));
        let consumed = Arc::new(AtomicU32::new(0));

        let producers: Vec<_> = (0..5)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.push(make_sample(p * 1000 + i));
                    }
                })
            })
            .collect();

        let consumer = {
            let queue = queue.clone();
            let consumed = consumed.clone();
            thread::spawn(move || {
                while queue.pop().is_some() {
                    consumed.fetch_add(1, Ordering::Relaxed);
                }
            })
        };

        for producer in producers {
            producer.join().unwrap();
        }
        queue.shutdown();
        consumer.join().unwrap();

        let total = consumed.load(Ordering::Relaxed);
        assert!(total > 0);
        assert!(total <= 500);
    }

    #[test]
    fn test_dropped_counts_every_eviction() {
        let queue = TelemetryQueue::with_capacity(2);

        for seq in 0..10 {
            queue.push(make_sample(seq));
        }
        assert_eq!(queue.dropped(), 8);
        assert_eq!(queue.len(), 2);
    }
}
