//! Engine-wide counters and a lock-free latency histogram.
//!
//! The engine calls in on its hot path, so nothing here blocks: counters are
//! atomics and the histogram is a fixed array of atomic buckets, one per
//! microsecond of latency.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Highest latency tracked at 1 us precision (100 ms). Observations beyond
/// this clamp silently into the final bucket, so percentiles saturate at
/// 100 ms rather than follow a pathological tail.
pub const MAX_LATENCY_MICROS: usize = 100_000;

/// Thread-safe metrics sink. Counters cover the engine's lifecycle events;
/// the histogram feeds the avg/p50/p99/p999 latency figures in
/// [`MetricsSnapshot`].
pub struct Metrics {
    start: Instant,
    orders_received: AtomicI64,
    orders_matched: AtomicI64,
    orders_cancelled: AtomicI64,
    orders_in_book: AtomicI64,
    trades_executed: AtomicI64,
    total_latency_micros: AtomicI64,
    /// Bucket `i` counts observations of `i` us; the last bucket is overflow.
    latency_histogram: Box<[AtomicI64]>,
}

impl Metrics {
    pub fn new() -> Self {
        let buckets: Vec<AtomicI64> = (0..=MAX_LATENCY_MICROS).map(|_| AtomicI64::new(0)).collect();
        Self {
            start: Instant::now(),
            orders_received: AtomicI64::new(0),
            orders_matched: AtomicI64::new(0),
            orders_cancelled: AtomicI64::new(0),
            orders_in_book: AtomicI64::new(0),
            trades_executed: AtomicI64::new(0),
            total_latency_micros: AtomicI64::new(0),
            latency_histogram: buckets.into_boxed_slice(),
        }
    }

    pub fn inc_orders_received(&self) {
        self.orders_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_orders_matched(&self, count: i64) {
        self.orders_matched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_orders_cancelled(&self) {
        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_in_book(&self) {
        self.orders_in_book.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_orders_in_book(&self) {
        self.orders_in_book.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn add_trades_executed(&self, count: i64) {
        self.trades_executed.fetch_add(count, Ordering::Relaxed);
    }

    /// Records one end-to-end submission latency. Values above
    /// [`MAX_LATENCY_MICROS`] land in the overflow bucket.
    pub fn observe_latency(&self, micros: i64) {
        self.total_latency_micros.fetch_add(micros, Ordering::Relaxed);
        let idx = (micros.max(0) as usize).min(MAX_LATENCY_MICROS);
        self.latency_histogram[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn orders_received(&self) -> i64 {
        self.orders_received.load(Ordering::Relaxed)
    }

    pub fn orders_matched(&self) -> i64 {
        self.orders_matched.load(Ordering::Relaxed)
    }

    pub fn orders_cancelled(&self) -> i64 {
        self.orders_cancelled.load(Ordering::Relaxed)
    }

    pub fn orders_in_book(&self) -> i64 {
        self.orders_in_book.load(Ordering::Relaxed)
    }

    pub fn trades_executed(&self) -> i64 {
        self.trades_executed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start.elapsed()
    }

    /// Latency value (ms) below which `p` of observations fall. Walks the
    /// histogram to the ceil(total * p) rank.
    fn percentile_ms(&self, p: f64, total: i64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let target = (total as f64 * p).ceil() as i64;
        let mut seen: i64 = 0;
        for (micros, bucket) in self.latency_histogram.iter().enumerate() {
            seen += bucket.load(Ordering::Relaxed);
            if seen >= target {
                return micros as f64 / 1000.0;
            }
        }
        MAX_LATENCY_MICROS as f64 / 1000.0
    }

    /// Point-in-time view for the transport's metrics endpoint.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let received = self.orders_received();
        let avg = if received > 0 {
            self.total_latency_micros.load(Ordering::Relaxed) as f64 / received as f64 / 1000.0
        } else {
            0.0
        };
        let uptime_secs = self.uptime().as_secs_f64();
        let throughput = if uptime_secs > 0.0 {
            received as f64 / uptime_secs
        } else {
            0.0
        };
        MetricsSnapshot {
            orders_received: received,
            orders_matched: self.orders_matched(),
            orders_cancelled: self.orders_cancelled(),
            orders_in_book: self.orders_in_book(),
            trades_executed: self.trades_executed(),
            latency_avg_ms: avg,
            latency_p50_ms: self.percentile_ms(0.50, received),
            latency_p99_ms: self.percentile_ms(0.99, received),
            latency_p999_ms: self.percentile_ms(0.999, received),
            throughput_orders_per_sec: throughput,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("orders_received", &self.orders_received())
            .field("orders_matched", &self.orders_matched())
            .field("orders_cancelled", &self.orders_cancelled())
            .field("orders_in_book", &self.orders_in_book())
            .field("trades_executed", &self.trades_executed())
            .finish()
    }
}

/// Serialized metrics view.
#[derive(Clone, Debug, serde::Serialize)]
pub struct MetricsSnapshot {
    pub orders_received: i64,
    pub orders_matched: i64,
    pub orders_cancelled: i64,
    pub orders_in_book: i64,
    pub trades_executed: i64,
    pub latency_avg_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_p999_ms: f64,
    pub throughput_orders_per_sec: f64,
}
