//! In-process counters for scored events.

use crate::types::alert::CombinedResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use tracing::info;

/// Counters over the lifetime of the engine process.
pub struct ScoringMetrics {
    /// Total events scored
    pub events_scored: AtomicU64,
    /// Events that produced at least one alert
    pub events_with_alerts: AtomicU64,
    /// Scored events by risk level
    by_level: RwLock<HashMap<String, u64>>,
    /// Risk score distribution over ten 10-point buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for throughput calculation
    start_time: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            events_scored: AtomicU64::new(0),
            events_with_alerts: AtomicU64::new(0),
            by_level: RwLock::new(HashMap::new()),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one combined result.
    pub fn record(&self, result: &CombinedResult) {
        self.events_scored.fetch_add(1, Ordering::Relaxed);
        if !result.alerts.is_empty() {
            self.events_with_alerts.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut by_level) = self.by_level.write() {
            let level = format!("{:?}", result.risk_level).to_lowercase();
            *by_level.entry(level).or_insert(0) += 1;
        }

        let bucket = ((result.risk_score / 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Events per second since startup.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.events_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log a summary of everything recorded so far.
    pub fn log_summary(&self) {
        let by_level = self
            .by_level
            .read()
            .map(|m| m.clone())
            .unwrap_or_default();
        info!(
            events = self.events_scored.load(Ordering::Relaxed),
            with_alerts = self.events_with_alerts.load(Ordering::Relaxed),
            by_level = ?by_level,
            throughput = format!("{:.1}/s", self.throughput()),
            "scoring summary"
        );
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}
