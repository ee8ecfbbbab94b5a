//! Rolling search-latency statistics (spec §4.E "Statistics").

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

const ROLLING_BUFFER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyPercentiles {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub sample_count: usize,
}

#[derive(Default)]
pub struct SearchStats {
    durations_ms: Mutex<VecDeque<f64>>,
}

impl SearchStats {
    pub fn record(&self, duration: Duration) {
        let mut durations = self.durations_ms.lock();
        if durations.len() == ROLLING_BUFFER_CAPACITY {
            durations.pop_front();
        }
        durations.push_back(duration.as_secs_f64() * 1000.0);
    }

    pub fn percentiles(&self) -> LatencyPercentiles {
        let durations = self.durations_ms.lock();
        if durations.is_empty() {
            return LatencyPercentiles::default();
        }
        let mut sorted: Vec<f64> = durations.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let pick = |p: f64| -> f64 {
            let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        LatencyPercentiles {
            p50_ms: pick(0.50),
            p95_ms: pick(0.95),
            p99_ms: pick(0.99),
            sample_count: sorted.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_uniform_samples() {
        let stats = SearchStats::default();
        for ms in 1..=100 {
            stats.record(Duration::from_millis(ms));
        }
        let p = stats.percentiles();
        assert_eq!(p.sample_count, 100);
        assert!(p.p50_ms <= p.p95_ms && p.p95_ms <= p.p99_ms);
    }

    #[test]
    fn empty_stats_return_zeroed_percentiles() {
        let stats = SearchStats::default();
        assert_eq!(stats.percentiles().sample_count, 0);
    }

    #[test]
    fn buffer_rolls_over_capacity() {
        let stats = SearchStats::default();
        for ms in 0..(ROLLING_BUFFER_CAPACITY + 10) {
            stats.record(Duration::from_millis(ms as u64));
        }
        assert_eq!(stats.percentiles().sample_count, ROLLING_BUFFER_CAPACITY);
    }
}
