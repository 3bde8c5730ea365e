//! Running statistics over callback durations.
//!
//! The analyzer keeps O(1) aggregates rather than sample history so a
//! multi-second run at a 1 ms burst period stays memory-bounded.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Accumulates one (duration, overrun) observation per simulated callback.
#[derive(Debug, Default)]
pub struct TimingAnalyzer {
    count: u64,
    sum_seconds: f64,
    max_seconds: f64,
    overrun_count: u64,
    prev_seconds: Option<f64>,
    /// Sum of |duration[k] - duration[k-1]| over consecutive pairs.
    jitter_sum: f64,
}

impl TimingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one callback observation. O(1).
    pub fn record(&mut self, duration_seconds: f64, overrun: bool) {
        self.count += 1;
        self.sum_seconds += duration_seconds;
        if duration_seconds > self.max_seconds {
            self.max_seconds = duration_seconds;
        }
        if overrun {
            self.overrun_count += 1;
        }
        if let Some(prev) = self.prev_seconds {
            self.jitter_sum += (duration_seconds - prev).abs();
        }
        self.prev_seconds = Some(duration_seconds);
    }

    /// Derive summary statistics from the running aggregates. O(1).
    pub fn statistics(&self) -> TimingStatistics {
        let mean = if self.count > 0 {
            self.sum_seconds / self.count as f64
        } else {
            0.0
        };
        // Jitter is the mean absolute difference between consecutive
        // durations, defined over count-1 pairs.
        let jitter = if self.count > 1 {
            self.jitter_sum / (self.count - 1) as f64
        } else {
            0.0
        };
        TimingStatistics {
            count: self.count,
            mean_seconds: mean,
            max_seconds: self.max_seconds,
            jitter_seconds: jitter,
            overrun_count: self.overrun_count,
        }
    }
}

/// Read-only summary derived from a [`TimingAnalyzer`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingStatistics {
    pub count: u64,
    pub mean_seconds: f64,
    pub max_seconds: f64,
    /// Mean absolute difference between consecutive callback durations.
    pub jitter_seconds: f64,
    /// Number of cycles whose render cost blew past the scheduled deadline.
    pub overrun_count: u64,
}

impl TimingStatistics {
    /// Fraction of cycles that overran, in [0, 1].
    pub fn overrun_fraction(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.overrun_count as f64 / self.count as f64
        }
    }
}
