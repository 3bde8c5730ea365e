//! CPU-bound padding work for the utilization harness.
//!
//! The spinner must consume real scheduler-delivered CPU time, not wall-clock
//! idle time, so it multiplies rather than sleeps. The clock is only checked
//! once per chunk to keep the loop dominated by arithmetic.

use std::hint::black_box;
use std::time::{Duration, Instant};

/// Iterations per calibration probe. Large enough that `Instant::now` noise
/// does not dominate the measurement.
const CALIBRATION_ITERATIONS: u64 = 1 << 20;

/// Target wall time per chunk between clock checks.
const CHUNK_TARGET_SECONDS: f64 = 2e-6;

/// A spin loop calibrated once against the monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SpinWork {
    chunk_iterations: u64,
}

impl SpinWork {
    /// Measure the cost of the multiply loop once and size subsequent chunks
    /// to roughly [`CHUNK_TARGET_SECONDS`] each.
    pub fn calibrated() -> Self {
        let start = Instant::now();
        spin_chunk(CALIBRATION_ITERATIONS);
        let elapsed = start.elapsed().as_secs_f64().max(1e-9);
        let per_iteration = elapsed / CALIBRATION_ITERATIONS as f64;
        let chunk_iterations = ((CHUNK_TARGET_SECONDS / per_iteration) as u64).max(64);
        Self { chunk_iterations }
    }

    /// Burn at least `seconds` of CPU time, then return.
    pub fn consume(&self, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }
        let deadline = Instant::now() + Duration::from_secs_f64(seconds);
        while Instant::now() < deadline {
            spin_chunk(self.chunk_iterations);
        }
    }
}

#[inline]
fn spin_chunk(iterations: u64) {
    let mut x: u64 = black_box(1);
    for _ in 0..iterations {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
    }
    black_box(x);
}
