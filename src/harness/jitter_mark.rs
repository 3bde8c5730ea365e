//! Fixed-load timing variance measurement.
//!
//! The control baseline: no adaptation at all. The voice count stays fixed
//! and the result is read straight off the timing analyzer.

use crate::harness::{CycleInfo, Measurement, RunSummary, Workload};
use crate::result::{ResultBuilder, ResultCode, SynthMarkResult};

/// Overrun fraction above which the baseline itself is considered failing.
pub const MAX_OVERRUN_FRACTION: f64 = 0.01;

#[derive(Debug, Default)]
pub struct JitterMark;

impl JitterMark {
    pub fn new() -> Self {
        Self
    }
}

impl Measurement for JitterMark {
    fn name(&self) -> &'static str {
        "JitterMark"
    }

    fn on_cycle(&mut self, _cycle: &CycleInfo, _workload: &mut Workload) {
        // No adaptation: the analyzer already saw everything it needs.
    }

    fn build_result(&mut self, summary: &RunSummary) -> SynthMarkResult {
        let stats = &summary.statistics;
        let code = if stats.overrun_fraction() > MAX_OVERRUN_FRACTION {
            ResultCode::ExcessiveOverruns
        } else {
            ResultCode::Success
        };
        let mut builder = ResultBuilder::new();
        builder.line(format!(
            "JitterMark = {:.3} msec jitter, {} overruns in {} cycles",
            stats.jitter_seconds * 1000.0,
            stats.overrun_count,
            stats.count
        ));
        builder.metric("jitter.msec", stats.jitter_seconds * 1000.0);
        builder.metric("render.mean.msec", stats.mean_seconds * 1000.0);
        builder.metric("render.max.msec", stats.max_seconds * 1000.0);
        builder.metric("burst.period.msec", summary.period_seconds * 1000.0);
        builder.metric("cycle.count", stats.count as f64);
        builder.metric("timing.overrun.count", stats.overrun_count as f64);
        if code != ResultCode::Success {
            builder.line(format!(
                "FAIL: overrun fraction {:.4} above {MAX_OVERRUN_FRACTION}",
                stats.overrun_fraction()
            ));
        }
        builder.build(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::TimingAnalyzer;

    fn summary_with(overruns: u64, cycles: u64) -> RunSummary {
        let mut analyzer = TimingAnalyzer::new();
        for index in 0..cycles {
            analyzer.record(0.001, index < overruns);
        }
        RunSummary {
            statistics: analyzer.statistics(),
            sample_rate: 48_000,
            frames_per_burst: 96,
            period_seconds: 0.002,
            requested_seconds: 1.0,
            num_cycles: cycles,
            final_voices: 8,
        }
    }

    #[test]
    fn test_clean_run_passes() {
        let mut mark = JitterMark::new();
        let result = mark.build_result(&summary_with(0, 500));
        assert_eq!(result.result_code(), ResultCode::Success);
        assert_eq!(result.metric("timing.overrun.count"), Some(0.0));
    }

    #[test]
    fn test_excessive_overruns_fail() {
        let mut mark = JitterMark::new();
        let result = mark.build_result(&summary_with(50, 500));
        assert_eq!(result.result_code(), ResultCode::ExcessiveOverruns);
    }
}
