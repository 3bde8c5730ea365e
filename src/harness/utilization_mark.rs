//! Utilization-accuracy self-check.
//!
//! Verifies that a requested CPU load fraction is actually delivered: after
//! each cycle's real render cost, the control loop pads with calibrated
//! busy-work up to `target_load * period`, and this mark measures how close
//! the consumed fraction lands to the request. The padding must burn CPU,
//! not sleep, because the probe is scheduler-delivered utilization.

use crate::error::{Result, SynthMarkError};
use crate::harness::{CycleInfo, Measurement, RunSummary, Workload};
use crate::result::{ResultBuilder, ResultCode, SynthMarkResult};

/// Allowed absolute deviation between target and measured utilization.
pub const UTILIZATION_TOLERANCE: f64 = 0.05;

pub struct UtilizationMark {
    target_load: f64,
    consumed_sum: f64,
    cycle_count: u64,
}

impl UtilizationMark {
    pub fn new(target_load: f64) -> Result<Self> {
        if !(target_load > 0.0 && target_load <= 1.0) {
            return Err(SynthMarkError::InvalidConfig(format!(
                "target CPU load must be in (0, 1], got {target_load}"
            )));
        }
        Ok(Self {
            target_load,
            consumed_sum: 0.0,
            cycle_count: 0,
        })
    }
}

impl Measurement for UtilizationMark {
    fn name(&self) -> &'static str {
        "UtilizationMark"
    }

    fn on_begin(&mut self, workload: &mut Workload) {
        workload.pad_to_load = Some(self.target_load);
    }

    fn on_cycle(&mut self, cycle: &CycleInfo, _workload: &mut Workload) {
        // burst_seconds covers render plus padding, the consumed slice of
        // this cycle's period.
        self.consumed_sum += cycle.burst_seconds / cycle.period_seconds;
        self.cycle_count += 1;
    }

    fn build_result(&mut self, summary: &RunSummary) -> SynthMarkResult {
        let stats = &summary.statistics;
        let measured = if self.cycle_count > 0 {
            self.consumed_sum / self.cycle_count as f64
        } else {
            0.0
        };
        let deviation = (measured - self.target_load).abs();
        let code = if deviation <= UTILIZATION_TOLERANCE {
            ResultCode::Success
        } else {
            ResultCode::TargetLoadNotReached
        };
        let mut builder = ResultBuilder::new();
        builder.line(format!(
            "UtilizationMark = {:.1}% measured for {:.1}% requested",
            measured * 100.0,
            self.target_load * 100.0
        ));
        builder.metric("target.utilization", self.target_load);
        builder.metric("measured.utilization", measured);
        builder.metric("utilization.deviation", deviation);
        builder.metric("cycle.count", stats.count as f64);
        builder.metric("timing.overrun.count", stats.overrun_count as f64);
        if code != ResultCode::Success {
            builder.line(format!(
                "FAIL: deviation {deviation:.4} above {UTILIZATION_TOLERANCE}"
            ));
        }
        builder.build(code)
    }
}
