//! Load-toggle latency measurement.
//!
//! Alternates sustained low-load phases with bursts of high load and counts,
//! from each toggle, how many cycles pass until deadline overruns cease.
//! That settling time is the latency proxy reported.

use tracing::debug;

use crate::error::{Result, SynthMarkError};
use crate::harness::{CycleInfo, Measurement, RunSummary, Workload};
use crate::result::{ResultBuilder, ResultCode, SynthMarkResult};
use crate::MAX_VOICES;

/// Duration of each sustained low-load phase.
pub const LOW_PHASE_SECONDS: f64 = 0.5;
/// Duration of each high-load burst.
pub const HIGH_PHASE_SECONDS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Low,
    High,
}

#[derive(Debug)]
pub struct LatencyMark {
    num_voices: u32,
    num_voices_high: u32,
    phase: Phase,
    phase_seconds: f64,
    toggle_cycle: u64,
    last_overrun_cycle: Option<u64>,
    worst_settling_cycles: u64,
    toggle_count: u32,
    /// High phases where overruns never ceased before the phase ended.
    unsettled_count: u32,
}

impl LatencyMark {
    /// Both voice levels are fixed at configuration time; a high count below
    /// the low count is rejected here so the run never starts.
    pub fn new(num_voices: u32, num_voices_high: u32) -> Result<Self> {
        if num_voices_high < num_voices {
            return Err(SynthMarkError::InvalidConfig(format!(
                "high voice count {num_voices_high} must be >= low voice count {num_voices}"
            )));
        }
        if num_voices_high == 0 || num_voices_high > MAX_VOICES {
            return Err(SynthMarkError::InvalidConfig(format!(
                "high voice count must be in [1, {MAX_VOICES}], got {num_voices_high}"
            )));
        }
        Ok(Self {
            num_voices,
            num_voices_high,
            phase: Phase::Low,
            phase_seconds: 0.0,
            toggle_cycle: 0,
            last_overrun_cycle: None,
            worst_settling_cycles: 0,
            toggle_count: 0,
            unsettled_count: 0,
        })
    }
}

impl Measurement for LatencyMark {
    fn name(&self) -> &'static str {
        "LatencyMark"
    }

    fn validate(&self, seconds: f64) -> Result<()> {
        let minimum = LOW_PHASE_SECONDS + HIGH_PHASE_SECONDS;
        if seconds < minimum {
            return Err(SynthMarkError::InvalidConfig(format!(
                "latency test needs at least {minimum} seconds for one load toggle, got {seconds}"
            )));
        }
        Ok(())
    }

    fn on_begin(&mut self, workload: &mut Workload) {
        workload.num_voices = self.num_voices;
    }

    fn on_cycle(&mut self, cycle: &CycleInfo, workload: &mut Workload) {
        self.phase_seconds += cycle.period_seconds;
        match self.phase {
            Phase::Low => {
                if self.phase_seconds >= LOW_PHASE_SECONDS {
                    self.phase = Phase::High;
                    self.phase_seconds = 0.0;
                    self.toggle_cycle = cycle.index + 1;
                    self.last_overrun_cycle = None;
                    self.toggle_count += 1;
                    workload.num_voices = self.num_voices_high;
                    debug!(cycle = cycle.index, "toggled to high load");
                }
            }
            Phase::High => {
                if cycle.overrun {
                    self.last_overrun_cycle = Some(cycle.index);
                }
                if self.phase_seconds >= HIGH_PHASE_SECONDS {
                    if cycle.overrun {
                        // Still overrunning when the phase ended: the system
                        // never recovered from this toggle.
                        self.unsettled_count += 1;
                    } else if let Some(last) = self.last_overrun_cycle {
                        let settling = last - self.toggle_cycle + 1;
                        self.worst_settling_cycles = self.worst_settling_cycles.max(settling);
                    }
                    self.phase = Phase::Low;
                    self.phase_seconds = 0.0;
                    workload.num_voices = self.num_voices;
                    debug!(cycle = cycle.index, "toggled back to low load");
                }
            }
        }
    }

    fn build_result(&mut self, summary: &RunSummary) -> SynthMarkResult {
        let stats = &summary.statistics;
        let settling_msec =
            self.worst_settling_cycles as f64 * summary.period_seconds * 1000.0;
        let code = if self.unsettled_count > 0 {
            ResultCode::ExcessiveOverruns
        } else {
            ResultCode::Success
        };
        let mut builder = ResultBuilder::new();
        builder.line(format!(
            "LatencyMark = {:.2} msec worst-case settling after load toggle",
            settling_msec
        ));
        builder.metric("latency.settling.cycles", self.worst_settling_cycles as f64);
        builder.metric("latency.settling.msec", settling_msec);
        builder.metric("toggle.count", self.toggle_count as f64);
        builder.metric("unsettled.count", self.unsettled_count as f64);
        builder.metric("voice.count.low", self.num_voices as f64);
        builder.metric("voice.count.high", self.num_voices_high as f64);
        builder.metric("timing.overrun.count", stats.overrun_count as f64);
        if code != ResultCode::Success {
            builder.line(format!(
                "FAIL: {} of {} high-load phases never stopped overrunning",
                self.unsettled_count, self.toggle_count
            ));
        }
        builder.build(code)
    }
}
