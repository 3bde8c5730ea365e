//! Adaptive voice-capacity search.
//!
//! A discrete proportional controller: accumulate per-cycle CPU load
//! (render cost over period), and once per adjustment interval step the
//! voice count toward the target load. Step-and-settle rather than binary
//! search, because the load curve is monotonic but noisy.

use tracing::debug;

use crate::error::{Result, SynthMarkError};
use crate::harness::{CycleInfo, Measurement, RunSummary, Workload};
use crate::result::{ResultBuilder, ResultCode, SynthMarkResult};
use crate::MAX_VOICES;

/// How much simulated time each load average covers before a step.
pub const ADJUST_INTERVAL_SECONDS: f64 = 0.25;
/// Dead band around the target; no step inside it.
pub const LOAD_TOLERANCE: f64 = 0.02;
/// The verdict passes when the settled load lands within this of the target.
pub const RESULT_TOLERANCE: f64 = 0.1;

pub struct VoiceMark {
    target_load: f64,
    initial_voices: u32,
    interval_load_sum: f64,
    interval_cycles: u64,
    interval_seconds: f64,
    /// Interval average observed most recently; the settled operating point.
    settled_load: f64,
    adjustment_count: u32,
}

impl VoiceMark {
    pub fn new(target_load: f64, initial_voices: u32) -> Result<Self> {
        if !(target_load > 0.0 && target_load <= 1.0) {
            return Err(SynthMarkError::InvalidConfig(format!(
                "target CPU load must be in (0, 1], got {target_load}"
            )));
        }
        if initial_voices == 0 || initial_voices > MAX_VOICES {
            return Err(SynthMarkError::InvalidConfig(format!(
                "initial voice count must be in [1, {MAX_VOICES}], got {initial_voices}"
            )));
        }
        Ok(Self {
            target_load,
            initial_voices,
            interval_load_sum: 0.0,
            interval_cycles: 0,
            interval_seconds: 0.0,
            settled_load: 0.0,
            adjustment_count: 0,
        })
    }

    pub fn target_load(&self) -> f64 {
        self.target_load
    }
}

impl Measurement for VoiceMark {
    fn name(&self) -> &'static str {
        "VoiceMark"
    }

    fn on_begin(&mut self, workload: &mut Workload) {
        workload.num_voices = self.initial_voices;
    }

    fn on_cycle(&mut self, cycle: &CycleInfo, workload: &mut Workload) {
        if cycle.active_voices == 0 {
            // Still waiting for the delayed note-on; nothing to learn yet.
            return;
        }
        self.interval_load_sum += cycle.render_seconds / cycle.period_seconds;
        self.interval_cycles += 1;
        self.interval_seconds += cycle.period_seconds;
        if self.interval_seconds < ADJUST_INTERVAL_SECONDS {
            return;
        }

        let average = self.interval_load_sum / self.interval_cycles as f64;
        self.settled_load = average;
        self.interval_load_sum = 0.0;
        self.interval_cycles = 0;
        self.interval_seconds = 0.0;
        self.adjustment_count += 1;

        let error = self.target_load - average;
        if error.abs() <= LOAD_TOLERANCE {
            return;
        }
        // Step in whole voices, sized by the estimated per-voice load. Below
        // half a voice of error the count is as close as it can get.
        let per_voice = (average / workload.num_voices as f64).max(1e-9);
        let step_voices = error.abs() / per_voice;
        if step_voices < 0.5 {
            return;
        }
        let step = step_voices.round().max(1.0) as u32;
        let previous = workload.num_voices;
        workload.num_voices = if error > 0.0 {
            (previous + step).min(MAX_VOICES)
        } else {
            previous.saturating_sub(step).max(1)
        };
        debug!(
            average_load = average,
            from = previous,
            to = workload.num_voices,
            "voice count adjusted"
        );
    }

    fn build_result(&mut self, summary: &RunSummary) -> SynthMarkResult {
        let stats = &summary.statistics;
        let code = if (self.settled_load - self.target_load).abs() <= RESULT_TOLERANCE {
            ResultCode::Success
        } else {
            ResultCode::TargetLoadNotReached
        };
        let mut builder = ResultBuilder::new();
        builder.line(format!(
            "VoiceMark = {} voices at {:.1}% CPU",
            summary.final_voices,
            self.settled_load * 100.0
        ));
        builder.metric("voice.count", summary.final_voices as f64);
        builder.metric("target.cpu.load", self.target_load);
        builder.metric("measured.cpu.load", self.settled_load);
        builder.metric("adjustment.count", self.adjustment_count as f64);
        builder.metric("cycle.count", stats.count as f64);
        builder.metric("timing.overrun.count", stats.overrun_count as f64);
        if code != ResultCode::Success {
            builder.line(format!(
                "FAIL: settled load {:.3} not within {RESULT_TOLERANCE} of target {:.3}",
                self.settled_load, self.target_load
            ));
        }
        builder.build(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the controller with a renderer whose cost is exactly
    /// `voices * slope` seconds per burst.
    fn simulate(slope: f64, target: f64, initial: u32, cycles: u64) -> (u32, f64) {
        let period = 0.002;
        let mut mark = VoiceMark::new(target, initial).unwrap();
        let mut workload = Workload {
            num_voices: 0,
            pad_to_load: None,
        };
        mark.on_begin(&mut workload);
        for index in 0..cycles {
            let render_seconds = workload.num_voices as f64 * slope;
            let cycle = CycleInfo {
                index,
                elapsed_seconds: index as f64 * period,
                period_seconds: period,
                render_seconds,
                burst_seconds: render_seconds,
                active_voices: workload.num_voices,
                overrun: render_seconds > period,
            };
            mark.on_cycle(&cycle, &mut workload);
        }
        let final_load = workload.num_voices as f64 * slope / period;
        (workload.num_voices, final_load)
    }

    #[test]
    fn test_converges_across_cost_slopes() {
        // Per-voice cost sweep; converged load must land within half a voice
        // of the target regardless of slope or starting point.
        for &slope in &[1e-5, 3e-5, 1e-4, 2e-4] {
            for &initial in &[1u32, 8, 64] {
                let (voices, load) = simulate(slope, 0.5, initial, 4000);
                let half_voice = slope / 0.002 / 2.0;
                let tolerance = (LOAD_TOLERANCE + half_voice).max(0.03);
                assert!(
                    (load - 0.5).abs() <= tolerance,
                    "slope {slope}, initial {initial}: settled at {voices} voices, load {load}"
                );
            }
        }
    }

    #[test]
    fn test_settled_load_tracks_interval_average() {
        let (_, load) = simulate(1e-4, 0.5, 8, 4000);
        let mut mark = VoiceMark::new(0.5, 8).unwrap();
        // Re-run to inspect the mark's own settled figure.
        let mut workload = Workload {
            num_voices: 0,
            pad_to_load: None,
        };
        mark.on_begin(&mut workload);
        for index in 0..4000u64 {
            let render_seconds = workload.num_voices as f64 * 1e-4;
            mark.on_cycle(
                &CycleInfo {
                    index,
                    elapsed_seconds: index as f64 * 0.002,
                    period_seconds: 0.002,
                    render_seconds,
                    burst_seconds: render_seconds,
                    active_voices: workload.num_voices,
                    overrun: false,
                },
                &mut workload,
            );
        }
        assert!((mark.settled_load - load).abs() < 0.03);
    }

    #[test]
    fn test_silent_cycles_do_not_adapt() {
        let mut mark = VoiceMark::new(0.5, 8).unwrap();
        let mut workload = Workload {
            num_voices: 0,
            pad_to_load: None,
        };
        mark.on_begin(&mut workload);
        // Note-on delayed: every cycle reports zero active voices.
        for index in 0..1000u64 {
            mark.on_cycle(
                &CycleInfo {
                    index,
                    elapsed_seconds: index as f64 * 0.002,
                    period_seconds: 0.002,
                    render_seconds: 0.0,
                    burst_seconds: 0.0,
                    active_voices: 0,
                    overrun: false,
                },
                &mut workload,
            );
        }
        assert_eq!(workload.num_voices, 8);
        assert_eq!(mark.adjustment_count, 0);
    }

    #[test]
    fn test_rejects_bad_target_load() {
        assert!(VoiceMark::new(0.0, 8).is_err());
        assert!(VoiceMark::new(1.5, 8).is_err());
        assert!(VoiceMark::new(-0.1, 8).is_err());
    }

    #[test]
    fn test_rejects_bad_initial_voices() {
        assert!(VoiceMark::new(0.5, 0).is_err());
        assert!(VoiceMark::new(0.5, MAX_VOICES + 1).is_err());
    }
}
