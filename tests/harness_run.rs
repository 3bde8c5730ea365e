//! End-to-end harness runs against stub renderers with known cost models.
//!
//! These run in real time against the wall clock, so durations are kept to a
//! couple of seconds and tolerances leave room for scheduler noise.

use std::time::Instant;

use synthmark::error::SynthMarkError;
use synthmark::harness::{
    JitterMark, LatencyMark, TestHarness, UtilizationMark, VoiceMark,
};
use synthmark::result::ResultCode;
use synthmark::synth::VoiceRenderer;

/// Renderer that returns instantly; the zero-cost baseline.
struct NullRenderer;

impl VoiceRenderer for NullRenderer {
    fn prepare(&mut self, _sample_rate: u32) -> synthmark::error::Result<()> {
        Ok(())
    }

    fn render(&mut self, _num_voices: u32, out: &mut [f32]) -> synthmark::error::Result<()> {
        out.fill(0.0);
        Ok(())
    }
}

/// Renderer whose cost scales linearly with the voice count.
struct LinearCostRenderer {
    seconds_per_voice: f64,
}

impl VoiceRenderer for LinearCostRenderer {
    fn prepare(&mut self, _sample_rate: u32) -> synthmark::error::Result<()> {
        Ok(())
    }

    fn render(&mut self, num_voices: u32, out: &mut [f32]) -> synthmark::error::Result<()> {
        out.fill(0.0);
        let cost = num_voices as f64 * self.seconds_per_voice;
        let deadline = Instant::now() + std::time::Duration::from_secs_f64(cost);
        while Instant::now() < deadline {
            std::hint::black_box(0u64);
        }
        Ok(())
    }
}

/// Renderer that fails after a fixed number of bursts.
struct FailingRenderer {
    bursts_before_failure: u32,
}

impl VoiceRenderer for FailingRenderer {
    fn prepare(&mut self, _sample_rate: u32) -> synthmark::error::Result<()> {
        Ok(())
    }

    fn render(&mut self, _num_voices: u32, out: &mut [f32]) -> synthmark::error::Result<()> {
        if self.bursts_before_failure == 0 {
            return Err(SynthMarkError::RenderFailed("buffer unavailable".into()));
        }
        self.bursts_before_failure -= 1;
        out.fill(0.0);
        Ok(())
    }
}

#[test]
fn jitter_with_zero_cost_renderer_is_clean() {
    // 480 frames at 48 kHz = 10 ms period, 1 second = 100 cycles.
    let mut harness = TestHarness::new(JitterMark::new(), Box::new(NullRenderer));
    let result = harness.run_test(48_000, 480, 1.0).unwrap();
    assert_eq!(result.result_code(), ResultCode::Success);
    assert_eq!(result.metric("timing.overrun.count"), Some(0.0));
    // Near-zero render cost implies near-zero jitter; 1 ms is generous.
    assert!(result.metric("jitter.msec").unwrap() < 1.0);
    assert_eq!(result.metric("cycle.count"), Some(100.0));
}

#[test]
fn voice_mark_converges_on_linear_cost_renderer() {
    // 5 ms period; 0.25 ms per voice means 10 voices hit the 0.5 target.
    let renderer = LinearCostRenderer {
        seconds_per_voice: 0.00025,
    };
    let mut harness = TestHarness::new(VoiceMark::new(0.5, 2).unwrap(), Box::new(renderer));
    let result = harness.run_test(48_000, 240, 3.0).unwrap();
    assert_eq!(
        result.result_code(),
        ResultCode::Success,
        "report:\n{}",
        result.result_message()
    );
    let measured = result.metric("measured.cpu.load").unwrap();
    assert!(
        (measured - 0.5).abs() <= 0.1,
        "measured load {measured} too far from target"
    );
    let voices = result.metric("voice.count").unwrap();
    assert!((6.0..=14.0).contains(&voices), "settled at {voices} voices");
}

#[test]
fn latency_mark_rejects_inverted_voice_counts() {
    let err = LatencyMark::new(8, 4).unwrap_err();
    assert!(matches!(err, SynthMarkError::InvalidConfig(_)));
}

#[test]
fn utilization_padding_reaches_target() {
    // Negligible render cost; padding alone must deliver 0.8 of each 10 ms
    // period.
    let mut harness = TestHarness::new(
        UtilizationMark::new(0.8).unwrap(),
        Box::new(NullRenderer),
    );
    let result = harness.run_test(48_000, 480, 1.0).unwrap();
    assert_eq!(
        result.result_code(),
        ResultCode::Success,
        "report:\n{}",
        result.result_message()
    );
    let measured = result.metric("measured.utilization").unwrap();
    assert!((measured - 0.8).abs() <= 0.05, "measured {measured}");
}

#[test]
fn utilization_holds_across_burst_periods() {
    // 1 ms and 20 ms periods at the same 0.8 target.
    for &(sample_rate, burst) in &[(48_000u32, 48u32), (48_000, 960)] {
        let mut harness = TestHarness::new(
            UtilizationMark::new(0.8).unwrap(),
            Box::new(NullRenderer),
        );
        let result = harness.run_test(sample_rate, burst, 1.0).unwrap();
        let measured = result.metric("measured.utilization").unwrap();
        assert!(
            (measured - 0.8).abs() <= 0.05,
            "burst {burst}: measured {measured}"
        );
    }
}

#[test]
fn result_getters_are_idempotent_after_completion() {
    let mut harness = TestHarness::new(JitterMark::new(), Box::new(NullRenderer));
    harness.run_test(48_000, 480, 0.2).unwrap();
    let result = harness.result().unwrap();
    let message = result.result_message().to_string();
    let code = result.result_code();
    for _ in 0..3 {
        let again = harness.result().unwrap();
        assert_eq!(again.result_message(), message);
        assert_eq!(again.result_code(), code);
    }
}

#[test]
fn setters_are_rejected_after_run() {
    let mut harness = TestHarness::new(JitterMark::new(), Box::new(NullRenderer));
    harness.run_test(48_000, 480, 0.2).unwrap();
    assert!(matches!(
        harness.set_num_voices(4),
        Err(SynthMarkError::InvalidState(_))
    ));
    assert!(matches!(
        harness.set_delay_notes_on(1.0),
        Err(SynthMarkError::InvalidState(_))
    ));
    assert!(matches!(
        harness.run_test(48_000, 480, 0.2),
        Err(SynthMarkError::InvalidState(_))
    ));
}

#[test]
fn renderer_failure_aborts_with_distinct_code() {
    let renderer = FailingRenderer {
        bursts_before_failure: 10,
    };
    let mut harness = TestHarness::new(JitterMark::new(), Box::new(renderer));
    let result = harness.run_test(48_000, 480, 2.0).unwrap();
    assert_eq!(result.result_code(), ResultCode::RendererFailed);
    assert_eq!(result.metric("cycle.count"), Some(10.0));
}

#[test]
fn note_on_delay_longer_than_run_is_invalid() {
    let mut harness = TestHarness::new(JitterMark::new(), Box::new(NullRenderer));
    harness.set_delay_notes_on(5.0).unwrap();
    assert!(matches!(
        harness.run_test(48_000, 480, 1.0),
        Err(SynthMarkError::InvalidConfig(_))
    ));
}

#[test]
fn latency_mark_with_headroom_settles() {
    // High load still far below the period; toggles never cause overruns, so
    // settling time is zero and the run passes.
    let renderer = LinearCostRenderer {
        seconds_per_voice: 0.00005,
    };
    let mut harness = TestHarness::new(
        LatencyMark::new(2, 8).unwrap(),
        Box::new(renderer),
    );
    let result = harness.run_test(48_000, 480, 2.0).unwrap();
    assert_eq!(
        result.result_code(),
        ResultCode::Success,
        "report:\n{}",
        result.result_message()
    );
    assert_eq!(result.metric("latency.settling.cycles"), Some(0.0));
    assert!(result.metric("toggle.count").unwrap() >= 1.0);
}
