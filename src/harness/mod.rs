// Purpose: the benchmark control loop and the four measurement marks.
// The loop drives the virtual sink burst by burst; a mark adapts the
// workload between cycles and turns the accumulated timing into a verdict.

pub mod jitter_mark;
pub mod latency_mark;
pub mod utilization_mark;
pub mod voice_mark;

pub use jitter_mark::JitterMark;
pub use latency_mark::LatencyMark;
pub use utilization_mark::UtilizationMark;
pub use voice_mark::VoiceMark;

use std::time::Instant;

use tracing::{debug, warn};

use crate::busywork::SpinWork;
use crate::error::{Result, SynthMarkError};
use crate::result::{ResultBuilder, ResultCode, SynthMarkResult};
use crate::sink::VirtualAudioSink;
use crate::synth::VoiceRenderer;
use crate::timing::{TimingAnalyzer, TimingStatistics};
use crate::MAX_VOICES;

/// The closed set of benchmark variants, selected by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessKind {
    VoiceMark,
    LatencyMark,
    JitterMark,
    UtilizationMark,
}

impl HarnessKind {
    /// Single-character test codes, kept compatible with the classic driver.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'v' => Some(Self::VoiceMark),
            'l' => Some(Self::LatencyMark),
            'j' => Some(Self::JitterMark),
            'u' => Some(Self::UtilizationMark),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::VoiceMark => "VoiceMark",
            Self::LatencyMark => "LatencyMark",
            Self::JitterMark => "JitterMark",
            Self::UtilizationMark => "UtilizationMark",
        }
    }
}

/// Workload knobs a mark may turn between cycles.
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    /// Voices rendered per burst (subject to the note-on delay gate).
    pub num_voices: u32,
    /// When set, each cycle is padded with busy-work up to this fraction of
    /// the callback period. Used by the utilization mark.
    pub pad_to_load: Option<f64>,
}

/// Observation handed to a mark after each completed cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleInfo {
    pub index: u64,
    /// Scheduled elapsed time at cycle start, `index * period`.
    pub elapsed_seconds: f64,
    pub period_seconds: f64,
    /// Wall-clock cost of the render call alone.
    pub render_seconds: f64,
    /// Wall-clock cost of the whole burst (render plus any padding).
    pub burst_seconds: f64,
    /// Voices actually rendered this cycle; zero while note-on is delayed.
    pub active_voices: u32,
    pub overrun: bool,
}

/// Everything a mark needs to finalize its verdict.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub statistics: TimingStatistics,
    pub sample_rate: u32,
    pub frames_per_burst: u32,
    pub period_seconds: f64,
    pub requested_seconds: f64,
    pub num_cycles: u64,
    /// Voice count the workload ended the run with.
    pub final_voices: u32,
}

/// One benchmark variant's feedback algorithm.
///
/// The control loop is shared; a mark only decides how the workload reacts
/// to each cycle and what the accumulated timing means.
pub trait Measurement {
    fn name(&self) -> &'static str;

    /// Last-chance validation before the run starts. `seconds` is the
    /// requested test duration.
    fn validate(&self, _seconds: f64) -> Result<()> {
        Ok(())
    }

    /// Called once before the first cycle to seed the workload.
    fn on_begin(&mut self, _workload: &mut Workload) {}

    /// Called after every cycle; may adjust the workload for the next one.
    fn on_cycle(&mut self, cycle: &CycleInfo, workload: &mut Workload);

    /// Turn the accumulated statistics into the final verdict.
    fn build_result(&mut self, summary: &RunSummary) -> SynthMarkResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Configured,
    Running,
    Completed,
}

/// Generic control loop: owns one sink, one renderer, one analyzer and one
/// mark, and produces exactly one result per run.
///
/// State machine `Configured -> Running -> Completed`; setters are only legal
/// in `Configured`. A run that reaches its natural duration always yields a
/// result, even if every cycle overran; only a renderer failure aborts early,
/// and that still yields a result with its own code.
pub struct TestHarness<M: Measurement> {
    mark: M,
    renderer: Box<dyn VoiceRenderer>,
    sink: VirtualAudioSink,
    analyzer: TimingAnalyzer,
    num_voices: u32,
    delay_notes_on: f64,
    state: RunState,
    result: Option<SynthMarkResult>,
}

impl<M: Measurement> TestHarness<M> {
    pub fn new(mark: M, renderer: Box<dyn VoiceRenderer>) -> Self {
        Self {
            mark,
            renderer,
            sink: VirtualAudioSink::new(),
            analyzer: TimingAnalyzer::new(),
            num_voices: crate::DEFAULT_NUM_VOICES,
            delay_notes_on: 0.0,
            state: RunState::Configured,
            result: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.mark.name()
    }

    pub fn mark(&self) -> &M {
        &self.mark
    }

    /// Baseline voice count rendered each burst. Marks that adapt the
    /// workload treat this as a starting point.
    pub fn set_num_voices(&mut self, num_voices: u32) -> Result<()> {
        self.check_configurable("set_num_voices")?;
        if num_voices > MAX_VOICES {
            return Err(SynthMarkError::InvalidConfig(format!(
                "num voices {num_voices} exceeds maximum {MAX_VOICES}"
            )));
        }
        self.num_voices = num_voices;
        Ok(())
    }

    /// Keep voices silent for the first `seconds` of the run, modeling the
    /// cost of voice onset rather than only steady-state rendering.
    pub fn set_delay_notes_on(&mut self, seconds: f64) -> Result<()> {
        self.check_configurable("set_delay_notes_on")?;
        if seconds < 0.0 {
            return Err(SynthMarkError::InvalidConfig(format!(
                "note-on delay must not be negative, got {seconds}"
            )));
        }
        self.delay_notes_on = seconds;
        Ok(())
    }

    /// Forwarded to the sink; applied best-effort when the run starts.
    pub fn set_requested_cpu(&mut self, cpu: Option<usize>) -> Result<()> {
        self.check_configurable("set_requested_cpu")?;
        self.sink.set_requested_cpu(cpu);
        Ok(())
    }

    /// The result of the last completed run, if any.
    pub fn result(&self) -> Option<&SynthMarkResult> {
        self.result.as_ref()
    }

    fn check_configurable(&self, what: &str) -> Result<()> {
        if self.state != RunState::Configured {
            return Err(SynthMarkError::InvalidState(format!(
                "{what} called after run_test began"
            )));
        }
        Ok(())
    }

    /// Run the entire measurement. Synchronous and blocking: returns only
    /// after `seconds` worth of callback cycles have elapsed.
    pub fn run_test(
        &mut self,
        sample_rate: u32,
        frames_per_burst: u32,
        seconds: f64,
    ) -> Result<&SynthMarkResult> {
        if self.state != RunState::Configured {
            return Err(SynthMarkError::InvalidState(
                "run_test called more than once".into(),
            ));
        }
        if !(seconds > 0.0) {
            return Err(SynthMarkError::InvalidConfig(format!(
                "test duration must be positive, got {seconds}"
            )));
        }
        if self.delay_notes_on > seconds {
            return Err(SynthMarkError::InvalidConfig(format!(
                "note-on delay {} exceeds test duration {seconds}",
                self.delay_notes_on
            )));
        }
        self.mark.validate(seconds)?;
        self.sink.configure(sample_rate, frames_per_burst)?;
        self.renderer.prepare(sample_rate)?;
        self.state = RunState::Running;

        let period = self.sink.period_seconds();
        let num_cycles = (seconds / period).ceil() as u64;
        let mut workload = Workload {
            num_voices: self.num_voices,
            pad_to_load: None,
        };
        self.mark.on_begin(&mut workload);
        // Calibrate the spinner only when the mark actually pads.
        let spin = workload.pad_to_load.map(|_| SpinWork::calibrated());
        let mut buffer = vec![0.0f32; frames_per_burst as usize];

        debug!(
            mark = self.mark.name(),
            sample_rate,
            frames_per_burst,
            num_cycles,
            period_seconds = period,
            "starting run"
        );
        self.sink.start()?;

        for index in 0..num_cycles {
            let elapsed_seconds = index as f64 * period;
            let active_voices = if elapsed_seconds < self.delay_notes_on {
                0
            } else {
                workload.num_voices
            };

            let renderer = &mut self.renderer;
            let pad_to_load = workload.pad_to_load;
            let mut render_seconds = 0.0f64;
            let outcome = self.sink.process_next_burst(|| {
                let begin = Instant::now();
                renderer.render(active_voices, &mut buffer)?;
                render_seconds = begin.elapsed().as_secs_f64();
                if let (Some(target), Some(spin)) = (pad_to_load, spin.as_ref()) {
                    spin.consume(target * period - render_seconds);
                }
                Ok(())
            });

            let timing = match outcome {
                Ok(timing) => timing,
                Err(SynthMarkError::RenderFailed(message)) => {
                    warn!(cycle = index, "renderer failed: {message}");
                    let mut builder = ResultBuilder::new();
                    builder.line(format!("{} aborted: {message}", self.mark.name()));
                    builder.metric("cycle.count", index as f64);
                    self.state = RunState::Completed;
                    return Ok(self.result.insert(builder.build(ResultCode::RendererFailed)));
                }
                Err(other) => return Err(other),
            };

            self.analyzer.record(timing.duration_seconds, timing.overrun);
            let cycle = CycleInfo {
                index,
                elapsed_seconds,
                period_seconds: period,
                render_seconds,
                burst_seconds: timing.duration_seconds,
                active_voices,
                overrun: timing.overrun,
            };
            self.mark.on_cycle(&cycle, &mut workload);
        }

        let summary = RunSummary {
            statistics: self.analyzer.statistics(),
            sample_rate,
            frames_per_burst,
            period_seconds: period,
            requested_seconds: seconds,
            num_cycles,
            final_voices: workload.num_voices,
        };
        let result = self.mark.build_result(&summary);
        debug!(
            mark = self.mark.name(),
            code = result.result_code().value(),
            "run completed"
        );
        self.state = RunState::Completed;
        Ok(self.result.insert(result))
    }
}
