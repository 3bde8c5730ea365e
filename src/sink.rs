//! Virtual audio hardware.
//!
//! Simulates the pacing of a real driver callback: one fixed-size burst per
//! cycle, then a blocking wait until the next scheduled deadline. Deadlines
//! are anchored to the start instant plus a fixed multiple of the period --
//! never to the previous wake time -- so scheduling noise cannot compound
//! into drift, exactly like a driver's clock-derived callback timer.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, SynthMarkError};
use crate::MIN_FRAMES_PER_BURST;

/// Timing record for one completed burst.
#[derive(Debug, Clone, Copy)]
pub struct BurstTiming {
    /// Zero-based cycle index of this burst.
    pub index: u64,
    /// Offset of this cycle's deadline from stream start.
    pub deadline: Duration,
    /// Offset of the render completion from stream start.
    pub completion: Duration,
    /// Wall-clock cost of the render closure.
    pub duration_seconds: f64,
    /// True when the render finished past the deadline. The cycle still
    /// produced its burst; nothing is skipped or compensated.
    pub overrun: bool,
}

/// Simulated audio sink pulling one burst per callback period.
#[derive(Debug)]
pub struct VirtualAudioSink {
    sample_rate: u32,
    frames_per_burst: u32,
    period_seconds: f64,
    requested_cpu: Option<usize>,
    start: Option<Instant>,
    cycle: u64,
}

impl VirtualAudioSink {
    pub fn new() -> Self {
        Self {
            sample_rate: 0,
            frames_per_burst: 0,
            period_seconds: 0.0,
            requested_cpu: None,
            start: None,
            cycle: 0,
        }
    }

    /// Set the stream format and derive the nominal callback period.
    pub fn configure(&mut self, sample_rate: u32, frames_per_burst: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(SynthMarkError::InvalidConfig(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if frames_per_burst < MIN_FRAMES_PER_BURST {
            return Err(SynthMarkError::InvalidConfig(format!(
                "frames per burst must be at least {MIN_FRAMES_PER_BURST}, got {frames_per_burst}"
            )));
        }
        self.sample_rate = sample_rate;
        self.frames_per_burst = frames_per_burst;
        self.period_seconds = frames_per_burst as f64 / sample_rate as f64;
        Ok(())
    }

    /// Record a CPU affinity preference. `None` means no pinning. The pin is
    /// applied at [`start`](Self::start) as a best-effort OS request.
    pub fn set_requested_cpu(&mut self, cpu: Option<usize>) {
        self.requested_cpu = cpu;
    }

    pub fn requested_cpu(&self) -> Option<usize> {
        self.requested_cpu
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames_per_burst(&self) -> u32 {
        self.frames_per_burst
    }

    /// Nominal time budget per burst, `frames_per_burst / sample_rate`.
    pub fn period_seconds(&self) -> f64 {
        self.period_seconds
    }

    /// Anchor the deadline schedule and apply the affinity request.
    pub fn start(&mut self) -> Result<()> {
        if self.period_seconds <= 0.0 {
            return Err(SynthMarkError::InvalidState(
                "sink must be configured before starting".into(),
            ));
        }
        if let Some(cpu) = self.requested_cpu {
            if let Err(message) = pin_current_thread(cpu) {
                // Best effort only: report and keep running unpinned.
                warn!(cpu, "could not apply CPU affinity: {message}");
            } else {
                debug!(cpu, "pinned benchmark thread");
            }
        }
        self.cycle = 0;
        self.start = Some(Instant::now());
        Ok(())
    }

    /// Run one callback cycle: invoke the render closure, time it, then block
    /// until the next absolute deadline. An overrun never aborts; the burst
    /// is produced and timed regardless so the timeline stays continuous.
    pub fn process_next_burst<F>(&mut self, render: F) -> Result<BurstTiming>
    where
        F: FnOnce() -> Result<()>,
    {
        let start = self.start.ok_or_else(|| {
            SynthMarkError::InvalidState("sink must be started before processing bursts".into())
        })?;

        let index = self.cycle;
        let render_begin = Instant::now();
        render()?;
        let render_end = Instant::now();

        self.cycle += 1;
        // Absolute deadline: start + (k+1) * period, independent of when the
        // previous cycle actually woke up.
        let deadline = Duration::from_secs_f64(self.cycle as f64 * self.period_seconds);
        let completion = render_end.duration_since(start);
        let overrun = completion > deadline;
        if !overrun {
            thread::sleep(deadline - completion);
        }

        Ok(BurstTiming {
            index,
            deadline,
            completion,
            duration_seconds: render_end.duration_since(render_begin).as_secs_f64(),
            overrun,
        })
    }
}

impl Default for VirtualAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
fn pin_current_thread(cpu: usize) -> std::result::Result<(), String> {
    // SAFETY: cpu_set_t is a plain bitmask; sched_setaffinity(0, ..) only
    // affects the calling thread.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(cpu, &mut set);
        let rc = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error().to_string())
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_current_thread(_cpu: usize) -> std::result::Result<(), String> {
    Err("CPU affinity is not supported on this platform".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_derivation() {
        let mut sink = VirtualAudioSink::new();
        sink.configure(48_000, 96).unwrap();
        assert!((sink.period_seconds() - 0.002).abs() < 1e-12);

        sink.configure(44_100, 441).unwrap();
        assert!((sink.period_seconds() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_tiny_burst() {
        let mut sink = VirtualAudioSink::new();
        let err = sink.configure(48_000, 3).unwrap_err();
        assert!(matches!(err, SynthMarkError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        let mut sink = VirtualAudioSink::new();
        let err = sink.configure(0, 96).unwrap_err();
        assert!(matches!(err, SynthMarkError::InvalidConfig(_)));
    }

    #[test]
    fn test_burst_before_start_is_invalid_state() {
        let mut sink = VirtualAudioSink::new();
        sink.configure(48_000, 96).unwrap();
        let err = sink.process_next_burst(|| Ok(())).unwrap_err();
        assert!(matches!(err, SynthMarkError::InvalidState(_)));
    }

    #[test]
    fn test_deadlines_are_anchored_to_start() {
        let mut sink = VirtualAudioSink::new();
        sink.configure(48_000, 480).unwrap(); // 10 ms period
        sink.start().unwrap();
        for k in 0..5u64 {
            let timing = sink.process_next_burst(|| Ok(())).unwrap();
            assert_eq!(timing.index, k);
            // Deadline k is exactly (k+1) * period from start, never earlier.
            let expected = (k + 1) as f64 * 0.01;
            assert!((timing.deadline.as_secs_f64() - expected).abs() < 1e-12);
            assert!(!timing.overrun);
        }
    }

    #[test]
    fn test_pacing_consumes_the_full_period() {
        let mut sink = VirtualAudioSink::new();
        sink.configure(48_000, 480).unwrap(); // 10 ms period
        sink.start().unwrap();
        let begin = Instant::now();
        for _ in 0..5 {
            sink.process_next_burst(|| Ok(())).unwrap();
        }
        // Five cycles of 10 ms each must take at least 50 ms of wall time.
        assert!(begin.elapsed().as_secs_f64() >= 0.050);
    }

    #[test]
    fn test_slow_render_flags_overrun() {
        let mut sink = VirtualAudioSink::new();
        sink.configure(48_000, 192).unwrap(); // 4 ms period
        sink.start().unwrap();
        let timing = sink
            .process_next_burst(|| {
                thread::sleep(Duration::from_millis(10));
                Ok(())
            })
            .unwrap();
        assert!(timing.overrun);
        assert!(timing.duration_seconds >= 0.010);
    }
}
