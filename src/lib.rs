pub mod busywork; // Calibrated CPU-bound padding for utilization tests
pub mod error;
pub mod harness; // Benchmark control loop and the four marks
pub mod result;
pub mod sink; // Virtual audio hardware pacing
pub mod synth; // Voice rendering workload
pub mod timing;

/// Typical sample rate for the simulated audio stream.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
/// 96 frames at 48 kHz gives a 2 ms callback period.
pub const DEFAULT_FRAMES_PER_BURST: u32 = 96;
pub const DEFAULT_TARGET_CPU_LOAD: f64 = 0.5;
pub const DEFAULT_NUM_VOICES: u32 = 8;
pub const DEFAULT_SECONDS: f64 = 10.0;

/// Upper bound on the voice-count workload knob.
pub const MAX_VOICES: u32 = 512;
/// The virtual hardware refuses bursts smaller than this.
pub const MIN_FRAMES_PER_BURST: u32 = 4;
