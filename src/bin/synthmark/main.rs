//! synthmark - benchmark an audio-processing pipeline under a simulated
//! periodic callback schedule.
//!
//! Run with: cargo run --release -- --test voice

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{bail, Result as EyreResult};
use tracing_subscriber::EnvFilter;

use synthmark::harness::{
    HarnessKind, JitterMark, LatencyMark, Measurement, TestHarness, UtilizationMark, VoiceMark,
};
use synthmark::synth::Synthesizer;
use synthmark::{
    DEFAULT_FRAMES_PER_BURST, DEFAULT_NUM_VOICES, DEFAULT_SAMPLE_RATE, DEFAULT_SECONDS,
    MAX_VOICES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TestKind {
    #[value(alias = "v")]
    Voice,
    #[value(alias = "l")]
    Latency,
    #[value(alias = "j")]
    Jitter,
    #[value(alias = "u")]
    Utilization,
}

impl From<TestKind> for HarnessKind {
    fn from(kind: TestKind) -> Self {
        match kind {
            TestKind::Voice => HarnessKind::VoiceMark,
            TestKind::Latency => HarnessKind::LatencyMark,
            TestKind::Jitter => HarnessKind::JitterMark,
            TestKind::Utilization => HarnessKind::UtilizationMark,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "synthmark", version, about = "Real-time audio benchmark")]
struct Cli {
    /// Which benchmark to run
    #[arg(short, long, value_enum, default_value_t = TestKind::Voice)]
    test: TestKind,

    /// Number of voices to render (initial count for the voice test)
    #[arg(short, long, default_value_t = DEFAULT_NUM_VOICES)]
    num_voices: u32,

    /// High voice count for load toggling, latency test only
    #[arg(short = 'N', long)]
    num_voices_high: Option<u32>,

    /// Seconds to delay the first note-on
    #[arg(short = 'd', long, default_value_t = 0.0)]
    note_on_delay: f64,

    /// Target CPU load in percent
    #[arg(short, long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=100))]
    percent_cpu: u32,

    /// Sample rate in Hz, should be typical: 44100, 48000, etc.
    #[arg(short = 'r', long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Seconds to run the test
    #[arg(short, long, default_value_t = DEFAULT_SECONDS)]
    seconds: f64,

    /// Frames read by the virtual hardware at one time
    #[arg(short, long, default_value_t = DEFAULT_FRAMES_PER_BURST)]
    burst_size: u32,

    /// Index of the CPU to pin the benchmark thread to
    #[arg(short, long)]
    cpu_affinity: Option<usize>,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.num_voices > MAX_VOICES {
        bail!("invalid num voices = {} (maximum {MAX_VOICES})", cli.num_voices);
    }
    let kind = HarnessKind::from(cli.test);
    if cli.num_voices_high.is_some() && kind != HarnessKind::LatencyMark {
        bail!("--num-voices-high is only supported by the latency test");
    }
    if cli.note_on_delay < 0.0 || cli.note_on_delay > cli.seconds {
        bail!("invalid note-on delay = {}", cli.note_on_delay);
    }

    println!("--- SynthMark {} ---", env!("CARGO_PKG_VERSION"));
    let target_load = cli.percent_cpu as f64 * 0.01;

    let code = match kind {
        HarnessKind::VoiceMark => run(VoiceMark::new(target_load, cli.num_voices)?, &cli)?,
        HarnessKind::LatencyMark => {
            let high = cli
                .num_voices_high
                .unwrap_or((cli.num_voices * 2).clamp(1, MAX_VOICES));
            run(LatencyMark::new(cli.num_voices, high)?, &cli)?
        }
        HarnessKind::JitterMark => run(JitterMark::new(), &cli)?,
        HarnessKind::UtilizationMark => run(UtilizationMark::new(target_load)?, &cli)?,
    };
    std::process::exit(code);
}

fn run<M: Measurement>(mark: M, cli: &Cli) -> EyreResult<i32> {
    let mut harness = TestHarness::new(mark, Box::new(Synthesizer::new()));
    harness.set_num_voices(cli.num_voices)?;
    harness.set_delay_notes_on(cli.note_on_delay)?;
    harness.set_requested_cpu(cli.cpu_affinity)?;

    println!("  test name      = {}", harness.name());
    println!("  numVoices      = {:6}", cli.num_voices);
    if let Some(high) = cli.num_voices_high {
        println!("  numVoicesHigh  = {high:6}");
    }
    println!("  noteOnDelay    = {:6.1}", cli.note_on_delay);
    println!("  targetCpu%     = {:6}", cli.percent_cpu);
    println!("  sampleRate     = {:6}", cli.sample_rate);
    println!("  framesPerBurst = {:6}", cli.burst_size);
    println!(
        "  msecPerBurst   = {:6.2}",
        cli.burst_size as f64 * 1000.0 / cli.sample_rate as f64
    );
    if let Some(cpu) = cli.cpu_affinity {
        println!("  cpuAffinity    = {cpu:6}");
    }
    println!(
        "--- wait at least {:.0} seconds for benchmark to complete ---",
        cli.seconds
    );

    let result = harness.run_test(cli.sample_rate, cli.burst_size, cli.seconds)?;

    println!("RESULTS BEGIN");
    print!("{}", result.result_message());
    println!("RESULTS END");
    println!("Benchmark complete.");
    Ok(result.result_code().value())
}
