// Purpose: the rendering workload the benchmark charges against the clock.
// The harness only cares about the contract; the synthesis algorithm itself
// is an opaque per-burst cost generator.

pub mod voice;

use crate::error::{Result, SynthMarkError};
use crate::MAX_VOICES;

use self::voice::SawVoice;

/// Per-burst renderer mixing N voices into a sample buffer.
///
/// The harness measures the wall-clock cost of each `render` call; the
/// renderer must never block unboundedly and must accept zero voices
/// (silence) as valid input.
pub trait VoiceRenderer {
    /// Called once at run start, before the first burst.
    fn prepare(&mut self, sample_rate: u32) -> Result<()>;

    /// Mix `num_voices` voices into `out`, overwriting its contents.
    fn render(&mut self, num_voices: u32, out: &mut [f32]) -> Result<()>;
}

/// Keep the mix well below clipping even at high voice counts.
const VOICE_GAIN: f32 = 1.0 / 64.0;

/// Default workload: detuned sawtooth voices through a one-pole low-pass.
///
/// Cost scales linearly with the voice count, which is what the capacity
/// search needs from its workload knob.
pub struct Synthesizer {
    sample_rate: u32,
    voices: Vec<SawVoice>,
}

impl Synthesizer {
    pub fn new() -> Self {
        Self {
            sample_rate: 0,
            voices: Vec::new(),
        }
    }

    fn grow_to(&mut self, num_voices: usize) {
        while self.voices.len() < num_voices {
            let index = self.voices.len();
            // Spread pitches over three octaves so voices do not phase-lock.
            let note = 40 + (index % 36) as u8;
            self.voices
                .push(SawVoice::new(self.sample_rate as f32, note));
        }
    }
}

impl VoiceRenderer for Synthesizer {
    fn prepare(&mut self, sample_rate: u32) -> Result<()> {
        self.sample_rate = sample_rate;
        self.voices.clear();
        Ok(())
    }

    fn render(&mut self, num_voices: u32, out: &mut [f32]) -> Result<()> {
        if num_voices > MAX_VOICES {
            return Err(SynthMarkError::RenderFailed(format!(
                "voice count {num_voices} exceeds maximum {MAX_VOICES}"
            )));
        }
        if self.sample_rate == 0 {
            return Err(SynthMarkError::RenderFailed(
                "renderer used before prepare".into(),
            ));
        }
        self.grow_to(num_voices as usize);

        out.fill(0.0);
        for voice in &mut self.voices[..num_voices as usize] {
            voice.render_add(out, VOICE_GAIN);
        }
        Ok(())
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}
