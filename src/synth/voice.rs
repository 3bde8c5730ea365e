//! One benchmark voice: detuned sawtooth into a one-pole low-pass.
//!
//! Deliberately simple but not free: each sample costs an oscillator step
//! plus a filter step, so per-voice cost is stable across bursts and the
//! total render cost tracks the voice count linearly.

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

pub struct SawVoice {
    phase: f32,
    phase_increment: f32,
    filter_coefficient: f32,
    filter_state: f32,
}

impl SawVoice {
    pub fn new(sample_rate: f32, note: u8) -> Self {
        let frequency = midi_note_to_freq(note);
        // One-pole low-pass tracking two octaves above the fundamental.
        let cutoff = (frequency * 4.0).min(sample_rate * 0.45);
        let filter_coefficient =
            1.0 - (-2.0 * std::f32::consts::PI * cutoff / sample_rate).exp();
        Self {
            phase: 0.0,
            phase_increment: frequency / sample_rate,
            filter_coefficient,
            filter_state: 0.0,
        }
    }

    /// Render one burst and mix it into `out` at the given gain.
    pub fn render_add(&mut self, out: &mut [f32], gain: f32) {
        for sample in out.iter_mut() {
            // Naive sawtooth in [-1, 1). Aliasing is irrelevant here; the
            // benchmark charges cycles, it does not ship audio.
            let saw = 2.0 * self.phase - 1.0;
            self.phase += self.phase_increment;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
            self.filter_state += self.filter_coefficient * (saw - self.filter_state);
            *sample += self.filter_state * gain;
        }
    }
}
