//! Waveform parameters and tone synthesis for AFSK1200
//!
//! Bell 202 AFSK sends one bit per baud at 1200 baud. A *mark*
//! (line level 1) is a 1200 Hz tone and a *space* (line level 0)
//! is a 2200 Hz tone. The tones are phase-continuous: switching
//! from one to the other never jumps the phase of the carrier.
//!
//! The [`ToneGenerator`] is a direct digital synthesizer. It
//! walks a 1024-entry sine table with an integer phase index.
//! Neither the per-sample phase step nor the number of samples
//! per baud is a whole number, so both carry an exact remainder
//! from one step to the next:
//!
//! ```txt
//! phase step   = 1024 · f / fs     = whole + rem / fs
//! samples/baud = fs / 1200         = whole + rem / 1200
//! ```
//!
//! Carrying the remainders as integers keeps the synthesized
//! waveform free of long-run drift.

use lazy_static::lazy_static;

/// Mark frequency (Hz)
pub const MARK_HZ: u32 = 1200;

/// Space frequency (Hz)
pub const SPACE_HZ: u32 = 2200;

/// Baud rate (Hz)
pub const BAUD_HZ: u32 = 1200;

/// Correlator delay (µs)
///
/// At this delay the product of a tone with its delayed copy is
/// strongly negative for the mark tone and strongly positive for
/// the space tone.
pub const CORRELATOR_DELAY_US: u32 = 446;

/// Length of the synthesis sine table
pub const SINE_TABLE_LEN: usize = 1024;

lazy_static! {
    static ref SINE_TABLE: [i16; SINE_TABLE_LEN] = {
        let mut out = [0i16; SINE_TABLE_LEN];
        for (i, o) in out.iter_mut().enumerate() {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / SINE_TABLE_LEN as f64;
            *o = (i16::MAX as f64 * phase.sin()) as i16;
        }
        out
    };
}

/// Baud period at the given sampling frequency, in fractional samples
pub fn samples_per_baud(fs: u32) -> f32 {
    fs as f32 / BAUD_HZ as f32
}

/// Correlator delay at the given sampling frequency, in samples
pub fn correlator_delay(fs: u32) -> usize {
    (CORRELATOR_DELAY_US as f64 * fs as f64 / 1.0e6).round() as usize
}

/// Phase-continuous mark/space tone generator
///
/// Each call to [`baud()`](#method.baud) appends one baud period
/// of either the mark tone or the space tone. Both tones share
/// one phase accumulator.
#[derive(Clone, Debug)]
pub struct ToneGenerator {
    sample_rate: u32,
    amplitude: i16,
    mark_step: PhaseStep,
    space_step: PhaseStep,
    phase: usize,
    phase_residue: u32,
    baud_whole: u32,
    baud_rem: u32,
    baud_residue: u32,
    sample_count: u64,
}

impl ToneGenerator {
    /// New generator
    ///
    /// The output peaks at ±`amplitude`.
    pub fn new(sample_rate: u32, amplitude: i16) -> Self {
        let sample_rate = u32::max(sample_rate, 1);
        Self {
            sample_rate,
            amplitude,
            mark_step: PhaseStep::new(MARK_HZ, sample_rate),
            space_step: PhaseStep::new(SPACE_HZ, sample_rate),
            phase: 0,
            phase_residue: 0,
            baud_whole: sample_rate / BAUD_HZ,
            baud_rem: sample_rate % BAUD_HZ,
            baud_residue: 0,
            sample_count: 0,
        }
    }

    /// Reset to zero phase and zero sample count
    pub fn reset(&mut self) {
        self.phase = 0;
        self.phase_residue = 0;
        self.baud_residue = 0;
        self.sample_count = 0;
    }

    /// Output sampling rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Lifetime count of samples produced
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Synthesize one baud
    ///
    /// Appends one baud period of the mark tone if `level` is
    /// set, or the space tone otherwise.
    pub fn baud(&mut self, level: bool, out: &mut Vec<i16>) {
        let mut len = self.baud_whole;
        self.baud_residue += self.baud_rem;
        if self.baud_residue >= BAUD_HZ {
            self.baud_residue -= BAUD_HZ;
            len += 1;
        }

        let step = if level {
            self.mark_step
        } else {
            self.space_step
        };

        out.reserve(len as usize);
        for _ in 0..len {
            self.phase += step.whole;
            self.phase_residue += step.rem;
            if self.phase_residue >= self.sample_rate {
                self.phase_residue -= self.sample_rate;
                self.phase += 1;
            }
            self.phase %= SINE_TABLE_LEN;
            out.push(self.scaled(SINE_TABLE[self.phase]));
        }
        self.sample_count += len as u64;
    }

    /// Append `count` samples of silence
    ///
    /// The tone phase is left alone.
    pub fn silence(&mut self, count: usize, out: &mut Vec<i16>) {
        out.extend(std::iter::repeat(0i16).take(count));
        self.sample_count += count as u64;
    }

    #[inline]
    fn scaled(&self, sa: i16) -> i16 {
        (sa as i32 * self.amplitude as i32 / i16::MAX as i32) as i16
    }
}

// Per-sample phase increment, in table entries
//
// The true increment is `whole + rem / fs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PhaseStep {
    whole: usize,
    rem: u32,
}

impl PhaseStep {
    fn new(freq: u32, sample_rate: u32) -> Self {
        let num = SINE_TABLE_LEN as u64 * freq as u64;
        Self {
            whole: (num / sample_rate as u64) as usize,
            rem: (num % sample_rate as u64) as u32,
        }
    }
}
