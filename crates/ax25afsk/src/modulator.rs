//! AFSK1200 transmitter

use crate::bits::BitBuf;
use crate::builder::ModulatorBuilder;
use crate::frame::{Frame, FLAG};
use crate::nrzi::NrziEncoder;
use crate::waveform::ToneGenerator;

/// AFSK1200 modulator
///
/// Converts AX.25 frames into audio. Each transmission is laid
/// out as
///
/// ```txt
/// silence | preamble flags | FLAG frame FLAG | postamble flags | silence
/// ```
///
/// where the frame is bit-stuffed and every bit, flags included,
/// passes through the NRZI encoder before it picks a tone. The
/// preamble gives the receiver time to settle and to find bit
/// and byte sync. When the *VOX* lead-in is enabled, a much
/// longer preamble gives voice-operated transmitters time to
/// key up.
///
/// Line level and tone phase carry over from one transmission
/// to the next, so the output of successive calls may be
/// concatenated.
///
/// ```
/// use ax25afsk::{Frame, ModulatorBuilder};
///
/// let frame: Frame = "KI5TOF>APRS:>hello world".parse().unwrap();
/// let mut modulator = ModulatorBuilder::new(22050).build();
/// let audio: Vec<i16> = modulator.modulate(&frame);
/// assert!(!audio.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Modulator {
    tone: ToneGenerator,
    nrzi: NrziEncoder,
    preamble_flags: usize,
    postamble_flags: usize,
    silence_samples: usize,
}

impl Modulator {
    /// Modulate a frame
    ///
    /// Returns the complete transmission.
    pub fn modulate(&mut self, frame: &Frame) -> Vec<i16> {
        let mut out = vec![];
        self.modulate_into(frame, &mut out);
        out
    }

    /// Modulate a frame, appending to `out`
    pub fn modulate_into(&mut self, frame: &Frame, out: &mut Vec<i16>) {
        let stuffed = frame.to_afsk(1, 1);
        self.modulate_stuffed(&stuffed, out);
    }

    /// Modulate a pre-stuffed bit stream, appending to `out`
    ///
    /// The `bits` must already be stuffed and bit-reversed and
    /// should carry their own opening and closing flags, as with
    /// [`Frame::to_afsk()`]. The preamble, postamble, and silence
    /// are added here.
    pub fn modulate_stuffed(&mut self, bits: &BitBuf, out: &mut Vec<i16>) {
        self.tone.silence(self.silence_samples, out);
        for _ in 0..self.preamble_flags {
            self.send_byte(FLAG, out);
        }
        for bit in bits.iter() {
            self.send_bit(bit, out);
        }
        for _ in 0..self.postamble_flags {
            self.send_byte(FLAG, out);
        }
        self.tone.silence(self.silence_samples, out);
    }

    /// Output sampling rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.tone.sample_rate()
    }

    /// Lifetime count of samples produced
    pub fn sample_count(&self) -> u64 {
        self.tone.sample_count()
    }

    /// Reset line level, tone phase, and sample count
    pub fn reset(&mut self) {
        self.tone.reset();
        self.nrzi.reset();
    }

    // flags are symmetric, so the bit order does not matter
    fn send_byte(&mut self, byte: u8, out: &mut Vec<i16>) {
        for i in 0..8 {
            self.send_bit(byte & (0x80 >> i) != 0, out);
        }
    }

    #[inline]
    fn send_bit(&mut self, bit: bool, out: &mut Vec<i16>) {
        let level = self.nrzi.encode(bit);
        self.tone.baud(level, out);
    }
}

impl From<&ModulatorBuilder> for Modulator {
    /// Create the modulator from its Builder
    fn from(cfg: &ModulatorBuilder) -> Self {
        Self {
            tone: ToneGenerator::new(cfg.output_rate(), cfg.amplitude()),
            nrzi: NrziEncoder::new(),
            preamble_flags: cfg.preamble_flags(),
            postamble_flags: cfg.postamble_flags(),
            silence_samples: cfg.silence_samples(),
        }
    }
}
