use crate::design::{BandPassParams, LowPassParams};
use crate::filter::Sample;
use crate::modulator::Modulator;
use crate::receiver::AfskReceiver;
use crate::waveform;

/// Builds an AFSK1200 receiver
///
/// The builder comes with a sensible set of default options.
/// All you really need to provide is the input sampling
/// rate. The [`AfskReceiver`] was tuned at 22050 Hz and works
/// at 11025 Hz as well.
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release. If you
/// care very strongly about a setting, be sure to configure
/// it here.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct AfskReceiverBuilder {
    input_rate: u32,
    bandpass_len: u32,
    bandpass_width: u32,
    bandpass_mark_gain: f32,
    bandpass_space_gain: f32,
    lowpass_len: u32,
    lowpass_cutoff: u32,
    lowpass_width: u32,
    lowpass_boost: f32,
    squelch_threshold: Sample,
    squelch_window: f32,
    max_run: u32,
    framer_capacity: usize,
    repair: bool,
}

impl AfskReceiverBuilder {
    /// New receiver chain with "sensible" defaults
    ///
    /// The only mandatory parameter is the input sampling
    /// rate, in Hz. It should be at least a few times the
    /// 2200 Hz space tone.
    pub fn new(input_rate: u32) -> Self {
        Self {
            input_rate: u32::max(input_rate, 2 * waveform::BAUD_HZ),
            bandpass_len: 5,
            bandpass_width: 400,
            bandpass_mark_gain: 2.0,
            bandpass_space_gain: 3.0,
            lowpass_len: 5,
            lowpass_cutoff: 800,
            lowpass_width: 250,
            lowpass_boost: 3.0,
            squelch_threshold: 32,
            squelch_window: 2.0,
            max_run: crate::receiver::symsync::DEFAULT_MAX_RUN,
            framer_capacity: crate::receiver::framing::DEFAULT_CAPACITY,
            repair: false,
        }
    }

    /// Build a receiver chain
    ///
    /// Once built, the receiver chain is immediately ready to
    /// process samples. Filter designs are shared with any
    /// other receiver built with the same parameters.
    pub fn build(&self) -> AfskReceiver {
        AfskReceiver::from(self)
    }

    /// Band-pass tone filter shape
    ///
    /// The filter is `len` mark periods long, with `len` between
    /// 1 and 16. Its stopbands begin `width` Hz outside of the
    /// mark and space tones.
    pub fn with_bandpass(&mut self, len: u32, width: u32) -> &mut Self {
        self.bandpass_len = u32::clamp(len, 1, 16);
        self.bandpass_width = u32::clamp(width, 10, waveform::MARK_HZ);
        self
    }

    /// Band-pass tone filter gains
    ///
    /// Sets the passband gain at the mark and space tones. Only
    /// the ratio matters, since the filter is normalized. A
    /// higher space gain compensates for de-emphasis in FM
    /// receivers.
    pub fn with_bandpass_gain(&mut self, mark: f32, space: f32) -> &mut Self {
        self.bandpass_mark_gain = f32::clamp(mark, 0.1, 100.0);
        self.bandpass_space_gain = f32::clamp(space, 0.1, 100.0);
        self
    }

    /// Low-pass filter shape
    ///
    /// The post-correlator filter is `len` mark periods long,
    /// with `len` between 1 and 16. It passes up to `cutoff` Hz
    /// and stops above `cutoff + width` Hz.
    pub fn with_lowpass(&mut self, len: u32, cutoff: u32, width: u32) -> &mut Self {
        self.lowpass_len = u32::clamp(len, 1, 16);
        self.lowpass_cutoff = u32::clamp(cutoff, 100, waveform::SPACE_HZ);
        self.lowpass_width = u32::clamp(width, 10, waveform::SPACE_HZ);
        self
    }

    /// Low-pass filter boost
    ///
    /// Gain at the cutoff frequency relative to DC.
    pub fn with_lowpass_boost(&mut self, boost: f32) -> &mut Self {
        self.lowpass_boost = f32::clamp(boost, 0.1, 100.0);
        self
    }

    /// Power squelch threshold
    ///
    /// Samples are passed to the demodulator only while the RMS
    /// deviation of the band-passed input is at least
    /// `threshold`. The units are those of the input samples.
    /// A value of zero disables the squelch.
    pub fn with_squelch_threshold(&mut self, threshold: Sample) -> &mut Self {
        self.squelch_threshold = Sample::max(threshold, 0);
        self
    }

    /// Power squelch window (bauds)
    ///
    /// The power is measured over `bauds` baud periods.
    pub fn with_squelch_window(&mut self, bauds: f32) -> &mut Self {
        self.squelch_window = f32::clamp(bauds, 0.25, 16.0);
        self
    }

    /// Longest run of one line level (bauds)
    ///
    /// The baud sampler ignores tone changes which arrive
    /// `max_run` or more bauds after the last one. Stuffed HDLC
    /// never holds one line level for more than seven bauds.
    pub fn with_max_run(&mut self, max_run: u32) -> &mut Self {
        self.max_run = u32::clamp(max_run, 2, 64);
        self
    }

    /// Framer capacity (bytes)
    ///
    /// The longest candidate frame, including its flags. Longer
    /// candidates are lost.
    pub fn with_framer_capacity(&mut self, capacity: usize) -> &mut Self {
        self.framer_capacity = usize::clamp(capacity, 32, 65536);
        self
    }

    /// Enable or disable frame repair
    ///
    /// When enabled, frames which fail their checksum are
    /// passed to a brute-force [search](crate::repair) for one
    /// or two bad bits. This is expensive for long frames.
    pub fn with_repair(&mut self, enable: bool) -> &mut Self {
        self.repair = enable;
        self
    }

    /// Input sampling rate (Hz)
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Band-pass tone filter parameters
    pub fn bandpass(&self) -> BandPassParams {
        BandPassParams {
            sample_rate: self.input_rate,
            len_mark_periods: self.bandpass_len,
            width: self.bandpass_width,
            mark_gain: self.bandpass_mark_gain,
            space_gain: self.bandpass_space_gain,
        }
    }

    /// Low-pass filter parameters
    pub fn lowpass(&self) -> LowPassParams {
        LowPassParams {
            sample_rate: self.input_rate,
            len_mark_periods: self.lowpass_len,
            cutoff: self.lowpass_cutoff,
            width: self.lowpass_width,
            boost: self.lowpass_boost,
        }
    }

    /// Power squelch threshold
    pub fn squelch_threshold(&self) -> Sample {
        self.squelch_threshold
    }

    /// Power squelch window (bauds)
    pub fn squelch_window(&self) -> f32 {
        self.squelch_window
    }

    /// Power squelch window (samples)
    pub fn squelch_window_samples(&self) -> usize {
        let len = self.squelch_window * waveform::samples_per_baud(self.input_rate);
        usize::max(len.round() as usize, 1)
    }

    /// Longest run of one line level (bauds)
    pub fn max_run(&self) -> u32 {
        self.max_run
    }

    /// Framer capacity (bytes)
    pub fn framer_capacity(&self) -> usize {
        self.framer_capacity
    }

    /// Is frame repair enabled?
    pub fn repair(&self) -> bool {
        self.repair
    }
}

impl std::default::Default for AfskReceiverBuilder {
    fn default() -> Self {
        Self::new(22050)
    }
}

/// Builds an AFSK1200 modulator
///
/// As with the [`AfskReceiverBuilder`], the default values are
/// not part of the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModulatorBuilder {
    output_rate: u32,
    amplitude: i16,
    preamble_flags: usize,
    postamble_flags: usize,
    silence_ms: u32,
    vox: bool,
}

impl ModulatorBuilder {
    /// Number of preamble flags with the VOX lead-in
    pub const VOX_PREAMBLE_FLAGS: usize = 150;

    /// New modulator with "sensible" defaults
    ///
    /// The only mandatory parameter is the output sampling
    /// rate, in Hz.
    pub fn new(output_rate: u32) -> Self {
        Self {
            output_rate: u32::max(output_rate, 2 * waveform::BAUD_HZ),
            amplitude: i16::MAX,
            preamble_flags: 4,
            postamble_flags: 4,
            silence_ms: 10,
            vox: false,
        }
    }

    /// Build a modulator
    pub fn build(&self) -> Modulator {
        Modulator::from(self)
    }

    /// Peak output amplitude
    pub fn with_amplitude(&mut self, amplitude: i16) -> &mut Self {
        self.amplitude = i16::max(amplitude, 0);
        self
    }

    /// Number of flags sent before and after each frame
    ///
    /// These are in addition to the single opening and closing
    /// flag which every frame carries.
    pub fn with_flags(&mut self, preamble: usize, postamble: usize) -> &mut Self {
        self.preamble_flags = usize::min(preamble, 1000);
        self.postamble_flags = usize::min(postamble, 1000);
        self
    }

    /// Silence before and after each frame (ms)
    pub fn with_silence_ms(&mut self, ms: u32) -> &mut Self {
        self.silence_ms = u32::min(ms, 10000);
        self
    }

    /// Enable a long lead-in for voice-operated transmitters
    ///
    /// When enabled, at least
    /// [`VOX_PREAMBLE_FLAGS`](ModulatorBuilder::VOX_PREAMBLE_FLAGS)
    /// flags are sent before each frame.
    pub fn with_vox(&mut self, vox: bool) -> &mut Self {
        self.vox = vox;
        self
    }

    /// Output sampling rate (Hz)
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Peak output amplitude
    pub fn amplitude(&self) -> i16 {
        self.amplitude
    }

    /// Number of flags sent before each frame
    pub fn preamble_flags(&self) -> usize {
        if self.vox {
            usize::max(self.preamble_flags, Self::VOX_PREAMBLE_FLAGS)
        } else {
            self.preamble_flags
        }
    }

    /// Number of flags sent after each frame
    pub fn postamble_flags(&self) -> usize {
        self.postamble_flags
    }

    /// Silence before and after each frame (ms)
    pub fn silence_ms(&self) -> u32 {
        self.silence_ms
    }

    /// Silence before and after each frame (samples)
    pub fn silence_samples(&self) -> usize {
        (self.output_rate as u64 * self.silence_ms as u64 / 1000) as usize
    }

    /// Is the VOX lead-in enabled?
    pub fn vox(&self) -> bool {
        self.vox
    }
}

impl std::default::Default for ModulatorBuilder {
    fn default() -> Self {
        Self::new(22050)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_defaults_and_clamps() {
        let mut uut = AfskReceiverBuilder::default();
        assert_eq!(22050, uut.input_rate());
        assert_eq!(37, uut.squelch_window_samples());
        assert!(!uut.repair());

        uut.with_bandpass(100, 0)
            .with_bandpass_gain(-1.0, 1000.0)
            .with_squelch_threshold(-5)
            .with_max_run(0)
            .with_framer_capacity(1)
            .with_repair(true);

        let bp = uut.bandpass();
        assert_eq!(16, bp.len_mark_periods);
        assert_eq!(10, bp.width);
        assert_eq!(0.1, bp.mark_gain);
        assert_eq!(100.0, bp.space_gain);
        assert_eq!(0, uut.squelch_threshold());
        assert_eq!(2, uut.max_run());
        assert_eq!(32, uut.framer_capacity());
        assert!(uut.repair());

        assert_eq!(2400, AfskReceiverBuilder::new(0).input_rate());
    }

    #[test]
    fn test_modulator_defaults_and_clamps() {
        let mut uut = ModulatorBuilder::default();
        assert_eq!(220, uut.silence_samples());
        assert_eq!(4, uut.preamble_flags());

        uut.with_vox(true);
        assert_eq!(ModulatorBuilder::VOX_PREAMBLE_FLAGS, uut.preamble_flags());
        uut.with_flags(200, 2);
        assert_eq!(200, uut.preamble_flags());
        uut.with_vox(false);
        assert_eq!(200, uut.preamble_flags());
        assert_eq!(2, uut.postamble_flags());

        uut.with_amplitude(-100);
        assert_eq!(0, uut.amplitude());
    }
}
