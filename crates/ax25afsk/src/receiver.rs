//! Full receiver chain

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;

use crate::bits::BitBuf;
use crate::builder::AfskReceiverBuilder;
use crate::filter::{FirFilter, Sample};
use crate::frame::{self, Frame, FrameDecodeErr};
use crate::nrzi::NrziDecoder;
use crate::repair;
use crate::waveform;

pub mod correlator;
pub mod framing;
pub mod squelch;
pub mod symsync;

mod output;

pub use output::{FrameOut, ReceiverStats};

use correlator::Correlator;
use framing::Framer;
use squelch::PowerSquelch;
use symsync::BaudSampler;

/// A complete AFSK1200 AX.25 receiver chain
///
/// The receive chain takes integer audio samples and performs
/// the following operations:
///
/// 1. Band-pass filtering around the mark and space tones
/// 2. Power squelch. Quiet samples stop here.
/// 3. Delay-and-multiply tone correlation, which turns the
///    tones into a baseband NRZ signal
/// 4. Low-pass filtering of the baseband
/// 5. Clock recovery from zero crossings
/// 6. NRZI decoding and HDLC flag framing
/// 7. Unstuffing and AX.25 decoding, with optional repair of
///    frames that fail their checksum
///
/// All arithmetic through the framer is integer.
///
/// To create the receiver, first create its Builder:
///
/// ```
/// use ax25afsk::AfskReceiverBuilder;
///
/// let mut builder = AfskReceiverBuilder::default();
/// let receiver = builder.build();
/// assert_eq!(receiver.input_rate(), 22050);
/// ```
///
/// See [module documentation](index.html) for details.
#[derive(Clone, Debug)]
pub struct AfskReceiver {
    bandpass: FirFilter,
    squelch: PowerSquelch,
    correlator: Correlator,
    lowpass: FirFilter,
    sampler: BaudSampler,
    nrzi: NrziDecoder,
    framer: Framer,
    repair: bool,
    input_rate: u32,
    input_sample_counter: u64,
    stats: ReceiverStats,
}

impl AfskReceiver {
    /// Receive AX.25 frames from a source of audio
    ///
    /// Bind an iterator which will consume the `input` and
    /// produce [`FrameOut`] events for every decoded frame or
    /// checksum failure.
    ///
    /// The `input` must be PCM mono audio at the
    /// [`input_rate()`](#method.input_rate) for this receiver.
    /// Any integer type which converts losslessly into `i64`
    /// will do, including the `i16` samples that sound cards
    /// commonly produce. The input may be delivered in chunks of
    /// any size: the receiver keeps its state between calls.
    ///
    /// The iterator will consume as many samples of `input`
    /// that are required to produce the next event. It will
    /// return `None` if the input is exhausted and there
    /// are no new events.
    #[must_use = "iterators are lazy and do nothing unless consumed"]
    pub fn iter<'rx, I, T, S>(&'rx mut self, input: I) -> SourceIter<'rx, T>
    where
        I: IntoIterator<Item = S> + IntoIterator<IntoIter = T>,
        T: Iterator<Item = S>,
        S: Into<Sample>,
    {
        SourceIter {
            source: input.into_iter(),
            receiver: self,
        }
    }

    /// Input sampling rate
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Lifetime total input sample counter
    ///
    /// Reports the lifetime total of input samples which
    /// have been processed. When read after an event, this is
    /// the time of that event.
    pub fn input_sample_counter(&self) -> u64 {
        self.input_sample_counter
    }

    /// Receiver statistics
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Is frame repair enabled?
    pub fn repair_enabled(&self) -> bool {
        self.repair
    }

    /// Clear all DSP states and reset to zero initial conditions
    ///
    /// All buffers, states, and statistics are cleared.
    pub fn reset(&mut self) {
        self.bandpass.reset();
        self.squelch.reset();
        self.correlator.reset();
        self.lowpass.reset();
        self.sampler.reset();
        self.nrzi.reset();
        self.framer.reset();
        self.input_sample_counter = 0;
        self.stats = ReceiverStats::default();
    }

    /// Flush the DSP buffers and emit any leftover frames
    ///
    /// The filters impose delay on the input. When processing
    /// recorded audio that has been "close cut" to the extents
    /// of a transmission, the last frame may still be in the
    /// pipeline. This method feeds half a second of zeros to
    /// push it out. Returns the last frame decoded, if any.
    ///
    /// Once the squelch closes, zeros advance nothing past it,
    /// so this cannot invent bits that were never received.
    pub fn flush(&mut self) -> Option<Frame> {
        let zeros = std::iter::repeat(0 as Sample).take(self.input_rate as usize / 2);
        let mut out = None;
        for evt in self.iter(zeros) {
            if let Some(frame) = evt.into_frame() {
                out = Some(frame);
            }
        }
        out
    }

    // Process one input sample
    //
    // Returns an event when a candidate frame ends at this
    // sample and decodes well enough to report.
    #[inline]
    fn process(&mut self, input: Sample) -> Option<FrameOut> {
        self.input_sample_counter = self.input_sample_counter.wrapping_add(1);
        self.stats.samples += 1;

        // 1. band-pass and power squelch
        let sa = self.bandpass.input(input);
        let sa = self.squelch.input(sa)?;
        self.stats.samples_passed += 1;

        // 2. demodulate to baseband
        let sa = self.correlator.input(sa);
        let sa = self.lowpass.input(sa);

        // 3. clock recovery
        let level = self.sampler.input(sa)?;
        self.stats.bits += 1;

        // 4. framing
        let bit = self.nrzi.decode(level);
        let candidate = self.framer.input(bit)?;
        self.stats.candidates += 1;

        self.decode(&candidate)
    }

    // Decode a candidate frame from the framer
    fn decode(&mut self, candidate: &BitBuf) -> Option<FrameOut> {
        let wire = frame::prepare_received(candidate);
        match Frame::from_wire(&wire) {
            Ok(frame) => {
                self.stats.frames_ok += 1;
                Some(FrameOut::Ready(Ok(frame)))
            }
            Err(err @ FrameDecodeErr::CrcMismatch { .. }) => {
                self.stats.crc_failures += 1;
                // don't search frames whose addresses are garbage
                if self.repair && frame::addresses_plausible(&wire) {
                    if let Some(fixed) = repair::repair(&wire) {
                        self.stats.repaired += 1;
                        return Some(FrameOut::Repaired(fixed));
                    }
                }
                Some(FrameOut::Ready(Err(err)))
            }
            Err(err) => {
                self.stats.other_failures += 1;
                debug!(
                    "receiver [{:<14}]: dropped {}-byte candidate: {}",
                    self.input_sample_counter,
                    wire.len(),
                    err
                );
                None
            }
        }
    }
}

impl From<&AfskReceiverBuilder> for AfskReceiver {
    /// Create the AFSK Receiver from its Builder
    fn from(cfg: &AfskReceiverBuilder) -> Self {
        let input_rate = cfg.input_rate();

        Self {
            bandpass: FirFilter::new(cfg.bandpass().design()),
            squelch: PowerSquelch::new(cfg.squelch_window_samples(), cfg.squelch_threshold()),
            correlator: Correlator::new(waveform::correlator_delay(input_rate)),
            lowpass: FirFilter::new(cfg.lowpass().design()),
            sampler: BaudSampler::new(input_rate, waveform::BAUD_HZ, cfg.max_run()),
            nrzi: NrziDecoder::new(),
            framer: Framer::new(cfg.framer_capacity()),
            repair: cfg.repair(),
            input_rate,
            input_sample_counter: 0,
            stats: ReceiverStats::default(),
        }
    }
}

/// Sample source iterator
///
/// This iterator is bound to a source of mono integer PCM
/// audio samples. Calling the `next()` method will
/// return the next [`FrameOut`] event from the
/// [`AfskReceiver`] or `None` if the available samples have
/// been consumed without any new events.
#[derive(Debug)]
pub struct SourceIter<'rx, I>
where
    I: Iterator,
{
    source: I,
    receiver: &'rx mut AfskReceiver,
}

impl<'rx, I> Iterator for SourceIter<'rx, I>
where
    I: Iterator,
    I::Item: Into<Sample>,
{
    type Item = FrameOut;

    fn next(&mut self) -> Option<Self::Item> {
        for sa in &mut self.source {
            if let Some(out) = self.receiver.process(sa.into()) {
                info!(
                    "receiver [{:<14}]: {}",
                    self.receiver.input_sample_counter(),
                    out
                );
                return Some(out);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bits;
    use crate::builder::ModulatorBuilder;

    const TEST_FRAME: &str = "KI5TOF>APRS:>hello world";

    fn modulate(frames: &[Frame], rate: u32) -> Vec<i16> {
        let mut modulator = ModulatorBuilder::new(rate).build();
        let mut out = vec![];
        for frame in frames {
            modulator.modulate_into(frame, &mut out);
        }
        out
    }

    fn receive(rx: &mut AfskReceiver, audio: &[i16]) -> Vec<FrameOut> {
        rx.iter(audio.iter().copied()).collect()
    }

    #[test]
    fn test_end_to_end() {
        let frame: Frame = TEST_FRAME.parse().expect("bad frame");
        let audio = modulate(&[frame.clone()], 22050);

        let mut rx = AfskReceiverBuilder::new(22050).build();
        let out = receive(&mut rx, &audio);
        println!("{}", rx.stats());

        assert_eq!(1, out.len());
        let rxframe = out[0].frame().expect("expected frame");
        assert_eq!(b">hello world", rxframe.info());
        assert_eq!(b"KI5TOF", rxframe.src().call());
        assert_eq!(&frame, rxframe);

        assert_eq!(1, rx.stats().frames_ok);
        assert_eq!(0, rx.stats().crc_failures);
        assert_eq!(audio.len() as u64, rx.input_sample_counter());
    }

    #[test]
    fn test_many_frames_in_chunks() {
        let frames: Vec<Frame> = [
            "KI5TOF>APRS:>hello world",
            "N0CALL-9>APDW16,WIDE1-1,WIDE2-1:!4903.50N/07201.75W-Test 001234",
            "W1AW>BEACON:~~~~}}}}||||",
            "AB1CD-15>APRS,K1ABC-1,K2ABC-2,K3ABC-3,K4ABC-4,K5ABC-5,K6ABC-6,K7ABC-7,K8ABC-8:",
        ]
        .iter()
        .map(|s| s.parse().expect("bad frame"))
        .collect();
        let audio = modulate(&frames, 22050);

        // chunk boundaries do not matter
        let mut rx = AfskReceiverBuilder::new(22050).build();
        let mut out = vec![];
        for chunk in audio.chunks(1000) {
            out.extend(receive(&mut rx, chunk).into_iter().filter_map(|e| e.into_frame()));
        }
        assert_eq!(frames, out);
        assert_eq!(None, rx.flush());
    }

    #[test]
    fn test_low_rate() {
        let frame: Frame = TEST_FRAME.parse().expect("bad frame");
        let audio = modulate(&[frame.clone()], 11025);

        let mut rx = AfskReceiverBuilder::new(11025).build();
        let out: Vec<Frame> = receive(&mut rx, &audio)
            .into_iter()
            .filter_map(|e| e.into_frame())
            .collect();
        assert_eq!(vec![frame], out);
    }

    #[test]
    fn test_quiet_input() {
        let frame: Frame = TEST_FRAME.parse().expect("bad frame");
        let mut modulator = ModulatorBuilder::new(22050).with_amplitude(2000).build();
        let audio = modulator.modulate(&frame);

        let mut rx = AfskReceiverBuilder::new(22050).build();
        let out = receive(&mut rx, &audio);
        assert_eq!(Some(&frame), out.first().and_then(|e| e.frame()));
    }

    #[test]
    fn test_silence() {
        let mut rx = AfskReceiverBuilder::new(22050).build();
        let out = receive(&mut rx, &vec![0i16; 22050]);
        assert!(out.is_empty());
        assert_eq!(22050, rx.stats().samples);
        assert_eq!(0, rx.stats().samples_passed);
        assert_eq!(0, rx.stats().bits);
        assert_eq!(0, rx.stats().candidates);
    }

    // modulate a frame whose FCS will not check
    fn corrupted_audio(frame: &Frame, bit: usize) -> Vec<i16> {
        let mut wire = frame.to_wire(1, 1);
        bits::flip_bit(&mut wire, bit);
        bits::reverse_bytes(&mut wire);
        let len = wire.len() * 8;
        let (stuffed, _) = bits::stuff(&BitBuf::from_bytes(&wire, len), 8, len - 8);

        let mut out = vec![];
        ModulatorBuilder::new(22050)
            .build()
            .modulate_stuffed(&stuffed, &mut out);
        out
    }

    #[test]
    fn test_crc_failure_and_repair() {
        let frame: Frame = TEST_FRAME.parse().expect("bad frame");
        let audio = corrupted_audio(&frame, 150);

        // without repair
        let mut rx = AfskReceiverBuilder::new(22050).build();
        assert!(!rx.repair_enabled());
        let out = receive(&mut rx, &audio);
        assert_eq!(1, out.len());
        assert!(matches!(
            out[0].error(),
            Some(FrameDecodeErr::CrcMismatch { .. })
        ));
        assert_eq!(1, rx.stats().crc_failures);
        assert_eq!(0, rx.stats().frames_ok);

        // with repair
        let mut rx = AfskReceiverBuilder::new(22050).with_repair(true).build();
        let out = receive(&mut rx, &audio);
        assert_eq!(1, out.len());
        match &out[0] {
            FrameOut::Repaired(fixed) => {
                assert_eq!(&frame, fixed.frame());
                assert_eq!((150, 150), fixed.flipped());
            }
            evt => panic!("unexpected event {:?}", evt),
        }
        assert_eq!(1, rx.stats().repaired);
    }

    #[test]
    fn test_repair_skips_implausible() {
        let frame: Frame = TEST_FRAME.parse().expect("bad frame");

        // lowercase the first letter of the source callsign. One
        // flip would fix this, but the addresses are not searched.
        let audio = corrupted_audio(&frame, 8 * 8 + 1);

        let mut rx = AfskReceiverBuilder::new(22050).with_repair(true).build();
        let out = receive(&mut rx, &audio);
        assert_eq!(1, out.len());
        assert!(matches!(
            out[0].error(),
            Some(FrameDecodeErr::CrcMismatch { .. })
        ));
        assert_eq!(1, rx.stats().crc_failures);
        assert_eq!(0, rx.stats().repaired);
    }

    #[test]
    fn test_reset() {
        let frame: Frame = TEST_FRAME.parse().expect("bad frame");
        let audio = modulate(&[frame.clone()], 22050);

        let mut rx = AfskReceiverBuilder::new(22050).build();
        let first = receive(&mut rx, &audio[0..audio.len() / 2]);
        assert!(first.is_empty());

        // a reset discards the half-received frame
        rx.reset();
        assert_eq!(0, rx.input_sample_counter());
        assert_eq!(&ReceiverStats::default(), rx.stats());

        let out = receive(&mut rx, &audio);
        assert_eq!(Some(frame), out.into_iter().find_map(|e| e.into_frame()));
    }
}
