//! Delay-and-multiply tone discriminator
//!
//! The correlator multiplies each sample by the sample from
//! `delay` samples ago. For a pure tone of period `T`, the
//! product averages to `cos(2π · delay / T)`:
//!
//! ```txt
//!   tone      delay/T   cos      product
//!   1200 Hz   ≈ 0.54    ≈ -0.96  strongly negative (mark)
//!   2200 Hz   ≈ 0.98    ≈ +0.99  strongly positive (space)
//! ```
//!
//! with a delay of 446 µs. A low-pass filter removes the double
//! frequency terms and leaves a baseband NRZ signal whose sign
//! is the tone.

use crate::filter::{Sample, Window};

/// Delay-and-multiply correlator
#[derive(Clone, Debug)]
pub struct Correlator {
    delay: Window<Sample>,
}

impl Correlator {
    /// New correlator with a delay of `delay` samples
    pub fn new(delay: usize) -> Self {
        Self {
            delay: Window::new(usize::max(delay, 1)),
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.delay.reset();
    }

    /// Delay, in samples
    pub fn delay(&self) -> usize {
        self.delay.len()
    }

    /// Correlate one sample
    ///
    /// Returns `input[t] · input[t - delay]`, saturated to the
    /// range of [`Sample`].
    #[inline]
    pub fn input(&mut self, input: Sample) -> Sample {
        let delayed = self.delay.shift(input);
        let prod = input as i128 * delayed as i128;
        prod.clamp(Sample::MIN as i128, Sample::MAX as i128) as Sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::waveform::{correlator_delay, ToneGenerator};

    fn mean_output(level: bool) -> f64 {
        let mut tone = ToneGenerator::new(22050, 10000);
        let mut sig = vec![];
        for _ in 0..100 {
            tone.baud(level, &mut sig);
        }

        let mut uut = Correlator::new(correlator_delay(22050));
        let out: Vec<Sample> = sig.iter().map(|&sa| uut.input(sa as Sample)).collect();

        // skip the fill-in of the delay line
        let out = &out[uut.delay()..];
        out.iter().map(|&sa| sa as f64).sum::<f64>() / out.len() as f64
    }

    #[test]
    fn test_delay_line() {
        let mut uut = Correlator::new(2);
        assert_eq!(0, uut.input(3));
        assert_eq!(0, uut.input(4));
        assert_eq!(15, uut.input(5));
        assert_eq!(-24, uut.input(-6));

        uut.reset();
        assert_eq!(0, uut.input(3));
    }

    #[test]
    fn test_saturates() {
        let mut uut = Correlator::new(1);
        uut.input(Sample::MAX);
        assert_eq!(Sample::MAX, uut.input(Sample::MAX));
        assert_eq!(Sample::MIN, uut.input(Sample::MIN));
    }

    #[test]
    fn test_tone_sign() {
        // half of amplitude² · cos(...)
        let mark = mean_output(true);
        let space = mean_output(false);
        assert!(mark < -0.4 * 10000.0 * 10000.0, "mark {}", mark);
        assert!(space > 0.4 * 10000.0 * 10000.0, "space {}", space);
    }
}
