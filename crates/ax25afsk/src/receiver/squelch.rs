//! Power squelch

use crate::filter::{Sample, Window};

/// Power squelch gate
///
/// Tracks the RMS deviation of the input over a short window
/// with a [`PowerMeter`]. Samples are passed only while that
/// power is at or above the `threshold`. Samples which fail the
/// gate go no further down the receive chain.
#[derive(Clone, Debug)]
pub struct PowerSquelch {
    meter: PowerMeter,
    threshold: Sample,
}

impl PowerSquelch {
    /// New squelch gate
    ///
    /// The power is measured over `window` samples. A
    /// `threshold` of zero passes every sample.
    pub fn new(window: usize, threshold: Sample) -> Self {
        Self {
            meter: PowerMeter::new(window),
            threshold,
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.meter.reset();
    }

    /// Most recent power measurement
    pub fn power(&self) -> Sample {
        self.meter.power()
    }

    /// Gate one sample
    ///
    /// Returns the `input` if the squelch is open.
    #[inline]
    pub fn input(&mut self, input: Sample) -> Option<Sample> {
        if self.meter.input(input) >= self.threshold {
            Some(input)
        } else {
            None
        }
    }
}

/// Windowed RMS deviation
///
/// Reports `sqrt(Σ (x - mean)² / N)` over the last `N` samples.
/// Running sums of the window and of its squares are kept, in
/// the manner of a moving average, so each sample costs the
/// same regardless of `N`.
#[derive(Clone, Debug)]
pub struct PowerMeter {
    window: Window<Sample>,
    sum: i128,
    sum_sq: i128,
    power: Sample,
}

impl PowerMeter {
    /// New power meter over `len > 0` samples
    pub fn new(len: usize) -> Self {
        Self {
            window: Window::new(usize::max(len, 1)),
            sum: 0,
            sum_sq: 0,
            power: 0,
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.window.reset();
        self.sum = 0;
        self.sum_sq = 0;
        self.power = 0;
    }

    /// Most recent power measurement
    pub fn power(&self) -> Sample {
        self.power
    }

    /// Measure, including `input`
    #[inline]
    pub fn input(&mut self, input: Sample) -> Sample {
        let aged = self.window.shift(input) as i128;
        let input = input as i128;
        self.sum += input - aged;
        self.sum_sq += input * input - aged * aged;

        let n = self.window.len() as f64;
        let mean = self.sum as f64 / n;
        let var = self.sum_sq as f64 / n - mean * mean;
        self.power = f64::max(var, 0.0).sqrt() as Sample;
        self.power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_meter() {
        let mut uut = PowerMeter::new(4);
        assert_eq!(0, uut.input(0));

        // a constant has no deviation
        for _ in 0..4 {
            uut.input(1000);
        }
        assert_eq!(0, uut.power());

        // ±100 square wave
        for i in 0..8 {
            uut.input(if i % 2 == 0 { 100 } else { -100 });
        }
        assert_eq!(100, uut.power());

        uut.reset();
        assert_eq!(0, uut.power());
        assert_eq!(0, uut.input(0));
    }

    #[test]
    fn test_squelch_gate() {
        let mut uut = PowerSquelch::new(4, 50);
        for _ in 0..100 {
            assert_eq!(None, uut.input(0));
        }

        let mut passed = 0;
        for i in 0..16 {
            if uut.input(if i % 2 == 0 { 200 } else { -200 }).is_some() {
                passed += 1;
            }
        }
        assert!(passed >= 14);

        // closes again on silence
        for _ in 0..4 {
            uut.input(0);
        }
        assert_eq!(None, uut.input(0));
    }

    #[test]
    fn test_squelch_disabled() {
        let mut uut = PowerSquelch::new(4, 0);
        assert_eq!(Some(0), uut.input(0));
    }
}
