//! Zero-crossing baud sampler
//!
//! AFSK1200 packet uses NRZI: the tone changes for a zero and
//! holds for a one. A long run of ones therefore produces no
//! transitions at all, and there is nothing to lock a timing
//! loop onto except the tone changes themselves.
//!
//! The [`BaudSampler`] recovers the clock from zero crossings of
//! the low-passed correlator output. It measures the time since
//! the previous crossing and divides by the nominal baud period
//! to learn how many bauds the line level was held:
//!
//! ```txt
//! bauds = (elapsed - half_baud) / baud + 1
//! ```
//!
//! The held level is then emitted that many times, one per input
//! sample. Rounding against the half-baud offset makes the count
//! tolerant of a few percent of clock skew between the sender
//! and the receiver.

use arraydeque::ArrayDeque;

use crate::filter::Sample;

/// Default limit on the length of one run, in bauds
pub const DEFAULT_MAX_RUN: u32 = 8;

/// Baud sampler
///
/// Consumes the demodulated baseband one sample at a time and
/// emits line levels (`true` = mark). Mark tones correlate to
/// negative values and space tones to positive ones.
#[derive(Clone, Debug)]
pub struct BaudSampler {
    history: ArrayDeque<Sample, 2, arraydeque::Wrapping>,
    baud: u32,
    half_baud: u32,
    max_run: u32,
    since_crossing: u32,
    held: u32,
    level: bool,
}

impl BaudSampler {
    /// New sampler
    ///
    /// The input is sampled at `sample_rate` Hz and carries
    /// `baud_rate` bauds per second. Runs of the same line level
    /// that last `max_run` bauds or longer are treated as a loss of
    /// signal and discarded.
    pub fn new(sample_rate: u32, baud_rate: u32, max_run: u32) -> Self {
        let sps = sample_rate as f32 / u32::max(baud_rate, 1) as f32;
        let mut out = Self {
            history: ArrayDeque::default(),
            baud: u32::max(sps.round() as u32, 2),
            half_baud: u32::max((sps / 2.0).round() as u32, 1),
            max_run: u32::max(max_run, 2),
            since_crossing: 0,
            held: 0,
            level: false,
        };
        out.reset();
        out
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.history.clear();
        for _i in 0..self.history.capacity() {
            self.history.push_back(0);
        }
        self.since_crossing = 0;
        self.held = 0;
        self.level = false;
    }

    /// Nominal baud period, in whole samples
    pub fn samples_per_baud(&self) -> u32 {
        self.baud
    }

    /// Longest accepted run, in bauds
    pub fn max_run(&self) -> u32 {
        self.max_run
    }

    /// Sample the baseband
    ///
    /// Returns a line level if one is due on this sample.
    pub fn input(&mut self, sample: Sample) -> Option<bool> {
        self.history.push_back(sample);
        let prev_pos = self.history[0] > 0;
        let cur_pos = self.history[1] > 0;

        if prev_pos != cur_pos {
            let since = self.since_crossing;
            if since > self.half_baud && since < self.baud * self.max_run {
                self.held = (since - self.half_baud) / self.baud + 1;
                self.level = !prev_pos;
            } else {
                self.held = 0;
            }
            self.since_crossing = 0;
        } else {
            self.since_crossing = self.since_crossing.saturating_add(1);
        }

        if self.held > 0 {
            self.held -= 1;
            Some(self.level)
        } else {
            None
        }
    }
}

impl Default for BaudSampler {
    fn default() -> Self {
        Self::new(22050, 1200, DEFAULT_MAX_RUN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Render runs of alternating line levels, starting with
    // space, as a bipolar baseband with the given baud period
    fn baseband(runs: &[u32], samples_per_baud: f64) -> Vec<Sample> {
        let levels: Vec<bool> = runs
            .iter()
            .enumerate()
            .flat_map(|(i, &len)| std::iter::repeat(i % 2 == 1).take(len as usize))
            .collect();

        let nsamp = (levels.len() as f64 * samples_per_baud) as usize;
        (0..nsamp)
            .map(|t| {
                let baud = usize::min((t as f64 / samples_per_baud) as usize, levels.len() - 1);
                if levels[baud] {
                    -1000
                } else {
                    1000
                }
            })
            .collect()
    }

    // The final run has no closing transition and is never emitted
    fn expected(runs: &[u32]) -> Vec<bool> {
        runs[..runs.len() - 1]
            .iter()
            .enumerate()
            .flat_map(|(i, &len)| std::iter::repeat(i % 2 == 1).take(len as usize))
            .collect()
    }

    fn run(uut: &mut BaudSampler, sig: &[Sample]) -> Vec<bool> {
        sig.iter().filter_map(|&sa| uut.input(sa)).collect()
    }

    #[test]
    fn test_construct() {
        let uut = BaudSampler::default();
        assert_eq!(18, uut.samples_per_baud());
        assert_eq!(9, uut.half_baud);
        assert_eq!(8, uut.max_run());

        let uut = BaudSampler::new(11025, 1200, 0);
        assert_eq!(9, uut.samples_per_baud());
        assert_eq!(2, uut.max_run());
    }

    #[test]
    fn test_alternating_no_drift() {
        let runs = vec![1u32; 1001];
        let sig = baseband(&runs, 22050.0 / 1200.0);

        let mut uut = BaudSampler::default();
        let out = run(&mut uut, &sig);
        assert_eq!(1000, out.len());
        assert_eq!(expected(&runs), out);
    }

    #[test]
    fn test_run_lengths_with_skew() {
        // every run length that HDLC with stuffing can produce
        let mut runs = vec![];
        for i in 0..300u32 {
            runs.push(1 + (i * 5 + i / 7) % 7);
        }
        let want = expected(&runs);

        for skew in [0.98f64, 1.0, 1.02] {
            let sig = baseband(&runs, skew * 22050.0 / 1200.0);
            let mut uut = BaudSampler::default();
            let out = run(&mut uut, &sig);
            assert_eq!(want.len(), out.len(), "skew {}", skew);
            assert_eq!(want, out, "skew {}", skew);
        }
    }

    #[test]
    fn test_rejects_long_and_short_runs() {
        let mut uut = BaudSampler::default();

        // too long: loss of signal
        let sig = baseband(&[20, 1], 22050.0 / 1200.0);
        assert!(run(&mut uut, &sig).is_empty());

        // too short: a glitch
        uut.reset();
        let mut sig = vec![1000; 4];
        sig.extend(std::iter::repeat(-1000).take(50));
        assert!(run(&mut uut, &sig).is_empty());
    }

    #[test]
    fn test_silence() {
        let mut uut = BaudSampler::default();
        assert!(run(&mut uut, &vec![0; 10000]).is_empty());
    }
}
