//! # Filter design
//!
//! The receive chain needs exactly two filter shapes:
//!
//! * a **band-pass** which keeps the mark/space tone pair and
//!   weights each tone with its own gain; and
//! * a **low-pass** which smooths the correlator output before
//!   clock recovery, with a gentle boost up to its cutoff.
//!
//! Both are linear-phase least-squares designs (the classic
//! `firls` formulation) with an odd number of taps. The real
//! coefficients are multiplied by 10000 and rounded to make a
//! fixed-point [`FirDesign`].
//!
//! ```txt
//!  gain
//!   |          amark ____ aspace
//!   |              /    |
//!   |             /     |        band-pass
//! 0 |____________/      |______________
//!   0      fmark-w fmark fspace fspace+w   fs/2
//! ```
//!
//! Designs are pure functions of their parameters. They are
//! computed on first use and kept for the life of the process.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;

#[cfg(not(test))]
use log::{debug, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as warn;

use crate::filter::FirDesign;
use crate::waveform;

/// Fixed-point multiplier for designed coefficients
pub const COEFF_SCALE: f64 = 10000.0;

/// Band-pass tone filter parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandPassParams {
    /// Sampling rate (Hz)
    pub sample_rate: u32,

    /// Filter length, in mark periods
    pub len_mark_periods: u32,

    /// Transition width outside the tone pair (Hz)
    pub width: u32,

    /// Passband gain at the mark tone
    pub mark_gain: f32,

    /// Passband gain at the space tone
    pub space_gain: f32,
}

/// Low-pass post-correlator filter parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LowPassParams {
    /// Sampling rate (Hz)
    pub sample_rate: u32,

    /// Filter length, in mark periods
    pub len_mark_periods: u32,

    /// Passband edge (Hz)
    pub cutoff: u32,

    /// Transition width (Hz)
    pub width: u32,

    /// Passband gain at `cutoff`, relative to DC
    pub boost: f32,
}

impl BandPassParams {
    /// Design, or fetch from the cache
    pub fn design(&self) -> Arc<FirDesign> {
        cached(DesignKey::BandPass(
            self.sample_rate,
            self.len_mark_periods,
            self.width,
            self.mark_gain.to_bits(),
            self.space_gain.to_bits(),
        ))
    }
}

impl LowPassParams {
    /// Design, or fetch from the cache
    pub fn design(&self) -> Arc<FirDesign> {
        cached(DesignKey::LowPass(
            self.sample_rate,
            self.len_mark_periods,
            self.cutoff,
            self.width,
            self.boost.to_bits(),
        ))
    }
}

/// Filter length for a tone filter
///
/// The smallest odd integer at least `len_mark_periods` whole
/// mark periods long.
pub fn filter_len(sample_rate: u32, len_mark_periods: u32) -> usize {
    let nmark = (sample_rate / waveform::MARK_HZ) as usize;
    let n = usize::max(nmark * len_mark_periods as usize, 1);
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Design the band-pass tone filter
///
/// Returns integer coefficients and the normalization scale
/// `round((|Σ h[i] cos(ωm i)| + |Σ h[i] sin(ωs i)|) / 2)`.
pub fn design_bandpass(p: &BandPassParams) -> FirDesign {
    let fs = p.sample_rate as f64;
    let fmark = waveform::MARK_HZ as f64;
    let fspace = waveform::SPACE_HZ as f64;
    let width = p.width as f64;
    let bands = [
        Band::new(0.0, fmark - width, 0.0, 0.0),
        Band::new(fmark, fspace, p.mark_gain as f64, p.space_gain as f64),
        Band::new(fspace + width, fs / 2.0, 0.0, 0.0),
    ];

    let numtaps = filter_len(p.sample_rate, p.len_mark_periods);
    let coeff = match firls(numtaps, &bands, fs) {
        Some(h) => quantize(&h),
        None => return fallback("band-pass", numtaps),
    };

    let wm = 2.0 * PI * fmark / fs;
    let ws = 2.0 * PI * fspace / fs;
    let mark: Complex<f64> = coeff
        .iter()
        .enumerate()
        .map(|(i, &c)| Complex::from_polar(c as f64, wm * i as f64))
        .sum();
    let space: Complex<f64> = coeff
        .iter()
        .enumerate()
        .map(|(i, &c)| Complex::from_polar(c as f64, ws * i as f64))
        .sum();
    let scale = ((mark.re.abs() + space.im.abs()) / 2.0).round() as i64;

    FirDesign::new(coeff, scale)
}

/// Design the low-pass post-correlator filter
///
/// The scale is the coefficient sum, for unity gain at DC.
pub fn design_lowpass(p: &LowPassParams) -> FirDesign {
    let fs = p.sample_rate as f64;
    let cutoff = p.cutoff as f64;
    let bands = [
        Band::new(0.0, cutoff, 1.0, p.boost as f64),
        Band::new(cutoff + p.width as f64, fs / 2.0, 0.0, 0.0),
    ];

    let numtaps = filter_len(p.sample_rate, p.len_mark_periods);
    let coeff = match firls(numtaps, &bands, fs) {
        Some(h) => quantize(&h),
        None => return fallback("low-pass", numtaps),
    };
    let scale = coeff.iter().sum();

    FirDesign::new(coeff, scale)
}

// Process-wide cache key
//
// Floats are keyed by their bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum DesignKey {
    BandPass(u32, u32, u32, u32, u32),
    LowPass(u32, u32, u32, u32, u32),
}

lazy_static! {
    static ref DESIGN_CACHE: Mutex<HashMap<DesignKey, Arc<FirDesign>>> =
        Mutex::new(HashMap::new());
}

fn cached(key: DesignKey) -> Arc<FirDesign> {
    let mut cache = DESIGN_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    cache
        .entry(key)
        .or_insert_with(|| {
            debug!("design: computing {:?}", key);
            Arc::new(match key {
                DesignKey::BandPass(sample_rate, len_mark_periods, width, mark, space) => {
                    design_bandpass(&BandPassParams {
                        sample_rate,
                        len_mark_periods,
                        width,
                        mark_gain: f32::from_bits(mark),
                        space_gain: f32::from_bits(space),
                    })
                }
                DesignKey::LowPass(sample_rate, len_mark_periods, cutoff, width, boost) => {
                    design_lowpass(&LowPassParams {
                        sample_rate,
                        len_mark_periods,
                        cutoff,
                        width,
                        boost: f32::from_bits(boost),
                    })
                }
            })
        })
        .clone()
}

fn fallback(what: &str, numtaps: usize) -> FirDesign {
    warn!(
        "design: {} filter has no least-squares solution; using an impulse",
        what
    );
    FirDesign::identity(numtaps)
}

fn quantize(h: &[f64]) -> Vec<i64> {
    h.iter().map(|&c| (c * COEFF_SCALE).round() as i64).collect()
}

// One band of a piecewise-linear desired response
//
// Edges are in Hz. The gain varies linearly from `gain_lo` at
// `lo` to `gain_hi` at `hi`.
#[derive(Clone, Copy, Debug)]
struct Band {
    lo: f64,
    hi: f64,
    gain_lo: f64,
    gain_hi: f64,
}

impl Band {
    fn new(lo: f64, hi: f64, gain_lo: f64, gain_hi: f64) -> Self {
        Self {
            lo,
            hi,
            gain_lo,
            gain_hi,
        }
    }
}

// Least-squares linear-phase FIR design
//
// `numtaps` must be odd. With `M = (numtaps - 1) / 2`, the
// amplitude response is `A(f) = Σ a[k] cos(π k f)` over
// normalized frequency `f ∈ [0, 1]`. Minimizing the squared
// error against the desired response over every band gives the
// normal equations `Q a = b` with
//
// ```txt
// Q[i][j] = q(i - j) + q(i + j)      q(n) = Σ ∫ cos(π n f) df
// b[n]    = Σ ∫ D(f) cos(π n f) df
// ```
//
// where both integrals run over the bands. `Q` is a Toeplitz
// plus Hankel matrix. The taps are `[a[M] .. a[1], 2 a[0],
// a[1] .. a[M]]`.
fn firls(numtaps: usize, bands: &[Band], fs: f64) -> Option<Vec<f64>> {
    if numtaps == 0 || numtaps % 2 == 0 {
        return None;
    }

    let nyq = fs / 2.0;
    let bands: Vec<Band> = bands
        .iter()
        .map(|b| Band::new(b.lo / nyq, b.hi / nyq, b.gain_lo, b.gain_hi))
        .filter(|b| b.hi > b.lo)
        .collect();
    let m = (numtaps - 1) / 2;

    let q: Vec<f64> = (0..numtaps)
        .map(|n| {
            let n = n as f64;
            bands
                .iter()
                .map(|b| b.hi * sinc(b.hi * n) - b.lo * sinc(b.lo * n))
                .sum()
        })
        .collect();

    let b: DVector<f64> = DVector::from_iterator(
        m + 1,
        (0..=m).map(|n| {
            bands
                .iter()
                .map(|b| {
                    let slope = (b.gain_hi - b.gain_lo) / (b.hi - b.lo);
                    let icept = b.gain_lo - b.lo * slope;
                    response_integral(b.hi, n, slope, icept)
                        - response_integral(b.lo, n, slope, icept)
                })
                .sum::<f64>()
        }),
    );

    let qmat = DMatrix::from_fn(m + 1, m + 1, |i, j| {
        q[(i as isize - j as isize).unsigned_abs()] + q[i + j]
    });

    let a = match qmat.clone().cholesky() {
        Some(chol) => chol.solve(&b),
        None => qmat.svd(true, true).solve(&b, 1.0e-12).ok()?,
    };

    let mut h = Vec::with_capacity(numtaps);
    h.extend((1..=m).rev().map(|k| a[k]));
    h.push(2.0 * a[0]);
    h.extend((1..=m).map(|k| a[k]));
    Some(h)
}

// Antiderivative of `(slope f + icept) cos(π n f)`, at `f`
fn response_integral(f: f64, n: usize, slope: f64, icept: f64) -> f64 {
    let nf = n as f64;
    let mut out = f * (slope * f + icept) * sinc(f * nf);
    if n == 0 {
        out -= slope * f * f / 2.0;
    } else {
        out += slope * (PI * nf * f).cos() / (PI * nf).powi(2);
    }
    out
}

// Normalized sinc, sin(π x) / (π x)
fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}
