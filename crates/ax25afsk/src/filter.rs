//! # Fixed-point FIR filters
//!
//! A Finite Impulse Response filter convolves its input with a
//! set of integer coefficients `h`. Each output sample is made
//! in two steps:
//!
//! 1. Sliding window: the newest input sample is shifted onto a
//!    fixed-length [`Window`], and the oldest sample ages off.
//!
//! 2. Multiply-accumulate: the window is multiplied element-wise
//!    with `h`, newest sample against `h[0]`. The sum is divided
//!    by an integer normalization `scale`.
//!
//! ```txt
//! // the sample L is the youngest sample, and O is the oldest
//! // [ O | N | M | L ]
//! out = (h[0]·L + h[1]·M + h[2]·N + h[3]·O) / scale
//! ```
//!
//! All arithmetic is integer. Products and sums are carried in
//! 128 bits, and the division truncates toward zero. A `scale`
//! of zero is treated as one.
//!
//! The coefficients and scale form a [`FirDesign`], which is
//! read-only once made. Designs are shared between filters with
//! an [`Arc`]. Each [`FirFilter`] owns only its window.

use std::collections::VecDeque;
use std::sync::Arc;

use nalgebra::DVector;
use num_traits::Zero;

/// A sample inside the receive chain
///
/// Intermediate stages are free to exceed the 16-bit range of
/// the audio that enters the chain.
pub type Sample = i64;

/// Integer coefficient set with normalization
///
/// A `FirDesign` never changes after it is made. The
/// [`design`](crate::design) module produces them for the
/// receive chain, and they are shared by reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirDesign {
    coeff: DVector<i64>,
    scale: i64,
}

impl FirDesign {
    /// Create from integer coefficients and scale
    ///
    /// `coeff[0]` is applied to the newest sample. A `scale` of
    /// zero is replaced with one.
    pub fn new<S>(coeff: S, scale: i64) -> Self
    where
        S: AsRef<[i64]>,
    {
        let coeff = coeff.as_ref();
        Self {
            coeff: DVector::from_column_slice(coeff),
            scale: if scale == 0 { 1 } else { scale },
        }
    }

    /// Unit impulse of the given length
    ///
    /// Passes its input through unchanged.
    pub fn identity(len: usize) -> Self {
        let mut coeff = DVector::zeros(usize::max(len, 1));
        coeff[0] = 1;
        Self { coeff, scale: 1 }
    }

    /// Number of taps
    pub fn len(&self) -> usize {
        self.coeff.len()
    }

    /// True if there are no taps
    pub fn is_empty(&self) -> bool {
        self.coeff.is_empty()
    }

    /// Coefficients, `h[0]` first
    pub fn coeff(&self) -> impl Iterator<Item = i64> + '_ {
        self.coeff.iter().copied()
    }

    /// Normalization divisor (never zero)
    pub fn scale(&self) -> i64 {
        self.scale
    }

    // Scaled dot product of the taps with a sample history
    //
    // `history` yields the oldest sample first.
    fn apply<W>(&self, history: W) -> Sample
    where
        W: IntoIterator<Item = Sample>,
        W::IntoIter: DoubleEndedIterator,
    {
        let acc = multiply_accumulate(history, self.coeff.as_slice());
        let out = acc / self.scale as i128;
        out.clamp(Sample::MIN as i128, Sample::MAX as i128) as Sample
    }
}

/// Fixed-point FIR filter
///
/// Owns a sample history as long as its design. Each call to
/// [`input()`](#method.input) runs in constant memory.
#[derive(Clone, Debug)]
pub struct FirFilter {
    design: Arc<FirDesign>,
    history: Window<Sample>,
}

impl FirFilter {
    /// Create a filter with zero initial conditions
    pub fn new(design: Arc<FirDesign>) -> Self {
        let history = Window::new(design.len());
        Self { design, history }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.history.reset();
    }

    /// The coefficient set in use
    pub fn design(&self) -> &FirDesign {
        &self.design
    }

    /// Filter one sample
    ///
    /// Pushes `input` onto the history and returns the next
    /// output. The result saturates at the range of [`Sample`].
    #[inline]
    pub fn input(&mut self, input: Sample) -> Sample {
        self.history.shift(input);
        self.design.apply(self.history.iter())
    }
}

/// Fixed-length delay line
///
/// Holds the last `len` values pushed into it, zero-filled at
/// creation and on reset. Used for FIR histories and running
/// sums.
#[derive(Clone, Debug)]
pub struct Window<T>(VecDeque<T>)
where
    T: Copy + Zero;

impl<T> Window<T>
where
    T: Copy + Zero,
{
    /// Zero-filled window of `len` values
    pub fn new(len: usize) -> Self {
        let mut q = VecDeque::with_capacity(len);
        q.resize(len, T::zero());
        Self(q)
    }

    /// Refill with zeros
    pub fn reset(&mut self) {
        self.0.iter_mut().for_each(|s| *s = T::zero());
    }

    /// Window length
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the window holds no values at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shift in a new value
    ///
    /// `input` becomes the newest value. Returns the value that
    /// aged off, which was `len()` pushes old. A zero-length
    /// window returns `input` unchanged.
    #[inline]
    pub fn shift(&mut self, input: T) -> T {
        match self.0.pop_front() {
            Some(aged) => {
                self.0.push_back(input);
                aged
            }
            None => input,
        }
    }

    /// Values from oldest to newest
    pub fn iter(&self) -> std::iter::Copied<std::collections::vec_deque::Iter<'_, T>> {
        self.0.iter().copied()
    }
}

// Σ history[N - 1 - i] · coeff[i], in 128 bits
//
// `history` is walked backwards so the newest sample meets
// `coeff[0]`. Missing history is zero.
fn multiply_accumulate<W>(history: W, coeff: &[i64]) -> i128
where
    W: IntoIterator<Item = Sample>,
    W::IntoIter: DoubleEndedIterator,
{
    history
        .into_iter()
        .rev()
        .zip(coeff.iter())
        .map(|(hi, &co)| hi as i128 * co as i128)
        .sum()
}
