//! HDLC flag framing

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::bits::{self, BitBuf};

/// Default accumulator capacity, in bytes
pub const DEFAULT_CAPACITY: usize = 2024;

/// Minimum candidate length, in whole bytes, including both flags
const MIN_CANDIDATE_BYTES: usize = 3;

/// HDLC flag framer
///
/// The `Framer` accepts NRZI-decoded bits one at a time via the
/// [`input()`](#method.input) method. It searches the bit stream
/// for the HDLC flag `0111_1110`, which is the only place in a
/// stuffed stream that six ones appear in a row.
///
/// Every bit is appended to an accumulator. When a flag
/// completes, everything accumulated since the previous flag is
/// emitted as a *candidate* frame. The candidate starts with the
/// opening flag and ends with the closing flag. It is still
/// bit-stuffed and still in transmission bit order.
///
/// Back-to-back flags, as in a preamble, produce nothing. The
/// accumulator is bounded: if no flag arrives before it fills,
/// the write position wraps back to the start and the over-long
/// candidate is lost.
#[derive(Clone, Debug)]
pub struct Framer {
    // accumulated bits, MSB-first
    buf: Vec<u8>,

    // next bit position to write
    idx: usize,

    // length of the current run of ones
    ones: u32,
}

impl Framer {
    /// New framer with an accumulator of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; usize::max(capacity, MIN_CANDIDATE_BYTES + 1)],
            idx: 0,
            ones: 0,
        }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.buf.iter_mut().for_each(|b| *b = 0);
        self.idx = 0;
        self.ones = 0;
    }

    /// Accumulator capacity, in bytes
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bits accumulated since the last flag
    ///
    /// This count includes the last flag itself.
    pub fn pending_bits(&self) -> usize {
        self.idx
    }

    /// Input one bit
    ///
    /// Returns a candidate frame if this bit completes a flag and
    /// more than two bytes have accumulated since the previous
    /// one.
    pub fn input(&mut self, bit: bool) -> Option<BitBuf> {
        bits::set_bit(&mut self.buf, self.idx, bit);
        self.idx += 1;

        let mut out = None;
        if !bit && self.ones == 6 {
            if self.idx / 8 >= MIN_CANDIDATE_BYTES {
                debug!("framer: candidate of {} bits", self.idx);
                out = Some(BitBuf::from_bytes(&self.buf, self.idx));
            }
            // the flag we just read opens the next frame
            self.buf[0] = crate::frame::FLAG;
            self.idx = 8;
        }

        self.ones = if bit { self.ones.saturating_add(1) } else { 0 };

        if self.idx >= self.buf.len() * 8 {
            debug!("framer: overflow after {} bytes", self.buf.len());
            self.idx = 0;
        }

        out
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
