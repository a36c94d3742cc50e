//! Bit-flip frame repair
//!
//! A frame that fails its checksum may have only one or two bad
//! bits. [`repair()`] searches for them by brute force: it flips
//! candidate bits and decodes again until the FCS checks.
//!
//! The search runs in two passes:
//!
//! 1. Every single bit, and every pair of adjacent bits, in the
//!    first 254 bytes of the frame.
//! 2. Every pair of bits which are no more than 240 bytes apart,
//!    starting within the first 240 bytes.
//!
//! The first pass is cheap and catches the most common errors.
//! The second is quadratic in the frame length.
//!
//! A 16-bit FCS will accept some wrong answers when enough bits
//! are tried. To guard against this, a repaired frame must also
//! have a plausible source and destination callsign.

#[cfg(not(test))]
use log::debug;

#[cfg(test)]
use std::println as debug;

use crate::bits;
use crate::frame::Frame;

/// Search limit for adjacent pairs, in bytes
const ADJACENT_SEARCH_BYTES: usize = 254;

/// Search limit for arbitrary pairs, in bytes
const PAIR_SEARCH_BYTES: usize = 240;

/// A frame recovered by bit flipping
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Repair {
    frame: Frame,
    flipped: (usize, usize),
}

impl Repair {
    /// The recovered frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Bit positions which were flipped
    ///
    /// Positions index the received wire buffer, MSB-first. A
    /// single-bit repair reports the same position twice.
    pub fn flipped(&self) -> (usize, usize) {
        self.flipped
    }

    /// Consume, returning the recovered frame
    pub fn into_frame(self) -> Frame {
        self.frame
    }
}

/// Attempt to repair a frame
///
/// `wire` is a received buffer which has been unstuffed and
/// bit-reversed, as with
/// [`prepare_received()`](crate::prepare_received). It
/// begins with one flag and ends with the FCS and one flag.
///
/// Returns the first repair found, or `None` if no flip of one
/// or two bits yields a plausible frame. The search skips the
/// opening flag, the FCS, and the closing flag.
pub fn repair(wire: &[u8]) -> Option<Repair> {
    if wire.len() <= 3 {
        return None;
    }

    let end = (wire.len() - 3) * 8;
    let mut scratch = wire.to_vec();

    for a in 8..usize::min(end, ADJACENT_SEARCH_BYTES * 8) {
        for b in [a, a + 1] {
            if b >= end {
                continue;
            }
            if let Some(frame) = try_flip(&mut scratch, a, b) {
                debug!("repair: fixed with adjacent flip ({}, {})", a, b);
                return Some(Repair {
                    frame,
                    flipped: (a, b),
                });
            }
        }
    }

    for a in 8..usize::min(end, PAIR_SEARCH_BYTES * 8) {
        for b in a..usize::min(end, a + PAIR_SEARCH_BYTES * 8) {
            if let Some(frame) = try_flip(&mut scratch, a, b) {
                debug!("repair: fixed with flip ({}, {})", a, b);
                return Some(Repair {
                    frame,
                    flipped: (a, b),
                });
            }
        }
    }

    None
}

// Flip bits `a` and `b`, decode, and flip them back
//
// If `a == b`, only one bit is flipped.
fn try_flip(buf: &mut [u8], a: usize, b: usize) -> Option<Frame> {
    flip_pair(buf, a, b);
    let out = Frame::from_wire(buf)
        .ok()
        .filter(|frame| frame.src().is_valid() && frame.dst().is_valid());
    flip_pair(buf, a, b);
    out
}

#[inline]
fn flip_pair(buf: &mut [u8], a: usize, b: usize) {
    bits::flip_bit(buf, a);
    if b != a {
        bits::flip_bit(buf, b);
    }
}
