//! NRZI line coding
//!
//! AX.25 sends data with Non-Return-to-Zero Inverted coding. A
//! data `0` toggles the line level. A data `1` holds it. Each
//! coder is a single running level and must see every bit, in
//! order.

/// NRZI encoder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NrziEncoder {
    level: bool,
}

impl NrziEncoder {
    /// New encoder, starting at line level 0
    pub fn new() -> Self {
        Self { level: false }
    }

    /// Reset to the initial line level
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Encode one data bit to a line level
    #[inline]
    pub fn encode(&mut self, bit: bool) -> bool {
        if !bit {
            self.level = !self.level;
        }
        self.level
    }
}

impl Default for NrziEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// NRZI decoder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NrziDecoder {
    level: bool,
}

impl NrziDecoder {
    /// New decoder, assuming a previous line level of 0
    ///
    /// This matches a fresh [`NrziEncoder`], so a new pair of
    /// coders round-trips every bit.
    pub fn new() -> Self {
        Self { level: false }
    }

    /// Reset to the initial line level
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Decode one line level to a data bit
    ///
    /// The data bit is 1 if `level` matches the previous level.
    #[inline]
    pub fn decode(&mut self, level: bool) -> bool {
        let out = level == self.level;
        self.level = level;
        out
    }
}

impl Default for NrziDecoder {
    fn default() -> Self {
        Self::new()
    }
}
