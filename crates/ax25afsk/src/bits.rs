//! Bit-level buffer utilities
//!
//! Bits are numbered from the most significant bit of the first
//! byte. Bit `i` lives at `buf[i / 8] & (0x80 >> (i % 8))`.
//!
//! AX.25 sends each byte least-significant bit first. Once every
//! byte of a frame is [reversed](reverse_bytes), the bit numbering
//! above is the order of transmission.
//!
//! HDLC forbids six ones in a row inside a frame. The transmitter
//! [stuffs](stuff) a zero after every run of five ones. The
//! receiver [unstuffs](unstuff) by dropping any zero which follows
//! five ones.

/// Read bit `idx`
#[inline]
pub fn get_bit(buf: &[u8], idx: usize) -> bool {
    buf[idx / 8] & (0x80 >> (idx % 8)) != 0
}

/// Write bit `idx`
#[inline]
pub fn set_bit(buf: &mut [u8], idx: usize, val: bool) {
    let mask = 0x80 >> (idx % 8);
    if val {
        buf[idx / 8] |= mask;
    } else {
        buf[idx / 8] &= !mask;
    }
}

/// Invert bit `idx`
#[inline]
pub fn flip_bit(buf: &mut [u8], idx: usize) {
    buf[idx / 8] ^= 0x80 >> (idx % 8);
}

/// Reverse the bit order of every byte in place
pub fn reverse_bytes(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte = byte.reverse_bits();
    }
}

/// A growable buffer with an exact length in bits
///
/// Bits past `len()` in the final byte are always zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitBuf {
    bytes: Vec<u8>,
    len: usize,
}

impl BitBuf {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer with room for `bytes` bytes
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            len: 0,
        }
    }

    /// Take the first `len` bits of `bytes`
    ///
    /// `len` is capped at the number of bits available.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Self {
        let len = usize::min(len, bytes.len() * 8);
        let mut bytes = bytes[..(len + 7) / 8].to_vec();
        if len % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xFFu8 << (8 - len % 8);
            }
        }
        Self { bytes, len }
    }

    /// Length in bits
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if there are no bits
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one bit
    #[inline]
    pub fn push(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[self.len / 8] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Read bit `idx`, which must be less than `len()`
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        get_bit(&self.bytes, idx)
    }

    /// Iterate over the bits in order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Backing bytes
    ///
    /// The final byte is zero-padded if `len()` is not a multiple
    /// of eight.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the backing bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl FromIterator<bool> for BitBuf {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut out = BitBuf::new();
        for bit in iter {
            out.push(bit);
        }
        out
    }
}

/// Insert stuffing bits
///
/// Copies `input`, inserting a zero after every run of five ones
/// in the bit range `start..stop`. Bits outside that range, such
/// as opening and closing flags, are copied unchanged. Returns
/// the stuffed bits and the number of zeros inserted.
pub fn stuff(input: &BitBuf, start: usize, stop: usize) -> (BitBuf, usize) {
    let stop = usize::min(stop, input.len());
    let start = usize::min(start, stop);

    // worst case is one extra bit for every five
    let extra = (stop - start) / 5;
    let mut out = BitBuf::with_capacity((input.len() + extra + 7) / 8);
    let mut ones = 0;
    let mut inserted = 0;
    for (idx, bit) in input.iter().enumerate() {
        out.push(bit);
        if idx < start || idx >= stop {
            continue;
        }
        if bit {
            ones += 1;
            if ones == 5 {
                out.push(false);
                inserted += 1;
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }
    (out, inserted)
}

/// Remove stuffing bits
///
/// Drops every zero which follows exactly five ones. Runs of six
/// ones, as in a flag, pass through. Returns the unstuffed bits
/// and the number of zeros removed.
pub fn unstuff(input: &BitBuf) -> (BitBuf, usize) {
    let mut out = BitBuf::with_capacity(input.as_bytes().len());
    let mut ones = 0u32;
    let mut removed = 0;
    for bit in input.iter() {
        if !bit && ones == 5 {
            ones = 0;
            removed += 1;
            continue;
        }
        ones = if bit { ones.saturating_add(1) } else { 0 };
        out.push(bit);
    }
    (out, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_from_str(s: &str) -> BitBuf {
        s.chars().map(|c| c == '1').collect()
    }

    fn bits_to_string(b: &BitBuf) -> String {
        b.iter().map(|b| if b { '1' } else { '0' }).collect()
    }

    #[test]
    fn test_get_set_flip() {
        let mut buf = [0u8; 2];
        set_bit(&mut buf, 0, true);
        set_bit(&mut buf, 9, true);
        assert_eq!([0x80, 0x40], buf);
        assert!(get_bit(&buf, 0));
        assert!(!get_bit(&buf, 1));
        assert!(get_bit(&buf, 9));

        set_bit(&mut buf, 0, false);
        flip_bit(&mut buf, 15);
        assert_eq!([0x00, 0x41], buf);
        flip_bit(&mut buf, 15);
        assert_eq!([0x00, 0x40], buf);
    }

    #[test]
    fn test_reverse_bytes() {
        let mut buf = [0x01u8, 0x7E, 0xA0, 0x82];
        reverse_bytes(&mut buf);
        assert_eq!([0x80u8, 0x7E, 0x05, 0x41], buf);
    }

    #[test]
    fn test_bitbuf() {
        let b = bits_from_str("1011");
        assert_eq!(4, b.len());
        assert_eq!(&[0xB0], b.as_bytes());

        let b = BitBuf::from_bytes(&[0xFF, 0xFF], 12);
        assert_eq!(12, b.len());
        assert_eq!(&[0xFF, 0xF0], b.as_bytes());

        let b = BitBuf::from_bytes(&[0xFF], 100);
        assert_eq!(8, b.len());
    }

    #[test]
    fn test_stuff() {
        let pairs: &[(&str, &str)] = &[
            ("", ""),
            ("00000000", "00000000"),
            ("11111", "111110"),
            ("111111", "1111101"),
            ("0111110111110", "011111001111100"),
            (
                "111111111111111",
                "111110111110111110",
            ),
        ];
        for (i, o) in pairs {
            let input = bits_from_str(i);
            let (got, inserted) = stuff(&input, 0, input.len());
            assert_eq!(*o, bits_to_string(&got));
            assert_eq!(o.len() - i.len(), inserted);
        }
    }

    #[test]
    fn test_stuff_skips_flags() {
        // flag | 11111111 | flag
        let input = bits_from_str("011111101111111101111110");
        let (got, inserted) = stuff(&input, 8, 16);
        assert_eq!(1, inserted);
        assert_eq!("0111111011111011101111110", bits_to_string(&got));

        // the flags survive unstuffing
        let (back, removed) = unstuff(&got);
        assert_eq!(1, removed);
        assert_eq!(input, back);
    }

    #[test]
    fn test_stuff_round_trip() {
        let mut state = 0xACE1u32;
        for len in [0usize, 1, 7, 8, 63, 500, 2049] {
            let input: BitBuf = (0..len)
                .map(|_| {
                    // skew toward ones to exercise long runs
                    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    (state >> 24) % 5 != 0
                })
                .collect();
            let (stuffed, inserted) = stuff(&input, 0, input.len());
            assert_eq!(input.len() + inserted, stuffed.len());

            // never six ones in a row
            assert!(!bits_to_string(&stuffed).contains("111111"));

            let (out, removed) = unstuff(&stuffed);
            assert_eq!(inserted, removed);
            assert_eq!(input, out);
        }
    }
}
