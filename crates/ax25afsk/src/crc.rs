//! CRC-16/CCITT frame check sequence
//!
//! AX.25 uses the HDLC frame check sequence: the CCITT polynomial
//! `x^16 + x^12 + x^5 + 1`, processed least-significant bit
//! first, starting from `0xFFFF` and inverted at the end. The
//! FCS is sent low byte first.
//!
//! The check value for the ASCII string `123456789` is `0x906E`.

/// Reflected generator polynomial
const POLY: u16 = 0x8408;

/// CRC over a message followed by its own FCS
///
/// Running [`crc16()`] over a frame *and* its little-endian FCS
/// always produces this value when the frame is intact.
pub const GOOD_RESIDUE: u16 = 0x0F47;

const TABLE: [u16; 256] = make_table();

/// Compute the frame check sequence over `data`
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0xFFFFu16;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ byte as u16) & 0xFF) as usize];
    }
    !crc
}

/// Check a message with its trailing little-endian FCS
pub fn check(data_and_fcs: &[u8]) -> bool {
    data_and_fcs.len() >= 2 && crc16(data_and_fcs) == GOOD_RESIDUE
}

const fn make_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}
