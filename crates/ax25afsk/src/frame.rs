//! AX.25 UI frames
//!
//! An AX.25 frame on the wire is laid out as
//!
//! ```txt
//! FLAG | DST (7) | SRC (7) | DIGI (7) × 0..8 | CTRL | PID | INFO | FCS (2) | FLAG
//! ```
//!
//! The FCS is the CRC-16/CCITT of everything between the flags,
//! sent little-endian. Before transmission each byte is bit-
//! reversed, since AX.25 sends the least-significant bit first,
//! and the region between the flags is bit-stuffed.

use std::fmt;
use std::iter;
use std::str::FromStr;

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::bits::{self, BitBuf};
use crate::callssid::{self, CallSsid, CallSsidErr};
use crate::crc;

/// HDLC flag byte
pub const FLAG: u8 = 0x7E;

/// Control field for an unnumbered information (UI) frame
pub const CONTROL: u8 = 0x03;

/// Protocol identifier for "no layer 3"
pub const PID: u8 = 0xF0;

/// Maximum number of digipeater addresses
pub const MAX_DIGIS: usize = 8;

// Shortest frame body: two addresses, control, PID, and FCS
const MIN_BODY: usize = 2 * callssid::WIRE_LEN + 2 + 2;

/// AX.25 UI frame
///
/// A frame carries a destination, a source, up to eight
/// digipeaters, and an information field of arbitrary bytes.
/// Frames may be built from their fields, parsed from the APRS
/// text form, or decoded from the wire:
///
/// ```
/// use ax25afsk::Frame;
///
/// let frame: Frame = "KI5TOF>APRS,WIDE1-1:>hello world".parse().unwrap();
/// assert_eq!(frame.src().call(), b"KI5TOF");
/// assert_eq!(frame.digis().len(), 1);
/// assert_eq!(frame.info(), b">hello world");
///
/// let wire = frame.to_wire(1, 1);
/// assert_eq!(Frame::from_wire(&wire).unwrap(), frame);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    dst: CallSsid,
    src: CallSsid,
    digis: ArrayVec<CallSsid, MAX_DIGIS>,
    info: Vec<u8>,
}

/// Error decoding a [`Frame`] from the wire
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameDecodeErr {
    /// The buffer is too short to hold the required fields
    #[error("invalid frame: too short")]
    TooShort,

    /// The buffer is not delimited or addressed correctly
    #[error("invalid frame: malformed")]
    Malformed,

    /// An address field could not be decoded
    #[error("invalid frame: {0}")]
    BadCallsign(#[from] CallSsidErr),

    /// The frame check sequence does not match
    #[error("invalid frame: checksum {received:#06x} does not match computed {computed:#06x}")]
    CrcMismatch {
        /// FCS received with the frame
        received: u16,

        /// FCS computed over the frame
        computed: u16,
    },
}

/// Error parsing a [`Frame`] from APRS text
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameParseErr {
    /// There is no `>` between source and destination
    #[error("invalid packet text: missing source")]
    MissingSource,

    /// There is no `:` before the information field
    #[error("invalid packet text: missing information field")]
    MissingInfo,

    /// The path has more than eight digipeaters
    #[error("invalid packet text: too many digipeaters")]
    TooManyDigis,

    /// An address could not be parsed
    #[error("invalid packet text: {0}")]
    BadCallsign(#[from] CallSsidErr),
}

impl Frame {
    /// New frame without digipeaters
    pub fn new<I>(src: CallSsid, dst: CallSsid, info: I) -> Self
    where
        I: Into<Vec<u8>>,
    {
        Self {
            dst,
            src,
            digis: ArrayVec::new(),
            info: info.into(),
        }
    }

    /// Append a digipeater to the path
    pub fn push_digi(&mut self, digi: CallSsid) -> Result<(), FrameParseErr> {
        self.digis
            .try_push(digi)
            .map_err(|_| FrameParseErr::TooManyDigis)
    }

    /// Destination address
    pub fn dst(&self) -> &CallSsid {
        &self.dst
    }

    /// Source address
    pub fn src(&self) -> &CallSsid {
        &self.src
    }

    /// Digipeater path, in order
    pub fn digis(&self) -> &[CallSsid] {
        &self.digis
    }

    /// Information field
    pub fn info(&self) -> &[u8] {
        &self.info
    }

    /// Consume the frame, returning its information field
    pub fn into_info(self) -> Vec<u8> {
        self.info
    }

    /// Length of [`to_wire()`](Frame::to_wire) output, in bytes
    pub fn wire_len(&self, flags_pre: usize, flags_post: usize) -> usize {
        flags_pre
            + callssid::WIRE_LEN * (2 + self.digis.len())
            + 2
            + self.info.len()
            + 2
            + flags_post
    }

    /// Encode for the wire
    ///
    /// Returns the frame between `flags_pre` opening flags and
    /// `flags_post` closing flags. Bytes are in their natural bit
    /// order and are not stuffed.
    pub fn to_wire(&self, flags_pre: usize, flags_post: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len(flags_pre, flags_post));
        out.resize(flags_pre, FLAG);

        let naddr = 2 + self.digis.len();
        for (i, addr) in self.addresses().enumerate() {
            out.extend_from_slice(&addr.to_wire(i + 1 == naddr));
        }
        out.push(CONTROL);
        out.push(PID);
        out.extend_from_slice(&self.info);

        let fcs = crc::crc16(&out[flags_pre..]);
        out.extend_from_slice(&fcs.to_le_bytes());
        out.resize(out.len() + flags_post, FLAG);
        out
    }

    /// Decode from the wire
    ///
    /// The `buf` must be unstuffed and in its natural bit order.
    /// Any number of opening flags are skipped. The frame ends at
    /// the final flag in the buffer, or at an earlier flag in a
    /// run of closing flags if that is where the FCS checks.
    ///
    /// The FCS is verified before any address is decoded, so a
    /// corrupted frame reports
    /// [`CrcMismatch`](FrameDecodeErr::CrcMismatch) whenever it is
    /// long enough and properly delimited.
    pub fn from_wire(buf: &[u8]) -> Result<Self, FrameDecodeErr> {
        if buf.len() < 3 {
            return Err(FrameDecodeErr::TooShort);
        }

        let start = buf
            .iter()
            .position(|&b| b != FLAG)
            .ok_or(FrameDecodeErr::Malformed)?;
        let mut stop = buf
            .iter()
            .rposition(|&b| b == FLAG)
            .filter(|&stop| stop > start)
            .ok_or(FrameDecodeErr::Malformed)?;

        loop {
            match check_fcs(&buf[start..stop]) {
                Ok(content) => return Self::parse_content(content),
                Err(e) => {
                    if buf[stop - 1] == FLAG && stop - 1 - start >= MIN_BODY {
                        stop -= 1;
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Encode for AFSK transmission
    ///
    /// Encodes with [`to_wire()`](Frame::to_wire), reverses the
    /// bit order of every byte, and stuffs every bit between the
    /// flags. The length of the output is the number of bits to
    /// transmit, stuffing included.
    pub fn to_afsk(&self, flags_pre: usize, flags_post: usize) -> BitBuf {
        let mut wire = self.to_wire(flags_pre, flags_post);
        bits::reverse_bytes(&mut wire);
        let len = wire.len() * 8;
        let wire = BitBuf::from_bytes(&wire, len);
        let (stuffed, _) = bits::stuff(&wire, flags_pre * 8, len - flags_post * 8);
        stuffed
    }

    /// Decode a received, still-stuffed bit stream
    ///
    /// This is the inverse of [`to_afsk()`](Frame::to_afsk).
    pub fn from_afsk(bits: &BitBuf) -> Result<Self, FrameDecodeErr> {
        Self::from_wire(&prepare_received(bits))
    }

    // all addresses, in wire order
    fn addresses(&self) -> impl Iterator<Item = &CallSsid> {
        iter::once(&self.dst)
            .chain(iter::once(&self.src))
            .chain(self.digis.iter())
    }

    // parse address, control, and info from a checked body
    fn parse_content(content: &[u8]) -> Result<Self, FrameDecodeErr> {
        const W: usize = callssid::WIRE_LEN;

        let dst = CallSsid::from_wire(&content[0..W])?;
        let src = CallSsid::from_wire(&content[W..2 * W])?;

        let mut last = content[2 * W - 1] & 0x01 != 0;
        let mut idx = 2 * W;
        let mut digis = ArrayVec::new();
        while !last {
            if digis.is_full() {
                return Err(FrameDecodeErr::Malformed);
            }
            let field = content
                .get(idx..idx + W)
                .ok_or(FrameDecodeErr::TooShort)?;
            digis.push(CallSsid::from_wire(field)?);
            last = field[W - 1] & 0x01 != 0;
            idx += W;
        }

        // control and PID are not checked
        let info = content.get(idx + 2..).ok_or(FrameDecodeErr::TooShort)?;

        Ok(Self {
            dst,
            src,
            digis,
            info: info.to_vec(),
        })
    }
}

/// Undo bit stuffing and bit reversal
///
/// Converts a received candidate, which begins and ends with a
/// flag, into a byte buffer suitable for
/// [`Frame::from_wire()`].
pub fn prepare_received(candidate: &BitBuf) -> Vec<u8> {
    let (unstuffed, _) = bits::unstuff(candidate);
    let mut out = unstuffed.into_bytes();
    bits::reverse_bytes(&mut out);
    out
}

// Verify the FCS of a frame body
//
// Returns the body less its FCS.
fn check_fcs(body: &[u8]) -> Result<&[u8], FrameDecodeErr> {
    if body.len() < MIN_BODY {
        return Err(FrameDecodeErr::TooShort);
    }

    let (content, fcs) = body.split_at(body.len() - 2);
    if crc::check(body) {
        return Ok(content);
    }
    Err(FrameDecodeErr::CrcMismatch {
        received: u16::from_le_bytes([fcs[0], fcs[1]]),
        computed: crc::crc16(content),
    })
}

/// True if a received buffer's destination and source look real
///
/// Decodes the first two address fields after the opening flags
/// without checking the FCS. A corrupted frame whose addresses
/// are not [plausible](CallSsid::is_valid) is unlikely to be
/// recovered by flipping a bit or two.
pub(crate) fn addresses_plausible(buf: &[u8]) -> bool {
    const W: usize = callssid::WIRE_LEN;

    let Some(start) = buf.iter().position(|&b| b != FLAG) else {
        return false;
    };
    let Some(addrs) = buf.get(start..start + 2 * W) else {
        return false;
    };
    addrs
        .chunks_exact(W)
        .all(|field| CallSsid::from_wire(field).map_or(false, |cs| cs.is_valid()))
}

impl FromStr for Frame {
    type Err = FrameParseErr;

    /// Parse APRS text of the form `SRC>DST,DIGI1,DIGI2:INFO`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (header, info) = s.split_once(':').ok_or(FrameParseErr::MissingInfo)?;
        let (src, path) = header
            .trim()
            .split_once('>')
            .ok_or(FrameParseErr::MissingSource)?;

        let mut path = path.split(',');
        let dst = path.next().unwrap_or_default();

        let mut out = Frame::new(src.parse()?, dst.parse()?, info);
        for digi in path {
            out.push_digi(digi.parse()?)?;
        }
        Ok(out)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.src, self.dst)?;
        for digi in &self.digis {
            write!(f, ",{}", digi)?;
        }
        write!(f, ":{}", String::from_utf8_lossy(&self.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(s: &str) -> CallSsid {
        s.parse().expect("bad callsign")
    }

    fn make_frame(ndigi: usize, info_len: usize) -> Frame {
        let info: Vec<u8> = (0..info_len)
            .map(|i| (i * 37 + ndigi * 11) as u8)
            .collect();
        let mut out = Frame::new(call("KI5TOF-7"), call("APRS"), info);
        for i in 0..ndigi {
            out.push_digi(CallSsid::new(&format!("DIGI{}", i), i as u8).expect("bad call"))
                .expect("too many digis");
        }
        out
    }

    #[test]
    fn test_wire_round_trip() {
        for ndigi in 0..=MAX_DIGIS {
            for info_len in 0..=256 {
                let frame = make_frame(ndigi, info_len);
                let wire = frame.to_wire(1, 1);
                assert_eq!(frame.wire_len(1, 1), wire.len());
                assert_eq!(Ok(&frame), Frame::from_wire(&wire).as_ref());
            }
        }
    }

    #[test]
    fn test_many_flags() {
        for info_len in [0, 1, 17, 200] {
            let frame = make_frame(2, info_len);
            let wire = frame.to_wire(5, 3);
            assert_eq!(&[FLAG; 5], &wire[0..5]);
            assert_eq!(&[FLAG; 3], &wire[wire.len() - 3..]);
            assert_eq!(Ok(&frame), Frame::from_wire(&wire).as_ref());
        }
    }

    #[test]
    fn test_afsk_round_trip() {
        for ndigi in [0, 1, 8] {
            for info_len in [0, 1, 5, 64, 255, 256] {
                let frame = make_frame(ndigi, info_len);
                let stuffed = frame.to_afsk(1, 1);
                assert!(stuffed.len() >= frame.wire_len(1, 1) * 8);

                let text: String = stuffed.iter().map(|b| if b { '1' } else { '0' }).collect();
                assert!(text.starts_with("01111110"));
                assert!(text.ends_with("01111110"));
                assert!(!text[8..text.len() - 8].contains("111111"));

                assert_eq!(Ok(&frame), Frame::from_afsk(&stuffed).as_ref());
            }
        }
    }

    #[test]
    fn test_extension_bit() {
        for ndigi in 0..=MAX_DIGIS {
            let frame = make_frame(ndigi, 4);
            let wire = frame.to_wire(0, 0);
            let naddr = 2 + ndigi;
            for i in 0..naddr {
                let ssid_byte = wire[7 * i + 6];
                assert_eq!(i + 1 == naddr, ssid_byte & 0x01 != 0);
                assert_eq!(0x60, ssid_byte & 0x60);
            }
            assert_eq!(CONTROL, wire[7 * naddr]);
            assert_eq!(PID, wire[7 * naddr + 1]);
        }
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(Err(FrameDecodeErr::TooShort), Frame::from_wire(&[FLAG, FLAG]));
        assert_eq!(Err(FrameDecodeErr::Malformed), Frame::from_wire(&[FLAG; 30]));
        assert_eq!(Err(FrameDecodeErr::TooShort), Frame::from_wire(&[FLAG, 0x82, 0x82, FLAG]));

        // no closing flag
        assert_eq!(
            Err(FrameDecodeErr::Malformed),
            Frame::from_wire(&[FLAG, 0x82, 0x82, 0x82])
        );

        // corrupted
        let frame = make_frame(0, 10);
        let mut wire = frame.to_wire(1, 1);
        wire[20] ^= 0x10;
        match Frame::from_wire(&wire) {
            Err(FrameDecodeErr::CrcMismatch { received, computed }) => {
                assert_ne!(received, computed)
            }
            r => panic!("unexpected result {:?}", r),
        }
    }

    // build a wire frame by hand with a valid FCS
    fn raw_frame(addrs: &[[u8; 7]]) -> Vec<u8> {
        let mut out = vec![FLAG];
        for a in addrs {
            out.extend_from_slice(a);
        }
        out.extend_from_slice(&[CONTROL, PID, b'x']);
        let fcs = crc::crc16(&out[1..]);
        out.extend_from_slice(&fcs.to_le_bytes());
        out.push(FLAG);
        out
    }

    #[test]
    fn test_decode_addresses() {
        let good = call("N0CALL").to_wire(false);

        // nine digipeaters, none of them last
        let addrs = vec![good; 11];
        assert_eq!(Err(FrameDecodeErr::Malformed), Frame::from_wire(&raw_frame(&addrs)));

        // sloppy addresses still decode if the FCS checks
        let mut sloppy = good;
        sloppy[0] = b'n' << 1;
        sloppy[1] = 0x40;
        sloppy[2] |= 0x01;
        let mut last = [0x40; 7];
        last[6] = 0x61;
        let frame = Frame::from_wire(&raw_frame(&[sloppy, last])).expect("should decode");
        assert_eq!(b"n", frame.dst().call());
        assert!(!frame.dst().is_valid());
        assert!(frame.src().call().is_empty());
        assert!(!frame.src().is_valid());

        // eight digipeaters is fine
        let mut last = good;
        last[6] |= 0x01;
        let mut addrs = vec![good; 9];
        addrs.push(last);
        let frame = Frame::from_wire(&raw_frame(&addrs)).expect("should decode");
        assert_eq!(8, frame.digis().len());
        assert_eq!(b"x", frame.info());
    }

    #[test]
    fn test_known_frame() {
        const WIRE: &str = "7e82a0a4a640406096926aa89e8c60ae92888a62406303f0\
                            3e68656c6c6f20776f726c6438157e";
        const AFSK: &str = "0111111001000001000001010010010101100101000000100000001000000110\
                            0110100101001001010101100001010101111001001100010000011001110101\
                            0100100100010001010100010100011000000010110001101100000000001111\
                            0111110000001011010100110001101100011011011110110000001001110111\
                            011110110010011100011011000100110000111001010100001111110";

        let frame: Frame = "KI5TOF>APRS,WIDE1-1:>hello world".parse().expect("bad frame");

        let wire = frame.to_wire(1, 1);
        let hex: String = wire.iter().map(|b| format!("{:02x}", b)).collect();
        assert_eq!(WIRE, hex);
        assert_eq!(0x1538, crc::crc16(&wire[1..wire.len() - 3]));

        // one bit is stuffed, where the PID meets the info field
        let stuffed = frame.to_afsk(1, 1);
        let text: String = stuffed.iter().map(|b| if b { '1' } else { '0' }).collect();
        assert_eq!(wire.len() * 8 + 1, stuffed.len());
        assert_eq!(AFSK, text);

        assert_eq!(Ok(&frame), Frame::from_wire(&wire).as_ref());
        assert_eq!(Ok(&frame), Frame::from_afsk(&stuffed).as_ref());
    }

    #[test]
    fn test_addresses_plausible() {
        let frame: Frame = "KI5TOF>APRS:>hello world".parse().expect("bad frame");
        let mut wire = frame.to_wire(3, 1);
        assert!(addresses_plausible(&wire));

        // a lowercase source callsign
        bits::flip_bit(&mut wire, 3 * 8 + 7 * 8 + 1);
        assert!(!addresses_plausible(&wire));

        assert!(!addresses_plausible(&[FLAG; 20]));
        assert!(!addresses_plausible(&wire[0..12]));
    }

    #[test]
    fn test_text() {
        let frame: Frame = "KI5TOF>APRS,WIDE1-1,wide2-2:>hello: world"
            .parse()
            .expect("bad frame");
        assert_eq!(&call("KI5TOF"), frame.src());
        assert_eq!(&call("APRS"), frame.dst());
        assert_eq!(&[call("WIDE1-1"), call("WIDE2-2")], frame.digis());
        assert_eq!(b">hello: world", frame.info());
        assert_eq!("KI5TOF>APRS,WIDE1-1,WIDE2-2:>hello: world", frame.to_string());

        let frame: Frame = "  N0CALL-1>APRS : ".parse().expect("bad frame");
        assert_eq!(1, frame.src().ssid());
        assert_eq!(b" ", frame.info());

        assert_eq!(Err(FrameParseErr::MissingInfo), "KI5TOF>APRS".parse::<Frame>());
        assert_eq!(Err(FrameParseErr::MissingSource), "KI5TOF:hi".parse::<Frame>());
        assert_eq!(
            Err(FrameParseErr::TooManyDigis),
            "A>B,C,D,E,F,G,H,I,J,K:x".parse::<Frame>()
        );
        assert_eq!(
            Err(FrameParseErr::BadCallsign(CallSsidErr::BadCharacter)),
            "KI5TOF>APR$:x".parse::<Frame>()
        );
        assert_eq!(
            Err(FrameParseErr::BadCallsign(CallSsidErr::Empty)),
            "KI5TOF>:x".parse::<Frame>()
        );
    }
}
