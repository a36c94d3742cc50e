//! AX.25 station addresses

use std::fmt;
use std::str::FromStr;

use arrayvec::ArrayVec;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Maximum callsign length, in characters
pub const MAX_CALL_LEN: usize = 6;

/// Maximum SSID
pub const MAX_SSID: u8 = 15;

/// Length of one address field on the wire
pub const WIRE_LEN: usize = 7;

/// A space, shifted into address position
const PAD: u8 = b' ' << 1;

/// Callsign and secondary station identifier
///
/// A station is identified by a callsign of up to six characters
/// and an SSID from 0 to 15. In text, these are written as
/// `CALL-SSID`, and the SSID is omitted when it is zero:
///
/// ```
/// use ax25afsk::CallSsid;
///
/// let cs: CallSsid = "ki5tof-9".parse().unwrap();
/// assert_eq!(cs.call(), b"KI5TOF");
/// assert_eq!(cs.ssid(), 9);
/// assert_eq!(cs.to_string(), "KI5TOF-9");
/// ```
///
/// On the wire, each address occupies a seven-byte field. Every
/// callsign character is shifted left by one bit and the field is
/// padded with spaces. The final byte carries the SSID and, in
/// bit 0, the *extension bit* which marks the last address of the
/// frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallSsid {
    call: ArrayVec<u8, MAX_CALL_LEN>,
    ssid: u8,
}

/// Error parsing a [`CallSsid`]
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallSsidErr {
    /// The callsign is empty
    #[error("invalid address: empty callsign")]
    Empty,

    /// The callsign is longer than six characters
    #[error("invalid address: callsign longer than six characters")]
    TooLong,

    /// The callsign contains an unusable character
    #[error("invalid address: callsign contains an invalid character")]
    BadCharacter,

    /// The SSID is not a number from 0 to 15
    #[error("invalid address: SSID must be between 0 and 15")]
    BadSsid,

    /// A wire address field is not seven bytes long
    #[error("invalid address: wire field must be seven bytes")]
    FieldLength,
}

impl CallSsid {
    /// New address from callsign and SSID
    ///
    /// The `call` is converted to uppercase. It must be one to
    /// six letters or digits.
    pub fn new(call: &str, ssid: u8) -> Result<Self, CallSsidErr> {
        if ssid > MAX_SSID {
            return Err(CallSsidErr::BadSsid);
        }
        let call = call.to_ascii_uppercase();
        if call.is_empty() {
            return Err(CallSsidErr::Empty);
        }
        if !call.bytes().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CallSsidErr::BadCharacter);
        }
        let call = ArrayVec::try_from(call.as_bytes()).map_err(|_| CallSsidErr::TooLong)?;
        Ok(Self { call, ssid })
    }

    /// Callsign, without padding
    pub fn call(&self) -> &[u8] {
        &self.call
    }

    /// Secondary station identifier
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// True if the callsign is plausible
    ///
    /// A plausible callsign is non-empty and consists only of
    /// uppercase letters and digits. Addresses decoded from the
    /// wire may contain other characters.
    pub fn is_valid(&self) -> bool {
        !self.call.is_empty()
            && self
                .call
                .iter()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    /// Decode a seven-byte wire address field
    ///
    /// The field must already be in its natural bit order. The
    /// callsign ends at the first padding byte or after six
    /// characters. Decoding is lenient: characters are taken as
    /// they come, and the callsign may even be empty. Use
    /// [`is_valid()`](CallSsid::is_valid) to judge the result.
    ///
    /// The extension bit is ignored here; check bit 0 of the last
    /// byte to learn if more addresses follow.
    pub fn from_wire(field: &[u8]) -> Result<Self, CallSsidErr> {
        if field.len() != WIRE_LEN {
            return Err(CallSsidErr::FieldLength);
        }

        let call = field[0..MAX_CALL_LEN]
            .iter()
            .take_while(|&&byte| byte != PAD)
            .map(|byte| byte >> 1)
            .collect();

        Ok(Self {
            call,
            ssid: (field[MAX_CALL_LEN] >> 1) & 0x0F,
        })
    }

    /// Encode as a seven-byte wire address field
    ///
    /// Set `last` for the final address of the frame.
    pub fn to_wire(&self, last: bool) -> [u8; WIRE_LEN] {
        let mut out = [PAD; WIRE_LEN];
        for (o, c) in out.iter_mut().zip(self.call.iter()) {
            *o = c << 1;
        }
        out[MAX_CALL_LEN] = (self.ssid << 1) | 0x60 | last as u8;
        out
    }
}

impl FromStr for CallSsid {
    type Err = CallSsidErr;

    /// Parse `CALL` or `CALL-SSID`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex =
                Regex::new(r"^([A-Z0-9]*)(?:-([0-9]+))?$").expect("bad callsign regexp");
        }

        let s = s.trim().to_ascii_uppercase();
        let caps = RE.captures(&s).ok_or(CallSsidErr::BadCharacter)?;
        let call = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let ssid = match caps.get(2) {
            Some(m) => m.as_str().parse().map_err(|_| CallSsidErr::BadSsid)?,
            None => 0,
        };

        Self::new(call, ssid)
    }
}

impl fmt::Display for CallSsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.call))?;
        if self.ssid != 0 {
            write!(f, "-{}", self.ssid)?;
        }
        Ok(())
    }
}
