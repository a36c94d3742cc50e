use crate::frame::{Frame, FrameDecodeErr};
use crate::repair::Repair;

/// Receiver output
///
/// Every candidate between two HDLC flags which is long enough
/// and properly addressed produces one `FrameOut`:
///
/// * [`Ready(Ok(_))`](FrameOut::Ready) for a frame whose
///   checksum is good;
/// * [`Ready(Err(_))`](FrameOut::Ready) for a frame whose
///   checksum failed, if it could not be repaired; and
/// * [`Repaired`](FrameOut::Repaired) for a failed frame which
///   was recovered by [bit flipping](crate::repair).
///
/// Candidates which are too short or malformed are far more
/// common than real frames, since any noise between two flags
/// makes one. These are counted in the
/// [`ReceiverStats`] but not reported here.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameOut {
    /// A decoded frame, or a checksum failure
    Ready(Result<Frame, FrameDecodeErr>),

    /// A frame which failed its checksum but was repaired
    Repaired(Repair),
}

impl FrameOut {
    /// Frame, if any
    ///
    /// Returns the decoded or repaired frame. Returns `None` if
    /// the frame failed to decode.
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            FrameOut::Ready(Ok(frame)) => Some(frame),
            FrameOut::Repaired(fixed) => Some(fixed.frame()),
            FrameOut::Ready(Err(_)) => None,
        }
    }

    /// Decoding error, if any
    pub fn error(&self) -> Option<&FrameDecodeErr> {
        match self {
            FrameOut::Ready(Err(err)) => Some(err),
            _ => None,
        }
    }

    /// Consume, returning the frame if any
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            FrameOut::Ready(Ok(frame)) => Some(frame),
            FrameOut::Repaired(fixed) => Some(fixed.into_frame()),
            FrameOut::Ready(Err(_)) => None,
        }
    }
}

impl AsRef<str> for FrameOut {
    fn as_ref(&self) -> &str {
        match self {
            FrameOut::Ready(Ok(_)) => "frame",
            FrameOut::Ready(Err(_)) => "decode error",
            FrameOut::Repaired(_) => "repaired frame",
        }
    }
}

impl std::fmt::Display for FrameOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameOut::Ready(Ok(frame)) => write!(f, "{}: {}", self.as_ref(), frame),
            FrameOut::Ready(Err(err)) => write!(f, "{}: {}", self.as_ref(), err),
            FrameOut::Repaired(fixed) => write!(
                f,
                "{} (flipped {:?}): {}",
                self.as_ref(),
                fixed.flipped(),
                fixed.frame()
            ),
        }
    }
}

/// Receiver statistics
///
/// Lifetime counters for each stage of the receive chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ReceiverStats {
    /// Samples input
    pub samples: u64,

    /// Samples passed by the power squelch
    pub samples_passed: u64,

    /// Line levels recovered by the baud sampler
    pub bits: u64,

    /// Candidate frames found between flags
    pub candidates: u64,

    /// Frames decoded with a good checksum
    pub frames_ok: u64,

    /// Frames which failed their checksum
    ///
    /// This includes frames which were later repaired.
    pub crc_failures: u64,

    /// Frames repaired by bit flipping
    pub repaired: u64,

    /// Candidates which were too short or malformed
    pub other_failures: u64,
}

impl std::fmt::Display for ReceiverStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} samples ({} passed), {} bits, {} candidates: {} ok, {} bad checksum ({} repaired), {} malformed",
            self.samples,
            self.samples_passed,
            self.bits,
            self.candidates,
            self.frames_ok,
            self.crc_failures,
            self.repaired,
            self.other_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_out() {
        let frame: Frame = "KI5TOF>APRS:hi".parse().expect("bad frame");
        let out = FrameOut::Ready(Ok(frame.clone()));
        assert_eq!(Some(&frame), out.frame());
        assert_eq!(None, out.error());
        assert_eq!("frame: KI5TOF>APRS:hi", out.to_string());
        assert_eq!(Some(frame), out.into_frame());

        let out = FrameOut::Ready(Err(FrameDecodeErr::CrcMismatch {
            received: 0x1234,
            computed: 0xABCD,
        }));
        assert_eq!(None, out.frame());
        assert!(out.error().is_some());
        assert_eq!(
            "decode error: invalid frame: checksum 0x1234 does not match computed 0xabcd",
            out.to_string()
        );
        assert_eq!(None, out.into_frame());
    }
}
