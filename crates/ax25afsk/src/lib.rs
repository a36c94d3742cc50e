//! # ax25afsk: AFSK1200 AX.25 packet modem
//!
//! This crate provides a software modem and link-layer codec for
//! [AX.25](https://en.wikipedia.org/wiki/AX.25) packets sent with
//! Bell 202 audio frequency-shift keying at 1200 baud. This is the
//! physical and link layer of
//! [APRS](https://en.wikipedia.org/wiki/Automatic_Packet_Reporting_System)
//! and of most VHF amateur packet radio.
//!
//! The crate converts a stream of audio samples into decoded AX.25
//! frames, and AX.25 frames into audio samples.
//!
//! ## Example
//!
//! You will need *baseband audio* from a receiver: an FM radio's
//! speaker or data jack, a sound card, or a software-defined radio.
//! Obtaining the audio is beyond the scope of this crate. If you
//! have a stereo signal, mix to mono first.
//!
//! ```
//! use ax25afsk::{AfskReceiverBuilder, Frame, FrameOut, ModulatorBuilder};
//!
//! // make some audio to receive
//! let frame: Frame = "KI5TOF>APRS,WIDE1-1:>hello world".parse().unwrap();
//! let mut modulator = ModulatorBuilder::new(22050).build();
//! let audio: Vec<i16> = modulator.modulate(&frame);
//!
//! // create an AfskReceiver with your audio sampling rate
//! let mut rx = AfskReceiverBuilder::new(22050)
//!     .with_squelch_threshold(32)  // minimum signal level
//!     .with_repair(false)          // brute-force repair of bad frames
//!     .build();
//!
//! // audio may be any iterator of integer samples
//! for evt in rx.iter(audio.iter().copied()) {
//!     match evt {
//!         FrameOut::Ready(Ok(frame)) => println!("{}", frame),
//!         FrameOut::Ready(Err(err)) => println!("bad frame: {}", err),
//!         FrameOut::Repaired(fixed) => println!("{}", fixed.frame()),
//!     }
//! }
//! assert_eq!(rx.stats().frames_ok, 1);
//! ```
//!
//! The receiver is created via a
//! [builder](struct.AfskReceiverBuilder.html). The
//! [`AfskReceiver`](struct.AfskReceiver.html) binds by iterator to
//! any source of integer PCM mono audio. The iterator consumes as
//! many samples as it needs to produce the next
//! [`FrameOut`](enum.FrameOut.html) event.
//!
//! To read raw 16-bit audio from a file or a pipe, see the
//! [`pcm`] module.
//!
//! ## Frames
//!
//! AX.25 [`Frame`]s may be parsed from the text form used by APRS
//! software,
//!
//! ```txt
//! SOURCE>DESTINATION,DIGI1,DIGI2:information
//! ```
//!
//! or decoded from the wire with [`Frame::from_wire()`]. Only UI
//! frames (control `0x03`, PID `0xF0`) are generated.
//!
//! ## Background
//!
//! AFSK1200 sends a *mark* tone of 1200 Hz or a *space* tone of
//! 2200 Hz for each baud. Data is NRZI-coded: a `0` bit changes the
//! tone and a `1` bit holds it. HDLC framing delimits each frame
//! with the flag `0x7E` and stuffs a `0` after every five `1` bits
//! so that the flag cannot appear inside a frame.
//!
//! The receiver demodulates with a delay-and-multiply correlator
//! and recovers the clock from the zero crossings of the result.
//! All of its signal processing is fixed-point.

pub mod bits;
pub mod crc;
pub mod design;
pub mod filter;
pub mod nrzi;
pub mod pcm;
pub mod receiver;
pub mod repair;
pub mod waveform;

mod builder;
mod callssid;
mod frame;
mod modulator;

pub use builder::{AfskReceiverBuilder, ModulatorBuilder};
pub use callssid::{CallSsid, CallSsidErr};
pub use frame::{prepare_received, Frame, FrameDecodeErr, FrameParseErr};
pub use modulator::Modulator;
pub use receiver::{AfskReceiver, FrameOut, ReceiverStats, SourceIter};
pub use repair::Repair;
