//! Raw PCM sample I/O
//!
//! Reads and writes headerless 16-bit little-endian mono audio,
//! as produced by `sox -t raw` or `rtl_fm`.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Sample encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian
    #[default]
    S16Le,

    /// Unsigned 16-bit little-endian, offset by 32768
    U16Le,
}

/// Reads `i16` samples from a byte stream
///
/// Unsigned input is re-centered around zero. Iteration ends at
/// the end of the stream or on the first read error. A trailing
/// odd byte is ignored.
///
/// ```
/// use ax25afsk::pcm::{PcmReader, SampleFormat};
///
/// let bytes: &[u8] = &[0x01, 0x00, 0xFF, 0xFF, 0x7F];
/// let samples: Vec<i16> = PcmReader::new(bytes, SampleFormat::S16Le).collect();
/// assert_eq!(samples, vec![1, -1]);
/// ```
#[derive(Debug)]
pub struct PcmReader<R>
where
    R: Read,
{
    inner: R,
    format: SampleFormat,
}

impl<R> PcmReader<R>
where
    R: Read,
{
    /// Read samples in `format` from `inner`
    ///
    /// Wrap `inner` in a `BufReader` if it is unbuffered.
    pub fn new(inner: R, format: SampleFormat) -> Self {
        Self { inner, format }
    }

    /// Sample encoding
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Consume, returning the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> Iterator for PcmReader<R>
where
    R: Read,
{
    type Item = i16;

    fn next(&mut self) -> Option<Self::Item> {
        match self.format {
            SampleFormat::S16Le => self.inner.read_i16::<LittleEndian>().ok(),
            SampleFormat::U16Le => {
                let sa = self.inner.read_u16::<LittleEndian>().ok()?;
                Some((sa as i32 - 32768) as i16)
            }
        }
    }
}

/// Write `samples` as signed 16-bit little-endian
pub fn write_samples<W>(out: &mut W, samples: &[i16]) -> io::Result<()>
where
    W: Write,
{
    for &sa in samples {
        out.write_i16::<LittleEndian>(sa)?;
    }
    Ok(())
}
