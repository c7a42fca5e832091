//! Binary primitives shared by the atlas and sheet formats
//!
//! Every multi-byte value is little-endian. Strings carry a 7-bit
//! variable-length byte count followed by UTF-8 bytes, the layout used by
//! the atlas files shipped with the game.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Upper bound for a single string payload.
pub const MAX_STRING_LEN: usize = 1 << 20;

/// Errors raised while decoding atlas or sheet data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// Stream ended before a value was complete
    #[error("Unexpected end of stream while reading {0}")]
    UnexpectedEof(&'static str),
    /// A length or count prefix was negative or implausibly large
    #[error("Invalid {what} length: {len}")]
    InvalidLength { what: &'static str, len: i64 },
    /// String payload was not UTF-8
    #[error("Invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Sheet header declared unusable dimensions
    #[error("Invalid sheet dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    /// Sheet run stream ended early (strict decoding only)
    #[error("Sheet data truncated: expected {expected} pixels, got {read}")]
    TruncatedSheet { expected: u64, read: u64 },
    /// Structurally invalid record
    #[error("Malformed data: {0}")]
    Malformed(String),
    /// Underlying I/O failure other than end of stream
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl FormatError {
    fn from_io(e: io::Error, what: &'static str) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::UnexpectedEof(what)
        } else {
            FormatError::Io(e)
        }
    }
}

/// Little-endian reader for atlas primitives.
pub struct AtlasReader<R> {
    inner: R,
}

impl<R: Read> AtlasReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_i32(&mut self) -> Result<i32, FormatError> {
        self.inner.read_i32::<LittleEndian>().map_err(|e| FormatError::from_io(e, "int32"))
    }

    pub fn read_f32(&mut self) -> Result<f32, FormatError> {
        self.inner.read_f32::<LittleEndian>().map_err(|e| FormatError::from_io(e, "float"))
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        self.inner.read_u8().map_err(|e| FormatError::from_io(e, "byte"))
    }

    pub fn read_bool(&mut self) -> Result<bool, FormatError> {
        self.inner.read_u8().map(|b| b != 0).map_err(|e| FormatError::from_io(e, "bool"))
    }

    /// Read an element count, rejecting negative values.
    pub fn read_count(&mut self, what: &'static str) -> Result<usize, FormatError> {
        let n = self.read_i32()?;
        if n < 0 {
            return Err(FormatError::InvalidLength { what, len: n as i64 });
        }
        Ok(n as usize)
    }

    /// Read a 7-bit encoded length (at most five bytes).
    fn read_var_len(&mut self) -> Result<i64, FormatError> {
        let mut value: u32 = 0;
        for i in 0..5 {
            let byte = self.inner.read_u8().map_err(|e| FormatError::from_io(e, "string length"))?;
            if i == 4 && byte > 0x0F {
                return Err(FormatError::InvalidLength { what: "string", len: -1 });
            }
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value as i32 as i64);
            }
        }
        Err(FormatError::InvalidLength { what: "string", len: -1 })
    }

    pub fn read_string(&mut self) -> Result<String, FormatError> {
        let len = self.read_var_len()?;
        if len < 0 || len as usize > MAX_STRING_LEN {
            return Err(FormatError::InvalidLength { what: "string", len });
        }
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf).map_err(|e| FormatError::from_io(e, "string"))?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Little-endian writer for atlas primitives.
pub struct AtlasWriter<W> {
    inner: W,
}

impl<W: Write> AtlasWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_i32(&mut self, v: i32) -> io::Result<()> {
        self.inner.write_i32::<LittleEndian>(v)
    }

    pub fn write_f32(&mut self, v: f32) -> io::Result<()> {
        self.inner.write_f32::<LittleEndian>(v)
    }

    pub fn write_u8(&mut self, v: u8) -> io::Result<()> {
        self.inner.write_u8(v)
    }

    pub fn write_bool(&mut self, v: bool) -> io::Result<()> {
        self.inner.write_u8(v as u8)
    }

    /// Write a count as int32, failing if it does not fit.
    pub fn write_count(&mut self, n: usize) -> io::Result<()> {
        let n = i32::try_from(n)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "count exceeds int32"))?;
        self.write_i32(n)
    }

    pub fn write_string(&mut self, s: &str) -> io::Result<()> {
        if s.len() > MAX_STRING_LEN {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "string too long"));
        }
        let mut len = s.len() as u32;
        while len >= 0x80 {
            self.inner.write_u8((len as u8) | 0x80)?;
            len >>= 7;
        }
        self.inner.write_u8(len as u8)?;
        self.inner.write_all(s.as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
