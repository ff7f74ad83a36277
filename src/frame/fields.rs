//! Bounded cursor over a frame payload.

use byteorder::{BigEndian, ByteOrder};

use crate::encoding::{self, TextEncoding};
use crate::error::{Id3Error, Result};

pub(crate) struct FieldReader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn bytes(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Id3Error::TruncatedFixedField {
                field,
                needed:    n,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.bytes(1, field)?[0])
    }

    pub fn u32(&mut self, field: &'static str) -> Result<u32> {
        Ok(BigEndian::read_u32(self.bytes(4, field)?))
    }

    pub fn language(&mut self) -> Result<[u8; 3]> {
        let b = self.bytes(3, "language")?;
        Ok([b[0], b[1], b[2]])
    }

    pub fn encoding(&mut self) -> Result<TextEncoding> {
        TextEncoding::from_byte(self.u8("encoding")?)
    }

    /// A terminated string in `encoding`.
    pub fn string(&mut self, enc: TextEncoding, field: &'static str) -> Result<String> {
        let (text, used) = encoding::decode_terminated(enc, &self.data[self.pos..], field)?;
        self.pos += used;
        Ok(text)
    }

    /// A terminated ISO-8859-1 string.
    pub fn latin1(&mut self, field: &'static str) -> Result<String> {
        self.string(TextEncoding::Latin1, field)
    }

    /// Everything left, as one string with an optional trailing terminator.
    pub fn text_rest(&mut self, enc: TextEncoding, field: &'static str) -> Result<String> {
        let text = encoding::decode_trailing(enc, self.rest(), field)?;
        Ok(text)
    }

    /// Everything left, as raw bytes.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }
}

/// Big-endian counter of any width, as used by PCNT and POPM.  Leading zero
/// bytes beyond 8 are tolerated.
pub(crate) fn decode_counter(bytes: &[u8], field: &'static str) -> Result<u64> {
    let significant = match bytes.iter().position(|&b| b != 0) {
        Some(first) => &bytes[first..],
        None        => return Ok(0),
    };
    if significant.len() > 8 {
        return Err(Id3Error::FieldOverflow { field });
    }
    Ok(significant.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Counters are written at least 4 bytes wide and grow as needed.
pub(crate) fn encode_counter(value: u64, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let needed = 8 - (value.leading_zeros() as usize / 8);
    out.extend_from_slice(&bytes[8 - needed.max(4)..]);
}
