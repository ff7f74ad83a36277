//! String codec for the four ID3v2 text encodings.
//!
//! | Byte | Encoding                 | Terminator | Versions |
//! |------|--------------------------|------------|----------|
//! | 0x00 | ISO-8859-1               | `00`       | all      |
//! | 0x01 | UTF-16 with BOM          | `00 00`    | all      |
//! | 0x02 | UTF-16BE without BOM     | `00 00`    | 2.4      |
//! | 0x03 | UTF-8                    | `00`       | 2.4      |
//!
//! Every UTF-16 string carries its own BOM.  A missing BOM is read as
//! little-endian, which is what writers that omit it almost always mean.
//! The encoder writes little-endian with an `FF FE` BOM.

use crate::error::{Id3Error, Result};
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    #[default]
    Latin1,
    Utf16,
    Utf16Be,
    Utf8,
}

impl TextEncoding {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(TextEncoding::Latin1),
            1 => Ok(TextEncoding::Utf16),
            2 => Ok(TextEncoding::Utf16Be),
            3 => Ok(TextEncoding::Utf8),
            other => Err(Id3Error::InvalidTextEncoding(other)),
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        match self {
            TextEncoding::Latin1  => 0,
            TextEncoding::Utf16   => 1,
            TextEncoding::Utf16Be => 2,
            TextEncoding::Utf8    => 3,
        }
    }

    #[inline]
    pub fn terminator(self) -> &'static [u8] {
        match self {
            TextEncoding::Latin1 | TextEncoding::Utf8   => &[0],
            TextEncoding::Utf16 | TextEncoding::Utf16Be => &[0, 0],
        }
    }

    /// The encoding actually written for `version` given the strings the
    /// frame carries.  2.3 has no UTF-8 or BOM-less UTF-16, and Latin-1
    /// cannot hold code points above U+00FF.
    pub fn effective<'a, I>(self, version: Version, texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wide = TextEncoding::widest_for(version);
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf16Be if !version.supports_utf8() => wide,
            TextEncoding::Latin1 if !texts.into_iter().all(fits_latin1) => wide,
            other => other,
        }
    }

    fn widest_for(version: Version) -> Self {
        if version.supports_utf8() { TextEncoding::Utf8 } else { TextEncoding::Utf16 }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Latin1  => "latin1",
            TextEncoding::Utf16   => "utf16",
            TextEncoding::Utf16Be => "utf16be",
            TextEncoding::Utf8    => "utf8",
        }
    }
}

fn fits_latin1(s: &str) -> bool {
    s.chars().all(|c| (c as u32) <= 0xFF)
}

// ── Terminators ──────────────────────────────────────────────────────────────

/// Offset of the first terminator in `bytes`.  UTF-16 terminators must be
/// 2-byte aligned so a `00` high byte is never mistaken for the end.
pub fn find_terminator(encoding: TextEncoding, bytes: &[u8]) -> Option<usize> {
    match encoding {
        TextEncoding::Latin1 | TextEncoding::Utf8 => bytes.iter().position(|&b| b == 0),
        TextEncoding::Utf16 | TextEncoding::Utf16Be => bytes
            .chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|unit| unit * 2),
    }
}

/// Decode one terminated string from the front of `bytes`.  Returns the text
/// and the number of bytes consumed including the terminator.
pub fn decode_terminated(
    encoding: TextEncoding,
    bytes:    &[u8],
    field:    &'static str,
) -> Result<(String, usize)> {
    let end = find_terminator(encoding, bytes)
        .ok_or(Id3Error::UnterminatedString { field })?;
    let text = decode(encoding, &bytes[..end], field)?;
    Ok((text, end + encoding.terminator().len()))
}

/// Decode all of `bytes` as one string, dropping a single trailing terminator
/// if present.  Inner terminators are kept as `\0` characters.
pub fn decode_trailing(encoding: TextEncoding, bytes: &[u8], field: &'static str) -> Result<String> {
    let term = encoding.terminator();
    let body = if bytes.len() >= term.len() && bytes.ends_with(term) && aligned(encoding, bytes.len()) {
        &bytes[..bytes.len() - term.len()]
    } else {
        bytes
    };
    decode(encoding, body, field)
}

fn aligned(encoding: TextEncoding, len: usize) -> bool {
    match encoding {
        TextEncoding::Utf16 | TextEncoding::Utf16Be => len % 2 == 0,
        _ => true,
    }
}

// ── Decode ───────────────────────────────────────────────────────────────────

/// Decode `bytes` (no terminator) in `encoding`.
pub fn decode(encoding: TextEncoding, bytes: &[u8], field: &'static str) -> Result<String> {
    match encoding {
        TextEncoding::Latin1 => Ok(decode_latin1(bytes)),
        TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
            .map_err(|_| Id3Error::MalformedText { field }),
        TextEncoding::Utf16 => match bytes {
            [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, false, field),
            [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, true, field),
            _                       => decode_utf16(bytes, false, field),
        },
        TextEncoding::Utf16Be => decode_utf16(bytes, true, field),
    }
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_utf16(bytes: &[u8], big_endian: bool, field: &'static str) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Id3Error::MalformedText { field });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).map_err(|_| Id3Error::MalformedText { field })
}

// ── Encode ───────────────────────────────────────────────────────────────────

/// Append `text` without a terminator.
pub fn encode(encoding: TextEncoding, text: &str, out: &mut Vec<u8>) {
    match encoding {
        TextEncoding::Latin1 => encode_latin1(text, out),
        TextEncoding::Utf8 => out.extend_from_slice(text.as_bytes()),
        TextEncoding::Utf16 => {
            out.extend_from_slice(&[0xFF, 0xFE]);
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
        TextEncoding::Utf16Be => {
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
    }
}

/// Append `text` followed by the encoding's terminator.  A NUL inside
/// `text` would end the field early on the next read, so it is refused.
pub fn encode_terminated(
    encoding: TextEncoding,
    text:     &str,
    field:    &'static str,
    out:      &mut Vec<u8>,
) -> Result<()> {
    if text.contains('\0') {
        return Err(Id3Error::EmbeddedTerminator { field });
    }
    encode(encoding, text, out);
    out.extend_from_slice(encoding.terminator());
    Ok(())
}

/// Append a trailing field.  A terminator is only written when the text
/// itself ends in NUL, which is exactly when [`decode_trailing`] would
/// otherwise eat a character.
pub fn encode_trailing(encoding: TextEncoding, text: &str, out: &mut Vec<u8>) {
    encode(encoding, text, out);
    if text.ends_with('\0') {
        out.extend_from_slice(encoding.terminator());
    }
}

/// Latin-1 fields (MIME types, owners, URLs) replace unrepresentable
/// characters with `?`.
pub fn encode_latin1(text: &str, out: &mut Vec<u8>) {
    out.extend(text.chars().map(|c| u8::try_from(c as u32).unwrap_or(b'?')));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encoding_bytes() {
        for b in 0..=3u8 {
            assert_eq!(TextEncoding::from_byte(b).unwrap().to_byte(), b);
        }
        assert!(matches!(TextEncoding::from_byte(4), Err(Id3Error::InvalidTextEncoding(4))));
    }

    #[test]
    fn latin1_maps_bytes_directly() {
        assert_eq!(decode(TextEncoding::Latin1, &[0x43, 0x61, 0x66, 0xE9], "t").unwrap(), "Café");
        let mut out = Vec::new();
        encode_latin1("Café ♥", &mut out);
        assert_eq!(out, vec![0x43, 0x61, 0x66, 0xE9, 0x20, b'?']);
    }

    #[test]
    fn utf16_bom_detection() {
        let le = [0xFF, 0xFE, b'H', 0x00, b'i', 0x00];
        let be = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        let none = [b'H', 0x00, b'i', 0x00];
        assert_eq!(decode(TextEncoding::Utf16, &le, "t").unwrap(), "Hi");
        assert_eq!(decode(TextEncoding::Utf16, &be, "t").unwrap(), "Hi");
        assert_eq!(decode(TextEncoding::Utf16, &none, "t").unwrap(), "Hi");
        assert_eq!(decode(TextEncoding::Utf16Be, &[0x00, b'H'], "t").unwrap(), "H");
    }

    #[test]
    fn utf16_terminator_is_aligned() {
        // "Ā" is 0x0100 LE -> 00 01; the 00 at odd offset 1..3 must not match.
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x41, 0x00];
        assert_eq!(find_terminator(TextEncoding::Utf16Be, &bytes), Some(2));
        let bytes = [0x41, 0x00, 0x00, 0x42, 0x00, 0x00];
        assert_eq!(find_terminator(TextEncoding::Utf16, &bytes), Some(4));
    }

    #[test]
    fn terminated_string_requires_terminator() {
        let (text, used) = decode_terminated(TextEncoding::Latin1, b"abc\0def", "d").unwrap();
        assert_eq!((text.as_str(), used), ("abc", 4));
        assert!(matches!(
            decode_terminated(TextEncoding::Utf8, b"abc", "description"),
            Err(Id3Error::UnterminatedString { field: "description" })
        ));
    }

    #[test]
    fn trailing_terminator_dropped_once() {
        assert_eq!(decode_trailing(TextEncoding::Utf8, b"abc\0", "t").unwrap(), "abc");
        assert_eq!(decode_trailing(TextEncoding::Utf8, b"a\0b\0", "t").unwrap(), "a\0b");
        assert_eq!(decode_trailing(TextEncoding::Latin1, b"abc", "t").unwrap(), "abc");
    }

    #[test]
    fn trailing_field_survives_inner_nul() {
        for enc in [TextEncoding::Latin1, TextEncoding::Utf16, TextEncoding::Utf8] {
            for text in ["", "plain", "ends\0"] {
                let mut out = Vec::new();
                encode_trailing(enc, text, &mut out);
                assert_eq!(decode_trailing(enc, &out, "t").unwrap(), text);
            }
        }
    }

    #[test]
    fn malformed_sequences_rejected() {
        assert!(decode(TextEncoding::Utf8, &[0xC3], "t").is_err());
        assert!(decode(TextEncoding::Utf16Be, &[0xD8, 0x00], "t").is_err());
        assert!(decode(TextEncoding::Utf16, &[0x41], "t").is_err());
    }

    #[test]
    fn effective_encoding_per_version() {
        assert_eq!(TextEncoding::Utf8.effective(Version::V2_3, ["x"]), TextEncoding::Utf16);
        assert_eq!(TextEncoding::Utf8.effective(Version::V2_4, ["x"]), TextEncoding::Utf8);
        assert_eq!(TextEncoding::Latin1.effective(Version::V2_4, ["日本"]), TextEncoding::Utf8);
        assert_eq!(TextEncoding::Latin1.effective(Version::V2_3, ["日本"]), TextEncoding::Utf16);
        assert_eq!(TextEncoding::Latin1.effective(Version::V2_3, ["Café"]), TextEncoding::Latin1);
    }

    proptest! {
        #[test]
        fn unicode_roundtrip(s in "[^\u{0}]{0,40}") {
            for enc in [TextEncoding::Utf8, TextEncoding::Utf16, TextEncoding::Utf16Be] {
                let mut out = Vec::new();
                encode_terminated(enc, &s, "t", &mut out).unwrap();
                out.extend_from_slice(b"tail");
                let (back, used) = decode_terminated(enc, &out, "t").unwrap();
                prop_assert_eq!(&back, &s);
                prop_assert_eq!(&out[used..], b"tail");
            }
        }
    }
}
