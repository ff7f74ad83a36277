//! Error taxonomy shared by every stage of the tag codec.
//!
//! Nothing in the decode or encode path panics.  Structural problems inside a
//! single frame are reported per frame (see [`crate::FrameIssue`]) and
//! never abort the enclosing tag; only a malformed outer header fails
//! [`crate::Tag::parse`] as a whole.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Id3Error {
    // ── Outer header ────────────────────────────────────────────────────────
    #[error("Invalid magic: expected \"ID3\"")]
    MagicMismatch,
    #[error("Unsupported ID3v2 major version: 2.{0}")]
    UnsupportedVersion(u8),
    #[error("Truncated header: needed {needed} bytes, {available} available")]
    TruncatedHeader { needed: usize, available: usize },
    #[error("Syncsafe byte {index} has its high bit set (0x{byte:02x})")]
    InvalidSyncsafeByte { index: usize, byte: u8 },
    #[error("ID3v2.2 tag-level compression has no defined scheme")]
    CompressedLegacyTag,
    /// Non-fatal: the extended header CRC does not match the frame region.
    #[error("Tag CRC-32 mismatch: extended header records 0x{expected:08x}, computed 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    // ── Frame structure ─────────────────────────────────────────────────────
    #[error("Invalid frame ID {0:?}: expected 3 or 4 characters from A-Z0-9")]
    InvalidFrameId(String),
    #[error("Frame {id} declares {declared} bytes but only {remaining} remain")]
    FrameSizeExceedsRemainingBytes { id: String, declared: usize, remaining: usize },
    #[error("Unterminated string in field '{field}'")]
    UnterminatedString { field: &'static str },
    #[error("Truncated fixed field '{field}': needed {needed} bytes, {available} available")]
    TruncatedFixedField { field: &'static str, needed: usize, available: usize },
    #[error("Invalid text encoding byte 0x{0:02x}")]
    InvalidTextEncoding(u8),
    #[error("Malformed text in field '{field}'")]
    MalformedText { field: &'static str },
    #[error("Field '{field}' contains a string terminator")]
    EmbeddedTerminator { field: &'static str },
    #[error("Field '{field}' does not fit its numeric type")]
    FieldOverflow { field: &'static str },
    #[error("Embedded frames nested deeper than {depth} levels")]
    NestingTooDeep { depth: usize },

    // ── Compression ─────────────────────────────────────────────────────────
    /// Non-fatal: the frame is kept, the mismatch is reported as a warning.
    #[error("Decompressed size mismatch: header records {expected}, stream produced {actual}")]
    CompressionSizeMismatch { expected: usize, actual: usize },
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),
    #[error("Declared decompressed size {declared} exceeds limit {limit}")]
    DecompressionBombRejected { declared: usize, limit: usize },
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    // ── Render ──────────────────────────────────────────────────────────────
    #[error("Tag body of {size} bytes does not fit a 28-bit syncsafe size")]
    TagTooLarge { size: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Id3Error {
    /// Warnings leave the frame intact; everything else replaces or drops it.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Id3Error::CompressionSizeMismatch { .. } | Id3Error::CrcMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Id3Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_the_non_fatal_findings() {
        assert!(Id3Error::CompressionSizeMismatch { expected: 9, actual: 6 }.is_warning());
        assert!(Id3Error::CrcMismatch { expected: 1, actual: 2 }.is_warning());
        assert!(!Id3Error::DecompressionFailed("bad".into()).is_warning());
        assert!(!Id3Error::EmbeddedTerminator { field: "description" }.is_warning());
    }
}
