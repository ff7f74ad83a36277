//! Parse and render options.

use crate::version::Version;

/// Default ceiling on a single frame's decompressed size: 16 MiB.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 16 * 1024 * 1024;
/// Default depth limit for CHAP/CTOC embedded frames.
pub const DEFAULT_MAX_NESTING_DEPTH:     usize = 4;
/// Default zero padding appended after the frames.
pub const DEFAULT_PADDING:               usize = 1024;
/// Default zlib level for frames flagged as compressed.
pub const DEFAULT_COMPRESSION_LEVEL:     u32   = 6;

// ── ParseOptions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Frames declaring a larger decompressed size are rejected before any
    /// allocation; inflation never produces more than this many bytes.
    pub max_decompressed_size: usize,
    pub max_nesting_depth:     usize,
    /// Check the extended-header CRC-32 when one is present.
    pub verify_crc:            bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            max_nesting_depth:     DEFAULT_MAX_NESTING_DEPTH,
            verify_crc:            true,
        }
    }
}

// ── WriteOptions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Target version; 2.2 is rejected.
    pub version:           Version,
    /// Zero bytes appended after the last frame.  Ignored when a v2.4 footer
    /// is written.
    pub padding:           usize,
    /// Overrides the tag's own unsynchronisation flag when set.
    pub unsynchronisation: Option<bool>,
    pub compression_level: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version:           Version::V2_4,
            padding:           DEFAULT_PADDING,
            unsynchronisation: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl WriteOptions {
    pub fn for_version(version: Version) -> Self {
        Self { version, ..Self::default() }
    }
}
