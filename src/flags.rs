//! Frame flag processor.
//!
//! Turns the two raw flag bytes of a 2.3/2.4 frame header into
//! [`FrameFlags`], strips the optional prefix bytes those flags announce, and
//! undoes frame-local unsynchronisation and zlib compression.  Encoding runs
//! the same pipeline backwards and recomputes every size from the bytes it
//! actually produces.
//!
//! # Raw bit layout
//!
//! ```text
//!            status byte            format byte
//! 2.3   %abc0_0000            %ijk0_0000
//!        a tag-alter          i compression (+4 B decompressed size)
//!        b file-alter         j encryption  (+1 B method)
//!        c read-only          k grouping    (+1 B group id)
//!
//! 2.4   %0abc_0000            %0h00_kmnp
//!        a tag-alter          h grouping    (+1 B group id)
//!        b file-alter         k compression
//!        c read-only          m encryption  (+1 B method)
//!                             n unsynchronisation
//!                             p data-length indicator (+4 B syncsafe)
//! ```
//!
//! Prefix bytes are always read in the order group id, encryption method,
//! size field.  In 2.3 the size field is the 4-byte big-endian decompressed
//! size that immediately precedes the zlib stream; in 2.4 it is the
//! data-length indicator.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::{trace, warn};

use crate::config::ParseOptions;
use crate::error::{Id3Error, Result};
use crate::syncsafe;
use crate::unsync;
use crate::version::Version;

// ── Raw bits ──────────────────────────────────────────────────────────────────

pub const V23_TAG_ALTER:   u8 = 0x80;
pub const V23_FILE_ALTER:  u8 = 0x40;
pub const V23_READ_ONLY:   u8 = 0x20;
pub const V23_COMPRESSION: u8 = 0x80;
pub const V23_ENCRYPTION:  u8 = 0x40;
pub const V23_GROUPING:    u8 = 0x20;

pub const V24_TAG_ALTER:   u8 = 0x40;
pub const V24_FILE_ALTER:  u8 = 0x20;
pub const V24_READ_ONLY:   u8 = 0x10;
pub const V24_GROUPING:    u8 = 0x40;
pub const V24_COMPRESSION: u8 = 0x08;
pub const V24_ENCRYPTION:  u8 = 0x04;
pub const V24_UNSYNC:      u8 = 0x02;
pub const V24_DATA_LENGTH: u8 = 0x01;

// ── FrameFlags ────────────────────────────────────────────────────────────────

/// Version-normalised frame flags together with the values of the prefix
/// bytes they imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    /// Frame should be discarded if the tag is altered and the frame unknown.
    pub tag_alter_preservation:  bool,
    /// Frame should be discarded if the audio is altered and the frame unknown.
    pub file_alter_preservation: bool,
    pub read_only:               bool,
    pub grouping_identity:       Option<u8>,
    pub compression:             bool,
    /// Encryption method byte.
    pub encryption:              Option<u8>,
    /// Frame-local unsynchronisation (2.4 only).
    pub unsynchronisation:       bool,
    /// 2.4 data-length indicator, or the 2.3 decompressed size.  Always the
    /// length of the payload before compression and unsynchronisation.
    pub data_length:             Option<u32>,
}

/// Presence bits read straight from the header, before prefix bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct RawBits {
    grouping:    bool,
    encryption:  bool,
    data_length: bool,
}

impl FrameFlags {
    fn from_raw(version: Version, raw: [u8; 2]) -> (Self, RawBits) {
        let [status, format] = raw;
        match version {
            Version::V2_2 => (FrameFlags::default(), RawBits::default()),
            Version::V2_3 => {
                let flags = FrameFlags {
                    tag_alter_preservation:  status & V23_TAG_ALTER != 0,
                    file_alter_preservation: status & V23_FILE_ALTER != 0,
                    read_only:               status & V23_READ_ONLY != 0,
                    compression:             format & V23_COMPRESSION != 0,
                    ..FrameFlags::default()
                };
                let bits = RawBits {
                    grouping:    format & V23_GROUPING != 0,
                    encryption:  format & V23_ENCRYPTION != 0,
                    data_length: format & V23_COMPRESSION != 0,
                };
                (flags, bits)
            }
            Version::V2_4 => {
                let flags = FrameFlags {
                    tag_alter_preservation:  status & V24_TAG_ALTER != 0,
                    file_alter_preservation: status & V24_FILE_ALTER != 0,
                    read_only:               status & V24_READ_ONLY != 0,
                    compression:             format & V24_COMPRESSION != 0,
                    unsynchronisation:       format & V24_UNSYNC != 0,
                    ..FrameFlags::default()
                };
                let bits = RawBits {
                    grouping:    format & V24_GROUPING != 0,
                    encryption:  format & V24_ENCRYPTION != 0,
                    data_length: format & V24_DATA_LENGTH != 0,
                };
                (flags, bits)
            }
        }
    }

    /// Raw flag bytes for `version`.  Flags the version cannot express
    /// (unsynchronisation and a bare data-length indicator in 2.3) are
    /// dropped.
    pub fn to_raw(&self, version: Version) -> [u8; 2] {
        let mut status = 0u8;
        let mut format = 0u8;
        match version {
            Version::V2_2 => {}
            Version::V2_3 => {
                if self.tag_alter_preservation  { status |= V23_TAG_ALTER; }
                if self.file_alter_preservation { status |= V23_FILE_ALTER; }
                if self.read_only               { status |= V23_READ_ONLY; }
                if self.compression             { format |= V23_COMPRESSION; }
                if self.encryption.is_some()    { format |= V23_ENCRYPTION; }
                if self.grouping_identity.is_some() { format |= V23_GROUPING; }
            }
            Version::V2_4 => {
                if self.tag_alter_preservation  { status |= V24_TAG_ALTER; }
                if self.file_alter_preservation { status |= V24_FILE_ALTER; }
                if self.read_only               { status |= V24_READ_ONLY; }
                if self.grouping_identity.is_some() { format |= V24_GROUPING; }
                if self.compression             { format |= V24_COMPRESSION; }
                if self.encryption.is_some()    { format |= V24_ENCRYPTION; }
                if self.unsynchronisation       { format |= V24_UNSYNC; }
                if self.data_length.is_some()   { format |= V24_DATA_LENGTH; }
            }
        }
        [status, format]
    }
}

// ── Decode ────────────────────────────────────────────────────────────────────

/// Frame payload after flag processing.
#[derive(Debug)]
pub struct ProcessedPayload {
    pub flags:    FrameFlags,
    /// Plain payload, or the still-encrypted bytes when `flags.encryption`
    /// is set.
    pub data:     Vec<u8>,
    /// Non-fatal findings, e.g. a decompressed-size mismatch.
    pub warnings: Vec<Id3Error>,
}

impl ProcessedPayload {
    pub fn is_encrypted(&self) -> bool {
        self.flags.encryption.is_some()
    }
}

fn take<'a>(body: &mut &'a [u8], n: usize, field: &'static str) -> Result<&'a [u8]> {
    if body.len() < n {
        return Err(Id3Error::TruncatedFixedField { field, needed: n, available: body.len() });
    }
    let (head, rest) = body.split_at(n);
    *body = rest;
    Ok(head)
}

/// Run the decode pipeline over one frame body.
///
/// `tag_unsynchronised` is true when the whole frame region was already
/// de-unsynchronised at tag level; frame-local removal is then skipped so the
/// same bytes are never transformed twice.
pub fn decode_payload(
    version:            Version,
    raw:                [u8; 2],
    body:               &[u8],
    tag_unsynchronised: bool,
    options:            &ParseOptions,
) -> Result<ProcessedPayload> {
    let (mut flags, bits) = FrameFlags::from_raw(version, raw);
    let mut rest = body;

    if bits.grouping {
        flags.grouping_identity = Some(take(&mut rest, 1, "group id")?[0]);
    }
    if bits.encryption {
        flags.encryption = Some(take(&mut rest, 1, "encryption method")?[0]);
    }
    if bits.data_length {
        let field = take(&mut rest, 4, "data length")?;
        flags.data_length = Some(match version {
            Version::V2_4 => syncsafe::decode_u28([field[0], field[1], field[2], field[3]])?,
            _             => BigEndian::read_u32(field),
        });
    }

    let mut data = if flags.unsynchronisation && !tag_unsynchronised {
        unsync::remove(rest)
    } else {
        rest.to_vec()
    };

    let mut warnings = Vec::new();

    if flags.encryption.is_some() {
        trace!(method = ?flags.encryption, len = data.len(), "encrypted frame kept opaque");
        return Ok(ProcessedPayload { flags, data, warnings });
    }

    if flags.compression {
        let declared = flags.data_length.map(|n| n as usize);
        let (inflated, mismatch) = inflate(&data, declared, options.max_decompressed_size)?;
        if let Some(err) = mismatch {
            warn!(%err, "compressed frame size mismatch");
            warnings.push(err);
        }
        data = inflated;
    }

    Ok(ProcessedPayload { flags, data, warnings })
}

/// Inflate a zlib stream.  A declared size above `limit` is rejected before
/// anything is allocated, and at most `limit + 1` bytes are ever produced.
pub fn inflate(
    data:     &[u8],
    declared: Option<usize>,
    limit:    usize,
) -> Result<(Vec<u8>, Option<Id3Error>)> {
    if let Some(declared) = declared {
        if declared > limit {
            return Err(Id3Error::DecompressionBombRejected { declared, limit });
        }
    }

    // Deflate cannot expand beyond ~1032:1, so that also bounds the reservation.
    let reserve = declared.unwrap_or(0).min(data.len().saturating_mul(1032));
    let mut out = Vec::with_capacity(reserve);
    ZlibDecoder::new(data)
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| Id3Error::DecompressionFailed(e.to_string()))?;

    if out.len() > limit {
        return Err(Id3Error::DecompressionBombRejected { declared: out.len(), limit });
    }

    let mismatch = match declared {
        Some(expected) if expected != out.len() => {
            Some(Id3Error::CompressionSizeMismatch { expected, actual: out.len() })
        }
        _ => None,
    };
    Ok((out, mismatch))
}

/// Compress `data` as a zlib stream.
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder
        .write_all(data)
        .map_err(|e| Id3Error::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| Id3Error::CompressionFailed(e.to_string()))
}

// ── Encode ────────────────────────────────────────────────────────────────────

/// What the frame body holds when it reaches the flag processor.
#[derive(Debug, Clone, Copy)]
pub enum PayloadInput<'a> {
    /// Freshly encoded plain payload.
    Plain(&'a [u8]),
    /// Bytes kept opaque because the frame is encrypted; already compressed
    /// if the frame says so.
    Encrypted { method: u8, data: &'a [u8] },
}

/// Run the encode pipeline.  Returns the raw flag bytes and the frame body
/// (prefix bytes included) for `version`.
pub fn encode_payload(
    version:            Version,
    flags:              &FrameFlags,
    input:              PayloadInput<'_>,
    tag_unsynchronised: bool,
    compression_level:  u32,
) -> Result<([u8; 2], Vec<u8>)> {
    if !version.is_writable() {
        return Err(Id3Error::UnsupportedVersion(version.major()));
    }

    let mut out_flags = *flags;
    let transformed = match input {
        PayloadInput::Plain(plain) => {
            out_flags.encryption = None;
            let length = u32::try_from(plain.len())
                .map_err(|_| Id3Error::TagTooLarge { size: plain.len() })?;
            if flags.compression {
                out_flags.data_length = Some(length);
                deflate(plain, compression_level)?
            } else {
                out_flags.data_length = match version {
                    Version::V2_4 if flags.data_length.is_some() => Some(length),
                    _ => None,
                };
                plain.to_vec()
            }
        }
        PayloadInput::Encrypted { method, data } => {
            out_flags.encryption = Some(method);
            if flags.compression && out_flags.data_length.is_none() {
                // Unknown decompressed size; the best available bound.
                out_flags.data_length = Some(data.len() as u32);
            }
            if !flags.compression && version == Version::V2_3 {
                out_flags.data_length = None;
            }
            data.to_vec()
        }
    };

    let frame_unsync = version == Version::V2_4 && flags.unsynchronisation && !tag_unsynchronised;
    out_flags.unsynchronisation = frame_unsync;
    let transformed = if frame_unsync { unsync::insert(&transformed) } else { transformed };

    let mut body = Vec::with_capacity(transformed.len() + 6);
    if let Some(group) = out_flags.grouping_identity {
        body.push(group);
    }
    if let Some(method) = out_flags.encryption {
        body.push(method);
    }
    if let Some(length) = out_flags.data_length {
        match version {
            Version::V2_4 => body.extend_from_slice(&syncsafe::encode_u28(length)?),
            _             => body.write_u32::<BigEndian>(length)?,
        }
    }
    body.extend_from_slice(&transformed);

    Ok((out_flags.to_raw(version), body))
}
