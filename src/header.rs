//! Outer tag header, extended header and v2.4 footer.
//!
//! ```text
//! "ID3" major revision flags size[4]     size is syncsafe for every version
//! "3DI" major revision flags size[4]     footer, v2.4 only
//! ```

use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::{Id3Error, Result};
use crate::frame::fields::FieldReader;
use crate::syncsafe;
use crate::version::Version;

pub const MAGIC:        &[u8; 3] = b"ID3";
pub const FOOTER_MAGIC: &[u8; 3] = b"3DI";
pub const HEADER_LEN:   usize = 10;
pub const FOOTER_LEN:   usize = 10;

pub const FLAG_UNSYNC:       u8 = 0x80;
pub const FLAG_EXTENDED:     u8 = 0x40;
pub const FLAG_EXPERIMENTAL: u8 = 0x20;
pub const FLAG_FOOTER:       u8 = 0x10;
/// Same bit as [`FLAG_EXTENDED`]; v2.2 used it for an undefined compression scheme.
pub const FLAG_V22_COMPRESSION: u8 = 0x40;

// ── TagFlags ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagFlags {
    pub unsynchronisation: bool,
    pub extended_header:   bool,
    pub experimental:      bool,
    /// v2.4 only.
    pub footer:            bool,
}

impl TagFlags {
    pub fn from_byte(version: Version, byte: u8) -> Result<Self> {
        let unsynchronisation = byte & FLAG_UNSYNC != 0;
        match version {
            Version::V2_2 => {
                if byte & FLAG_V22_COMPRESSION != 0 {
                    return Err(Id3Error::CompressedLegacyTag);
                }
                Ok(TagFlags { unsynchronisation, ..TagFlags::default() })
            }
            Version::V2_3 | Version::V2_4 => Ok(TagFlags {
                unsynchronisation,
                extended_header: byte & FLAG_EXTENDED != 0,
                experimental:    byte & FLAG_EXPERIMENTAL != 0,
                footer:          version == Version::V2_4 && byte & FLAG_FOOTER != 0,
            }),
        }
    }

    pub fn to_byte(self, version: Version) -> u8 {
        let mut byte = 0u8;
        if self.unsynchronisation { byte |= FLAG_UNSYNC; }
        if version == Version::V2_2 {
            return byte;
        }
        if self.extended_header { byte |= FLAG_EXTENDED; }
        if self.experimental    { byte |= FLAG_EXPERIMENTAL; }
        if self.footer && version == Version::V2_4 { byte |= FLAG_FOOTER; }
        byte
    }
}

// ── TagHeader ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub version:  Version,
    /// Informational only.
    pub revision: u8,
    pub flags:    TagFlags,
    /// Bytes after the header, excluding any footer.
    pub size:     u32,
}

impl TagHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_with_magic(bytes, MAGIC)
    }

    pub fn parse_footer(bytes: &[u8]) -> Result<Self> {
        Self::parse_with_magic(bytes, FOOTER_MAGIC)
    }

    fn parse_with_magic(bytes: &[u8], magic: &[u8; 3]) -> Result<Self> {
        let probe = bytes.len().min(magic.len());
        if bytes[..probe] != magic[..probe] {
            return Err(Id3Error::MagicMismatch);
        }
        if bytes.len() < HEADER_LEN {
            return Err(Id3Error::TruncatedHeader { needed: HEADER_LEN, available: bytes.len() });
        }
        let version = Version::from_major(bytes[3])?;
        let revision = bytes[4];
        let flags = TagFlags::from_byte(version, bytes[5])?;
        let size = syncsafe::decode_u28([bytes[6], bytes[7], bytes[8], bytes[9]])?;
        Ok(Self { version, revision, flags, size })
    }

    /// Header, body and footer together.
    pub fn total_len(&self) -> usize {
        let footer = if self.flags.footer { FOOTER_LEN } else { 0 };
        HEADER_LEN + self.size as usize + footer
    }

    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        self.write_with_magic(writer, MAGIC)
    }

    pub fn write_footer<W: Write>(&self, writer: W) -> Result<()> {
        self.write_with_magic(writer, FOOTER_MAGIC)
    }

    fn write_with_magic<W: Write>(&self, mut writer: W, magic: &[u8; 3]) -> Result<()> {
        writer.write_all(magic)?;
        writer.write_u8(self.version.major())?;
        writer.write_u8(self.revision)?;
        writer.write_u8(self.flags.to_byte(self.version))?;
        writer.write_all(&syncsafe::encode_u28(self.size)?)?;
        Ok(())
    }
}

// ── ExtendedHeader ────────────────────────────────────────────────────────────

const V23_EXT_CRC: u8 = 0x80;

const V24_EXT_UPDATE:       u8 = 0x40;
const V24_EXT_CRC:          u8 = 0x20;
const V24_EXT_RESTRICTIONS: u8 = 0x10;

/// Extended header in a version-neutral form.  Whether a CRC is written is
/// decided by `crc.is_some()`; the value itself is recomputed on render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtendedHeader {
    /// v2.4: the tag updates an earlier one.
    pub update:       bool,
    /// CRC-32 of the frame region as recorded in the header.
    pub crc:          Option<u32>,
    /// v2.3: padding size as recorded.
    pub padding_size: u32,
    /// v2.4: the raw restrictions byte.
    pub restrictions: Option<u8>,
}

impl ExtendedHeader {
    /// Parse from the start of the tag body.  Returns the header and the
    /// number of bytes it occupies.
    pub fn parse(version: Version, data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 4 {
            return Err(Id3Error::TruncatedHeader { needed: 4, available: data.len() });
        }
        match version {
            Version::V2_2 => Ok((ExtendedHeader::default(), 0)),
            Version::V2_3 => {
                // Size excludes the size field itself.
                let size = BigEndian::read_u32(&data[..4]) as usize;
                let total = size.saturating_add(4);
                if data.len() < total {
                    return Err(Id3Error::TruncatedHeader { needed: total, available: data.len() });
                }
                let mut r = FieldReader::new(&data[4..total]);
                let flags = r.bytes(2, "extended header flags")?;
                let padding_size = r.u32("padding size")?;
                let crc = if flags[0] & V23_EXT_CRC != 0 {
                    Some(r.u32("crc")?)
                } else {
                    None
                };
                Ok((ExtendedHeader { crc, padding_size, ..ExtendedHeader::default() }, total))
            }
            Version::V2_4 => {
                // Size includes the size field.
                let size = syncsafe::decode_u28([data[0], data[1], data[2], data[3]])? as usize;
                if size < 6 {
                    return Err(Id3Error::TruncatedFixedField {
                        field:     "extended header",
                        needed:    6,
                        available: size,
                    });
                }
                if data.len() < size {
                    return Err(Id3Error::TruncatedHeader { needed: size, available: data.len() });
                }
                let mut r = FieldReader::new(&data[4..size]);
                let flag_bytes = r.u8("extended flag count")? as usize;
                let flags = r.bytes(flag_bytes.max(1), "extended flags")?[0];

                let mut header = ExtendedHeader::default();
                if flags & V24_EXT_UPDATE != 0 {
                    let len = r.u8("update data length")? as usize;
                    r.bytes(len, "update data")?;
                    header.update = true;
                }
                if flags & V24_EXT_CRC != 0 {
                    let len = r.u8("crc data length")? as usize;
                    let crc = r.bytes(len, "crc")?;
                    if crc.len() != 5 {
                        return Err(Id3Error::TruncatedFixedField { field: "crc", needed: 5, available: crc.len() });
                    }
                    header.crc = Some(syncsafe::decode_u35([crc[0], crc[1], crc[2], crc[3], crc[4]])?);
                }
                if flags & V24_EXT_RESTRICTIONS != 0 {
                    let len = r.u8("restrictions length")? as usize;
                    let restrictions = r.bytes(len, "restrictions")?;
                    header.restrictions = restrictions.first().copied();
                }
                Ok((header, size))
            }
        }
    }

    /// Append the header in `version`'s shape.  `crc` is written when given;
    /// `padding_size` is only recorded by v2.3.
    pub fn write(
        &self,
        version:      Version,
        crc:          Option<u32>,
        padding_size: u32,
        out:          &mut Vec<u8>,
    ) -> Result<()> {
        match version {
            Version::V2_2 => return Err(Id3Error::UnsupportedVersion(version.major())),
            Version::V2_3 => {
                let size: u32 = if crc.is_some() { 10 } else { 6 };
                out.write_u32::<BigEndian>(size)?;
                out.push(if crc.is_some() { V23_EXT_CRC } else { 0 });
                out.push(0);
                out.write_u32::<BigEndian>(padding_size)?;
                if let Some(crc) = crc {
                    out.write_u32::<BigEndian>(crc)?;
                }
            }
            Version::V2_4 => {
                let mut flags = 0u8;
                let mut data = Vec::new();
                if self.update {
                    flags |= V24_EXT_UPDATE;
                    data.push(0);
                }
                if let Some(crc) = crc {
                    flags |= V24_EXT_CRC;
                    data.push(5);
                    data.extend_from_slice(&syncsafe::encode_u35(crc));
                }
                if let Some(restrictions) = self.restrictions {
                    flags |= V24_EXT_RESTRICTIONS;
                    data.push(1);
                    data.push(restrictions);
                }
                let size = (6 + data.len()) as u32;
                out.extend_from_slice(&syncsafe::encode_u28(size)?);
                out.push(1);
                out.push(flags);
                out.extend_from_slice(&data);
            }
        }
        Ok(())
    }
}
