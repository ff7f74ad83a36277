//! High-level [`Tag`] API: the embedding surface for container code.
//!
//! ```
//! use id3forge::{Frame, Tag, Version};
//!
//! let mut tag = Tag::new(Version::V2_4);
//! tag.add_frame(Frame::text("TIT2", "Hello")?);
//! let bytes = tag.render(Version::V2_3)?;
//!
//! let back = Tag::parse(&bytes)?;
//! assert_eq!(back.text("TIT2"), Some("Hello"));
//! # Ok::<(), id3forge::Id3Error>(())
//! ```
//!
//! The caller supplies the byte slice where the tag starts and splices the
//! rendered bytes back at the same place.  Nothing here touches a file.

use crc32fast::Hasher;
use tracing::{debug, warn};

use crate::config::{ParseOptions, WriteOptions};
use crate::error::{Id3Error, Result};
use crate::frame::{
    self, CommentFrame, DecodeContext, EncodeContext, Frame, FrameBody, FrameIssue, IssueAction,
    PictureFrame, TextFrame,
};
use crate::header::{ExtendedHeader, TagFlags, TagHeader, FOOTER_LEN, HEADER_LEN};
use crate::syncsafe::MAX_SYNCSAFE_U28;
use crate::unsync;
use crate::version::Version;

// ── Tag ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Version the tag was read as; [`Tag::render`] takes its own target.
    pub version:         Version,
    pub revision:        u8,
    pub flags:           TagFlags,
    pub extended_header: Option<ExtendedHeader>,
    frames:              Vec<Frame>,
}

impl Default for Tag {
    fn default() -> Self {
        Tag::new(Version::V2_4)
    }
}

/// A parsed tag plus everything that went wrong on the way.
#[derive(Debug)]
pub struct ParsedTag {
    pub tag:    Tag,
    pub issues: Vec<FrameIssue>,
}

impl Tag {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            revision:        0,
            flags:           TagFlags::default(),
            extended_header: None,
            frames:          Vec::new(),
        }
    }

    // ── Parse ─────────────────────────────────────────────────────────────────

    /// Parse the tag at the start of `bytes` with default options.  Frame
    /// issues are logged and otherwise discarded.
    pub fn parse(bytes: &[u8]) -> Result<Tag> {
        Ok(Tag::parse_with(bytes, &ParseOptions::default())?.tag)
    }

    pub fn parse_with(bytes: &[u8], options: &ParseOptions) -> Result<ParsedTag> {
        let header = TagHeader::parse(bytes)?;
        let body_end = HEADER_LEN + header.size as usize;
        if bytes.len() < body_end {
            return Err(Id3Error::TruncatedHeader { needed: body_end, available: bytes.len() });
        }
        debug!(version = %header.version, size = header.size, flags = ?header.flags, "tag header");

        let raw_body = &bytes[HEADER_LEN..body_end];
        let body = if header.flags.unsynchronisation {
            unsync::remove(raw_body)
        } else {
            raw_body.to_vec()
        };

        let mut issues = Vec::new();

        let (extended_header, ext_len) = if header.flags.extended_header {
            let (ext, len) = ExtendedHeader::parse(header.version, &body)?;
            (Some(ext), len)
        } else {
            (None, 0)
        };
        let region = &body[ext_len..];

        if let Some(expected) = extended_header.and_then(|ext| ext.crc) {
            if options.verify_crc {
                let covered = crc_region(header.version, region, extended_header.map_or(0, |e| e.padding_size));
                let actual = crc32fast::hash(covered);
                if actual != expected {
                    let error = Id3Error::CrcMismatch { expected, actual };
                    warn!(%error, "tag crc");
                    issues.push(FrameIssue { id: String::new(), offset: 0, error, action: IssueAction::Kept });
                }
            }
        }

        let mut ctx = DecodeContext::new(header.version, options, header.flags.unsynchronisation);
        let frames = frame::decode_region(&mut ctx, region);
        issues.append(&mut ctx.issues);

        if header.flags.footer {
            check_footer(&header, &bytes[body_end..], &mut issues);
        }

        let tag = Tag {
            version: header.version,
            revision: header.revision,
            flags: header.flags,
            extended_header,
            frames,
        };
        debug!(frames = tag.frames.len(), issues = issues.len(), "parsed tag");
        Ok(ParsedTag { tag, issues })
    }

    // ── Render ────────────────────────────────────────────────────────────────

    /// Render for `version` with default padding and the tag's own flags.
    pub fn render(&self, version: Version) -> Result<Vec<u8>> {
        self.render_with(&WriteOptions::for_version(version))
    }

    pub fn render_with(&self, options: &WriteOptions) -> Result<Vec<u8>> {
        let version = options.version;
        if !version.is_writable() {
            return Err(Id3Error::UnsupportedVersion(version.major()));
        }
        let unsynchronised = options.unsynchronisation.unwrap_or(self.flags.unsynchronisation);
        let footer = self.flags.footer && version == Version::V2_4;
        let padding = if footer { 0 } else { options.padding };
        if padding > MAX_SYNCSAFE_U28 as usize {
            return Err(Id3Error::TagTooLarge { size: padding });
        }

        let ctx = EncodeContext {
            version,
            compression_level:  options.compression_level,
            tag_unsynchronised: unsynchronised,
        };
        let mut region = Vec::new();
        ctx.encode_nested(&self.frames, &mut region)?;

        let capacity = region.len()
            .checked_add(padding + 16)
            .ok_or(Id3Error::TagTooLarge { size: region.len() })?;
        let mut body = Vec::with_capacity(capacity);
        if let Some(ext) = &self.extended_header {
            let padding_size = u32::try_from(padding)
                .map_err(|_| Id3Error::TagTooLarge { size: padding })?;
            let crc = ext.crc.map(|_| region_crc(version, &region, padding));
            ext.write(version, crc, padding_size, &mut body)?;
        }
        body.extend_from_slice(&region);
        let mut body = if unsynchronised { unsync::insert(&body) } else { body };
        let total = body.len()
            .checked_add(padding)
            .ok_or(Id3Error::TagTooLarge { size: body.len() })?;
        body.resize(total, 0);

        let size = u32::try_from(body.len())
            .map_err(|_| Id3Error::TagTooLarge { size: body.len() })?;
        let header = TagHeader {
            version,
            revision: 0,
            flags: TagFlags {
                unsynchronisation: unsynchronised,
                extended_header:   self.extended_header.is_some(),
                experimental:      self.flags.experimental,
                footer,
            },
            size,
        };

        let mut out = Vec::with_capacity(HEADER_LEN + body.len() + FOOTER_LEN);
        header.write(&mut out)?;
        out.extend_from_slice(&body);
        if footer {
            header.write_footer(&mut out)?;
        }
        debug!(%version, frames = self.frames.len(), len = out.len(), "rendered tag");
        Ok(out)
    }

    // ── Frames ────────────────────────────────────────────────────────────────

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.frames
    }

    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Remove every frame with `id`; returns how many were removed.
    pub fn remove_frames(&mut self, id: &str) -> usize {
        let before = self.frames.len();
        self.frames.retain(|f| f.id() != id);
        before - self.frames.len()
    }

    /// First frame with `id`.
    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id() == id)
    }

    /// First value of the text frame `id`.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.frames.iter().find_map(|f| match &f.body {
            FrameBody::Text(t) if f.id() == id => Some(t.value()),
            _ => None,
        })
    }

    /// Replace the first text frame `id` with a single UTF-8 value, or add
    /// one.  Other frames with the same ID are left alone.
    pub fn set_text(&mut self, id: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let existing = self.frames.iter_mut().find_map(|f| match &mut f.body {
            FrameBody::Text(t) if f.id.as_str() == id => Some(t),
            _ => None,
        });
        match existing {
            Some(text) => *text = TextFrame::new(value),
            None       => self.frames.push(Frame::text(id, value)?),
        }
        Ok(())
    }

    /// Value of the TXXX frame with `description`.
    pub fn user_text(&self, description: &str) -> Option<&str> {
        self.frames.iter().find_map(|f| match &f.body {
            FrameBody::UserText(t) if t.description == description => Some(t.value.as_str()),
            _ => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &CommentFrame> {
        self.frames.iter().filter_map(|f| match &f.body {
            FrameBody::Comment(c) => Some(c),
            _ => None,
        })
    }

    pub fn pictures(&self) -> impl Iterator<Item = &PictureFrame> {
        self.frames.iter().filter_map(|f| match &f.body {
            FrameBody::Picture(p) => Some(p),
            _ => None,
        })
    }
}

// ── CRC ───────────────────────────────────────────────────────────────────────

/// Bytes covered by the extended-header CRC: frames only in v2.3, frames and
/// padding in v2.4.
fn crc_region(version: Version, region: &[u8], padding_size: u32) -> &[u8] {
    match version {
        Version::V2_3 => {
            let end = region.len().saturating_sub(padding_size as usize);
            &region[..end]
        }
        _ => region,
    }
}

fn region_crc(version: Version, frames: &[u8], padding: usize) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(frames);
    if version == Version::V2_4 {
        hasher.update(&vec![0u8; padding]);
    }
    hasher.finalize()
}

// ── Footer ────────────────────────────────────────────────────────────────────

fn check_footer(header: &TagHeader, after_body: &[u8], issues: &mut Vec<FrameIssue>) {
    let error = match TagHeader::parse_footer(after_body) {
        Ok(footer) if footer == *header => return,
        Ok(footer) => {
            warn!(?footer, ?header, "footer disagrees with header");
            return;
        }
        Err(error) => error,
    };
    warn!(%error, "footer");
    issues.push(FrameIssue {
        id:     String::new(),
        offset: HEADER_LEN + header.size as usize,
        error,
        action: IssueAction::Kept,
    });
}
