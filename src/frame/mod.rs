//! Frame model and registry.
//!
//! A [`Frame`] is a canonical ID, its normalised [`FrameFlags`] and a typed
//! [`FrameBody`].  Which body a frame gets is decided by a static table of
//! exact IDs, then the `T`/`W` prefix rules; everything else is kept as
//! opaque bytes.
//!
//! # Decode path
//! ```text
//! region bytes ─► header scan ─► legacy ID mapping (2.2)
//!              ─► flag processor (prefixes, unsync, inflate)
//!              ─► registry dispatch ─► typed body | Opaque
//! ```
//! A failure anywhere after the header scan affects that frame only and is
//! recorded as a [`FrameIssue`]; parsing resumes at the next frame header.

mod content;
pub(crate) mod fields;
mod picture;

use std::fmt;

use tracing::{debug, warn};

use crate::config::ParseOptions;
use crate::encoding::TextEncoding;
use crate::error::{Id3Error, Result};
use crate::flags::{self, FrameFlags, PayloadInput};
use crate::version::{self, HeaderScan, RawFrameHeader, Version};

pub use content::{
    ChapterFrame, CommentFrame, EncryptedFrame, EventTimingFrame, InvolvedPeopleFrame,
    ObjectFrame, PictureFrame, PopularimeterFrame, PrivateFrame, SyncLyricsFrame, SyncedText,
    TableOfContentsFrame, TermsOfUseFrame, TextFrame, TimedEvent, TimestampFormat,
    UniqueFileIdFrame, UrlFrame, UserTextFrame, UserUrlFrame,
};
pub use picture::{mime_for_legacy_format, PictureType};

use fields::FieldReader;

// ── FrameId ───────────────────────────────────────────────────────────────────

/// A frame identifier: 4 characters from `A-Z0-9`, or 3 for a v2.2 frame the
/// legacy table could not map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(String);

impl FrameId {
    pub fn new(id: &str) -> Result<Self> {
        let valid = matches!(id.len(), 3 | 4)
            && id.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(Id3Error::InvalidFrameId(id.to_string()));
        }
        Ok(FrameId(id.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A 3-character ID; such frames are never written.
    #[inline]
    pub fn is_legacy(&self) -> bool {
        self.0.len() == 3
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for FrameId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FrameId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id:    FrameId,
    pub flags: FrameFlags,
    pub body:  FrameBody,
}

impl Frame {
    /// A frame with default flags.  The ID is validated but not checked
    /// against the body kind.
    pub fn new(id: &str, body: FrameBody) -> Result<Self> {
        Ok(Self { id: FrameId::new(id)?, flags: FrameFlags::default(), body })
    }

    /// A single-valued UTF-8 text frame.
    pub fn text(id: &str, value: impl Into<String>) -> Result<Self> {
        Frame::new(id, FrameBody::Text(TextFrame::new(value)))
    }

    #[inline]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }
}

// ── FrameBody ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameBody {
    Text(TextFrame),
    UserText(UserTextFrame),
    Url(UrlFrame),
    UserUrl(UserUrlFrame),
    Comment(CommentFrame),
    Lyrics(CommentFrame),
    TermsOfUse(TermsOfUseFrame),
    Picture(PictureFrame),
    UniqueFileId(UniqueFileIdFrame),
    InvolvedPeople(InvolvedPeopleFrame),
    Popularimeter(PopularimeterFrame),
    PlayCounter(u64),
    Chapter(ChapterFrame),
    TableOfContents(TableOfContentsFrame),
    SyncLyrics(SyncLyricsFrame),
    EventTiming(EventTimingFrame),
    Object(ObjectFrame),
    Private(PrivateFrame),
    Encrypted(EncryptedFrame),
    /// Unknown ID or a payload that failed to decode, kept byte for byte.
    Opaque(Vec<u8>),
}

impl FrameBody {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FrameBody::Text(_)            => "text",
            FrameBody::UserText(_)        => "user text",
            FrameBody::Url(_)             => "url",
            FrameBody::UserUrl(_)         => "user url",
            FrameBody::Comment(_)         => "comment",
            FrameBody::Lyrics(_)          => "lyrics",
            FrameBody::TermsOfUse(_)      => "terms of use",
            FrameBody::Picture(_)         => "picture",
            FrameBody::UniqueFileId(_)    => "unique file id",
            FrameBody::InvolvedPeople(_)  => "involved people",
            FrameBody::Popularimeter(_)   => "popularimeter",
            FrameBody::PlayCounter(_)     => "play counter",
            FrameBody::Chapter(_)         => "chapter",
            FrameBody::TableOfContents(_) => "table of contents",
            FrameBody::SyncLyrics(_)      => "synced lyrics",
            FrameBody::EventTiming(_)     => "event timing",
            FrameBody::Object(_)          => "object",
            FrameBody::Private(_)         => "private",
            FrameBody::Encrypted(_)       => "encrypted",
            FrameBody::Opaque(_)          => "opaque",
        }
    }

    /// Text encoding byte the payload was read with, for kinds that carry one.
    pub fn text_encoding(&self) -> Option<TextEncoding> {
        match self {
            FrameBody::Text(t)                           => Some(t.encoding),
            FrameBody::UserText(t)                       => Some(t.encoding),
            FrameBody::UserUrl(u)                        => Some(u.encoding),
            FrameBody::Comment(c) | FrameBody::Lyrics(c) => Some(c.encoding),
            FrameBody::TermsOfUse(t)                     => Some(t.encoding),
            FrameBody::Picture(p)                        => Some(p.encoding),
            FrameBody::InvolvedPeople(p)                 => Some(p.encoding),
            FrameBody::SyncLyrics(s)                     => Some(s.encoding),
            FrameBody::Object(o)                         => Some(o.encoding),
            _                                            => None,
        }
    }

    /// One-line human-readable rendering of the payload.
    pub fn summary(&self) -> String {
        match self {
            FrameBody::Text(t) => t.values.join(" / "),
            FrameBody::UserText(t) => format!("{} = {}", t.description, t.value),
            FrameBody::Url(u) => u.url.clone(),
            FrameBody::UserUrl(u) => format!("{} = {}", u.description, u.url),
            FrameBody::Comment(c) | FrameBody::Lyrics(c) => {
                format!("[{}] {}: {}", c.language(), c.description, c.text)
            }
            FrameBody::TermsOfUse(t) => {
                format!("[{}] {}", String::from_utf8_lossy(&t.language), t.text)
            }
            FrameBody::Picture(p) => format!(
                "{:?} {} \"{}\", {} bytes",
                p.picture_type, p.mime_type, p.description, p.data.len()
            ),
            FrameBody::UniqueFileId(u) => format!("{}: {}", u.owner, hex::encode(&u.identifier)),
            FrameBody::InvolvedPeople(p) => p
                .people
                .iter()
                .map(|(role, name)| format!("{role}: {name}"))
                .collect::<Vec<_>>()
                .join("; "),
            FrameBody::Popularimeter(p) => match p.counter {
                Some(count) => format!("{} rating {} played {}", p.email, p.rating, count),
                None        => format!("{} rating {}", p.email, p.rating),
            },
            FrameBody::PlayCounter(n) => n.to_string(),
            FrameBody::Chapter(c) => format!(
                "{} {}..{} ms, {} sub-frames",
                c.element_id, c.start_time, c.end_time, c.frames.len()
            ),
            FrameBody::TableOfContents(t) => {
                format!("{} -> [{}]", t.element_id, t.children.join(", "))
            }
            FrameBody::SyncLyrics(s) => format!("{} ({} lines)", s.description, s.lines.len()),
            FrameBody::EventTiming(e) => format!("{} events", e.events.len()),
            FrameBody::Object(o) => {
                format!("{} ({}), {} bytes", o.filename, o.mime_type, o.data.len())
            }
            FrameBody::Private(p) => format!("{}, {} bytes", p.owner, p.data.len()),
            FrameBody::Encrypted(e) => format!("method 0x{:02x}, {} bytes", e.method, e.data.len()),
            FrameBody::Opaque(data) => format!("{} bytes", data.len()),
        }
    }

    /// Dispatch `data` (already flag-processed) to the payload decoder for
    /// `id`.  `legacy_picture` selects the v2.2 `PIC` layout.
    fn decode(
        id:             &FrameId,
        data:           &[u8],
        legacy_picture: bool,
        ctx:            &mut DecodeContext<'_>,
    ) -> Result<Self> {
        let mut r = FieldReader::new(data);
        let body = match FrameKind::for_id(id.as_str()) {
            FrameKind::Text            => FrameBody::Text(TextFrame::decode(&mut r)?),
            FrameKind::UserText        => FrameBody::UserText(UserTextFrame::decode(&mut r)?),
            FrameKind::Url             => FrameBody::Url(UrlFrame::decode(&mut r)?),
            FrameKind::UserUrl         => FrameBody::UserUrl(UserUrlFrame::decode(&mut r)?),
            FrameKind::Comment         => FrameBody::Comment(CommentFrame::decode(&mut r)?),
            FrameKind::Lyrics          => FrameBody::Lyrics(CommentFrame::decode(&mut r)?),
            FrameKind::TermsOfUse      => FrameBody::TermsOfUse(TermsOfUseFrame::decode(&mut r)?),
            FrameKind::Picture         => {
                FrameBody::Picture(PictureFrame::decode(&mut r, legacy_picture)?)
            }
            FrameKind::UniqueFileId    => FrameBody::UniqueFileId(UniqueFileIdFrame::decode(&mut r)?),
            FrameKind::InvolvedPeople  => {
                FrameBody::InvolvedPeople(InvolvedPeopleFrame::decode(&mut r)?)
            }
            FrameKind::Popularimeter   => {
                FrameBody::Popularimeter(PopularimeterFrame::decode(&mut r)?)
            }
            FrameKind::PlayCounter     => FrameBody::PlayCounter(content::decode_play_counter(&mut r)?),
            FrameKind::Chapter         => FrameBody::Chapter(ChapterFrame::decode(&mut r, ctx)?),
            FrameKind::TableOfContents => {
                FrameBody::TableOfContents(TableOfContentsFrame::decode(&mut r, ctx)?)
            }
            FrameKind::SyncLyrics      => FrameBody::SyncLyrics(SyncLyricsFrame::decode(&mut r)?),
            FrameKind::EventTiming     => FrameBody::EventTiming(EventTimingFrame::decode(&mut r)?),
            FrameKind::Object          => FrameBody::Object(ObjectFrame::decode(&mut r)?),
            FrameKind::Private         => FrameBody::Private(PrivateFrame::decode(&mut r)?),
            FrameKind::Opaque          => FrameBody::Opaque(data.to_vec()),
        };
        Ok(body)
    }

    /// Append the plain payload (before flag processing) for `ctx.version`.
    fn encode(&self, ctx: &EncodeContext, out: &mut Vec<u8>) -> Result<()> {
        let version = ctx.version;
        match self {
            FrameBody::Text(t)            => t.encode(version, out)?,
            FrameBody::UserText(t)        => t.encode(version, out)?,
            FrameBody::Url(u)             => u.encode(out),
            FrameBody::UserUrl(u)         => u.encode(version, out)?,
            FrameBody::Comment(c)         => c.encode(version, out)?,
            FrameBody::Lyrics(c)          => c.encode(version, out)?,
            FrameBody::TermsOfUse(t)      => t.encode(version, out),
            FrameBody::Picture(p)         => p.encode(version, out)?,
            FrameBody::UniqueFileId(u)    => u.encode(out)?,
            FrameBody::InvolvedPeople(p)  => p.encode(version, out)?,
            FrameBody::Popularimeter(p)   => p.encode(out)?,
            FrameBody::PlayCounter(n)     => fields::encode_counter(*n, out),
            FrameBody::Chapter(c)         => c.encode(ctx, out)?,
            FrameBody::TableOfContents(t) => t.encode(ctx, out)?,
            FrameBody::SyncLyrics(s)      => s.encode(version, out)?,
            FrameBody::EventTiming(e)     => e.encode(out)?,
            FrameBody::Object(o)          => o.encode(version, out)?,
            FrameBody::Private(p)         => p.encode(out)?,
            FrameBody::Encrypted(e)       => out.extend_from_slice(&e.data),
            FrameBody::Opaque(data)       => out.extend_from_slice(data),
        }
        Ok(())
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Text,
    UserText,
    Url,
    UserUrl,
    Comment,
    Lyrics,
    TermsOfUse,
    Picture,
    UniqueFileId,
    InvolvedPeople,
    Popularimeter,
    PlayCounter,
    Chapter,
    TableOfContents,
    SyncLyrics,
    EventTiming,
    Object,
    Private,
    Opaque,
}

/// Exact-ID entries.  Consulted before the `T`/`W` prefix rules, so `TXXX`,
/// `TIPL` and `WXXX` land here rather than on the generic kinds.
static REGISTRY: [(&str, FrameKind); 18] = [
    ("TXXX", FrameKind::UserText),
    ("WXXX", FrameKind::UserUrl),
    ("COMM", FrameKind::Comment),
    ("USLT", FrameKind::Lyrics),
    ("USER", FrameKind::TermsOfUse),
    ("APIC", FrameKind::Picture),
    ("UFID", FrameKind::UniqueFileId),
    ("IPLS", FrameKind::InvolvedPeople),
    ("TIPL", FrameKind::InvolvedPeople),
    ("TMCL", FrameKind::InvolvedPeople),
    ("POPM", FrameKind::Popularimeter),
    ("PCNT", FrameKind::PlayCounter),
    ("CHAP", FrameKind::Chapter),
    ("CTOC", FrameKind::TableOfContents),
    ("SYLT", FrameKind::SyncLyrics),
    ("ETCO", FrameKind::EventTiming),
    ("GEOB", FrameKind::Object),
    ("PRIV", FrameKind::Private),
];

impl FrameKind {
    fn for_id(id: &str) -> Self {
        if let Some((_, kind)) = REGISTRY.iter().find(|(known, _)| *known == id) {
            return *kind;
        }
        match id.as_bytes() {
            [b'T', _, _, _] => FrameKind::Text,
            [b'W', _, _, _] => FrameKind::Url,
            _               => FrameKind::Opaque,
        }
    }
}

// ── Issues ────────────────────────────────────────────────────────────────────

/// What the parser did with a frame that produced an error or warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueAction {
    /// Payload failed to decode; the frame is in the tag as [`FrameBody::Opaque`].
    KeptOpaque,
    /// Flag processing failed (e.g. inflate); the frame is not in the tag.
    Dropped,
    /// Non-fatal warning; the frame is in the tag as decoded.
    Kept,
    /// The frame header could not be trusted; nothing after it was parsed.
    StoppedParsing,
}

#[derive(Debug)]
pub struct FrameIssue {
    /// Frame ID as it appeared on the wire; empty for tag-level findings.
    pub id:     String,
    /// Offset of the frame header within its frame region.
    pub offset: usize,
    pub error:  Id3Error,
    pub action: IssueAction,
}

// ── Decode ────────────────────────────────────────────────────────────────────

pub(crate) struct DecodeContext<'a> {
    pub version:            Version,
    pub options:            &'a ParseOptions,
    /// The frame region was de-unsynchronised as a whole.
    pub tag_unsynchronised: bool,
    pub depth:              usize,
    pub issues:             Vec<FrameIssue>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(version: Version, options: &'a ParseOptions, tag_unsynchronised: bool) -> Self {
        Self { version, options, tag_unsynchronised, depth: 0, issues: Vec::new() }
    }

    pub fn record(&mut self, id: &str, offset: usize, error: Id3Error, action: IssueAction) {
        warn!(frame = id, offset, ?action, %error, "frame issue");
        self.issues.push(FrameIssue { id: id.to_string(), offset, error, action });
    }

    /// Decode the frames embedded in a CHAP or CTOC payload.
    pub fn decode_nested(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(Id3Error::NestingTooDeep { depth: self.options.max_nesting_depth });
        }
        self.depth += 1;
        let frames = decode_region(self, data);
        self.depth -= 1;
        Ok(frames)
    }
}

/// Decode every frame in `data` (a frame region with tag-level
/// unsynchronisation already undone).  Stops at padding, at bytes that cannot
/// be a frame header, or at a frame that overruns the region.
pub(crate) fn decode_region(ctx: &mut DecodeContext<'_>, data: &[u8]) -> Vec<Frame> {
    let header_len = ctx.version.frame_header_len();
    let mut frames = Vec::new();
    let mut pos = 0usize;

    while pos < data.len() {
        let rest = &data[pos..];
        let header = match RawFrameHeader::scan(ctx.version, rest) {
            Ok(HeaderScan::Frame(header)) => header,
            Ok(HeaderScan::Padding) => {
                debug!(offset = pos, len = rest.len(), "padding");
                break;
            }
            Ok(HeaderScan::Garbage) => {
                warn!(offset = pos, len = rest.len(), "bytes after last frame are not a frame header; treated as padding");
                break;
            }
            Err(error) => {
                let id = String::from_utf8_lossy(&rest[..ctx.version.frame_id_len()]).into_owned();
                ctx.record(&id, pos, error, IssueAction::StoppedParsing);
                break;
            }
        };

        let body_start = pos + header_len;
        let remaining = data.len() - body_start;
        if header.size > remaining {
            let error = Id3Error::FrameSizeExceedsRemainingBytes {
                id:        header.id.clone(),
                declared:  header.size,
                remaining,
            };
            ctx.record(&header.id, pos, error, IssueAction::StoppedParsing);
            break;
        }

        let body = &data[body_start..body_start + header.size];
        if let Some(frame) = decode_frame(ctx, header, body, pos) {
            frames.push(frame);
        }
        pos = body_start + body.len();
    }

    frames
}

fn decode_frame(
    ctx:    &mut DecodeContext<'_>,
    header: RawFrameHeader,
    body:   &[u8],
    offset: usize,
) -> Option<Frame> {
    let (id, legacy_picture) = match ctx.version {
        Version::V2_2 => match version::canonical_id_for(&header.id) {
            Some(canonical) => (FrameId(canonical.to_string()), header.id == "PIC"),
            None => {
                warn!(frame = %header.id, "v2.2 frame has no 4-character equivalent; kept opaque");
                return Some(Frame {
                    id:    FrameId(header.id),
                    flags: FrameFlags::default(),
                    body:  FrameBody::Opaque(body.to_vec()),
                });
            }
        },
        _ => (FrameId(header.id.clone()), false),
    };

    let payload = match flags::decode_payload(
        ctx.version,
        header.flags,
        body,
        ctx.tag_unsynchronised,
        ctx.options,
    ) {
        Ok(payload) => payload,
        Err(error) => {
            ctx.record(&header.id, offset, error, IssueAction::Dropped);
            return None;
        }
    };
    for warning in payload.warnings {
        ctx.record(&header.id, offset, warning, IssueAction::Kept);
    }

    if let Some(method) = payload.flags.encryption {
        debug!(frame = %id, method, len = payload.data.len(), "encrypted frame");
        return Some(Frame {
            id,
            flags: payload.flags,
            body:  FrameBody::Encrypted(EncryptedFrame { method, data: payload.data }),
        });
    }

    let body = match FrameBody::decode(&id, &payload.data, legacy_picture, ctx) {
        Ok(body) => body,
        Err(error) => {
            ctx.record(&header.id, offset, error, IssueAction::KeptOpaque);
            FrameBody::Opaque(payload.data)
        }
    };
    debug!(frame = %id, kind = body.kind_name(), offset, "decoded frame");
    Some(Frame { id, flags: payload.flags, body })
}

// ── Encode ────────────────────────────────────────────────────────────────────

pub(crate) struct EncodeContext {
    pub version:            Version,
    pub compression_level:  u32,
    /// The assembled frame region will be unsynchronised as a whole.
    pub tag_unsynchronised: bool,
}

impl EncodeContext {
    /// Write each frame in order; used for the top-level region and for
    /// CHAP/CTOC sub-frames alike.
    pub fn encode_nested(&self, frames: &[Frame], out: &mut Vec<u8>) -> Result<()> {
        frames.iter().try_for_each(|frame| encode_frame(frame, self, out))
    }
}

/// Append one frame (header, prefixes and processed payload) to `out`.
pub(crate) fn encode_frame(frame: &Frame, ctx: &EncodeContext, out: &mut Vec<u8>) -> Result<()> {
    if frame.id.is_legacy() {
        warn!(frame = %frame.id, "3-character frame ID cannot be written; skipped");
        return Ok(());
    }

    let (raw_flags, body) = match &frame.body {
        FrameBody::Encrypted(enc) => flags::encode_payload(
            ctx.version,
            &frame.flags,
            PayloadInput::Encrypted { method: enc.method, data: &enc.data },
            ctx.tag_unsynchronised,
            ctx.compression_level,
        )?,
        body => {
            let mut plain = Vec::new();
            body.encode(ctx, &mut plain)?;
            flags::encode_payload(
                ctx.version,
                &frame.flags,
                PayloadInput::Plain(&plain),
                ctx.tag_unsynchronised,
                ctx.compression_level,
            )?
        }
    };

    let header = RawFrameHeader { id: frame.id.as_str().to_string(), size: body.len(), flags: raw_flags };
    header.write(ctx.version, out)?;
    out.extend_from_slice(&body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;

    fn raw_frame(version: Version, id: &str, flags: [u8; 2], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        RawFrameHeader { id: id.into(), size: payload.len(), flags }
            .write(version, &mut out)
            .unwrap();
        out.extend_from_slice(payload);
        out
    }

    fn encode_all(version: Version, frames: &[Frame]) -> Vec<u8> {
        let ctx = EncodeContext { version, compression_level: 6, tag_unsynchronised: false };
        let mut out = Vec::new();
        ctx.encode_nested(frames, &mut out).unwrap();
        out
    }

    fn decode_all(version: Version, options: &ParseOptions, data: &[u8]) -> (Vec<Frame>, Vec<FrameIssue>) {
        let mut ctx = DecodeContext::new(version, options, false);
        let frames = decode_region(&mut ctx, data);
        (frames, ctx.issues)
    }

    #[test]
    fn frame_id_validation() {
        assert!(FrameId::new("TIT2").is_ok());
        assert!(FrameId::new("TT2").unwrap().is_legacy());
        assert!(matches!(FrameId::new("tit2"), Err(Id3Error::InvalidFrameId(_))));
        assert!(FrameId::new("TITLE").is_err());
        assert!(FrameId::new("").is_err());
    }

    #[test]
    fn text_encoding_reported_per_kind() {
        let data = raw_frame(Version::V2_4, "TIT2", [0, 0], b"\x01\xFF\xFEA\x00");
        let (frames, _) = decode_all(Version::V2_4, &ParseOptions::default(), &data);
        assert_eq!(frames[0].body.text_encoding().map(TextEncoding::name), Some("utf16"));
        assert_eq!(FrameBody::PlayCounter(3).text_encoding(), None);
        assert_eq!(FrameBody::Opaque(vec![1]).text_encoding(), None);
    }

    #[test]
    fn registry_dispatch() {
        assert_eq!(FrameKind::for_id("TIT2"), FrameKind::Text);
        assert_eq!(FrameKind::for_id("TXXX"), FrameKind::UserText);
        assert_eq!(FrameKind::for_id("TIPL"), FrameKind::InvolvedPeople);
        assert_eq!(FrameKind::for_id("WOAR"), FrameKind::Url);
        assert_eq!(FrameKind::for_id("WXXX"), FrameKind::UserUrl);
        assert_eq!(FrameKind::for_id("MCDI"), FrameKind::Opaque);
        assert_eq!(FrameKind::for_id("TT2"), FrameKind::Opaque);
    }

    #[test]
    fn region_stops_at_padding() {
        let mut data = raw_frame(Version::V2_4, "TIT2", [0, 0], b"\x03Hello");
        data.extend_from_slice(&[0u8; 64]);
        let (frames, issues) = decode_all(Version::V2_4, &ParseOptions::default(), &data);
        assert_eq!(frames.len(), 1);
        assert!(issues.is_empty());
        match &frames[0].body {
            FrameBody::Text(t) => assert_eq!(t.values, vec!["Hello"]),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn overrunning_frame_stops_parsing() {
        let mut data = raw_frame(Version::V2_3, "TALB", [0, 0], b"\x00Album");
        data.extend_from_slice(b"TPE1\x00\x00\x01\x00\x00\x00\x00Artist");
        let (frames, issues) = decode_all(Version::V2_3, &ParseOptions::default(), &data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id(), "TALB");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "TPE1");
        assert_eq!(issues[0].action, IssueAction::StoppedParsing);
        assert!(matches!(
            issues[0].error,
            Id3Error::FrameSizeExceedsRemainingBytes { declared: 256, remaining: 7, .. }
        ));
    }

    #[test]
    fn undecodable_payload_kept_opaque() {
        let mut data = raw_frame(Version::V2_4, "COMM", [0, 0], b"\x00en");
        data.extend(raw_frame(Version::V2_4, "TIT2", [0, 0], b"\x00ok"));
        let (frames, issues) = decode_all(Version::V2_4, &ParseOptions::default(), &data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].body, FrameBody::Opaque(b"\x00en".to_vec()));
        assert_eq!(issues[0].action, IssueAction::KeptOpaque);
        assert!(matches!(frames[1].body, FrameBody::Text(_)));
    }

    #[test]
    fn legacy_ids_canonicalised() {
        let mut data = raw_frame_v22("TT2", b"\x00Hello");
        data.extend(raw_frame_v22("XYZ", b"abc"));
        let (frames, issues) = decode_all(Version::V2_2, &ParseOptions::default(), &data);
        assert!(issues.is_empty());
        assert_eq!(frames[0].id(), "TIT2");
        assert_eq!(frames[1].id(), "XYZ");
        assert_eq!(frames[1].body, FrameBody::Opaque(b"abc".to_vec()));

        // The unmapped frame is skipped on write.
        let out = encode_all(Version::V2_4, &frames);
        let (again, _) = decode_all(Version::V2_4, &ParseOptions::default(), &out);
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id(), "TIT2");
    }

    fn raw_frame_v22(id: &str, payload: &[u8]) -> Vec<u8> {
        let mut out = id.as_bytes().to_vec();
        let len = payload.len() as u32;
        out.extend_from_slice(&len.to_be_bytes()[1..]);
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn chapter_with_embedded_title() {
        let chapter = ChapterFrame {
            element_id:   "ch1".into(),
            start_time:   0,
            end_time:     30_000,
            start_offset: u32::MAX,
            end_offset:   u32::MAX,
            frames:       vec![Frame::text("TIT2", "Intro").unwrap()],
        };
        let toc = TableOfContentsFrame {
            element_id: "toc".into(),
            top_level:  true,
            ordered:    true,
            children:   vec!["ch1".into()],
            frames:     Vec::new(),
        };
        let frames = vec![
            Frame::new("CTOC", FrameBody::TableOfContents(toc)).unwrap(),
            Frame::new("CHAP", FrameBody::Chapter(chapter)).unwrap(),
        ];
        let (back, issues) = decode_all(
            Version::V2_4,
            &ParseOptions::default(),
            &encode_all(Version::V2_4, &frames),
        );
        assert!(issues.is_empty());
        assert_eq!(back, frames);
    }

    #[test]
    fn nesting_beyond_limit_kept_opaque() {
        let inner = Frame::new("CHAP", FrameBody::Chapter(ChapterFrame {
            element_id: "inner".into(),
            frames:     vec![Frame::text("TIT2", "deep").unwrap()],
            ..ChapterFrame::default()
        }))
        .unwrap();
        let outer = Frame::new("CHAP", FrameBody::Chapter(ChapterFrame {
            element_id: "outer".into(),
            frames:     vec![inner],
            ..ChapterFrame::default()
        }))
        .unwrap();

        let options = ParseOptions { max_nesting_depth: 1, ..ParseOptions::default() };
        let (frames, issues) = decode_all(Version::V2_4, &options, &encode_all(Version::V2_4, &[outer]));
        let FrameBody::Chapter(ch) = &frames[0].body else {
            panic!("outer chapter should decode");
        };
        assert!(matches!(ch.frames[0].body, FrameBody::Opaque(_)));
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0].error, Id3Error::NestingTooDeep { depth: 1 }));
    }

    #[test]
    fn encrypted_frame_written_back_unchanged() {
        let mut data = raw_frame(Version::V2_3, "TIT2", [0, 0x40], &[0x81, 0xDE, 0xAD, 0xBE, 0xEF]);
        data.extend_from_slice(&[0; 8]);
        let (frames, _) = decode_all(Version::V2_3, &ParseOptions::default(), &data);
        assert_eq!(
            frames[0].body,
            FrameBody::Encrypted(EncryptedFrame { method: 0x81, data: vec![0xDE, 0xAD, 0xBE, 0xEF] })
        );
        assert_eq!(encode_all(Version::V2_3, &frames), &data[..data.len() - 8]);
    }

    #[test]
    fn latin1_text_upgraded_on_write() {
        let frame = Frame::new("TIT2", FrameBody::Text(TextFrame {
            encoding: TextEncoding::Latin1,
            values:   vec!["東京".into()],
        }))
        .unwrap();
        let out = encode_all(Version::V2_3, &[frame]);
        assert_eq!(out[10], TextEncoding::Utf16.to_byte());
    }
}
