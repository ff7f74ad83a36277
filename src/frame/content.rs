//! Typed frame payloads.
//!
//! Each payload knows how to read itself from a [`FieldReader`] positioned
//! at the start of the (already flag-processed) frame body, and how to write
//! itself back.  Text-bearing payloads resolve their encoding against the
//! target version at write time, see [`TextEncoding::effective`].

use byteorder::{BigEndian, WriteBytesExt};

use super::fields::{decode_counter, encode_counter, FieldReader};
use super::picture::{mime_for_legacy_format, PictureType};
use super::{DecodeContext, EncodeContext, Frame};
use crate::encoding::{self, TextEncoding};
use crate::error::{Id3Error, Result};
use crate::version::Version;

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Split a run of terminator-separated strings.  A single trailing terminator
/// is not an extra empty value.
fn split_values(enc: TextEncoding, mut data: &[u8], field: &'static str) -> Result<Vec<String>> {
    let term = enc.terminator().len();
    let mut values = Vec::new();
    loop {
        match encoding::find_terminator(enc, data) {
            Some(end) => {
                values.push(encoding::decode(enc, &data[..end], field)?);
                data = &data[end + term..];
                if data.is_empty() {
                    break;
                }
            }
            None => {
                values.push(encoding::decode(enc, data, field)?);
                break;
            }
        }
    }
    Ok(values)
}

/// Inverse of [`split_values`].  A trailing empty value, or a last value
/// ending in NUL, needs an explicit terminator or it would be read back as
/// a trailing terminator.
fn join_values<'a, I>(enc: TextEncoding, values: I, out: &mut Vec<u8>)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut last = "";
    let mut count = 0usize;
    for value in values {
        if count > 0 {
            out.extend_from_slice(enc.terminator());
        }
        encoding::encode(enc, value, out);
        last = value;
        count += 1;
    }
    if (count > 1 && last.is_empty()) || last.ends_with('\0') {
        out.extend_from_slice(enc.terminator());
    }
}

fn language_str(lang: &[u8; 3]) -> String {
    encoding::decode_latin1(lang)
}

// ── Timestamp format ──────────────────────────────────────────────────────────

/// Unit of the timestamps in SYLT and ETCO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampFormat {
    MpegFrames,
    #[default]
    Milliseconds,
    Unknown(u8),
}

impl TimestampFormat {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TimestampFormat::MpegFrames,
            2 => TimestampFormat::Milliseconds,
            b => TimestampFormat::Unknown(b),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            TimestampFormat::MpegFrames   => 1,
            TimestampFormat::Milliseconds => 2,
            TimestampFormat::Unknown(b)   => b,
        }
    }
}

// ── Text (T***) ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextFrame {
    pub encoding: TextEncoding,
    /// One or more values; 2.4 separates multiple values with terminators.
    pub values:   Vec<String>,
}

impl TextFrame {
    pub fn new(value: impl Into<String>) -> Self {
        Self { encoding: TextEncoding::Utf8, values: vec![value.into()] }
    }

    /// First value, the one single-valued readers show.
    pub fn value(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }

    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let values = split_values(encoding, r.rest(), "text")?;
        Ok(Self { encoding, values })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let enc = self.encoding.effective(version, self.values.iter().map(String::as_str));
        out.push(enc.to_byte());
        join_values(enc, self.values.iter().map(String::as_str), out);
        Ok(())
    }
}

// ── User text (TXXX) ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserTextFrame {
    pub encoding:    TextEncoding,
    pub description: String,
    pub value:       String,
}

impl UserTextFrame {
    pub fn new(description: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            encoding:    TextEncoding::Utf8,
            description: description.into(),
            value:       value.into(),
        }
    }

    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let description = r.string(encoding, "description")?;
        let value = r.text_rest(encoding, "value")?;
        Ok(Self { encoding, description, value })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let enc = self.encoding.effective(version, [self.description.as_str(), self.value.as_str()]);
        out.push(enc.to_byte());
        encoding::encode_terminated(enc, &self.description, "description", out)?;
        encoding::encode_trailing(enc, &self.value, out);
        Ok(())
    }
}

// ── URL (W***) and user URL (WXXX) ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlFrame {
    pub url: String,
}

impl UrlFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        Ok(Self { url: r.text_rest(TextEncoding::Latin1, "url")? })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        encoding::encode_trailing(TextEncoding::Latin1, &self.url, out);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserUrlFrame {
    pub encoding:    TextEncoding,
    pub description: String,
    pub url:         String,
}

impl UserUrlFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let description = r.string(encoding, "description")?;
        let url = r.text_rest(TextEncoding::Latin1, "url")?;
        Ok(Self { encoding, description, url })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let enc = self.encoding.effective(version, [self.description.as_str()]);
        out.push(enc.to_byte());
        encoding::encode_terminated(enc, &self.description, "description", out)?;
        encoding::encode_trailing(TextEncoding::Latin1, &self.url, out);
        Ok(())
    }
}

// ── Comment (COMM) and unsynchronised lyrics (USLT) ───────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentFrame {
    pub encoding:    TextEncoding,
    /// ISO-639-2 code, e.g. `*b"eng"`.
    pub language:    [u8; 3],
    pub description: String,
    pub text:        String,
}

impl CommentFrame {
    pub fn new(language: [u8; 3], description: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            encoding:    TextEncoding::Utf8,
            language,
            description: description.into(),
            text:        text.into(),
        }
    }

    pub fn language(&self) -> String {
        language_str(&self.language)
    }

    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let language = r.language()?;
        let description = r.string(encoding, "description")?;
        let text = r.text_rest(encoding, "text")?;
        Ok(Self { encoding, language, description, text })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let enc = self.encoding.effective(version, [self.description.as_str(), self.text.as_str()]);
        out.push(enc.to_byte());
        out.extend_from_slice(&self.language);
        encoding::encode_terminated(enc, &self.description, "description", out)?;
        encoding::encode_trailing(enc, &self.text, out);
        Ok(())
    }
}

// ── Terms of use (USER) ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermsOfUseFrame {
    pub encoding: TextEncoding,
    pub language: [u8; 3],
    pub text:     String,
}

impl TermsOfUseFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let language = r.language()?;
        let text = r.text_rest(encoding, "text")?;
        Ok(Self { encoding, language, text })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) {
        let enc = self.encoding.effective(version, [self.text.as_str()]);
        out.push(enc.to_byte());
        out.extend_from_slice(&self.language);
        encoding::encode_trailing(enc, &self.text, out);
    }
}

// ── Attached picture (APIC, v2.2 PIC) ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PictureFrame {
    pub encoding:     TextEncoding,
    pub mime_type:    String,
    pub picture_type: PictureType,
    pub description:  String,
    pub data:         Vec<u8>,
}

impl PictureFrame {
    /// `legacy` selects the v2.2 layout, where a 3-byte image format stands
    /// in for the MIME string.
    pub(crate) fn decode(r: &mut FieldReader<'_>, legacy: bool) -> Result<Self> {
        let encoding = r.encoding()?;
        let mime_type = if legacy {
            let f = r.bytes(3, "image format")?;
            mime_for_legacy_format(&[f[0], f[1], f[2]])
        } else {
            r.latin1("mime type")?
        };
        let picture_type = PictureType::from_byte(r.u8("picture type")?);
        let description = r.string(encoding, "description")?;
        let data = r.rest().to_vec();
        Ok(Self { encoding, mime_type, picture_type, description, data })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let enc = self.encoding.effective(version, [self.description.as_str()]);
        out.push(enc.to_byte());
        encoding::encode_terminated(TextEncoding::Latin1, &self.mime_type, "mime type", out)?;
        out.push(self.picture_type.to_byte());
        encoding::encode_terminated(enc, &self.description, "description", out)?;
        out.extend_from_slice(&self.data);
        Ok(())
    }
}

// ── Unique file identifier (UFID) ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniqueFileIdFrame {
    pub owner:      String,
    pub identifier: Vec<u8>,
}

impl UniqueFileIdFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let owner = r.latin1("owner")?;
        Ok(Self { owner, identifier: r.rest().to_vec() })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        encoding::encode_terminated(TextEncoding::Latin1, &self.owner, "owner", out)?;
        out.extend_from_slice(&self.identifier);
        Ok(())
    }
}

// ── Involved people (IPLS, TIPL, TMCL) ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvolvedPeopleFrame {
    pub encoding: TextEncoding,
    /// (involvement, name) pairs.
    pub people:   Vec<(String, String)>,
}

impl InvolvedPeopleFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let data = r.rest();
        if data.is_empty() {
            return Ok(Self { encoding, people: Vec::new() });
        }
        let mut strings = split_values(encoding, data, "involved people")?.into_iter();
        let mut people = Vec::new();
        while let Some(role) = strings.next() {
            // An odd count leaves the final role without a name.
            people.push((role, strings.next().unwrap_or_default()));
        }
        Ok(Self { encoding, people })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let flat = || self.people.iter().flat_map(|(r, n)| [r.as_str(), n.as_str()]);
        if flat().any(|s| s.contains('\0')) {
            return Err(Id3Error::EmbeddedTerminator { field: "involved people" });
        }
        let enc = self.encoding.effective(version, flat());
        out.push(enc.to_byte());
        join_values(enc, flat(), out);
        Ok(())
    }
}

// ── Popularimeter (POPM) and play counter (PCNT) ──────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopularimeterFrame {
    pub email:   String,
    /// 1 (worst) to 255 (best); 0 means unknown.
    pub rating:  u8,
    /// Absent when the frame omits the counter entirely.
    pub counter: Option<u64>,
}

impl PopularimeterFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let email = r.latin1("email")?;
        let rating = r.u8("rating")?;
        let counter = if r.is_empty() {
            None
        } else {
            Some(decode_counter(r.rest(), "play counter")?)
        };
        Ok(Self { email, rating, counter })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        encoding::encode_terminated(TextEncoding::Latin1, &self.email, "email", out)?;
        out.push(self.rating);
        if let Some(counter) = self.counter {
            encode_counter(counter, out);
        }
        Ok(())
    }
}

pub(crate) fn decode_play_counter(r: &mut FieldReader<'_>) -> Result<u64> {
    if r.is_empty() {
        return Err(Id3Error::TruncatedFixedField { field: "play counter", needed: 4, available: 0 });
    }
    decode_counter(r.rest(), "play counter")
}

// ── Chapter (CHAP) ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChapterFrame {
    pub element_id:   String,
    /// Milliseconds.
    pub start_time:   u32,
    pub end_time:     u32,
    /// Byte offsets into the audio; `0xFFFFFFFF` means unused.
    pub start_offset: u32,
    pub end_offset:   u32,
    /// Embedded frames, usually TIT2 and friends.
    pub frames:       Vec<Frame>,
}

impl ChapterFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>, ctx: &mut DecodeContext<'_>) -> Result<Self> {
        let element_id = r.latin1("element id")?;
        let start_time = r.u32("start time")?;
        let end_time = r.u32("end time")?;
        let start_offset = r.u32("start offset")?;
        let end_offset = r.u32("end offset")?;
        let frames = ctx.decode_nested(r.rest())?;
        Ok(Self { element_id, start_time, end_time, start_offset, end_offset, frames })
    }

    pub(crate) fn encode(&self, ctx: &EncodeContext, out: &mut Vec<u8>) -> Result<()> {
        encoding::encode_terminated(TextEncoding::Latin1, &self.element_id, "element id", out)?;
        out.write_u32::<BigEndian>(self.start_time)?;
        out.write_u32::<BigEndian>(self.end_time)?;
        out.write_u32::<BigEndian>(self.start_offset)?;
        out.write_u32::<BigEndian>(self.end_offset)?;
        ctx.encode_nested(&self.frames, out)
    }
}

// ── Table of contents (CTOC) ──────────────────────────────────────────────────

pub const CTOC_ORDERED:   u8 = 0x01;
pub const CTOC_TOP_LEVEL: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableOfContentsFrame {
    pub element_id: String,
    pub top_level:  bool,
    pub ordered:    bool,
    /// Element IDs of the child CHAP/CTOC frames.
    pub children:   Vec<String>,
    pub frames:     Vec<Frame>,
}

impl TableOfContentsFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>, ctx: &mut DecodeContext<'_>) -> Result<Self> {
        let element_id = r.latin1("element id")?;
        let flags = r.u8("toc flags")?;
        let count = r.u8("entry count")?;
        let children = (0..count)
            .map(|_| r.latin1("child element id"))
            .collect::<Result<Vec<_>>>()?;
        let frames = ctx.decode_nested(r.rest())?;
        Ok(Self {
            element_id,
            top_level: flags & CTOC_TOP_LEVEL != 0,
            ordered:   flags & CTOC_ORDERED != 0,
            children,
            frames,
        })
    }

    pub(crate) fn encode(&self, ctx: &EncodeContext, out: &mut Vec<u8>) -> Result<()> {
        let count = u8::try_from(self.children.len())
            .map_err(|_| Id3Error::FieldOverflow { field: "entry count" })?;
        encoding::encode_terminated(TextEncoding::Latin1, &self.element_id, "element id", out)?;
        let mut flags = 0u8;
        if self.top_level { flags |= CTOC_TOP_LEVEL; }
        if self.ordered   { flags |= CTOC_ORDERED; }
        out.push(flags);
        out.push(count);
        for child in &self.children {
            encoding::encode_terminated(TextEncoding::Latin1, child, "child element id", out)?;
        }
        ctx.encode_nested(&self.frames, out)
    }
}

// ── Synchronised lyrics (SYLT) ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncedText {
    pub text:      String,
    pub timestamp: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncLyricsFrame {
    pub encoding:         TextEncoding,
    pub language:         [u8; 3],
    pub timestamp_format: TimestampFormat,
    /// 0 other, 1 lyrics, 2 transcription, 3 movement, 4 events, 5 chord,
    /// 6 trivia, 7 web page URLs, 8 image URLs.
    pub content_type:     u8,
    pub description:      String,
    pub lines:            Vec<SyncedText>,
}

impl SyncLyricsFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let language = r.language()?;
        let timestamp_format = TimestampFormat::from_byte(r.u8("timestamp format")?);
        let content_type = r.u8("content type")?;
        let description = r.string(encoding, "description")?;
        let mut lines = Vec::new();
        while !r.is_empty() {
            let text = r.string(encoding, "lyric text")?;
            let timestamp = r.u32("timestamp")?;
            lines.push(SyncedText { text, timestamp });
        }
        Ok(Self { encoding, language, timestamp_format, content_type, description, lines })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let texts = std::iter::once(self.description.as_str())
            .chain(self.lines.iter().map(|l| l.text.as_str()));
        let enc = self.encoding.effective(version, texts);
        out.push(enc.to_byte());
        out.extend_from_slice(&self.language);
        out.push(self.timestamp_format.to_byte());
        out.push(self.content_type);
        encoding::encode_terminated(enc, &self.description, "description", out)?;
        for line in &self.lines {
            encoding::encode_terminated(enc, &line.text, "lyric text", out)?;
            out.write_u32::<BigEndian>(line.timestamp)?;
        }
        Ok(())
    }
}

// ── Event timing codes (ETCO) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimedEvent {
    pub event_type: u8,
    pub timestamp:  u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventTimingFrame {
    pub timestamp_format: TimestampFormat,
    pub events:           Vec<TimedEvent>,
}

impl EventTimingFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let timestamp_format = TimestampFormat::from_byte(r.u8("timestamp format")?);
        let mut events = Vec::new();
        while !r.is_empty() {
            let event_type = r.u8("event type")?;
            let timestamp = r.u32("timestamp")?;
            events.push(TimedEvent { event_type, timestamp });
        }
        Ok(Self { timestamp_format, events })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.timestamp_format.to_byte());
        for event in &self.events {
            out.push(event.event_type);
            out.write_u32::<BigEndian>(event.timestamp)?;
        }
        Ok(())
    }
}

// ── General encapsulated object (GEOB) ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectFrame {
    pub encoding:    TextEncoding,
    pub mime_type:   String,
    pub filename:    String,
    pub description: String,
    pub data:        Vec<u8>,
}

impl ObjectFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let encoding = r.encoding()?;
        let mime_type = r.latin1("mime type")?;
        let filename = r.string(encoding, "filename")?;
        let description = r.string(encoding, "description")?;
        let data = r.rest().to_vec();
        Ok(Self { encoding, mime_type, filename, description, data })
    }

    pub(crate) fn encode(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        let enc = self.encoding.effective(version, [self.filename.as_str(), self.description.as_str()]);
        out.push(enc.to_byte());
        encoding::encode_terminated(TextEncoding::Latin1, &self.mime_type, "mime type", out)?;
        encoding::encode_terminated(enc, &self.filename, "filename", out)?;
        encoding::encode_terminated(enc, &self.description, "description", out)?;
        out.extend_from_slice(&self.data);
        Ok(())
    }
}

// ── Private (PRIV) ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrivateFrame {
    pub owner: String,
    pub data:  Vec<u8>,
}

impl PrivateFrame {
    pub(crate) fn decode(r: &mut FieldReader<'_>) -> Result<Self> {
        let owner = r.latin1("owner")?;
        Ok(Self { owner, data: r.rest().to_vec() })
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        encoding::encode_terminated(TextEncoding::Latin1, &self.owner, "owner", out)?;
        out.extend_from_slice(&self.data);
        Ok(())
    }
}

// ── Encrypted ─────────────────────────────────────────────────────────────────

/// A frame whose encryption flag was set.  The payload is kept exactly as
/// read (still compressed, if the frame says so) and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncryptedFrame {
    pub method: u8,
    pub data:   Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reencode_text(frame: &TextFrame, version: Version) -> TextFrame {
        let mut out = Vec::new();
        frame.encode(version, &mut out).unwrap();
        TextFrame::decode(&mut FieldReader::new(&out)).unwrap()
    }

    #[test]
    fn text_values_split_and_join() {
        let mut r = FieldReader::new(b"\x03Rock\0Pop\0");
        let frame = TextFrame::decode(&mut r).unwrap();
        assert_eq!(frame.values, vec!["Rock", "Pop"]);

        let trailing_empty = TextFrame { encoding: TextEncoding::Latin1, values: vec!["a".into(), "".into()] };
        assert_eq!(reencode_text(&trailing_empty, Version::V2_4), trailing_empty);
    }

    #[test]
    fn text_utf16_each_value_has_bom() {
        let frame = TextFrame { encoding: TextEncoding::Utf16, values: vec!["A".into(), "B".into()] };
        let mut out = Vec::new();
        frame.encode(Version::V2_3, &mut out).unwrap();
        assert_eq!(out, vec![1, 0xFF, 0xFE, b'A', 0, 0, 0, 0xFF, 0xFE, b'B', 0]);
        assert_eq!(reencode_text(&frame, Version::V2_3), frame);
    }

    #[test]
    fn utf8_downgraded_for_v23() {
        let frame = TextFrame::new("Ünïcödé ☃");
        let back = reencode_text(&frame, Version::V2_3);
        assert_eq!(back.encoding, TextEncoding::Utf16);
        assert_eq!(back.values, frame.values);
    }

    #[test]
    fn user_text_replaygain() {
        let frame = UserTextFrame::new("REPLAYGAIN_TRACK_GAIN", "-6.50 dB");
        let mut out = Vec::new();
        frame.encode(Version::V2_4, &mut out).unwrap();
        let back = UserTextFrame::decode(&mut FieldReader::new(&out)).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn user_text_needs_terminated_description() {
        let mut r = FieldReader::new(b"\x00no terminator");
        assert!(matches!(
            UserTextFrame::decode(&mut r),
            Err(Id3Error::UnterminatedString { field: "description" })
        ));
    }

    #[test]
    fn comment_language_is_fixed_width() {
        let mut r = FieldReader::new(b"\x00en");
        assert!(matches!(
            CommentFrame::decode(&mut r),
            Err(Id3Error::TruncatedFixedField { field: "language", .. })
        ));

        let mut r = FieldReader::new(b"\x00engdesc\0Some text\0");
        let c = CommentFrame::decode(&mut r).unwrap();
        assert_eq!(c.language(), "eng");
        assert_eq!(c.description, "desc");
        assert_eq!(c.text, "Some text");
    }

    #[test]
    fn legacy_picture_layout() {
        let mut payload = vec![0x00];
        payload.extend_from_slice(b"PNG");
        payload.push(3);
        payload.extend_from_slice(b"cover\0");
        payload.extend_from_slice(&[0x89, b'P', b'N', b'G']);
        let pic = PictureFrame::decode(&mut FieldReader::new(&payload), true).unwrap();
        assert_eq!(pic.mime_type, "image/png");
        assert_eq!(pic.picture_type, PictureType::CoverFront);
        assert_eq!(pic.description, "cover");
        assert_eq!(pic.data, vec![0x89, b'P', b'N', b'G']);

        let mut out = Vec::new();
        pic.encode(Version::V2_4, &mut out).unwrap();
        assert!(out.starts_with(b"\x00image/png\0\x03cover\0"));
    }

    #[test]
    fn popularimeter_counter_variants() {
        let mut r = FieldReader::new(b"a@b\0\xC4");
        let p = PopularimeterFrame::decode(&mut r).unwrap();
        assert_eq!((p.rating, p.counter), (0xC4, None));

        let mut r = FieldReader::new(b"a@b\0\x01\x00\x00\x01\x00\x00");
        let p = PopularimeterFrame::decode(&mut r).unwrap();
        assert_eq!(p.counter, Some(0x0001_0000));

        let mut out = Vec::new();
        PopularimeterFrame { email: "x".into(), rating: 1, counter: Some(7) }.encode(&mut out).unwrap();
        assert_eq!(out, b"x\0\x01\x00\x00\x00\x07");
    }

    #[test]
    fn involved_people_pairs() {
        let mut r = FieldReader::new(b"\x00producer\0Alice\0mix\0Bob");
        let f = InvolvedPeopleFrame::decode(&mut r).unwrap();
        assert_eq!(f.people, vec![
            ("producer".to_string(), "Alice".to_string()),
            ("mix".to_string(), "Bob".to_string()),
        ]);
        let mut r = FieldReader::new(b"\x00engineer");
        let f = InvolvedPeopleFrame::decode(&mut r).unwrap();
        assert_eq!(f.people, vec![("engineer".to_string(), String::new())]);
    }

    #[test]
    fn sync_lyrics_entries() {
        let frame = SyncLyricsFrame {
            encoding:         TextEncoding::Utf16,
            language:         *b"eng",
            timestamp_format: TimestampFormat::Milliseconds,
            content_type:     1,
            description:      "verse".into(),
            lines:            vec![
                SyncedText { text: "Hello".into(), timestamp: 1000 },
                SyncedText { text: "World".into(), timestamp: 2500 },
            ],
        };
        let mut out = Vec::new();
        frame.encode(Version::V2_3, &mut out).unwrap();
        let back = SyncLyricsFrame::decode(&mut FieldReader::new(&out)).unwrap();
        assert_eq!(back, frame);

        out.truncate(out.len() - 2);
        assert!(matches!(
            SyncLyricsFrame::decode(&mut FieldReader::new(&out)),
            Err(Id3Error::TruncatedFixedField { field: "timestamp", .. })
        ));
    }

    #[test]
    fn event_timing_truncated_event() {
        let mut r = FieldReader::new(&[2, 0x03, 0, 0, 0x10, 0x00, 0x04, 0]);
        assert!(matches!(
            EventTimingFrame::decode(&mut r),
            Err(Id3Error::TruncatedFixedField { field: "timestamp", .. })
        ));
    }

    #[test]
    fn geob_fields() {
        let frame = ObjectFrame {
            encoding:    TextEncoding::Latin1,
            mime_type:   "application/octet-stream".into(),
            filename:    "blob.bin".into(),
            description: "raw".into(),
            data:        vec![0, 1, 2, 0xFF],
        };
        let mut out = Vec::new();
        frame.encode(Version::V2_4, &mut out).unwrap();
        assert_eq!(ObjectFrame::decode(&mut FieldReader::new(&out)).unwrap(), frame);
    }

    #[test]
    fn last_value_ending_in_nul_survives() {
        for values in [vec!["x\0"], vec!["a", "b\0"], vec!["\0"]] {
            let frame = TextFrame {
                encoding: TextEncoding::Latin1,
                values:   values.into_iter().map(String::from).collect(),
            };
            let mut first = Vec::new();
            frame.encode(Version::V2_4, &mut first).unwrap();
            let mut second = Vec::new();
            reencode_text(&frame, Version::V2_4).encode(Version::V2_4, &mut second).unwrap();
            assert_eq!(first, second);
        }
        let frame = TextFrame { encoding: TextEncoding::Latin1, values: vec!["x\0".into()] };
        let mut out = Vec::new();
        frame.encode(Version::V2_4, &mut out).unwrap();
        assert_eq!(out, b"\x00x\0\0");
    }

    #[test]
    fn terminated_fields_refuse_embedded_nul() {
        let mut out = Vec::new();
        assert!(matches!(
            UserTextFrame::new("A\0B", "v").encode(Version::V2_4, &mut out),
            Err(Id3Error::EmbeddedTerminator { field: "description" })
        ));
        assert!(matches!(
            CommentFrame::new(*b"eng", "x\0", "t").encode(Version::V2_4, &mut out),
            Err(Id3Error::EmbeddedTerminator { field: "description" })
        ));
        let pic = PictureFrame { mime_type: "image/png".into(), description: "\0".into(), ..PictureFrame::default() };
        assert!(matches!(
            pic.encode(Version::V2_4, &mut out),
            Err(Id3Error::EmbeddedTerminator { field: "description" })
        ));
        let sylt = SyncLyricsFrame {
            lines: vec![SyncedText { text: "la\0la".into(), timestamp: 0 }],
            ..SyncLyricsFrame::default()
        };
        assert!(matches!(
            sylt.encode(Version::V2_4, &mut out),
            Err(Id3Error::EmbeddedTerminator { field: "lyric text" })
        ));
        let people = InvolvedPeopleFrame {
            encoding: TextEncoding::Latin1,
            people:   vec![("bass".into(), "A\0B".into())],
        };
        assert!(matches!(
            people.encode(Version::V2_4, &mut out),
            Err(Id3Error::EmbeddedTerminator { field: "involved people" })
        ));
    }
}
