//! Version adapter: per-version frame header shape and v2.2 ID mapping.
//!
//! | Version | Header | ID     | Size                | Flags   |
//! |---------|--------|--------|---------------------|---------|
//! | 2.2     | 6 B    | 3 B    | 3 B plain BE        | none    |
//! | 2.3     | 10 B   | 4 B    | 4 B plain BE        | 2 B     |
//! | 2.4     | 10 B   | 4 B    | 4 B syncsafe        | 2 B     |
//!
//! Version 2.2 is decode-only.  Every rendered frame uses the 2.3/2.4 shape.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use tracing::trace;

use crate::error::{Id3Error, Result};
use crate::syncsafe;

// ── Version ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V2_2,
    V2_3,
    V2_4,
}

impl Version {
    pub fn from_major(major: u8) -> Result<Self> {
        match major {
            2 => Ok(Version::V2_2),
            3 => Ok(Version::V2_3),
            4 => Ok(Version::V2_4),
            other => Err(Id3Error::UnsupportedVersion(other)),
        }
    }

    #[inline]
    pub fn major(self) -> u8 {
        match self {
            Version::V2_2 => 2,
            Version::V2_3 => 3,
            Version::V2_4 => 4,
        }
    }

    #[inline]
    pub fn frame_header_len(self) -> usize {
        match self {
            Version::V2_2 => 6,
            Version::V2_3 | Version::V2_4 => 10,
        }
    }

    #[inline]
    pub fn frame_id_len(self) -> usize {
        match self {
            Version::V2_2 => 3,
            Version::V2_3 | Version::V2_4 => 4,
        }
    }

    /// UTF-16BE without BOM and UTF-8 are only defined from 2.4 on.
    #[inline]
    pub fn supports_utf8(self) -> bool {
        self == Version::V2_4
    }

    /// Versions the encoder can emit.
    pub fn is_writable(self) -> bool {
        self != Version::V2_2
    }

    /// Parse a CLI string such as `"3"`, `"2.4"` or `"v2.3"`.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim_start_matches('v') {
            "2" | "2.2" => Some(Version::V2_2),
            "3" | "2.3" => Some(Version::V2_3),
            "4" | "2.4" => Some(Version::V2_4),
            _           => None,
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID3v2.{}", self.major())
    }
}

// ── Frame header ─────────────────────────────────────────────────────────────

/// A frame header as it appears on the wire, before flag interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrameHeader {
    pub id:    String,
    pub size:  usize,
    pub flags: [u8; 2],
}

/// Outcome of reading the bytes where a frame header is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderScan {
    Frame(RawFrameHeader),
    /// A zero ID byte: the padding region starts here.
    Padding,
    /// Too few bytes left for a header, or an ID with bytes outside `A-Z0-9`.
    Garbage,
}

fn is_valid_id(id: &[u8]) -> bool {
    id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

impl RawFrameHeader {
    /// Read a frame header from the start of `data`.
    pub fn scan(version: Version, data: &[u8]) -> Result<HeaderScan> {
        if data.first().map_or(true, |&b| b == 0) {
            return Ok(HeaderScan::Padding);
        }
        let header_len = version.frame_header_len();
        if data.len() < header_len {
            return Ok(HeaderScan::Garbage);
        }

        let id_len = version.frame_id_len();
        let id_bytes = &data[..id_len];
        if !is_valid_id(id_bytes) {
            trace!(?id_bytes, "frame id outside A-Z0-9");
            return Ok(HeaderScan::Garbage);
        }
        let id: String = id_bytes.iter().map(|&b| b as char).collect();

        let (size, flags) = match version {
            Version::V2_2 => (BigEndian::read_u24(&data[3..6]) as usize, [0, 0]),
            Version::V2_3 => (BigEndian::read_u32(&data[4..8]) as usize, [data[8], data[9]]),
            Version::V2_4 => {
                let size = syncsafe::decode_u28([data[4], data[5], data[6], data[7]])?;
                (size as usize, [data[8], data[9]])
            }
        };

        Ok(HeaderScan::Frame(RawFrameHeader { id, size, flags }))
    }

    /// Append a 2.3/2.4 frame header to `out`.
    pub fn write(&self, version: Version, out: &mut Vec<u8>) -> Result<()> {
        if !version.is_writable() {
            return Err(Id3Error::UnsupportedVersion(version.major()));
        }
        let size = u32::try_from(self.size)
            .map_err(|_| Id3Error::TagTooLarge { size: self.size })?;
        out.extend_from_slice(self.id.as_bytes());
        match version {
            Version::V2_4 => out.extend_from_slice(&syncsafe::encode_u28(size)?),
            _             => out.write_u32::<BigEndian>(size)?,
        }
        out.extend_from_slice(&self.flags);
        Ok(())
    }
}

// ── Legacy (v2.2) ID table ───────────────────────────────────────────────────
//
// Bidirectional: every 3-character ID maps to exactly one canonical ID and no
// canonical ID appears twice.  Canonical IDs use the 2.3 vocabulary, which
// 2.4 readers accept.

pub static LEGACY_IDS: [(&str, &str); 66] = [
    ("BUF", "RBUF"), ("CNT", "PCNT"), ("COM", "COMM"), ("CRA", "AENC"),
    ("ETC", "ETCO"), ("EQU", "EQUA"), ("GEO", "GEOB"), ("IPL", "IPLS"),
    ("LNK", "LINK"), ("MCI", "MCDI"), ("MLL", "MLLT"), ("PIC", "APIC"),
    ("POP", "POPM"), ("REV", "RVRB"), ("RVA", "RVAD"), ("SLT", "SYLT"),
    ("STC", "SYTC"), ("TAL", "TALB"), ("TBP", "TBPM"), ("TCM", "TCOM"),
    ("TCO", "TCON"), ("TCR", "TCOP"), ("TDA", "TDAT"), ("TDY", "TDLY"),
    ("TEN", "TENC"), ("TFT", "TFLT"), ("TIM", "TIME"), ("TKE", "TKEY"),
    ("TLA", "TLAN"), ("TLE", "TLEN"), ("TMT", "TMED"), ("TOA", "TOPE"),
    ("TOF", "TOFN"), ("TOL", "TOLY"), ("TOR", "TORY"), ("TOT", "TOAL"),
    ("TP1", "TPE1"), ("TP2", "TPE2"), ("TP3", "TPE3"), ("TP4", "TPE4"),
    ("TPA", "TPOS"), ("TPB", "TPUB"), ("TRC", "TSRC"), ("TRD", "TRDA"),
    ("TRK", "TRCK"), ("TSI", "TSIZ"), ("TSS", "TSSE"), ("TT1", "TIT1"),
    ("TT2", "TIT2"), ("TT3", "TIT3"), ("TXT", "TEXT"), ("TXX", "TXXX"),
    ("TYE", "TYER"), ("UFI", "UFID"), ("ULT", "USLT"), ("WAF", "WOAF"),
    ("WAR", "WOAR"), ("WAS", "WOAS"), ("WCM", "WCOM"), ("WCP", "WCOP"),
    ("WPB", "WPUB"), ("WXX", "WXXX"), ("TCP", "TCMP"), ("TST", "TSOT"),
    ("TSA", "TSOA"), ("TSP", "TSOP"),
];

/// Canonical 4-character ID for a v2.2 ID, if the table knows it.
pub fn canonical_id_for(legacy: &str) -> Option<&'static str> {
    LEGACY_IDS.iter().find(|(old, _)| *old == legacy).map(|(_, new)| *new)
}

/// The v2.2 ID a canonical ID was upgraded from.  Diagnostics only; the
/// encoder never writes 3-character IDs.
pub fn legacy_id_for(canonical: &str) -> Option<&'static str> {
    LEGACY_IDS.iter().find(|(_, new)| *new == canonical).map(|(old, _)| *old)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn legacy_table_is_bijective() {
        let olds: HashSet<_> = LEGACY_IDS.iter().map(|(o, _)| *o).collect();
        let news: HashSet<_> = LEGACY_IDS.iter().map(|(_, n)| *n).collect();
        assert_eq!(olds.len(), 66);
        assert_eq!(news.len(), 66);
        assert!(LEGACY_IDS.iter().all(|(o, n)| o.len() == 3 && n.len() == 4));
    }

    #[test]
    fn representative_mappings() {
        assert_eq!(canonical_id_for("TT2"), Some("TIT2"));
        assert_eq!(canonical_id_for("TP1"), Some("TPE1"));
        assert_eq!(canonical_id_for("TAL"), Some("TALB"));
        assert_eq!(canonical_id_for("PIC"), Some("APIC"));
        assert_eq!(canonical_id_for("CRM"), None);
        assert_eq!(legacy_id_for("TIT2"), Some("TT2"));
    }

    #[test]
    fn header_shapes() {
        let v22 = [b'T', b'T', b'2', 0x00, 0x01, 0x02, 0xAA];
        assert_eq!(
            RawFrameHeader::scan(Version::V2_2, &v22).unwrap(),
            HeaderScan::Frame(RawFrameHeader { id: "TT2".into(), size: 0x0102, flags: [0, 0] })
        );

        let v23 = [b'T', b'I', b'T', b'2', 0x00, 0x00, 0x00, 0x80, 0x40, 0x20];
        assert_eq!(
            RawFrameHeader::scan(Version::V2_3, &v23).unwrap(),
            HeaderScan::Frame(RawFrameHeader { id: "TIT2".into(), size: 0x80, flags: [0x40, 0x20] })
        );

        let v24 = [b'T', b'I', b'T', b'2', 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(
            RawFrameHeader::scan(Version::V2_4, &v24).unwrap(),
            HeaderScan::Frame(RawFrameHeader { id: "TIT2".into(), size: 0x80, flags: [0, 0] })
        );

        assert!(RawFrameHeader::scan(Version::V2_4, &v23).is_err());
    }

    #[test]
    fn padding_and_garbage() {
        assert_eq!(RawFrameHeader::scan(Version::V2_3, &[0; 10]).unwrap(), HeaderScan::Padding);
        assert_eq!(RawFrameHeader::scan(Version::V2_3, &[]).unwrap(), HeaderScan::Padding);
        assert_eq!(RawFrameHeader::scan(Version::V2_3, b"TI").unwrap(), HeaderScan::Garbage);
        assert_eq!(RawFrameHeader::scan(Version::V2_3, b"ti t\0\0\0\x01\0\0").unwrap(), HeaderScan::Garbage);
    }

    #[test]
    fn write_never_emits_v22() {
        let h = RawFrameHeader { id: "TIT2".into(), size: 5, flags: [0, 0] };
        let mut out = Vec::new();
        assert!(h.write(Version::V2_2, &mut out).is_err());
        h.write(Version::V2_4, &mut out).unwrap();
        assert_eq!(out, b"TIT2\0\0\0\x05\0\0");
    }
}
