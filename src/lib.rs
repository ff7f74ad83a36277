pub mod config;
pub mod encoding;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod syncsafe;
pub mod tag;
pub mod unsync;
pub mod version;

pub use config::{ParseOptions, WriteOptions};
pub use encoding::TextEncoding;
pub use error::{Id3Error, Result};
pub use flags::FrameFlags;
pub use frame::{Frame, FrameBody, FrameId, FrameIssue, IssueAction, PictureType};
pub use header::{ExtendedHeader, TagFlags, TagHeader};
pub use tag::{ParsedTag, Tag};
pub use version::{canonical_id_for, legacy_id_for, Version};
