//! Attached-picture type byte and v2.2 image format names.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PictureType {
    #[default]
    Other,
    FileIcon,
    OtherFileIcon,
    CoverFront,
    CoverBack,
    Leaflet,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    ScreenCapture,
    BrightFish,
    Illustration,
    BandLogo,
    PublisherLogo,
    /// Values above 0x14 are preserved verbatim.
    Undefined(u8),
}

const TYPES: [PictureType; 21] = [
    PictureType::Other,
    PictureType::FileIcon,
    PictureType::OtherFileIcon,
    PictureType::CoverFront,
    PictureType::CoverBack,
    PictureType::Leaflet,
    PictureType::Media,
    PictureType::LeadArtist,
    PictureType::Artist,
    PictureType::Conductor,
    PictureType::Band,
    PictureType::Composer,
    PictureType::Lyricist,
    PictureType::RecordingLocation,
    PictureType::DuringRecording,
    PictureType::DuringPerformance,
    PictureType::ScreenCapture,
    PictureType::BrightFish,
    PictureType::Illustration,
    PictureType::BandLogo,
    PictureType::PublisherLogo,
];

impl PictureType {
    pub fn from_byte(byte: u8) -> Self {
        TYPES.get(byte as usize).copied().unwrap_or(PictureType::Undefined(byte))
    }

    pub fn to_byte(self) -> u8 {
        match self {
            PictureType::Undefined(b) => b,
            known => TYPES.iter().position(|t| *t == known).map_or(0, |i| i as u8),
        }
    }
}

/// MIME type for a v2.2 `PIC` image format such as `JPG`.
pub fn mime_for_legacy_format(format: &[u8; 3]) -> String {
    let upper = format.to_ascii_uppercase();
    match upper.as_slice() {
        b"JPG" => "image/jpeg".to_string(),
        b"PNG" => "image/png".to_string(),
        b"GIF" => "image/gif".to_string(),
        b"BMP" => "image/bmp".to_string(),
        other => {
            let name: String = other
                .iter()
                .filter(|b| b.is_ascii_alphanumeric())
                .map(|&b| (b as char).to_ascii_lowercase())
                .collect();
            format!("image/{name}")
        }
    }
}
