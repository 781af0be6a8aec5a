//! Inline image encoding.
//!
//! The generated deck is a single self-contained HTML file, so every image is
//! embedded as a `data:` URI. The media type is decided from the file
//! extension alone; an extension outside [`MediaType`] is never guessed at.
//! The caller reports it and leaves the file out.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Image encodings that can be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Svg,
    Webp,
    Avif,
    Bmp,
    Ico,
}

impl MediaType {
    /// Look up a media type by file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "svg" => Some(Self::Svg),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "bmp" => Some(Self::Bmp),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    /// Look up a media type from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Bmp => "image/bmp",
            Self::Ico => "image/x-icon",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A base64 payload tagged with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub media_type: MediaType,
    pub base64: String,
}

impl InlineImage {
    /// Render as `data:<mime>;base64,<payload>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type.mime(), self.base64)
    }
}

/// Encode raw bytes. Deterministic: same input, same output.
pub fn encode(bytes: &[u8], media_type: MediaType) -> InlineImage {
    InlineImage {
        media_type,
        base64: STANDARD.encode(bytes),
    }
}

/// Neutral placeholder used where a photo slot has no image.
pub const PLACEHOLDER_SVG: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 1200 800\"><path fill=\"#c6feff\" d=\"M0 0H1200V800H0Z\"/></svg>";

pub fn placeholder() -> InlineImage {
    encode(PLACEHOLDER_SVG.as_bytes(), MediaType::Svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(MediaType::from_extension("PNG"), Some(MediaType::Png));
        assert_eq!(MediaType::from_extension("Jpeg"), Some(MediaType::Jpeg));
        assert_eq!(MediaType::from_extension("jpg"), Some(MediaType::Jpeg));
    }

    #[test]
    fn at_least_five_types_recognised() {
        for ext in ["png", "jpg", "gif", "svg", "webp", "avif"] {
            assert!(MediaType::from_extension(ext).is_some(), "{ext}");
        }
    }

    #[test]
    fn unknown_extension_is_none() {
        assert_eq!(MediaType::from_extension("tiff"), None);
        assert_eq!(MediaType::from_extension("txt"), None);
        assert_eq!(MediaType::from_path(Path::new("noext")), None);
    }

    #[test]
    fn from_path_uses_extension() {
        assert_eq!(
            MediaType::from_path(Path::new("images/Login-01.SVG")),
            Some(MediaType::Svg)
        );
    }

    #[test]
    fn data_uri_format() {
        let img = encode(b"hello", MediaType::Png);
        assert_eq!(img.base64, "aGVsbG8=");
        assert_eq!(img.data_uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn encoding_is_deterministic() {
        let bytes = [0x89, b'P', b'N', b'G', 0, 1, 2, 255];
        assert_eq!(encode(&bytes, MediaType::Png), encode(&bytes, MediaType::Png));
    }

    #[test]
    fn svg_mime_type() {
        assert!(placeholder().data_uri().starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn empty_payload() {
        assert_eq!(encode(&[], MediaType::Gif).data_uri(), "data:image/gif;base64,");
    }
}
