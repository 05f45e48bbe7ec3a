//! Content sniffing for uploads. The declared filename and content type are
//! never consulted here.

use image::ImageFormat;

use crate::error::{Error, Result};

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub fn format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Sniffs `bytes` and returns the accepted image kind.
pub fn validate(bytes: &[u8]) -> Result<ImageKind> {
    let detected = infer::get(bytes).ok_or_else(|| {
        Error::UnsupportedMediaType("Unable to determine file type".to_string())
    })?;

    let mime = detected.mime_type();
    if !ACCEPTED_MIME_TYPES.contains(&mime) {
        tracing::debug!(mime, "rejected upload");
        return Err(Error::UnsupportedMediaType("Unsupported file type".to_string()));
    }

    ImageKind::from_mime(mime)
        .ok_or_else(|| Error::UnsupportedMediaType("Unsupported file type".to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::{ImageKind, validate};
    use crate::error::ErrorCode;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), format)
            .expect("encode fixture");
        buf
    }

    #[test]
    fn accepts_png_and_jpeg() {
        assert_eq!(validate(&encoded(ImageFormat::Png)).unwrap(), ImageKind::Png);
        assert_eq!(
            validate(&encoded(ImageFormat::Jpeg)).unwrap(),
            ImageKind::Jpeg
        );
    }

    #[test]
    fn rejects_plain_text() {
        let err = validate(b"just some notes, not an image").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedMediaType);
        assert_eq!(err.to_string(), "Unable to determine file type");
    }

    #[test]
    fn rejects_empty_upload() {
        let err = validate(&[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedMediaType);
    }

    #[test]
    fn rejects_other_image_types() {
        let err = validate(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedMediaType);
        assert_eq!(err.to_string(), "Unsupported file type");
    }

    #[test]
    fn kind_round_trips_through_format() {
        for kind in [ImageKind::Png, ImageKind::Jpeg] {
            assert_eq!(ImageKind::from_format(kind.format()), Some(kind));
            assert_eq!(ImageKind::from_mime(kind.mime()), Some(kind));
        }
        assert_eq!(ImageKind::from_mime("image/jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_format(ImageFormat::Gif), None);
    }
}
