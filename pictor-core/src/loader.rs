use std::{
    io::{Cursor, ErrorKind},
    path::Path,
};

use image::{DynamicImage, ImageReader};
use tracing::instrument;

use crate::{
    error::{Error, Result},
    mime::ImageKind,
};

/// A decoded image together with the container it came from.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub kind: ImageKind,
}

/// Reads and decodes a stored image. The format is sniffed from content.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load(path: impl AsRef<Path>) -> Result<LoadedImage> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || load_blocking(&path)).await?
}

fn load_blocking(path: &Path) -> Result<LoadedImage> {
    let bytes = std::fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => Error::ImageDecode("Image not found".to_string()),
        _ => Error::read(path, err),
    })?;

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| Error::read(path, err))?;
    let format = reader.format();
    let image = reader
        .decode()
        .map_err(|err| Error::ImageDecode(format!("Failed to decode image: {err}")))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::ImageDecode("Decoded image is empty".to_string()));
    }

    let kind = format
        .and_then(ImageKind::from_format)
        .unwrap_or(ImageKind::Png);
    Ok(LoadedImage { image, kind })
}

/// Encodes `image` for `kind`. JPEG has no alpha channel, so those buffers
/// are flattened first.
pub fn encode(image: &DynamicImage, kind: ImageKind) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    match (kind, image) {
        (ImageKind::Jpeg, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => {
            image.write_to(&mut cursor, kind.format())?
        }
        (ImageKind::Jpeg, DynamicImage::ImageLumaA8(_)) => {
            DynamicImage::ImageLuma8(image.to_luma8()).write_to(&mut cursor, kind.format())?
        }
        (ImageKind::Jpeg, _) => {
            DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut cursor, kind.format())?
        }
        (ImageKind::Png, _) => image.write_to(&mut cursor, kind.format())?,
    }
    Ok(buf)
}

/// Encodes and writes a transform result into the processed area.
pub async fn save(image: DynamicImage, kind: ImageKind, path: impl AsRef<Path>) -> Result<()> {
    let bytes = tokio::task::spawn_blocking(move || encode(&image, kind)).await??;
    tokio::fs::write(path.as_ref(), bytes)
        .await
        .map_err(Error::StorageWrite)
}
