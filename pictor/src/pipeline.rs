use pictor_core::{LoadedImage, Result, Storage, encode, loader};
use pictor_vision::{FaceBox, TextExtraction, Transform, Vision};
use tracing::instrument;

pub struct FaceResult {
    pub faces: Vec<FaceBox>,
    pub image: String,
}

/// Checkout, decode, transform, write the processed file and answer with it
/// as a data URI. The upload is consumed only once the payload exists.
#[instrument(level = "info", skip(storage), fields(operation = %transform.operation()))]
pub async fn run_transform(
    storage: &Storage,
    filename: &str,
    transform: Transform,
) -> Result<String> {
    let mut checkout = storage.checkout(filename).await?;
    let LoadedImage { image, kind } = loader::load(checkout.source()).await?;

    let output = tokio::task::spawn_blocking(move || transform.apply(&image)).await??;

    let processed = checkout.processed_path(transform.operation().into(), kind);
    loader::save(output, kind, &processed).await?;
    encode::respond(checkout, &processed, kind).await
}

#[instrument(level = "info", skip(storage, vision))]
pub async fn extract_text(
    storage: &Storage,
    vision: &Vision,
    filename: &str,
) -> Result<TextExtraction> {
    let checkout = storage.checkout(filename).await?;
    let LoadedImage { image, .. } = loader::load(checkout.source()).await?;

    let extraction = vision.extract_text(image).await?;
    checkout.commit().await?;
    Ok(extraction)
}

#[instrument(level = "info", skip(storage, vision))]
pub async fn detect_faces(
    storage: &Storage,
    vision: &Vision,
    filename: &str,
) -> Result<FaceResult> {
    let mut checkout = storage.checkout(filename).await?;
    let LoadedImage { image, kind } = loader::load(checkout.source()).await?;

    let detection = vision.detect_faces(image).await?;
    tracing::info!(faces = detection.faces.len(), "faces found");

    let processed = checkout.processed_path("detect_faces", kind);
    loader::save(detection.annotated, kind, &processed).await?;
    let image = encode::respond(checkout, &processed, kind).await?;
    Ok(FaceResult {
        faces: detection.faces,
        image,
    })
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
    use pictor_core::{ErrorCode, ImageKind, Storage, config::StorageConfig, loader};
    use pictor_vision::Transform;
    use tempfile::TempDir;

    use super::run_transform;

    async fn storage_with_upload(dir: &TempDir) -> (Storage, String) {
        let storage = Storage::open(StorageConfig {
            upload_dir: dir.path().join("uploads"),
            processed_dir: dir.path().join("processed"),
            consume_on_success: true,
        })
        .await
        .unwrap();

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 200, 30])));
        let bytes = loader::encode(&image, ImageKind::Png).unwrap();
        let name = storage
            .store(Some("leaf.png"), ImageKind::Png, bytes)
            .await
            .unwrap();
        (storage, name)
    }

    fn processed_count(storage: &Storage) -> usize {
        std::fs::read_dir(storage.processed_dir()).unwrap().count()
    }

    #[tokio::test]
    async fn transform_consumes_upload_and_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let (storage, name) = storage_with_upload(&dir).await;

        let uri = run_transform(&storage, &name, Transform::Resize { width: 20, height: 10 })
            .await
            .unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(!storage.upload_dir().join(&name).exists());
        assert_eq!(processed_count(&storage), 0);
    }

    #[tokio::test]
    async fn failed_transform_keeps_upload() {
        let dir = TempDir::new().unwrap();
        let (storage, name) = storage_with_upload(&dir).await;

        let err = run_transform(&storage, &name, Transform::MedianBlur { kernel: 4 })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TransformError);
        assert!(storage.upload_dir().join(&name).exists());
        assert_eq!(processed_count(&storage), 0);

        let image = loader::load(storage.upload_dir().join(&name)).await.unwrap();
        assert_eq!(image.image.dimensions(), (40, 30));
    }

    #[tokio::test]
    async fn second_request_on_consumed_name_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let (storage, name) = storage_with_upload(&dir).await;

        run_transform(&storage, &name, Transform::Grayscale).await.unwrap();
        let err = run_transform(&storage, &name, Transform::Grayscale)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImageDecodeError);
    }
}
