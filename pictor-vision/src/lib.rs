pub mod faces;
pub mod ocr;
pub mod params;
pub mod text;
pub mod transform;

use std::sync::Arc;

use image::DynamicImage;
use pictor_core::{Config, Result, config::TextConfig};
use serde::Serialize;
use tracing::instrument;

pub use faces::{FaceBox, FaceDetector, FaceParams, SeetaFace};
pub use ocr::{Tesseract, TextRecognizer};
pub use params::Params;
pub use text::TextRegion;
pub use transform::{Operation, Transform};

#[derive(Debug, Clone, Serialize)]
pub struct TextExtraction {
    pub text: String,
    pub regions: Vec<TextRegion>,
}

#[derive(Debug, Clone)]
pub struct FaceDetection {
    pub faces: Vec<FaceBox>,
    pub annotated: DynamicImage,
}

/// The OCR and face engines plus the tuning they run with.
#[derive(Clone)]
pub struct Vision {
    recognizer: Arc<dyn TextRecognizer>,
    detector: Arc<dyn FaceDetector>,
    text: TextConfig,
    faces: FaceParams,
}

impl Vision {
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        detector: Arc<dyn FaceDetector>,
        text: TextConfig,
        faces: FaceParams,
    ) -> Self {
        Self {
            recognizer,
            detector,
            text,
            faces,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(Tesseract::new(&config.ocr)),
            Arc::new(SeetaFace::new(&config.faces)),
            config.text.clone(),
            FaceParams::from(&config.faces),
        )
    }

    /// OCR restricted to candidate text regions. Without any candidate the
    /// whole grayscale image is recognized.
    #[instrument(level = "info", skip_all)]
    pub async fn extract_text(&self, image: DynamicImage) -> Result<TextExtraction> {
        let config = self.text.clone();
        let (regions, input) = tokio::task::spawn_blocking(move || {
            let gray = image.to_luma8();
            let regions = text::find_text_regions(&gray, &config);
            let input = if regions.is_empty() {
                gray
            } else {
                text::mask_outside(&gray, &regions)
            };
            (regions, input)
        })
        .await?;

        let text = self.recognizer.recognize(&input).await?;
        Ok(TextExtraction { text, regions })
    }

    #[instrument(level = "info", skip_all)]
    pub async fn detect_faces(&self, image: DynamicImage) -> Result<FaceDetection> {
        let detector = self.detector.clone();
        let params = self.faces;
        tokio::task::spawn_blocking(move || {
            let gray = image.to_luma8();
            let faces = detector.detect(&gray, &params)?;
            let annotated = faces::annotate(&image, &faces);
            Ok(FaceDetection { faces, annotated })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};
    use pictor_core::{ErrorCode, Result, config::TextConfig};

    use super::{FaceBox, FaceDetector, FaceParams, TextRecognizer, Vision};

    /// Remembers the image it was asked to read.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Option<GrayImage>>,
    }

    #[async_trait]
    impl TextRecognizer for Recorder {
        async fn recognize(&self, image: &GrayImage) -> Result<String> {
            *self.seen.lock().unwrap() = Some(image.clone());
            Ok("hello".to_string())
        }
    }

    struct FixedFaces(Vec<FaceBox>);

    impl FaceDetector for FixedFaces {
        fn detect(&self, _gray: &GrayImage, _params: &FaceParams) -> Result<Vec<FaceBox>> {
            Ok(self.0.clone())
        }
    }

    struct NoModel;

    impl FaceDetector for NoModel {
        fn detect(&self, _gray: &GrayImage, _params: &FaceParams) -> Result<Vec<FaceBox>> {
            Err(pictor_core::Error::EngineUnavailable("no model".to_string()))
        }
    }

    fn vision(recognizer: Arc<Recorder>, detector: Arc<dyn FaceDetector>) -> Vision {
        Vision::new(
            recognizer,
            detector,
            TextConfig::default(),
            FaceParams::default(),
        )
    }

    #[tokio::test]
    async fn text_outside_regions_is_masked() {
        let recorder = Arc::new(Recorder::default());
        let vision = vision(recorder.clone(), Arc::new(FixedFaces(Vec::new())));

        let mut gray = GrayImage::from_pixel(300, 200, Luma([255]));
        draw_filled_rect_mut(&mut gray, Rect::at(100, 80).of_size(80, 20), Luma([0]));
        // faint smudge, too weak to form a region
        gray.put_pixel(5, 5, Luma([250]));

        let result = vision
            .extract_text(DynamicImage::ImageLuma8(gray))
            .await
            .unwrap();
        assert_eq!(result.text, "hello");
        assert_eq!(result.regions.len(), 1);

        let seen = recorder.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.dimensions(), (300, 200));
        assert_eq!(seen.get_pixel(5, 5)[0], 255);
        assert_eq!(seen.get_pixel(120, 90)[0], 0);
    }

    #[tokio::test]
    async fn without_regions_whole_image_is_read() {
        let recorder = Arc::new(Recorder::default());
        let vision = vision(recorder.clone(), Arc::new(FixedFaces(Vec::new())));

        let gray = GrayImage::from_pixel(40, 30, Luma([180]));
        let result = vision
            .extract_text(DynamicImage::ImageLuma8(gray.clone()))
            .await
            .unwrap();
        assert!(result.regions.is_empty());

        let seen = recorder.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen, gray);
    }

    #[tokio::test]
    async fn detected_faces_are_drawn() {
        let face = FaceBox {
            x: 4,
            y: 4,
            width: 10,
            height: 10,
            score: 5.0,
        };
        let vision = vision(
            Arc::new(Recorder::default()),
            Arc::new(FixedFaces(vec![face])),
        );

        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([255, 255, 255])));
        let result = vision.detect_faces(image).await.unwrap();
        assert_eq!(result.faces, vec![face]);
        assert_eq!(result.annotated.to_rgb8().get_pixel(4, 4), &Rgb([0, 0, 255]));
    }

    #[tokio::test]
    async fn detector_errors_propagate() {
        let vision = vision(Arc::new(Recorder::default()), Arc::new(NoModel));
        let err = vision
            .detect_faces(DynamicImage::ImageLuma8(GrayImage::new(8, 8)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::EngineUnavailable);
    }
}
