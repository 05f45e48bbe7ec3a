use std::{fmt, path::PathBuf, sync::OnceLock};

use image::{DynamicImage, GrayImage, Rgb, Rgba};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use pictor_core::{Error, Result, config::FacesConfig};
use rustface::{ImageData, Model};
use serde::Serialize;

const BOX_COLOR: [u8; 3] = [0, 0, 255];
const BOX_THICKNESS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub score: f64,
}

/// Detector-independent search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceParams {
    pub scale_factor: f32,
    pub min_size: u32,
}

impl Default for FaceParams {
    fn default() -> Self {
        Self::from(&FacesConfig::default())
    }
}

impl From<&FacesConfig> for FaceParams {
    fn from(config: &FacesConfig) -> Self {
        Self {
            scale_factor: config.scale_factor,
            min_size: config.min_size,
        }
    }
}

/// Synchronous detector; callers run it on the blocking pool.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, gray: &GrayImage, params: &FaceParams) -> Result<Vec<FaceBox>>;
}

/// SeetaFace cascade via `rustface`.
///
/// The model is parsed on first use and kept resident; a failed load is
/// retried on the next request.
pub struct SeetaFace {
    model_path: PathBuf,
    score_threshold: f64,
    model: OnceLock<Model>,
}

impl SeetaFace {
    pub fn new(config: &FacesConfig) -> Self {
        if !config.model_path.exists() {
            tracing::warn!(
                path = %config.model_path.display(),
                "face model not found, /detect_faces will be unavailable"
            );
        }
        Self {
            model_path: config.model_path.clone(),
            score_threshold: config.score_threshold,
            model: OnceLock::new(),
        }
    }

    fn model(&self) -> Result<&Model> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }
        if !self.model_path.is_file() {
            return Err(Error::EngineUnavailable(format!(
                "Face model not found: {}",
                self.model_path.display()
            )));
        }
        let path = self.model_path.to_str().ok_or_else(|| {
            Error::EngineUnavailable(format!(
                "Face model path is not valid UTF-8: {}",
                self.model_path.display()
            ))
        })?;
        let model = rustface::load_model(path)
            .map_err(|err| Error::EngineUnavailable(format!("Failed to load face model: {err}")))?;
        tracing::info!(path = %self.model_path.display(), "face model loaded");
        Ok(self.model.get_or_init(|| model))
    }
}

impl fmt::Debug for SeetaFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeetaFace")
            .field("model_path", &self.model_path)
            .field("score_threshold", &self.score_threshold)
            .field("loaded", &self.model.get().is_some())
            .finish()
    }
}

impl FaceDetector for SeetaFace {
    fn detect(&self, gray: &GrayImage, params: &FaceParams) -> Result<Vec<FaceBox>> {
        let mut detector = rustface::create_detector_with_model(self.model()?.clone());

        detector.set_min_face_size(params.min_size);
        detector.set_pyramid_scale_factor(1.0 / params.scale_factor);
        detector.set_score_thresh(self.score_threshold);
        detector.set_slide_window_step(4, 4);

        let mut data = ImageData::new(gray.as_raw(), gray.width(), gray.height());
        let faces = detector
            .detect(&mut data)
            .into_iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBox {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width(),
                    height: bbox.height(),
                    score: face.score(),
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = faces.len(), "faces detected");
        Ok(faces)
    }
}

fn outlines(face: &FaceBox) -> impl Iterator<Item = Rect> + '_ {
    (0..BOX_THICKNESS).filter_map(move |inset| {
        let width = face.width.checked_sub(2 * inset).filter(|w| *w > 0)?;
        let height = face.height.checked_sub(2 * inset).filter(|h| *h > 0)?;
        Some(Rect::at(face.x + inset as i32, face.y + inset as i32).of_size(width, height))
    })
}

/// Draws every face box onto a color copy of `image`.
pub fn annotate(image: &DynamicImage, faces: &[FaceBox]) -> DynamicImage {
    if image.color().has_alpha() {
        let mut canvas = image.to_rgba8();
        let [r, g, b] = BOX_COLOR;
        for rect in faces.iter().flat_map(outlines) {
            draw_hollow_rect_mut(&mut canvas, rect, Rgba([r, g, b, 255]));
        }
        DynamicImage::ImageRgba8(canvas)
    } else {
        let mut canvas = image.to_rgb8();
        for rect in faces.iter().flat_map(outlines) {
            draw_hollow_rect_mut(&mut canvas, rect, Rgb(BOX_COLOR));
        }
        DynamicImage::ImageRgb8(canvas)
    }
}
