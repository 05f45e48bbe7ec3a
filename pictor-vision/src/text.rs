use image::{GrayImage, Luma};
use imageproc::{
    contours::{BorderType, Contour, find_contours},
    distance_transform::Norm,
    edges::canny,
    filter::box_filter,
    morphology::dilate,
};
use pictor_core::config::TextConfig;
use serde::Serialize;

/// Axis-aligned box around a candidate text blob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Polygon area of the blob's outer contour.
    pub area: f64,
}

impl TextRegion {
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    fn from_contour(contour: &Contour<i32>) -> Option<Self> {
        let first = contour.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some(Self {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
            area: polygon_area(contour),
        })
    }
}

fn polygon_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Foreground mask of likely glyph strokes: inverted adaptive mean threshold
/// merged with Canny edges, then dilated so neighbouring glyphs join up.
pub fn binarize(gray: &GrayImage, config: &TextConfig) -> GrayImage {
    let edges = canny(gray, config.canny_low, config.canny_high);
    let means = box_filter(gray, config.block_radius, config.block_radius);

    let mut binary = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in binary.enumerate_pixels_mut() {
        let value = gray.get_pixel(x, y)[0] as i16;
        let mean = means.get_pixel(x, y)[0] as i16;
        let foreground = value <= mean - config.threshold_offset || edges.get_pixel(x, y)[0] > 0;
        *pixel = Luma([if foreground { 255 } else { 0 }]);
    }

    dilate(&binary, Norm::LInf, config.dilate_radius)
}

/// Candidate text regions in reading order (top to bottom, then left to right).
pub fn find_text_regions(gray: &GrayImage, config: &TextConfig) -> Vec<TextRegion> {
    let binary = binarize(gray, config);

    let mut regions: Vec<TextRegion> = find_contours::<i32>(&binary)
        .iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .filter_map(TextRegion::from_contour)
        .filter(|region| {
            (config.min_area..=config.max_area).contains(&region.area)
                && (config.min_aspect..=config.max_aspect).contains(&region.aspect())
        })
        .collect();
    regions.sort_by_key(|region| (region.y, region.x));

    tracing::debug!(count = regions.len(), "text regions kept");
    regions
}

/// Paints everything outside the union of `regions` white.
pub fn mask_outside(gray: &GrayImage, regions: &[TextRegion]) -> GrayImage {
    let mut masked = gray.clone();
    for (x, y, pixel) in masked.enumerate_pixels_mut() {
        if !regions.iter().any(|region| region.contains(x, y)) {
            *pixel = Luma([255]);
        }
    }
    masked
}
