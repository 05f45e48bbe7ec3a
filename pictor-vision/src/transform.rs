use image::{DynamicImage, ImageBuffer, Pixel, imageops::FilterType};
use imageproc::filter::{horizontal_filter, median_filter, vertical_filter};
use pictor_core::{Error, Result};
use tracing::instrument;

/// Pixel operations addressable over HTTP.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Resize,
    Blur,
    GaussianBlur,
    MedianBlur,
    Grayscale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Resize {
        width: u32,
        height: u32,
    },
    BoxBlur {
        kernel_width: u32,
        kernel_height: u32,
    },
    GaussianBlur {
        kernel_width: u32,
        kernel_height: u32,
        sigma: u32,
    },
    MedianBlur {
        kernel: u32,
    },
    Grayscale,
}

/// Runs `$body` against the 8-bit buffer behind a `DynamicImage`, keeping the
/// channel layout. Higher bit depths are narrowed first.
macro_rules! map_buffer {
    ($image:expr, |$buf:ident| $body:expr) => {
        match $image {
            DynamicImage::ImageLuma8($buf) => DynamicImage::ImageLuma8($body),
            DynamicImage::ImageLumaA8($buf) => DynamicImage::ImageLumaA8($body),
            DynamicImage::ImageRgb8($buf) => DynamicImage::ImageRgb8($body),
            DynamicImage::ImageRgba8($buf) => DynamicImage::ImageRgba8($body),
            other if other.color().has_alpha() => {
                let $buf = &other.to_rgba8();
                DynamicImage::ImageRgba8($body)
            }
            other => {
                let $buf = &other.to_rgb8();
                DynamicImage::ImageRgb8($body)
            }
        }
    };
}

impl Transform {
    pub fn operation(&self) -> Operation {
        match self {
            Transform::Resize { .. } => Operation::Resize,
            Transform::BoxBlur { .. } => Operation::Blur,
            Transform::GaussianBlur { .. } => Operation::GaussianBlur,
            Transform::MedianBlur { .. } => Operation::MedianBlur,
            Transform::Grayscale => Operation::Grayscale,
        }
    }

    #[instrument(
        level = "debug",
        skip(image),
        fields(width = image.width(), height = image.height())
    )]
    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::transform("Input image is empty"));
        }

        match *self {
            Transform::Resize { width, height } => {
                Ok(image.resize_exact(width, height, FilterType::Triangle))
            }
            Transform::BoxBlur {
                kernel_width,
                kernel_height,
            } => {
                let h = box_kernel(kernel_width);
                let v = box_kernel(kernel_height);
                Ok(map_buffer!(image, |buf| two_pass(buf, &h, &v)))
            }
            Transform::GaussianBlur {
                kernel_width,
                kernel_height,
                sigma,
            } => {
                if kernel_width % 2 == 0 || kernel_height % 2 == 0 {
                    return Err(Error::transform("Gaussian kernel dimensions must be odd"));
                }
                let h = gaussian_kernel(kernel_width, sigma as f32);
                let v = gaussian_kernel(kernel_height, sigma as f32);
                Ok(map_buffer!(image, |buf| two_pass(buf, &h, &v)))
            }
            Transform::MedianBlur { kernel } => {
                if kernel % 2 == 0 {
                    return Err(Error::transform("Median kernel size must be odd"));
                }
                let radius = kernel / 2;
                Ok(map_buffer!(image, |buf| median_filter(buf, radius, radius)))
            }
            Transform::Grayscale => Ok(DynamicImage::ImageLuma8(image.to_luma8())),
        }
    }
}

/// Horizontal then vertical pass; the two kernels may differ in length.
fn two_pass<P>(buf: &ImageBuffer<P, Vec<u8>>, h: &[f32], v: &[f32]) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    vertical_filter(&horizontal_filter(buf, h), v)
}

fn box_kernel(size: u32) -> Vec<f32> {
    vec![1.0 / size as f32; size as usize]
}

fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let center = (size as f32 - 1.0) / 2.0;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}
