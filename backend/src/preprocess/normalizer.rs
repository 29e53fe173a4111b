//! Decoding and canonicalization of uploaded images.
//!
//! Every upload, whatever its encoding, colour mode or dimensions, leaves
//! this module as an NHWC tensor of shape `[1, H, W, 3]` with RGB values in
//! `[0.0, 1.0]`. The resize stretches to the target box; aspect ratio is not
//! preserved.

use image::imageops::FilterType;
use ndarray::{Array4, ArrayView4};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Fixed resampling policy. Triangle is bilinear interpolation.
const RESAMPLE_FILTER: FilterType = FilterType::Triangle;
const RGB_CHANNELS: usize = 3;
const MAX_INTENSITY: f32 = 255.0;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("cannot identify image file: {0}")]
    Decode(#[from] image::ImageError),
    #[error("target size must be non-zero, got {0}")]
    EmptyTarget(InputSize),
    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Spatial input size of the classifier, `height x width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "[u32; 2]")]
pub struct InputSize {
    pub height: u32,
    pub width: u32,
}

impl InputSize {
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// NHWC shape of a single-image batch at this size.
    pub fn tensor_shape(&self) -> (usize, usize, usize, usize) {
        (1, self.height as usize, self.width as usize, RGB_CHANNELS)
    }
}

impl From<[u32; 2]> for InputSize {
    fn from([height, width]: [u32; 2]) -> Self {
        Self::new(height, width)
    }
}

impl fmt::Display for InputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Accepts `224` (square) or `224x224` (height x width).
impl FromStr for InputSize {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(['x', 'X']) {
            Some((h, w)) => Ok(Self::new(h.trim().parse()?, w.trim().parse()?)),
            None => Ok(Self::square(s.parse()?)),
        }
    }
}

/// Classifier input: `[1, H, W, 3]`, RGB, values in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    /// All-black tensor, used to check a freshly loaded classifier.
    pub fn zeros(size: InputSize) -> Self {
        Self {
            data: Array4::zeros(size.tensor_shape()),
        }
    }

    pub fn input_size(&self) -> InputSize {
        let (_, height, width, _) = self.data.dim();
        InputSize::new(height as u32, width as u32)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Contiguous row-major NHWC buffer.
    pub fn as_slice(&self) -> &[f32] {
        // Built from a standard-layout Vec and never re-strided.
        self.data.as_slice().unwrap_or_default()
    }
}

/// Decodes `raw` and produces the classifier tensor at `target` size.
pub fn normalize(raw: &[u8], target: InputSize) -> Result<NormalizedTensor, NormalizeError> {
    if target.is_empty() {
        return Err(NormalizeError::EmptyTarget(target));
    }

    let decoded = image::load_from_memory(raw)?;
    log::debug!(
        "Decoded {}x{} image ({:?})",
        decoded.width(),
        decoded.height(),
        decoded.color()
    );

    // Alpha is truncated, not blended.
    let rgb = decoded.into_rgb8();
    let resized = image::imageops::resize(&rgb, target.width, target.height, RESAMPLE_FILTER);

    let values: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / MAX_INTENSITY)
        .collect();
    let data = Array4::from_shape_vec(target.tensor_shape(), values)?;

    Ok(NormalizedTensor { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn white_rgba_square_becomes_all_ones() {
        let img = RgbaImage::from_pixel(512, 512, Rgba([255, 255, 255, 255]));
        let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let tensor = normalize(&bytes, InputSize::square(128)).unwrap();

        assert_eq!(tensor.shape(), &[1, 128, 128, 3]);
        assert!(tensor.as_slice().iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn alpha_is_dropped_without_blending() {
        // Fully transparent red must stay red.
        let img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let tensor = normalize(&bytes, InputSize::square(4)).unwrap();
        let view = tensor.view();

        assert_eq!(view[[0, 2, 2, 0]], 1.0);
        assert_eq!(view[[0, 2, 2, 1]], 0.0);
        assert_eq!(view[[0, 2, 2, 2]], 0.0);
    }

    #[test]
    fn non_square_input_is_stretched_to_target() {
        let img = RgbImage::from_fn(300, 40, |x, y| Rgb([(x % 256) as u8, (y * 6) as u8, 7]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

        let tensor = normalize(&bytes, InputSize::new(224, 224)).unwrap();

        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
        assert_eq!(tensor.input_size(), InputSize::square(224));
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn rectangular_target_keeps_height_width_order() {
        let img = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

        let tensor = normalize(&bytes, InputSize::new(32, 48)).unwrap();

        assert_eq!(tensor.shape(), &[1, 32, 48, 3]);
        assert!(tensor.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn grayscale_is_expanded_to_three_channels() {
        let img = GrayImage::from_pixel(20, 20, Luma([51]));
        let bytes = encode(DynamicImage::ImageLuma8(img), ImageFormat::Png);

        let tensor = normalize(&bytes, InputSize::square(8)).unwrap();

        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
        assert!(tensor.as_slice().iter().all(|v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn jpeg_input_is_accepted() {
        let img = RgbImage::from_pixel(50, 30, Rgb([128, 64, 32]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg);

        let tensor = normalize(&bytes, InputSize::square(16)).unwrap();

        assert_eq!(tensor.shape(), &[1, 16, 16, 3]);
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn same_bytes_give_same_tensor() {
        let img = RgbImage::from_fn(33, 17, |x, y| Rgb([x as u8 * 7, y as u8 * 11, 200]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

        let a = normalize(&bytes, InputSize::square(24)).unwrap();
        let b = normalize(&bytes, InputSize::square(24)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = normalize(b"definitely not an image", InputSize::square(224)).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }

    #[test]
    fn empty_payload_fails_to_decode() {
        assert!(matches!(
            normalize(&[], InputSize::square(224)),
            Err(NormalizeError::Decode(_))
        ));
    }

    #[test]
    fn zero_target_is_rejected() {
        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);
        assert!(matches!(
            normalize(&bytes, InputSize::new(0, 10)),
            Err(NormalizeError::EmptyTarget(_))
        ));
    }

    #[test]
    fn input_size_parses_square_and_pair() {
        assert_eq!("128".parse::<InputSize>().unwrap(), InputSize::square(128));
        assert_eq!(
            " 224x160 ".parse::<InputSize>().unwrap(),
            InputSize::new(224, 160)
        );
        assert!("abc".parse::<InputSize>().is_err());
    }

    #[test]
    fn zeros_has_requested_shape() {
        let t = NormalizedTensor::zeros(InputSize::new(5, 7));
        assert_eq!(t.shape(), &[1, 5, 7, 3]);
        assert_eq!(t.as_slice().len(), 105);
    }
}
