//! Pill/background masks.
//!
//! A [`Mask`] is a per-ROI raster marking pill pixels within a detected
//! region. Values are probabilities in `[0, 1]`; the pipeline container
//! binarizes at a configured threshold before applying a mask to a crop.

use image::RgbImage;

use crate::core::errors::{RxError, RxResult};
use crate::domain::roi::Roi;

/// A probability raster separating pill pixels from background within an ROI.
///
/// The mask's spatial extent always equals the extent of the ROI it was
/// produced for; rows are stored top-to-bottom in row-major order.
#[derive(Debug, Clone)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl Mask {
    /// Creates a mask from row-major probability data.
    ///
    /// Fails with `InvalidInput` if the data length does not match the
    /// dimensions or any value lies outside `[0, 1]`.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> RxResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RxError::invalid_input(format!(
                "mask data length {} does not match {}x{} extent",
                data.len(),
                width,
                height
            )));
        }
        if data.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(RxError::invalid_input(
                "mask values must lie in [0, 1]".to_string(),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a mask with every pixel set to the same probability.
    pub fn filled(width: u32, height: u32, value: f32) -> RxResult<Self> {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    /// Width of the mask in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the mask in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Probability at the given pixel.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates lie outside the mask.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        assert!(x < self.width && y < self.height, "mask index out of range");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Raw row-major probability data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns true if the mask's extent equals the ROI's extent.
    pub fn matches_roi(&self, roi: &Roi) -> bool {
        self.width == roi.width && self.height == roi.height
    }

    /// Binarizes the mask: values `>= threshold` become `1.0`, others `0.0`.
    pub fn to_binary(&self, threshold: f32) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| if v >= threshold { 1.0 } else { 0.0 })
                .collect(),
        }
    }

    /// Fraction of pixels with probability `>= 0.5`.
    pub fn coverage(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let fg = self.data.iter().filter(|&&v| v >= 0.5).count();
        fg as f32 / self.data.len() as f32
    }

    /// Applies the mask to an RGB crop of the same extent, zeroing background
    /// pixels and scaling foreground pixels by their probability.
    pub fn apply(&self, crop: &RgbImage) -> RxResult<RgbImage> {
        let (w, h) = crop.dimensions();
        if w != self.width || h != self.height {
            return Err(RxError::invalid_input(format!(
                "crop extent {}x{} does not match mask extent {}x{}",
                w, h, self.width, self.height
            )));
        }
        let mut out = crop.clone();
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            let p = self.get(x, y);
            for channel in pixel.0.iter_mut() {
                *channel = (f32::from(*channel) * p).round() as u8;
            }
        }
        Ok(out)
    }
}
