//! Pill/background segmenters.
//!
//! The shipped segmenter thresholds each ROI crop with Otsu's method; a
//! learned segmentation model plugs in through the same [`Segmenter`] trait.

use image::{RgbImage, imageops};
use imageproc::contrast::otsu_level;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{RxError, RxResult};
use crate::core::traits::Segmenter;
use crate::domain::{Mask, Roi};
use crate::utils::image::crop_roi;

/// Configuration for [`OtsuSegmenter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OtsuSegmenterConfig {
    /// Object polarity: `true` if pill pixels are darker than the background
    /// inside the ROI.
    pub dark_objects: bool,
}

impl Default for OtsuSegmenterConfig {
    fn default() -> Self {
        Self { dark_objects: true }
    }
}

/// Segments a pill within an ROI by thresholding the crop at its Otsu level.
///
/// The produced mask is hard: probabilities are exactly `0.0` or `1.0`, and
/// its extent always equals the ROI's extent.
#[derive(Debug, Clone, Default)]
pub struct OtsuSegmenter {
    config: OtsuSegmenterConfig,
}

impl OtsuSegmenter {
    /// Creates a segmenter with the given configuration.
    pub fn new(config: OtsuSegmenterConfig) -> Self {
        Self { config }
    }
}

impl Segmenter for OtsuSegmenter {
    fn name(&self) -> &str {
        "otsu"
    }

    fn segment(&self, image: &RgbImage, roi: &Roi) -> RxResult<Mask> {
        let (width, height) = image.dimensions();
        if !roi.fits_within(width, height) {
            return Err(RxError::invalid_input(format!(
                "roi {}x{}+{}+{} lies outside {}x{} image",
                roi.width, roi.height, roi.x, roi.y, width, height
            )));
        }

        let crop = crop_roi(image, roi);
        let gray = imageops::grayscale(&crop);
        let level = otsu_level(&gray);

        let data = gray
            .pixels()
            .map(|p| {
                let foreground = if self.config.dark_objects {
                    p.0[0] <= level
                } else {
                    p.0[0] > level
                };
                if foreground { 1.0 } else { 0.0 }
            })
            .collect();
        let mask = Mask::new(roi.width, roi.height, data)?;
        debug!(
            segmenter = self.name(),
            coverage = mask.coverage(),
            "segmented roi"
        );
        Ok(mask)
    }
}
