//! Pill detectors.
//!
//! The crate ships a classical connected-component detector suitable for
//! composed or well-lit tray images. Learned detectors plug in through the
//! same [`Detector`] trait.

use std::collections::HashMap;

use image::{GrayImage, Luma, RgbImage, imageops};
use imageproc::contrast::otsu_level;
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::{RxError, RxResult};
use crate::core::traits::Detector;
use crate::domain::Roi;

/// Configuration for [`ContourDetector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourDetectorConfig {
    /// Global grayscale threshold. `None` selects the threshold with Otsu's
    /// method over the whole image.
    pub threshold: Option<u8>,
    /// Minimum connected-component area in pixels; smaller components are
    /// discarded as noise.
    pub min_area: u32,
    /// Object polarity: `true` if pills are darker than the background.
    pub dark_objects: bool,
}

impl Default for ContourDetectorConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            min_area: 100,
            dark_objects: true,
        }
    }
}

/// Classical detector: threshold the grayscale image, label connected
/// components, and return one bounding region per component.
///
/// Regions are sorted by `(y, x)` of their top-left corner, so the returned
/// order is stable for a given image.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    config: ContourDetectorConfig,
}

impl ContourDetector {
    /// Creates a detector with the given configuration.
    pub fn new(config: ContourDetectorConfig) -> Self {
        Self { config }
    }

    fn binarize(&self, gray: &GrayImage) -> GrayImage {
        let level = self.config.threshold.unwrap_or_else(|| otsu_level(gray));
        let mut binary = GrayImage::new(gray.width(), gray.height());
        for (x, y, pixel) in gray.enumerate_pixels() {
            let foreground = if self.config.dark_objects {
                pixel.0[0] <= level
            } else {
                pixel.0[0] > level
            };
            binary.put_pixel(x, y, Luma([if foreground { 255 } else { 0 }]));
        }
        binary
    }
}

impl Default for ContourDetector {
    fn default() -> Self {
        Self::new(ContourDetectorConfig::default())
    }
}

impl Detector for ContourDetector {
    fn name(&self) -> &str {
        "contour"
    }

    fn detect(&self, image: &RgbImage) -> RxResult<Vec<Roi>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RxError::invalid_input(format!(
                "cannot detect on a {width}x{height} image"
            )));
        }

        let gray = imageops::grayscale(image);
        let binary = self.binarize(&gray);
        let labeled = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

        // Per-label bbox and pixel count, accumulated in raster order.
        let mut regions: HashMap<u32, (u32, u32, u32, u32, u32)> = HashMap::new();
        for (x, y, label) in labeled.enumerate_pixels() {
            let label = label.0[0];
            if label == 0 {
                continue;
            }
            regions
                .entry(label)
                .and_modify(|(min_x, min_y, max_x, max_y, count)| {
                    *min_x = (*min_x).min(x);
                    *min_y = (*min_y).min(y);
                    *max_x = (*max_x).max(x);
                    *max_y = (*max_y).max(y);
                    *count += 1;
                })
                .or_insert((x, y, x, y, 1));
        }

        let mut rois: Vec<Roi> = regions
            .into_values()
            .filter(|&(_, _, _, _, count)| count >= self.config.min_area)
            .map(|(min_x, min_y, max_x, max_y, _)| Roi::from_bounds(min_x, min_y, max_x, max_y))
            .collect();
        // The full extent breaks (y, x) ties; map iteration order must not
        // leak into the result.
        rois.sort_by_key(|roi| (roi.y, roi.x, roi.height, roi.width));

        debug!(detector = self.name(), count = rois.len(), "detection done");
        Ok(rois)
    }
}
