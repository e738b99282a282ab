//! Utility functions for image loading and manipulation.
//!
//! Provides loading and conversion helpers used across the pipeline,
//! including threshold-gated parallel batch loading for reference sets.

use image::{DynamicImage, RgbImage, imageops};

use crate::core::errors::RxResult;
use crate::domain::Roi;

/// Number of images above which batch loading switches to rayon.
const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RGB.
pub fn load_image(path: &std::path::Path) -> RxResult<RgbImage> {
    let img = image::open(path)?;
    Ok(dynamic_to_rgb(img))
}

/// Copies the pixels covered by an ROI out of an image.
///
/// The caller is responsible for checking that the ROI lies within the image
/// bounds (see [`Roi::fits_within`]).
pub fn crop_roi(image: &RgbImage, roi: &Roi) -> RgbImage {
    imageops::crop_imm(image, roi.x, roi.y, roi.width, roi.height).to_image()
}

/// Loads a batch of images, in parallel when the batch is large.
pub fn load_images_batch<P: AsRef<std::path::Path> + Send + Sync>(
    paths: &[P],
) -> RxResult<Vec<RgbImage>> {
    load_images_batch_with_threshold(paths, None)
}

/// Loads a batch of images with a custom parallel threshold.
///
/// Batches larger than the threshold (default 8) are loaded with rayon.
pub fn load_images_batch_with_threshold<P: AsRef<std::path::Path> + Send + Sync>(
    paths: &[P],
    parallel_threshold: Option<usize>,
) -> RxResult<Vec<RgbImage>> {
    let threshold = parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD);

    if paths.len() > threshold {
        use rayon::prelude::*;
        paths.par_iter().map(|p| load_image(p.as_ref())).collect()
    } else {
        paths.iter().map(|p| load_image(p.as_ref())).collect()
    }
}
