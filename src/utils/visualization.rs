//! Visualization utilities for pipeline results.
//!
//! Read-only presentation helpers: draw detected ROIs as hollow rectangles
//! and blend segmentation masks as a tint over the source image. These
//! functions consume pipeline state and never mutate it.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::core::errors::{RxError, RxResult};
use crate::domain::{Mask, Roi};

const BBOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const MASK_TINT: Rgb<u8> = Rgb([255, 0, 0]);

/// Blend factor for mask tinting.
const MASK_ALPHA: f32 = 0.5;

/// Returns a copy of the image with each ROI drawn as a hollow rectangle.
pub fn draw_rois(image: &RgbImage, rois: &[Roi]) -> RgbImage {
    let mut canvas = image.clone();
    for roi in rois {
        let rect = Rect::at(roi.x as i32, roi.y as i32).of_size(roi.width, roi.height);
        draw_hollow_rect_mut(&mut canvas, rect, BBOX_COLOR);
    }
    canvas
}

/// Returns a copy of the image with each mask blended over its ROI as a red
/// tint, weighted by the mask probability.
///
/// Fails with `InvalidInput` if the lists are not index-aligned or a mask's
/// extent does not match its ROI.
pub fn overlay_masks(image: &RgbImage, rois: &[Roi], masks: &[Mask]) -> RxResult<RgbImage> {
    if rois.len() != masks.len() {
        return Err(RxError::invalid_input(format!(
            "{} rois but {} masks",
            rois.len(),
            masks.len()
        )));
    }

    let mut canvas = image.clone();
    let (width, height) = image.dimensions();
    for (roi, mask) in rois.iter().zip(masks) {
        if !roi.fits_within(width, height) {
            return Err(RxError::invalid_input(format!(
                "roi {}x{}+{}+{} lies outside {}x{} image",
                roi.width, roi.height, roi.x, roi.y, width, height
            )));
        }
        if !mask.matches_roi(roi) {
            return Err(RxError::invalid_input(format!(
                "mask extent {}x{} does not match roi extent {}x{}",
                mask.width(),
                mask.height(),
                roi.width,
                roi.height
            )));
        }
        for my in 0..mask.height() {
            for mx in 0..mask.width() {
                let weight = mask.get(mx, my) * MASK_ALPHA;
                if weight == 0.0 {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(roi.x + mx, roi.y + my);
                for (channel, tint) in pixel.0.iter_mut().zip(MASK_TINT.0) {
                    *channel =
                        (f32::from(*channel) * (1.0 - weight) + f32::from(tint) * weight) as u8;
                }
            }
        }
    }
    Ok(canvas)
}
