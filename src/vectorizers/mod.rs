//! Similarity-scoring strategies.
//!
//! Two interchangeable vectorizers satisfy the [`Vectorizer`] contract:
//!
//! * [`ColorMomentVectorizer`] — a color-moment fingerprint compared with an
//!   L1 (Hamming-style) distance; lower scores are better.
//! * [`EmbeddingVectorizer`] — a color histogram projected through a trained
//!   embedding model, compared with a similarity in `[0, 1]`; higher scores
//!   are better.
//!
//! Both exclude pure-black pixels from their features: the pipeline zeroes
//! background pixels when applying a mask, so black is the masked-out color.

pub mod color_moment;
pub mod embedding;

pub use color_moment::ColorMomentVectorizer;
pub use embedding::{EmbeddingModel, EmbeddingVectorizer};

use image::{Rgb, RgbImage};

use crate::core::errors::{RxError, RxResult};

/// Returns true for pixels excluded from feature extraction.
fn is_background(pixel: &Rgb<u8>) -> bool {
    pixel.0 == [0, 0, 0]
}

/// Computes a per-channel color histogram over foreground pixels,
/// normalized so the bins of each channel sum to 1.
///
/// The result has `3 * bins` entries, channel-major (all red bins, then
/// green, then blue). Fails with `InvalidInput` if the image has no
/// foreground pixels.
fn color_histogram(image: &RgbImage, bins: usize) -> RxResult<Vec<f32>> {
    debug_assert!(bins > 0 && 256 % bins == 0);
    let bin_width = 256 / bins;

    let mut histogram = vec![0f32; 3 * bins];
    let mut foreground = 0usize;
    for pixel in image.pixels().filter(|p| !is_background(p)) {
        foreground += 1;
        for (channel, &value) in pixel.0.iter().enumerate() {
            histogram[channel * bins + value as usize / bin_width] += 1.0;
        }
    }
    if foreground == 0 {
        return Err(RxError::invalid_input(
            "no foreground pixels to vectorize".to_string(),
        ));
    }
    for bin in &mut histogram {
        *bin /= foreground as f32;
    }
    Ok(histogram)
}

/// Computes per-channel color moments over foreground pixels: mean, standard
/// deviation, and the cube root of the third central moment.
///
/// The result has 9 entries, channel-major. Fails with `InvalidInput` if the
/// image has no foreground pixels.
fn color_moments(image: &RgbImage) -> RxResult<Vec<f32>> {
    let pixels: Vec<&Rgb<u8>> = image.pixels().filter(|p| !is_background(p)).collect();
    if pixels.is_empty() {
        return Err(RxError::invalid_input(
            "no foreground pixels to vectorize".to_string(),
        ));
    }
    let n = pixels.len() as f64;

    let mut moments = Vec::with_capacity(9);
    for channel in 0..3 {
        let mean = pixels.iter().map(|p| f64::from(p.0[channel])).sum::<f64>() / n;
        let m2 = pixels
            .iter()
            .map(|p| (f64::from(p.0[channel]) - mean).powi(2))
            .sum::<f64>()
            / n;
        let m3 = pixels
            .iter()
            .map(|p| (f64::from(p.0[channel]) - mean).powi(3))
            .sum::<f64>()
            / n;
        moments.push(mean as f32);
        moments.push(m2.sqrt() as f32);
        moments.push(m3.cbrt() as f32);
    }
    Ok(moments)
}

/// Scales a vector to unit L2 norm. Zero vectors are left untouched.
fn normalize_unit(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
