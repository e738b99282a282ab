//! Color-moment fingerprint vectorizer.

use image::RgbImage;

use crate::core::errors::RxResult;
use crate::core::traits::Vectorizer;
use crate::domain::ScoreDirection;
use crate::vectorizers::{color_moments, normalize_unit};

/// Perceptual fingerprint built from color-moment statistics.
///
/// The descriptor is 9-dimensional: per channel, the mean, standard
/// deviation, and cube-rooted third central moment of the foreground pixels,
/// scaled to unit length. Pairs are compared with an L1 (Hamming-style)
/// distance.
///
/// Score convention: **lower is better**. Identical crops score `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorMomentVectorizer;

impl Vectorizer for ColorMomentVectorizer {
    fn name(&self) -> &str {
        "color-moment"
    }

    fn direction(&self) -> ScoreDirection {
        ScoreDirection::LowerIsBetter
    }

    fn encode(&self, image: &RgbImage) -> RxResult<Vec<f32>> {
        let mut moments = color_moments(image)?;
        normalize_unit(&mut moments);
        Ok(moments)
    }

    fn score(&self, probe: &[f32], reference: &[f32]) -> f32 {
        probe
            .iter()
            .zip(reference)
            .map(|(a, b)| (a - b).abs())
            .sum()
    }
}
