//! Strategy contracts for the three pipeline stages.
//!
//! The pipeline container is written against these traits and is agnostic to
//! which concrete strategy backs each seam. Any implementation satisfying a
//! contract is substitutable at configuration time.

use image::RgbImage;

use crate::core::errors::RxResult;
use crate::domain::{Mask, ReferenceSet, Roi, ScoreDirection, ScoreReport};

/// Detects pill regions within an image.
///
/// Detection is a pure function over the image plus the detector's internal
/// parameters. The returned order must be stable for a given image so that
/// pill counts and downstream index alignment are reproducible.
pub trait Detector: Send + Sync {
    /// Name of the detector, for logging.
    fn name(&self) -> &str;

    /// Returns zero or more regions believed to contain a pill.
    ///
    /// An image without pills yields an empty vector, not an error; malformed
    /// image geometry yields `InvalidInput`.
    fn detect(&self, image: &RgbImage) -> RxResult<Vec<Roi>>;
}

/// Separates pill pixels from background within one detected region.
pub trait Segmenter: Send + Sync {
    /// Name of the segmenter, for logging.
    fn name(&self) -> &str;

    /// Produces a mask whose spatial extent equals the ROI's extent.
    ///
    /// Mask values are probabilities in `[0, 1]`; the caller binarizes if a
    /// hard mask is required. Fails with `InvalidInput` if the ROI lies
    /// outside the image bounds.
    fn segment(&self, image: &RgbImage, roi: &Roi) -> RxResult<Mask>;
}

/// Scores a masked pill crop against a set of reference images.
///
/// A vectorizer encodes images into fixed-length descriptors and compares
/// descriptor pairs with a metric of its choosing. Concrete strategies must
/// fix and document their score direction; callers read it from the produced
/// [`ScoreReport`] rather than assuming one.
pub trait Vectorizer: Send + Sync {
    /// Name of the vectorizer, for logging.
    fn name(&self) -> &str;

    /// The score convention of this strategy.
    fn direction(&self) -> ScoreDirection;

    /// Encodes an image into a fixed-length descriptor.
    fn encode(&self, image: &RgbImage) -> RxResult<Vec<f32>>;

    /// Scores a probe descriptor against a reference descriptor.
    fn score(&self, probe: &[f32], reference: &[f32]) -> f32;

    /// Scores a masked pill crop against every entry of a reference set.
    ///
    /// The provided implementation encodes the crop and each reference image
    /// and applies [`score`](Self::score) pairwise; scores in the returned
    /// report are index-aligned with the reference set.
    fn compare(&self, pill: &RgbImage, references: &ReferenceSet) -> RxResult<ScoreReport> {
        let probe = self.encode(pill)?;
        let mut scores = Vec::with_capacity(references.len());
        for entry in references.entries() {
            let descriptor = self.encode(&entry.image)?;
            scores.push(self.score(&probe, &descriptor));
        }
        Ok(ScoreReport::new(self.direction(), scores))
    }
}
