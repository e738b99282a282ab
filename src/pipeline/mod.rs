//! The per-image pipeline container.
//!
//! [`PillImage`] orchestrates the three stages over one image: detect pills,
//! segment each detected region, and score each masked crop against a
//! reference set. It binds to exactly one detector, one segmenter, and one
//! vectorizer, chosen at configuration time, and holds the intermediate and
//! final results for inspection and visualization.
//!
//! The container moves through `Empty → Loaded → Detected → Segmented →
//! Vectorized`, forward-only per image. No stage may be skipped; stages may
//! be re-run individually, which invalidates downstream results so the
//! ROI/mask/score lists stay index-aligned.

use std::path::Path;

use image::RgbImage;
use tracing::{debug, info};

use crate::core::config::{
    DetectorSelection, PillPipelineConfig, SegmenterSelection, VectorizerSelection,
};
use crate::core::errors::{RxError, RxResult, Stage};
use crate::core::traits::{Detector, Segmenter, Vectorizer};
use crate::detectors::ContourDetector;
use crate::domain::{Mask, ReferenceSet, Roi, ScoreDirection, ScoreReport};
use crate::segmenters::OtsuSegmenter;
use crate::utils::image::{crop_roi, load_image};
use crate::utils::visualization::{draw_rois, overlay_masks};
use crate::vectorizers::{ColorMomentVectorizer, EmbeddingVectorizer};

/// The observable state of a [`PillImage`] container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// No image loaded.
    Empty,
    /// An image is loaded; no stage has run.
    Loaded,
    /// Detection has produced ROIs.
    Detected,
    /// Segmentation has produced masks for every ROI.
    Segmented,
    /// Vectorization has produced a score report for every ROI.
    Vectorized,
}

/// Per-image orchestration container for the detect → segment → vectorize
/// pipeline.
///
/// One container holds exactly one image and its accumulated results. The
/// container owns its state exclusively; processing several images
/// concurrently requires one container per image. The bound strategies are
/// immutable, shared, read-only resources and may back many containers.
pub struct PillImage {
    detector: Box<dyn Detector>,
    segmenter: Box<dyn Segmenter>,
    vectorizer: Box<dyn Vectorizer>,
    mask_threshold: f32,
    image: Option<RgbImage>,
    rois: Option<Vec<Roi>>,
    masks: Option<Vec<Mask>>,
    scores: Option<Vec<ScoreReport>>,
}

impl std::fmt::Debug for PillImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PillImage")
            .field("detector", &self.detector.name())
            .field("segmenter", &self.segmenter.name())
            .field("vectorizer", &self.vectorizer.name())
            .field("stage", &self.stage())
            .finish()
    }
}

impl PillImage {
    /// Creates a container bound to the given strategies.
    pub fn new(
        detector: Box<dyn Detector>,
        segmenter: Box<dyn Segmenter>,
        vectorizer: Box<dyn Vectorizer>,
    ) -> Self {
        Self {
            detector,
            segmenter,
            vectorizer,
            mask_threshold: 0.5,
            image: None,
            rois: None,
            masks: None,
            scores: None,
        }
    }

    /// Builds a container from a pipeline configuration.
    ///
    /// Strategy construction may fail: an embedding vectorizer with a
    /// missing or corrupt model artifact surfaces `ModelLoad` here.
    pub fn from_config(config: &PillPipelineConfig) -> RxResult<Self> {
        config.validate()?;

        let DetectorSelection::Contour(contour) = &config.detector;
        let detector: Box<dyn Detector> = Box::new(ContourDetector::new(contour.clone()));

        let SegmenterSelection::Otsu(otsu) = &config.segmenter;
        let segmenter: Box<dyn Segmenter> = Box::new(OtsuSegmenter::new(otsu.clone()));

        let vectorizer: Box<dyn Vectorizer> = match &config.vectorizer {
            VectorizerSelection::ColorMoment => Box::new(ColorMomentVectorizer),
            VectorizerSelection::Embedding { model_path } => {
                Box::new(EmbeddingVectorizer::from_file(model_path)?)
            }
        };

        let mut pipeline = Self::new(detector, segmenter, vectorizer);
        pipeline.mask_threshold = config.mask_threshold;
        info!(
            detector = pipeline.detector.name(),
            segmenter = pipeline.segmenter.name(),
            vectorizer = pipeline.vectorizer.name(),
            "built pipeline container"
        );
        Ok(pipeline)
    }

    /// The current state of the container.
    pub fn stage(&self) -> PipelineStage {
        if self.scores.is_some() {
            PipelineStage::Vectorized
        } else if self.masks.is_some() {
            PipelineStage::Segmented
        } else if self.rois.is_some() {
            PipelineStage::Detected
        } else if self.image.is_some() {
            PipelineStage::Loaded
        } else {
            PipelineStage::Empty
        }
    }

    /// Loads an image, replacing the current one and resetting all stage
    /// output.
    ///
    /// Fails with `InvalidInput` for degenerate dimensions.
    pub fn load(&mut self, image: RgbImage) -> RxResult<()> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RxError::invalid_input(format!(
                "cannot load a {width}x{height} image"
            )));
        }
        debug!(width, height, "loaded image");
        self.image = Some(image);
        self.rois = None;
        self.masks = None;
        self.scores = None;
        Ok(())
    }

    /// Loads an image from a file path. See [`load`](Self::load).
    pub fn load_path(&mut self, path: impl AsRef<Path>) -> RxResult<()> {
        let image = load_image(path.as_ref())?;
        self.load(image)
    }

    /// Runs detection, populating the ROI list and returning the pill count.
    ///
    /// Idempotent: re-running replaces prior ROIs and clears any downstream
    /// masks and scores so stale index alignment cannot survive.
    pub fn run_detection(&mut self) -> RxResult<usize> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| RxError::precondition(Stage::Load, Stage::Detection))?;

        let rois = self.detector.detect(image)?;
        info!(detector = self.detector.name(), pills = rois.len(), "detection complete");
        let count = rois.len();
        self.rois = Some(rois);
        self.masks = None;
        self.scores = None;
        Ok(count)
    }

    /// Runs segmentation once per detected ROI, populating the mask list
    /// index-aligned with the ROI list.
    ///
    /// Requires a non-empty ROI list; fails with `Precondition` otherwise.
    /// Either every mask is produced or the container is left unchanged.
    pub fn run_segmentation(&mut self) -> RxResult<()> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| RxError::precondition(Stage::Load, Stage::Segmentation))?;
        let rois = match self.rois.as_deref() {
            Some([]) | None => {
                return Err(RxError::precondition(Stage::Detection, Stage::Segmentation));
            }
            Some(rois) => rois,
        };

        let mut masks = Vec::with_capacity(rois.len());
        for roi in rois {
            let mask = self.segmenter.segment(image, roi)?;
            debug_assert!(mask.matches_roi(roi));
            masks.push(mask);
        }
        info!(segmenter = self.segmenter.name(), masks = masks.len(), "segmentation complete");
        self.masks = Some(masks);
        self.scores = None;
        Ok(())
    }

    /// Runs vectorization: for each (ROI, mask) pair, crops the image,
    /// applies the binarized mask, and scores the masked crop against the
    /// reference set.
    ///
    /// Requires masks (fails with `Precondition` otherwise) and a non-empty
    /// reference set (`InvalidInput`). Either every score report is produced
    /// or the container is left unchanged.
    pub fn run_vectorization(&mut self, references: &ReferenceSet) -> RxResult<()> {
        let image = self
            .image
            .as_ref()
            .ok_or_else(|| RxError::precondition(Stage::Load, Stage::Vectorization))?;
        let (rois, masks) = match (self.rois.as_deref(), self.masks.as_deref()) {
            (Some(rois), Some(masks)) if !masks.is_empty() => (rois, masks),
            _ => {
                return Err(RxError::precondition(
                    Stage::Segmentation,
                    Stage::Vectorization,
                ));
            }
        };
        if references.is_empty() {
            return Err(RxError::invalid_input(format!(
                "reference set '{}' is empty",
                references.name()
            )));
        }

        let mut scores = Vec::with_capacity(rois.len());
        for (roi, mask) in rois.iter().zip(masks) {
            let crop = crop_roi(image, roi);
            let masked = mask.to_binary(self.mask_threshold).apply(&crop)?;
            scores.push(self.vectorizer.compare(&masked, references)?);
        }
        info!(
            vectorizer = self.vectorizer.name(),
            references = references.len(),
            pills = scores.len(),
            "vectorization complete"
        );
        self.scores = Some(scores);
        Ok(())
    }

    /// The loaded image. Fails with `NotRun` if no image is loaded.
    pub fn image(&self) -> RxResult<&RgbImage> {
        self.image
            .as_ref()
            .ok_or_else(|| RxError::not_run(Stage::Load))
    }

    /// Number of detected pills. Fails with `NotRun` before detection.
    pub fn pill_count(&self) -> RxResult<usize> {
        Ok(self.rois()?.len())
    }

    /// Detected ROIs. Fails with `NotRun` before detection.
    pub fn rois(&self) -> RxResult<&[Roi]> {
        self.rois
            .as_deref()
            .ok_or_else(|| RxError::not_run(Stage::Detection))
    }

    /// Segmentation masks, index-aligned with the ROIs. Fails with `NotRun`
    /// before segmentation.
    pub fn masks(&self) -> RxResult<&[Mask]> {
        self.masks
            .as_deref()
            .ok_or_else(|| RxError::not_run(Stage::Segmentation))
    }

    /// Score reports, index-aligned with the ROIs. Fails with `NotRun`
    /// before vectorization.
    pub fn scores(&self) -> RxResult<&[ScoreReport]> {
        self.scores
            .as_deref()
            .ok_or_else(|| RxError::not_run(Stage::Vectorization))
    }

    /// Score convention of the bound vectorizer.
    pub fn score_direction(&self) -> ScoreDirection {
        self.vectorizer.direction()
    }

    /// Rebinds the detector. Like [`load`](Self::load), this resets all stage
    /// output (the loaded image is retained).
    pub fn set_detector(&mut self, detector: Box<dyn Detector>) {
        self.detector = detector;
        self.reset_stages();
    }

    /// Rebinds the segmenter, resetting all stage output.
    pub fn set_segmenter(&mut self, segmenter: Box<dyn Segmenter>) {
        self.segmenter = segmenter;
        self.reset_stages();
    }

    /// Rebinds the vectorizer, resetting all stage output.
    pub fn set_vectorizer(&mut self, vectorizer: Box<dyn Vectorizer>) {
        self.vectorizer = vectorizer;
        self.reset_stages();
    }

    fn reset_stages(&mut self) {
        self.rois = None;
        self.masks = None;
        self.scores = None;
    }

    /// Renders the detected ROIs over the image. Fails with `NotRun` before
    /// detection.
    pub fn visualize_detections(&self) -> RxResult<RgbImage> {
        Ok(draw_rois(self.image()?, self.rois()?))
    }

    /// Renders the segmentation masks over the image. Fails with `NotRun`
    /// before segmentation.
    pub fn visualize_masks(&self) -> RxResult<RgbImage> {
        overlay_masks(self.image()?, self.rois()?, self.masks()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Deterministic stub detector returning a fixed ROI list.
    struct FixedDetector(Vec<Roi>);

    impl Detector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect(&self, _image: &RgbImage) -> RxResult<Vec<Roi>> {
            Ok(self.0.clone())
        }
    }

    fn container_with(rois: Vec<Roi>) -> PillImage {
        PillImage::new(
            Box::new(FixedDetector(rois)),
            Box::new(OtsuSegmenter::default()),
            Box::new(ColorMomentVectorizer),
        )
    }

    fn white_image() -> RgbImage {
        RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]))
    }

    #[test]
    fn empty_container_reports_not_run_everywhere() {
        let pipeline = container_with(vec![]);
        assert_eq!(pipeline.stage(), PipelineStage::Empty);
        assert!(matches!(pipeline.image(), Err(RxError::NotRun { .. })));
        assert!(matches!(pipeline.rois(), Err(RxError::NotRun { .. })));
        assert!(matches!(pipeline.masks(), Err(RxError::NotRun { .. })));
        assert!(matches!(pipeline.scores(), Err(RxError::NotRun { .. })));
        assert!(matches!(
            pipeline.pill_count(),
            Err(RxError::NotRun { .. })
        ));
    }

    #[test]
    fn detection_before_load_is_a_precondition_error() {
        let mut pipeline = container_with(vec![]);
        assert!(matches!(
            pipeline.run_detection(),
            Err(RxError::Precondition {
                required: Stage::Load,
                ..
            })
        ));
    }

    #[test]
    fn zero_detections_gate_downstream_stages() {
        let mut pipeline = container_with(vec![]);
        pipeline.load(white_image()).unwrap();
        assert_eq!(pipeline.run_detection().unwrap(), 0);
        assert_eq!(pipeline.pill_count().unwrap(), 0);

        assert!(matches!(
            pipeline.run_segmentation(),
            Err(RxError::Precondition {
                required: Stage::Detection,
                requested: Stage::Segmentation,
            })
        ));
        let references =
            ReferenceSet::new("refs").with_entry("a", RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])));
        assert!(matches!(
            pipeline.run_vectorization(&references),
            Err(RxError::Precondition {
                required: Stage::Segmentation,
                requested: Stage::Vectorization,
            })
        ));
    }

    #[test]
    fn vectorization_requires_segmentation_even_when_detected() {
        let mut pipeline = container_with(vec![Roi::new(8, 8, 16, 16)]);
        pipeline.load(white_image()).unwrap();
        pipeline.run_detection().unwrap();

        let references =
            ReferenceSet::new("refs").with_entry("a", RgbImage::from_pixel(2, 2, Rgb([9, 9, 9])));
        assert!(matches!(
            pipeline.run_vectorization(&references),
            Err(RxError::Precondition {
                required: Stage::Segmentation,
                requested: Stage::Vectorization,
            })
        ));
    }

    #[test]
    fn rerunning_detection_clears_downstream_results() {
        let mut pipeline = container_with(vec![Roi::new(8, 8, 16, 16)]);
        let mut image = white_image();
        // A dark square inside the stub ROI so segmentation and vectorization
        // have foreground to work with.
        for y in 10..20 {
            for x in 10..20 {
                image.put_pixel(x, y, Rgb([40, 40, 160]));
            }
        }
        pipeline.load(image).unwrap();
        pipeline.run_detection().unwrap();
        pipeline.run_segmentation().unwrap();
        let references =
            ReferenceSet::new("refs").with_entry("a", RgbImage::from_pixel(4, 4, Rgb([40, 40, 160])));
        pipeline.run_vectorization(&references).unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::Vectorized);

        pipeline.run_detection().unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::Detected);
        assert!(matches!(pipeline.masks(), Err(RxError::NotRun { .. })));
        assert!(matches!(pipeline.scores(), Err(RxError::NotRun { .. })));
    }

    #[test]
    fn load_resets_to_loaded() {
        let mut pipeline = container_with(vec![Roi::new(0, 0, 8, 8)]);
        pipeline.load(white_image()).unwrap();
        pipeline.run_detection().unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::Detected);

        pipeline.load(white_image()).unwrap();
        assert_eq!(pipeline.stage(), PipelineStage::Loaded);
        assert!(matches!(pipeline.rois(), Err(RxError::NotRun { .. })));
    }

    #[test]
    fn strategy_rebind_resets_stage_output_but_keeps_image() {
        let mut pipeline = container_with(vec![Roi::new(0, 0, 8, 8)]);
        pipeline.load(white_image()).unwrap();
        pipeline.run_detection().unwrap();

        pipeline.set_detector(Box::new(FixedDetector(vec![])));
        assert_eq!(pipeline.stage(), PipelineStage::Loaded);
        assert!(pipeline.image().is_ok());
        assert!(matches!(pipeline.rois(), Err(RxError::NotRun { .. })));
    }

    #[test]
    fn empty_reference_set_is_invalid_input() {
        let mut pipeline = container_with(vec![Roi::new(8, 8, 16, 16)]);
        let mut image = white_image();
        for y in 10..20 {
            for x in 10..20 {
                image.put_pixel(x, y, Rgb([40, 40, 160]));
            }
        }
        pipeline.load(image).unwrap();
        pipeline.run_detection().unwrap();
        pipeline.run_segmentation().unwrap();
        assert!(matches!(
            pipeline.run_vectorization(&ReferenceSet::new("empty")),
            Err(RxError::InvalidInput { .. })
        ));
    }

    #[test]
    fn visualization_is_gated_on_its_stage() {
        let mut pipeline = container_with(vec![Roi::new(0, 0, 8, 8)]);
        assert!(matches!(
            pipeline.visualize_detections(),
            Err(RxError::NotRun { .. })
        ));
        pipeline.load(white_image()).unwrap();
        pipeline.run_detection().unwrap();
        assert!(pipeline.visualize_detections().is_ok());
        assert!(matches!(
            pipeline.visualize_masks(),
            Err(RxError::NotRun { .. })
        ));
    }
}
