//! Pipeline configuration.
//!
//! Strategy selection happens here, once, before any image is loaded: the
//! configuration names one detector, one segmenter, and one vectorizer
//! strategy with their parameters. There is no dynamic reconfiguration after
//! construction. Configurations are serde-serializable and can be read from
//! JSON files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{RxError, RxResult};
use crate::detectors::ContourDetectorConfig;
use crate::segmenters::OtsuSegmenterConfig;

/// Detector strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum DetectorSelection {
    /// Connected-component contour detector.
    Contour(ContourDetectorConfig),
}

impl Default for DetectorSelection {
    fn default() -> Self {
        Self::Contour(ContourDetectorConfig::default())
    }
}

/// Segmenter strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SegmenterSelection {
    /// Otsu-threshold segmenter.
    Otsu(OtsuSegmenterConfig),
}

impl Default for SegmenterSelection {
    fn default() -> Self {
        Self::Otsu(OtsuSegmenterConfig::default())
    }
}

/// Vectorizer strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum VectorizerSelection {
    /// Color-moment fingerprint; scores are distances (lower is better).
    ColorMoment,
    /// Learned embedding; requires a model artifact on disk. Scores are
    /// similarities in `[0, 1]` (higher is better).
    Embedding {
        /// Path to the serialized embedding model.
        model_path: PathBuf,
    },
}

impl Default for VectorizerSelection {
    fn default() -> Self {
        Self::ColorMoment
    }
}

/// Configuration for building a [`PillImage`](crate::pipeline::PillImage)
/// pipeline container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PillPipelineConfig {
    /// Detector strategy and parameters.
    pub detector: DetectorSelection,
    /// Segmenter strategy and parameters.
    pub segmenter: SegmenterSelection,
    /// Vectorizer strategy and parameters.
    pub vectorizer: VectorizerSelection,
    /// Threshold at which segmentation masks are binarized before being
    /// applied to a crop. Must lie in `[0, 1]`.
    pub mask_threshold: f32,
}

impl Default for PillPipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorSelection::default(),
            segmenter: SegmenterSelection::default(),
            vectorizer: VectorizerSelection::default(),
            mask_threshold: 0.5,
        }
    }
}

impl PillPipelineConfig {
    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> RxResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| RxError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values.
    pub fn validate(&self) -> RxResult<()> {
        if !(0.0..=1.0).contains(&self.mask_threshold) {
            return Err(RxError::config(format!(
                "mask_threshold {} must lie in [0, 1]",
                self.mask_threshold
            )));
        }
        let DetectorSelection::Contour(contour) = &self.detector;
        if contour.min_area == 0 {
            return Err(RxError::config("contour min_area must be positive"));
        }
        if let VectorizerSelection::Embedding { model_path } = &self.vectorizer
            && model_path.as_os_str().is_empty()
        {
            return Err(RxError::config("embedding model_path must not be empty"));
        }
        Ok(())
    }
}
