//! Error types for the pill identification pipeline.
//!
//! This module defines the error taxonomy used across the pipeline: invalid
//! input geometry, stages invoked out of order, accessors used before their
//! stage has run, and model artifacts that fail to load at construction.
//! It also provides utility constructors for creating these errors with
//! appropriate context.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A pipeline stage, used to report which stage an error relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Loading an image into the container.
    Load,
    /// Pill detection (image to ROIs).
    Detection,
    /// Pill/background segmentation (ROI to mask).
    Segmentation,
    /// Similarity scoring against a reference set.
    Vectorization,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Detection => write!(f, "detection"),
            Stage::Segmentation => write!(f, "segmentation"),
            Stage::Vectorization => write!(f, "vectorization"),
        }
    }
}

/// Errors raised by the pill identification pipeline.
///
/// All errors are surfaced synchronously to the immediate caller; nothing is
/// retried or swallowed inside the crate. Stage methods either fully populate
/// their output or fail without mutating visible state.
#[derive(Error, Debug)]
pub enum RxError {
    /// Error occurred while loading or decoding an image.
    #[error("image load")]
    ImageLoad(#[from] image::ImageError),

    /// Malformed input: degenerate image dimensions, ROI outside image
    /// bounds, mask/crop extent mismatch, or an empty reference set.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// A stage was invoked before the stage it depends on produced output.
    #[error("{requested} requires {required} output; run {required} first")]
    Precondition {
        /// The stage whose output is missing.
        required: Stage,
        /// The stage that was invoked out of order.
        requested: Stage,
    },

    /// An accessor was invoked before its stage has executed.
    #[error("{stage} has not run")]
    NotRun {
        /// The stage that has not executed yet.
        stage: Stage,
    },

    /// A model artifact was missing or corrupt at strategy construction.
    /// Fatal to constructing that strategy object.
    #[error("model load failed for {}", .path.display())]
    ModelLoad {
        /// Path to the artifact that failed to load.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type RxResult<T> = Result<T, RxError>;

impl RxError {
    /// Creates an `RxError` for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an `RxError` for a stage invoked out of order.
    pub fn precondition(required: Stage, requested: Stage) -> Self {
        Self::Precondition {
            required,
            requested,
        }
    }

    /// Creates an `RxError` for an accessor used before its stage has run.
    pub fn not_run(stage: Stage) -> Self {
        Self::NotRun { stage }
    }

    /// Creates an `RxError` for a model artifact that failed to load.
    pub fn model_load(
        path: impl AsRef<Path>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelLoad {
            path: path.as_ref().to_path_buf(),
            source: Box::new(error),
        }
    }

    /// Creates an `RxError` for a model artifact rejected by validation.
    pub fn model_invalid(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        #[derive(Debug, Error)]
        #[error("{0}")]
        struct ModelValidation(String);

        Self::ModelLoad {
            path: path.as_ref().to_path_buf(),
            source: Box::new(ModelValidation(reason.into())),
        }
    }

    /// Creates an `RxError` for configuration errors.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
