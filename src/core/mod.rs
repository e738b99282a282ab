//! The core module of the pill identification pipeline.
//!
//! This module contains the fundamental components of the pipeline:
//! - Error handling and the stage taxonomy
//! - Pipeline configuration and strategy selection
//! - Traits defining the detector, segmenter, and vectorizer contracts
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod errors;
pub mod traits;

pub use config::{
    DetectorSelection, PillPipelineConfig, SegmenterSelection, VectorizerSelection,
};
pub use errors::{RxError, RxResult, Stage};
pub use traits::{Detector, Segmenter, Vectorizer};

/// Initializes the tracing subscriber for logging.
///
/// Sets up the tracing subscriber with an environment filter and formatting
/// layer. Typically called once at the start of an application.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
