//! # rx-vision
//!
//! A Rust library for pharmaceutical pill identification and verification.
//! It chains three swappable stages over one image: pill detection, pill vs
//! background segmentation, and similarity scoring against a set of labelled
//! reference images.
//!
//! ## Components
//!
//! - **Detection**: find regions believed to contain a pill
//! - **Segmentation**: separate pill pixels from background within a region
//! - **Vectorization**: score each masked pill against reference images
//! - **Generation**: compose synthetic pill scenes with ground truth
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, and the three strategy traits
//! * [`domain`] - ROIs, masks, reference sets, and score reports
//! * [`detectors`] / [`segmenters`] / [`vectorizers`] - Shipped strategies
//! * [`pipeline`] - The per-image orchestration container
//! * [`generator`] - Synthetic image composition
//! * [`utils`] - Image loading and visualization helpers
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rx_vision::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PillPipelineConfig::default();
//! let mut pipeline = PillImage::from_config(&config)?;
//!
//! pipeline.load_path("tray.png")?;
//! let count = pipeline.run_detection()?;
//! println!("detected {count} pills");
//!
//! pipeline.run_segmentation()?;
//! let references = ReferenceSet::from_dir("ndc", "references/")?;
//! pipeline.run_vectorization(&references)?;
//!
//! for report in pipeline.scores()? {
//!     if let Some((index, score)) = report.best_match() {
//!         let label = references.entries()[index].label.clone();
//!         println!("best match {label} at {score} ({:?})", report.direction());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod detectors;
pub mod domain;
pub mod generator;
pub mod pipeline;
pub mod segmenters;
pub mod utils;
pub mod vectorizers;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use rx_vision::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        Detector, PillPipelineConfig, RxError, RxResult, Segmenter, Stage, Vectorizer,
    };
    pub use crate::domain::{Mask, ReferenceSet, Roi, ScoreDirection, ScoreReport};
    pub use crate::pipeline::{PillImage, PipelineStage};
    pub use crate::utils::load_image;
}
