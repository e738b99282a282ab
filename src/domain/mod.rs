//! Domain types shared across the pipeline stages.
//!
//! This module contains the data model of the pipeline: regions of interest,
//! pill/background masks, reference image sets, and similarity score reports.

pub mod mask;
pub mod reference;
pub mod roi;
pub mod score;

pub use mask::Mask;
pub use reference::{ReferenceEntry, ReferenceSet};
pub use roi::Roi;
pub use score::{ScoreDirection, ScoreReport};
