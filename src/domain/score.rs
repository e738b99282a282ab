//! Similarity scores and their direction convention.
//!
//! The two vectorizer strategies do not agree on whether lower or higher
//! scores indicate a better match, so every score report carries its
//! direction and callers read it instead of assuming one.

use serde::{Deserialize, Serialize};

/// Which end of the score scale indicates a better match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDirection {
    /// Smaller scores are better matches (distances).
    LowerIsBetter,
    /// Larger scores are better matches (similarities).
    HigherIsBetter,
}

/// Per-reference similarity scores for one detected pill.
///
/// Scores are index-aligned with the entries of the reference set they were
/// computed against.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    direction: ScoreDirection,
    scores: Vec<f32>,
}

impl ScoreReport {
    /// Creates a report from a direction and per-reference scores.
    pub fn new(direction: ScoreDirection, scores: Vec<f32>) -> Self {
        Self { direction, scores }
    }

    /// The score convention of the vectorizer that produced this report.
    pub fn direction(&self) -> ScoreDirection {
        self.direction
    }

    /// Per-reference scores, index-aligned with the reference set.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Index and score of the best-matching reference under this report's
    /// direction, or `None` if the report is empty.
    pub fn best_match(&self) -> Option<(usize, f32)> {
        let iter = self.scores.iter().copied().enumerate();
        match self.direction {
            ScoreDirection::LowerIsBetter => iter.min_by(|a, b| a.1.total_cmp(&b.1)),
            ScoreDirection::HigherIsBetter => iter.max_by(|a, b| a.1.total_cmp(&b.1)),
        }
    }
}
