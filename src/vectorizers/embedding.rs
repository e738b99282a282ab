//! Learned-embedding vectorizer.
//!
//! Encodes images into fixed-length embeddings through a trained projection
//! model loaded from disk at construction time. The artifact is JSON: input
//! and embedding dimensions plus a row-major projection matrix, exported by
//! the training side.

use std::path::Path;

use image::RgbImage;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::{RxError, RxResult};
use crate::core::traits::Vectorizer;
use crate::domain::ScoreDirection;
use crate::vectorizers::{color_histogram, normalize_unit};

/// Serialized embedding model artifact.
///
/// `projection` holds `embedding_dim` rows of `input_dim` columns. The input
/// dimension must be a multiple of 3: the model consumes a per-channel color
/// histogram with `input_dim / 3` bins per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModel {
    /// Dimensionality of the histogram feature the model consumes.
    pub input_dim: usize,
    /// Dimensionality of the produced embedding.
    pub embedding_dim: usize,
    /// Row-major projection matrix, `embedding_dim x input_dim`.
    pub projection: Vec<Vec<f32>>,
}

impl EmbeddingModel {
    /// An identity model: the embedding is the histogram itself.
    pub fn identity(input_dim: usize) -> Self {
        let projection = (0..input_dim)
            .map(|row| {
                let mut r = vec![0.0; input_dim];
                r[row] = 1.0;
                r
            })
            .collect();
        Self {
            input_dim,
            embedding_dim: input_dim,
            projection,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.input_dim == 0 || self.input_dim % 3 != 0 {
            return Err(format!(
                "input_dim must be a positive multiple of 3, got {}",
                self.input_dim
            ));
        }
        let bins = self.input_dim / 3;
        if bins == 0 || 256 % bins != 0 {
            return Err(format!("{bins} bins per channel does not divide 256"));
        }
        if self.embedding_dim == 0 {
            return Err("embedding_dim must be positive".to_string());
        }
        if self.projection.len() != self.embedding_dim {
            return Err(format!(
                "projection has {} rows, expected embedding_dim {}",
                self.projection.len(),
                self.embedding_dim
            ));
        }
        if let Some(row) = self.projection.iter().find(|r| r.len() != self.input_dim) {
            return Err(format!(
                "projection row of length {} does not match input_dim {}",
                row.len(),
                self.input_dim
            ));
        }
        Ok(())
    }
}

/// Learned-embedding similarity scorer.
///
/// Encodes the masked pill crop and each reference image into unit-length
/// embeddings and scores each pair with `1 - d / 2`, where `d` is the
/// Euclidean distance between the embeddings. For unit vectors the score lies
/// in `[0, 1]`, with `1.0` for identical embeddings.
///
/// Score convention: **higher is better**.
#[derive(Debug, Clone)]
pub struct EmbeddingVectorizer {
    matrix: Array2<f32>,
    bins: usize,
}

impl EmbeddingVectorizer {
    /// Loads the model artifact from disk and builds the vectorizer.
    ///
    /// A missing, unreadable, unparsable, or shape-inconsistent artifact is
    /// fatal: construction fails with `ModelLoad`.
    pub fn from_file(path: impl AsRef<Path>) -> RxResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| RxError::model_load(path, e))?;
        let model: EmbeddingModel =
            serde_json::from_str(&raw).map_err(|e| RxError::model_load(path, e))?;
        model
            .validate()
            .map_err(|reason| RxError::model_invalid(path, reason))?;
        info!(
            path = %path.display(),
            input_dim = model.input_dim,
            embedding_dim = model.embedding_dim,
            "loaded embedding model"
        );
        Self::from_model(model)
    }

    /// Builds the vectorizer from an in-memory model.
    pub fn from_model(model: EmbeddingModel) -> RxResult<Self> {
        model.validate().map_err(RxError::config)?;
        let bins = model.input_dim / 3;
        let flat: Vec<f32> = model.projection.into_iter().flatten().collect();
        let matrix = Array2::from_shape_vec((model.embedding_dim, model.input_dim), flat)
            .map_err(|e| RxError::config(e.to_string()))?;
        Ok(Self { matrix, bins })
    }

    /// Number of histogram bins per channel consumed by the model.
    pub fn bins(&self) -> usize {
        self.bins
    }
}

impl Vectorizer for EmbeddingVectorizer {
    fn name(&self) -> &str {
        "embedding"
    }

    fn direction(&self) -> ScoreDirection {
        ScoreDirection::HigherIsBetter
    }

    fn encode(&self, image: &RgbImage) -> RxResult<Vec<f32>> {
        let feature = Array1::from(color_histogram(image, self.bins)?);
        let mut embedding = self.matrix.dot(&feature).to_vec();
        normalize_unit(&mut embedding);
        Ok(embedding)
    }

    fn score(&self, probe: &[f32], reference: &[f32]) -> f32 {
        let d = probe
            .iter()
            .zip(reference)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt();
        1.0 - d / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReferenceSet;
    use image::Rgb;
    use std::io::Write;

    fn write_model(model: &EmbeddingModel) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(model).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[test]
    fn missing_artifact_is_model_load_error() {
        let err = EmbeddingVectorizer::from_file("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, RxError::ModelLoad { .. }));
    }

    #[test]
    fn corrupt_artifact_is_model_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = EmbeddingVectorizer::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RxError::ModelLoad { .. }));
    }

    #[test]
    fn ragged_projection_is_rejected() {
        let mut model = EmbeddingModel::identity(96);
        model.projection[3].pop();
        let file = write_model(&model);
        let err = EmbeddingVectorizer::from_file(file.path()).unwrap_err();
        assert!(matches!(err, RxError::ModelLoad { .. }));
    }

    #[test]
    fn roundtrips_through_the_artifact_file() {
        let file = write_model(&EmbeddingModel::identity(96));
        let vectorizer = EmbeddingVectorizer::from_file(file.path()).unwrap();
        assert_eq!(vectorizer.bins(), 32);
    }

    #[test]
    fn identical_images_have_maximal_similarity() {
        let vectorizer = EmbeddingVectorizer::from_model(EmbeddingModel::identity(96)).unwrap();
        let image = RgbImage::from_pixel(8, 8, Rgb([200, 40, 40]));
        let e = vectorizer.encode(&image).unwrap();
        assert!((vectorizer.score(&e, &e) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn best_match_is_the_matching_color_and_higher_is_better() {
        let vectorizer = EmbeddingVectorizer::from_model(EmbeddingModel::identity(96)).unwrap();
        let probe = RgbImage::from_pixel(8, 8, Rgb([40, 40, 200]));
        let references = ReferenceSet::new("refs")
            .with_entry("blue", RgbImage::from_pixel(8, 8, Rgb([40, 40, 200])))
            .with_entry("red", RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])));

        let report = vectorizer.compare(&probe, &references).unwrap();
        assert_eq!(report.direction(), ScoreDirection::HigherIsBetter);
        let (index, score) = report.best_match().unwrap();
        assert_eq!(index, 0);
        assert!(score > report.scores()[1]);
    }
}
