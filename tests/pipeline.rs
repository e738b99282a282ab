//! End-to-end pipeline tests on deterministic synthetic scenes.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_ellipse_mut;

use rx_vision::core::config::{PillPipelineConfig, VectorizerSelection};
use rx_vision::prelude::*;
use rx_vision::vectorizers::EmbeddingModel;

const RED: Rgb<u8> = Rgb([200, 30, 30]);
const BLUE: Rgb<u8> = Rgb([30, 30, 200]);

/// A white tray with exactly two well-separated pills: a red one in the
/// upper-left quadrant and a blue one in the lower-right.
fn two_pill_scene() -> RgbImage {
    let mut scene = RgbImage::from_pixel(256, 256, Rgb([255, 255, 255]));
    draw_filled_ellipse_mut(&mut scene, (60, 60), 24, 16, RED);
    draw_filled_ellipse_mut(&mut scene, (180, 180), 20, 20, BLUE);
    scene
}

/// References for the two pill types in the scene. Solid patches carry the
/// same color statistics as the composed pills.
fn two_pill_references() -> ReferenceSet {
    ReferenceSet::new("test-pills")
        .with_entry("blue_pill", RgbImage::from_pixel(32, 32, BLUE))
        .with_entry("red_pill", RgbImage::from_pixel(32, 32, RED))
}

fn write_identity_model(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("embedding.json");
    let model = EmbeddingModel::identity(96);
    std::fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();
    path
}

#[test]
fn full_run_identifies_both_pills_with_color_moments() {
    let mut pipeline = PillImage::from_config(&PillPipelineConfig::default()).unwrap();
    pipeline.load(two_pill_scene()).unwrap();

    assert_eq!(pipeline.run_detection().unwrap(), 2);
    assert_eq!(pipeline.pill_count().unwrap(), 2);

    pipeline.run_segmentation().unwrap();
    pipeline.run_vectorization(&two_pill_references()).unwrap();

    let scores = pipeline.scores().unwrap();
    assert_eq!(scores.len(), 2);
    assert_eq!(pipeline.score_direction(), ScoreDirection::LowerIsBetter);

    // ROIs are sorted by top-left corner, so index 0 is the red pill.
    let (red_best, _) = scores[0].best_match().unwrap();
    let (blue_best, _) = scores[1].best_match().unwrap();
    assert_eq!(red_best, 1, "red pill should match the red reference");
    assert_eq!(blue_best, 0, "blue pill should match the blue reference");
}

#[test]
fn full_run_identifies_both_pills_with_embedding_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = PillPipelineConfig {
        vectorizer: VectorizerSelection::Embedding {
            model_path: write_identity_model(&dir),
        },
        ..PillPipelineConfig::default()
    };

    let mut pipeline = PillImage::from_config(&config).unwrap();
    pipeline.load(two_pill_scene()).unwrap();
    pipeline.run_detection().unwrap();
    pipeline.run_segmentation().unwrap();
    pipeline.run_vectorization(&two_pill_references()).unwrap();

    assert_eq!(pipeline.score_direction(), ScoreDirection::HigherIsBetter);
    let scores = pipeline.scores().unwrap();
    assert_eq!(scores[0].best_match().unwrap().0, 1);
    assert_eq!(scores[1].best_match().unwrap().0, 0);
    // Identical color statistics give a near-perfect similarity.
    assert!(scores[0].best_match().unwrap().1 > 0.99);
}

#[test]
fn stage_progression_and_index_alignment() {
    let mut pipeline = PillImage::from_config(&PillPipelineConfig::default()).unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::Empty);

    pipeline.load(two_pill_scene()).unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::Loaded);

    pipeline.run_detection().unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::Detected);

    pipeline.run_segmentation().unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::Segmented);

    pipeline.run_vectorization(&two_pill_references()).unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::Vectorized);

    let rois = pipeline.rois().unwrap();
    let masks = pipeline.masks().unwrap();
    let scores = pipeline.scores().unwrap();
    assert_eq!(rois.len(), masks.len());
    assert_eq!(rois.len(), scores.len());
    for (roi, mask) in rois.iter().zip(masks) {
        assert!(mask.matches_roi(roi));
    }
}

#[test]
fn vectorization_on_a_detected_only_container_is_rejected() {
    let mut pipeline = PillImage::from_config(&PillPipelineConfig::default()).unwrap();
    pipeline.load(two_pill_scene()).unwrap();
    pipeline.run_detection().unwrap();

    let err = pipeline
        .run_vectorization(&two_pill_references())
        .unwrap_err();
    assert!(matches!(
        err,
        RxError::Precondition {
            required: Stage::Segmentation,
            requested: Stage::Vectorization,
        }
    ));
}

#[test]
fn reloading_resets_all_stage_accessors() {
    let mut pipeline = PillImage::from_config(&PillPipelineConfig::default()).unwrap();
    pipeline.load(two_pill_scene()).unwrap();
    pipeline.run_detection().unwrap();
    pipeline.run_segmentation().unwrap();
    pipeline.run_vectorization(&two_pill_references()).unwrap();

    pipeline.load(two_pill_scene()).unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::Loaded);
    assert!(matches!(pipeline.rois(), Err(RxError::NotRun { .. })));
    assert!(matches!(pipeline.masks(), Err(RxError::NotRun { .. })));
    assert!(matches!(pipeline.scores(), Err(RxError::NotRun { .. })));
}

#[test]
fn config_round_trips_through_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.json");
    let raw = r#"{
        "detector": { "strategy": "contour", "min_area": 64 },
        "segmenter": { "strategy": "otsu", "dark_objects": true },
        "vectorizer": { "strategy": "color_moment" },
        "mask_threshold": 0.5
    }"#;
    std::fs::write(&path, raw).unwrap();

    let config = PillPipelineConfig::from_json_file(&path).unwrap();
    let mut pipeline = PillImage::from_config(&config).unwrap();
    pipeline.load(two_pill_scene()).unwrap();
    assert_eq!(pipeline.run_detection().unwrap(), 2);
}

#[test]
fn missing_embedding_artifact_is_fatal_at_construction() {
    let config = PillPipelineConfig {
        vectorizer: VectorizerSelection::Embedding {
            model_path: "/nonexistent/embedding.json".into(),
        },
        ..PillPipelineConfig::default()
    };
    let err = PillImage::from_config(&config).unwrap_err();
    assert!(matches!(err, RxError::ModelLoad { .. }));
}
