//! Synthetic pill-image composition.
//!
//! Composes pill sprites onto a background image, tracking a label mask and
//! per-pill ground-truth bounding boxes. The result is the labelled input the
//! rest of the pipeline is exercised against: detection counts are checked
//! against the number of placed pills and vectorization against the sprite
//! identities.
//!
//! Placement is randomized through a caller-supplied [`Rng`], so seeded runs
//! are fully deterministic.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::{RxError, RxResult};
use crate::domain::Roi;

/// A pill sprite: an RGB image plus a binary mask of the pill's pixels.
#[derive(Debug, Clone)]
pub struct PillSprite {
    image: RgbImage,
    mask: GrayImage,
    fg_area: u32,
}

impl PillSprite {
    /// Creates a sprite from an image and its mask.
    ///
    /// The mask must have the image's extent (nonzero pixels are pill) and at
    /// least one pill pixel.
    pub fn new(image: RgbImage, mask: GrayImage) -> RxResult<Self> {
        if image.dimensions() != mask.dimensions() {
            return Err(RxError::invalid_input(format!(
                "sprite image {}x{} and mask {}x{} differ in extent",
                image.width(),
                image.height(),
                mask.width(),
                mask.height()
            )));
        }
        let fg_area = mask.pixels().filter(|p| p.0[0] != 0).count() as u32;
        if fg_area == 0 {
            return Err(RxError::invalid_input("sprite mask has no pill pixels"));
        }
        Ok(Self {
            image,
            mask,
            fg_area,
        })
    }

    /// Creates a solid elliptical sprite of the given extent and color.
    pub fn ellipse(width: u32, height: u32, color: Rgb<u8>) -> RxResult<Self> {
        if width < 3 || height < 3 {
            return Err(RxError::invalid_input(format!(
                "ellipse sprite needs at least 3x3 pixels, got {width}x{height}"
            )));
        }
        let center = ((width / 2) as i32, (height / 2) as i32);
        let radii = ((width / 2) as i32 - 1, (height / 2) as i32 - 1);

        let mut image = RgbImage::new(width, height);
        draw_filled_ellipse_mut(&mut image, center, radii.0, radii.1, color);
        let mut mask = GrayImage::new(width, height);
        draw_filled_ellipse_mut(&mut mask, center, radii.0, radii.1, Luma([255]));
        Self::new(image, mask)
    }

    /// The sprite's RGB image (black outside the pill).
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The sprite's binary mask (nonzero on pill pixels).
    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Sprite width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Sprite height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Configuration for [`generate_image`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Minimum number of pills to compose.
    pub min_pills: usize,
    /// Maximum number of pills to compose.
    pub max_pills: usize,
    /// Fraction of pills per sprite type. `None` draws a random partition
    /// with at least one pill per type.
    pub fraction_per_type: Option<Vec<f32>>,
    /// Maximum allowed overlap between a new pill and already-placed pills,
    /// as a fraction of the new pill's area.
    pub max_overlap: f32,
    /// Placement attempts per pill before giving up on it.
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_pills: 5,
            max_pills: 15,
            fraction_per_type: None,
            max_overlap: 0.2,
            max_attempts: 10,
        }
    }
}

/// A composed synthetic image with its ground truth.
#[derive(Debug, Clone)]
pub struct ImageComposition {
    /// The background with pills composed onto it.
    pub image: RgbImage,
    /// Label mask: background 0, placed pills labelled 1, 2, 3, ...
    pub label_mask: GrayImage,
    /// Label IDs of the placed pills.
    pub labels: Vec<u8>,
    /// Ground-truth bounding boxes, index-aligned with `labels`.
    pub bboxes: Vec<Roi>,
    /// Number of pills requested per sprite type.
    pub pills_per_type: Vec<usize>,
}

/// Splits `total` into `parts` random integers that sum to `total`, with at
/// least one count per part, sorted in descending order.
pub fn random_partition(total: usize, parts: usize, rng: &mut impl Rng) -> RxResult<Vec<usize>> {
    if parts == 0 || parts > total {
        return Err(RxError::invalid_input(format!(
            "cannot split {total} pills into {parts} parts"
        )));
    }
    // Reserve one pill per part, distribute the rest.
    let mut remaining = total - parts;
    let mut partition = vec![0usize; parts];
    for slot in partition.iter_mut().take(parts - 1) {
        let take = rng.random_range(0..=remaining);
        *slot = take;
        remaining -= take;
    }
    partition[parts - 1] = remaining;
    for slot in &mut partition {
        *slot += 1;
    }
    partition.sort_unstable_by(|a, b| b.cmp(a));
    Ok(partition)
}

/// Splits `total` into integer parts proportional to `fractions`. The parts
/// are sorted in descending order and any integer remainder then goes to the
/// last (smallest) part. The fractions must sum to 1 (within 1e-3).
pub fn partition_by_fraction(total: usize, fractions: &[f32]) -> RxResult<Vec<usize>> {
    if fractions.is_empty() {
        return Err(RxError::invalid_input("no fractions given"));
    }
    let sum: f32 = fractions.iter().sum();
    if (sum - 1.0).abs() > 1e-3 {
        return Err(RxError::invalid_input(format!(
            "fractions sum to {sum}, expected 1"
        )));
    }
    let mut partition: Vec<usize> = fractions
        .iter()
        .map(|f| (total as f32 * f) as usize)
        .collect();
    partition.sort_unstable_by(|a, b| b.cmp(a));
    let assigned: usize = partition.iter().sum();
    *partition.last_mut().expect("nonempty") += total - assigned;
    Ok(partition)
}

/// Composes pills onto a background image.
///
/// For each pill, a location is sampled uniformly such that the sprite lies
/// fully inside the background, rejecting placements whose overlap with
/// already-placed pills exceeds `max_overlap`; after `max_attempts`
/// rejections the pill is skipped. The returned labels and bounding boxes
/// cover the pills actually placed.
pub fn generate_image(
    background: &RgbImage,
    sprites: &[PillSprite],
    config: &GeneratorConfig,
    rng: &mut impl Rng,
) -> RxResult<ImageComposition> {
    let (bg_w, bg_h) = background.dimensions();
    if bg_w == 0 || bg_h == 0 {
        return Err(RxError::invalid_input("background image is degenerate"));
    }
    if sprites.is_empty() {
        return Err(RxError::invalid_input("no sprites to compose"));
    }
    if config.min_pills == 0 || config.min_pills > config.max_pills {
        return Err(RxError::invalid_input(format!(
            "invalid pill range {}..={}",
            config.min_pills, config.max_pills
        )));
    }
    if config.max_pills > u8::MAX as usize {
        return Err(RxError::invalid_input(
            "label mask supports at most 255 pills",
        ));
    }
    for sprite in sprites {
        if sprite.width() > bg_w || sprite.height() > bg_h {
            return Err(RxError::invalid_input(format!(
                "sprite {}x{} exceeds background {}x{}",
                sprite.width(),
                sprite.height(),
                bg_w,
                bg_h
            )));
        }
    }

    let total = rng.random_range(config.min_pills..=config.max_pills);
    let pills_per_type = match &config.fraction_per_type {
        None => random_partition(total, sprites.len(), rng)?,
        Some(fractions) => {
            if fractions.len() != sprites.len() {
                return Err(RxError::invalid_input(format!(
                    "{} fractions for {} sprite types",
                    fractions.len(),
                    sprites.len()
                )));
            }
            partition_by_fraction(total, fractions)?
        }
    };

    let mut image = background.clone();
    let mut label_mask = GrayImage::new(bg_w, bg_h);
    let mut labels = Vec::new();
    let mut bboxes = Vec::new();
    let mut next_label = 1usize;

    for (sprite, &count) in sprites.iter().zip(&pills_per_type) {
        for _ in 0..count {
            let mut placed = false;
            for _ in 0..config.max_attempts {
                let x = rng.random_range(0..=(bg_w - sprite.width()));
                let y = rng.random_range(0..=(bg_h - sprite.height()));
                if overlap_ratio(sprite, &label_mask, x, y) > config.max_overlap {
                    continue;
                }
                let bbox =
                    overlay_sprite(&mut image, &mut label_mask, sprite, x, y, next_label as u8);
                labels.push(next_label as u8);
                bboxes.push(bbox);
                next_label += 1;
                placed = true;
                break;
            }
            if !placed {
                warn!(
                    attempts = config.max_attempts,
                    "could not place pill without excess overlap"
                );
            }
        }
    }

    debug!(
        requested = total,
        placed = labels.len(),
        types = sprites.len(),
        "composed synthetic image"
    );
    Ok(ImageComposition {
        image,
        label_mask,
        labels,
        bboxes,
        pills_per_type,
    })
}

/// Fraction of the sprite's pill pixels that would cover already-placed
/// pills at the given position.
fn overlap_ratio(sprite: &PillSprite, label_mask: &GrayImage, x: u32, y: u32) -> f32 {
    let mut covered = 0u32;
    for (dx, dy, pixel) in sprite.mask.enumerate_pixels() {
        if pixel.0[0] != 0 && label_mask.get_pixel(x + dx, y + dy).0[0] != 0 {
            covered += 1;
        }
    }
    covered as f32 / sprite.fg_area as f32
}

/// Writes the sprite's pill pixels into the image and label mask, returning
/// the tight bounding box of the written pixels.
fn overlay_sprite(
    image: &mut RgbImage,
    label_mask: &mut GrayImage,
    sprite: &PillSprite,
    x: u32,
    y: u32,
    label: u8,
) -> Roi {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
    for (dx, dy, pixel) in sprite.mask.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        let (px, py) = (x + dx, y + dy);
        image.put_pixel(px, py, *sprite.image.get_pixel(dx, dy));
        label_mask.put_pixel(px, py, Luma([label]));
        min_x = min_x.min(px);
        min_y = min_y.min(py);
        max_x = max_x.max(px);
        max_y = max_y.max(py);
    }
    // Sprites always have at least one foreground pixel.
    Roi::from_bounds(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_partition_sums_and_covers_every_part() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let partition = random_partition(12, 3, &mut rng).unwrap();
            assert_eq!(partition.len(), 3);
            assert_eq!(partition.iter().sum::<usize>(), 12);
            assert!(partition.iter().all(|&p| p >= 1));
            assert!(partition.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn random_partition_rejects_more_parts_than_pills() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(random_partition(2, 3, &mut rng).is_err());
    }

    #[test]
    fn partition_by_fraction_distributes_the_remainder() {
        // 10 * 0.25 truncates to 2 per small part; the remainder lands on the
        // last part, so the result is not fully descending.
        let partition = partition_by_fraction(10, &[0.5, 0.25, 0.25]).unwrap();
        assert_eq!(partition, vec![5, 2, 3]);

        assert!(partition_by_fraction(10, &[0.7, 0.7]).is_err());
    }

    #[test]
    fn ellipse_sprite_has_pill_pixels_inside_its_extent() {
        let sprite = PillSprite::ellipse(20, 12, Rgb([200, 30, 30])).unwrap();
        assert_eq!((sprite.width(), sprite.height()), (20, 12));
        assert!(sprite.fg_area > 0);
        assert_eq!(sprite.image.get_pixel(10, 6).0, [200, 30, 30]);
        assert_eq!(sprite.mask.get_pixel(0, 0).0, [0]);
    }

    #[test]
    fn mismatched_sprite_extents_are_rejected() {
        let image = RgbImage::new(4, 4);
        let mask = GrayImage::new(5, 4);
        assert!(PillSprite::new(image, mask).is_err());
    }

    #[test]
    fn generated_ground_truth_is_index_aligned() {
        let background = RgbImage::from_pixel(160, 160, Rgb([255, 255, 255]));
        let sprites = vec![
            PillSprite::ellipse(24, 14, Rgb([200, 30, 30])).unwrap(),
            PillSprite::ellipse(18, 18, Rgb([30, 30, 200])).unwrap(),
        ];
        let config = GeneratorConfig {
            min_pills: 4,
            max_pills: 6,
            max_attempts: 50,
            ..GeneratorConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(42);

        let composition = generate_image(&background, &sprites, &config, &mut rng).unwrap();
        let total: usize = composition.pills_per_type.iter().sum();
        assert!((4..=6).contains(&total));
        assert_eq!(composition.labels.len(), composition.bboxes.len());
        assert!(composition.labels.len() <= total);

        for (label, bbox) in composition.labels.iter().zip(&composition.bboxes) {
            assert!(bbox.fits_within(160, 160));
            // The label appears inside its own bounding box.
            let found = (bbox.y..bbox.bottom()).any(|py| {
                (bbox.x..bbox.right())
                    .any(|px| composition.label_mask.get_pixel(px, py).0[0] == *label)
            });
            assert!(found);
        }
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let background = RgbImage::from_pixel(120, 120, Rgb([255, 255, 255]));
        let sprites = vec![PillSprite::ellipse(16, 10, Rgb([60, 180, 60])).unwrap()];
        let config = GeneratorConfig {
            min_pills: 3,
            max_pills: 5,
            max_attempts: 50,
            ..GeneratorConfig::default()
        };

        let a = generate_image(&background, &sprites, &config, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = generate_image(&background, &sprites, &config, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.bboxes, b.bboxes);
        assert_eq!(a.image.as_raw(), b.image.as_raw());
    }
}
