//! Region-of-interest geometry.
//!
//! A [`Roi`] is an axis-aligned rectangle within an image, produced by a
//! detector and consumed by the segmentation and vectorization stages.

use serde::{Deserialize, Serialize};

/// An axis-aligned region of interest within an image.
///
/// Coordinates are in pixels with the origin at the top-left corner of the
/// image. The region covers columns `x..x + width` and rows `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    /// X-coordinate of the top-left corner.
    pub x: u32,
    /// Y-coordinate of the top-left corner.
    pub y: u32,
    /// Width of the region in pixels.
    pub width: u32,
    /// Height of the region in pixels.
    pub height: u32,
}

impl Roi {
    /// Creates a new region from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a region from inclusive pixel bounds.
    pub fn from_bounds(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// One past the rightmost column covered by the region.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottommost row covered by the region.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area of the region in pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns true if the region is non-degenerate and lies entirely within
    /// an image of the given dimensions.
    ///
    /// The comparison is widened to u64 so corners near `u32::MAX` cannot
    /// overflow.
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(image_width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(image_height)
    }

    /// Returns the overlapping region between two ROIs, if any.
    pub fn intersection(&self, other: &Roi) -> Option<Roi> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = (u64::from(self.x) + u64::from(self.width))
            .min(u64::from(other.x) + u64::from(other.width));
        let bottom = (u64::from(self.y) + u64::from(self.height))
            .min(u64::from(other.y) + u64::from(other.height));
        (u64::from(x) < right && u64::from(y) < bottom)
            .then(|| Roi::new(x, y, (right - u64::from(x)) as u32, (bottom - u64::from(y)) as u32))
    }
}
