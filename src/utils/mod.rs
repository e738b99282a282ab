//! Utility functions for images and visualization.

pub mod image;
pub mod visualization;

pub use self::image::{crop_roi, dynamic_to_rgb, load_image, load_images_batch};
pub use visualization::{draw_rois, overlay_masks};
