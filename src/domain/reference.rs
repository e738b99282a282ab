//! Reference image sets.
//!
//! A [`ReferenceSet`] is a named, externally supplied collection of known-pill
//! images. It is read-only during inference; vectorizers score each detected
//! pill against every entry.

use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use tracing::debug;

use crate::core::errors::{RxError, RxResult};
use crate::utils::image::load_images_batch;

/// A single labelled reference image.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    /// Identity label for the reference pill (e.g. an NDC code or file stem).
    pub label: Arc<str>,
    /// The reference image.
    pub image: RgbImage,
}

/// A named, read-only collection of labelled reference images.
///
/// Entry order is fixed at construction; score reports are index-aligned with
/// it. Directory loading sorts by file name so the order is stable across
/// runs.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    name: String,
    entries: Vec<ReferenceEntry>,
}

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

impl ReferenceSet {
    /// Creates an empty reference set with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Loads a reference set from a directory of images.
    ///
    /// Every file with a recognized image extension is loaded; the file stem
    /// becomes the entry label. Entries are sorted by file name.
    pub fn from_dir(name: impl Into<String>, dir: impl AsRef<Path>) -> RxResult<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
            })
            .collect();
        paths.sort();

        let mut labels = Vec::with_capacity(paths.len());
        for path in &paths {
            let label = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| {
                    RxError::invalid_input(format!("unreadable file name: {}", path.display()))
                })?;
            labels.push(label);
        }

        let mut set = Self::new(name);
        for (label, image) in labels.into_iter().zip(load_images_batch(&paths)?) {
            set.push(label, image);
        }
        debug!(
            name = %set.name,
            entries = set.len(),
            dir = %dir.display(),
            "loaded reference set"
        );
        Ok(set)
    }

    /// Appends a labelled reference image.
    pub fn push(&mut self, label: impl AsRef<str>, image: RgbImage) {
        self.entries.push(ReferenceEntry {
            label: Arc::from(label.as_ref()),
            image,
        });
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with_entry(mut self, label: impl AsRef<str>, image: RgbImage) -> Self {
        self.push(label, image);
        self
    }

    /// Name of the reference set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of reference entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The reference entries in their fixed order.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// The entry labels in their fixed order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| &*entry.label)
    }
}
