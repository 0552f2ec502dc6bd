//! # Template Repository
//!
//! Where the generator gets room templates from.
//!
//! [`TemplateRepository`] is the seam: the generator only ever asks for "a
//! random template of this category", drawing from the same RNG it uses for
//! layout so a seed reproduces content choice too. [`TemplateLibrary`] is the
//! in-process implementation, filled by hand or loaded from a directory tree of
//! serialized rooms.

use crate::config::{MAX_ROOM_SIZE, MIN_ROOM_SIZE};
use crate::{DelveResult, RoomCategory, RoomData, SerializedRoomData};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of room templates for stage generation.
#[allow(async_fn_in_trait)]
pub trait TemplateRepository {
    /// Picks a random template of `category`, or None if there are none.
    async fn random_template(
        &self,
        category: RoomCategory,
        rng: &mut StdRng,
    ) -> Option<Arc<RoomData>>;
}

/// In-memory template collection, grouped by category.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: HashMap<RoomCategory, Vec<Arc<RoomData>>>,
}

impl TemplateLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template to a category.
    pub fn insert(&mut self, category: RoomCategory, room: RoomData) {
        self.templates
            .entry(category)
            .or_default()
            .push(Arc::new(room));
    }

    /// Builder form of [`TemplateLibrary::insert`].
    pub fn with_template(mut self, category: RoomCategory, room: RoomData) -> Self {
        self.insert(category, room);
        self
    }

    /// Templates registered for a category, in insertion order.
    pub fn templates(&self, category: RoomCategory) -> &[Arc<RoomData>] {
        self.templates
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of templates across all categories.
    pub fn len(&self) -> usize {
        self.templates.values().map(Vec::len).sum()
    }

    /// True when no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads a library from `root/start`, `root/normal` and `root/boss`.
    ///
    /// Every `*.json` file in those directories must hold a
    /// [`SerializedRoomData`]; files are read in name order so template
    /// indices are stable across runs. Missing category directories are
    /// skipped, a malformed file fails the whole load.
    pub async fn load_dir(root: impl AsRef<Path>) -> DelveResult<Self> {
        Self::load_dir_with_sizes(root, MIN_ROOM_SIZE..=MAX_ROOM_SIZE).await
    }

    /// Like [`TemplateLibrary::load_dir`], clamping every room to `sizes`.
    pub async fn load_dir_with_sizes(
        root: impl AsRef<Path>,
        sizes: RangeInclusive<i32>,
    ) -> DelveResult<Self> {
        let root = root.as_ref();
        let mut library = Self::new();

        for category in RoomCategory::ALL {
            let dir = root.join(category.dir_name());
            if !tokio::fs::try_exists(&dir).await? {
                debug!("No {} templates at {}", category.dir_name(), dir.display());
                continue;
            }

            for path in json_files(&dir).await? {
                let room = load_room_with_sizes(&path, sizes.clone()).await?;
                debug!("Loaded {:?} template '{}' from {}", category, room.name, path.display());
                library.insert(category, room);
            }
        }

        info!("Loaded {} room templates from {}", library.len(), root.display());
        Ok(library)
    }
}

impl TemplateRepository for TemplateLibrary {
    async fn random_template(
        &self,
        category: RoomCategory,
        rng: &mut StdRng,
    ) -> Option<Arc<RoomData>> {
        self.templates(category).choose(rng).cloned()
    }
}

/// Reads one serialized room from disk and expands it.
pub async fn load_room(path: impl AsRef<Path>) -> DelveResult<RoomData> {
    load_room_with_sizes(path, MIN_ROOM_SIZE..=MAX_ROOM_SIZE).await
}

/// Reads one serialized room, clamping its footprint to `sizes`.
pub async fn load_room_with_sizes(
    path: impl AsRef<Path>,
    sizes: RangeInclusive<i32>,
) -> DelveResult<RoomData> {
    let json = tokio::fs::read_to_string(path).await?;
    SerializedRoomData::from_json(&json)?.to_room_data_with_sizes(sizes)
}

/// Compresses a room and writes it to disk as JSON.
pub async fn save_room(path: impl AsRef<Path>, room: &RoomData) -> DelveResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = SerializedRoomData::from_room_data(room).to_json()?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

async fn json_files(dir: &Path) -> DelveResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
