//! # Content Resolution
//!
//! The seam between stage instantiation and the engine that owns real assets.

use crate::{DelveResult, SpawnedObject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque handle to a resolved tile asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileHandle(pub String);

impl TileHandle {
    /// Creates a handle from any string-like id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// What a content table id turns into once placed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Static decoration or obstacle
    Prop { prefab: String },
    /// Hostile creature
    Enemy { archetype: String },
    /// Where the player appears when entering the stage
    PlayerSpawn,
    /// Scripted area that fires when entered
    Trigger { script: String },
    /// Known id with no dedicated handling
    Generic { table_id: i32 },
}

/// Engine-side resolver for tiles and objects used during instantiation.
#[allow(async_fn_in_trait)]
pub trait ContentResolver {
    /// Tile used to fill room floors and corridors.
    async fn ground_tile(&self) -> Option<TileHandle>;

    /// Resolves an asset address to a tile.
    async fn resolve_tile(&self, address: &str) -> Option<TileHandle>;

    /// Resolves a content table id to an object kind.
    async fn resolve_object(&self, table_id: i32) -> Option<ObjectKind>;

    /// Spawns a placed object in the engine.
    async fn spawn(&self, object: &SpawnedObject) -> DelveResult<()> {
        let _ = object;
        Ok(())
    }
}

/// Resolver backed by plain lookup tables.
///
/// Useful for tools and tests; with passthrough enabled every address
/// resolves to a handle with the same name.
#[derive(Debug, Clone)]
pub struct StaticContentResolver {
    ground: Option<TileHandle>,
    tiles: HashMap<String, TileHandle>,
    objects: HashMap<i32, ObjectKind>,
    passthrough_tiles: bool,
}

impl StaticContentResolver {
    /// Creates a resolver with the given ground tile and empty tables.
    pub fn new(ground: TileHandle) -> Self {
        Self {
            ground: Some(ground),
            tiles: HashMap::new(),
            objects: HashMap::new(),
            passthrough_tiles: false,
        }
    }

    /// Registers a tile address.
    pub fn with_tile(mut self, address: impl Into<String>, handle: TileHandle) -> Self {
        self.tiles.insert(address.into(), handle);
        self
    }

    /// Registers an object table id.
    pub fn with_object(mut self, table_id: i32, kind: ObjectKind) -> Self {
        self.objects.insert(table_id, kind);
        self
    }

    /// Resolves unknown addresses to a handle named after the address.
    pub fn with_passthrough_tiles(mut self) -> Self {
        self.passthrough_tiles = true;
        self
    }

    /// Drops the ground tile, for exercising resolver failures.
    pub fn without_ground(mut self) -> Self {
        self.ground = None;
        self
    }
}

impl ContentResolver for StaticContentResolver {
    async fn ground_tile(&self) -> Option<TileHandle> {
        self.ground.clone()
    }

    async fn resolve_tile(&self, address: &str) -> Option<TileHandle> {
        match self.tiles.get(address) {
            Some(handle) => Some(handle.clone()),
            None if self.passthrough_tiles => Some(TileHandle::new(address)),
            None => None,
        }
    }

    async fn resolve_object(&self, table_id: i32) -> Option<ObjectKind> {
        self.objects.get(&table_id).cloned()
    }
}
