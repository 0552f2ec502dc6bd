//! # Content Module
//!
//! Room templates and everything needed to store and fetch them.
//!
//! A [`RoomData`] describes one reusable room: its footprint, the tiles painted
//! on each layer, and the gameplay objects placed inside it. Asset addresses are
//! kept in a deduplicated table and tiles refer to them by index, which keeps
//! both memory and the run-length encoded file form small.

pub mod repository;
pub mod rle;
pub mod serialized;

pub use repository::*;
pub use rle::*;
pub use serialized::*;

use crate::config::{MAX_ROOM_SIZE, MIN_ROOM_SIZE};
use crate::{DelveError, DelveResult, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Which slot of a stage a template is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomCategory {
    /// Entrance room, holds the player spawn
    Start,
    /// Any ordinary room
    Normal,
    /// Final room at the far end of the stage
    Boss,
}

impl RoomCategory {
    /// All categories.
    pub const ALL: [RoomCategory; 3] = [RoomCategory::Start, RoomCategory::Normal, RoomCategory::Boss];

    /// Directory name used by on-disk template libraries.
    pub fn dir_name(self) -> &'static str {
        match self {
            RoomCategory::Start => "start",
            RoomCategory::Normal => "normal",
            RoomCategory::Boss => "boss",
        }
    }
}

/// One painted cell of a room, in room-local coordinates relative to its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileRecord {
    /// Index into [`RoomData::asset_addresses`]
    pub address_index: i32,
    /// Tilemap layer the tile belongs to
    pub layer: i32,
    /// Room-local cell
    pub position: Position,
}

impl TileRecord {
    /// Creates a new tile record.
    pub fn new(address_index: i32, layer: i32, position: Position) -> Self {
        Self {
            address_index,
            layer,
            position,
        }
    }
}

/// A room-local point with sub-tile precision.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloatPosition {
    pub x: f32,
    pub y: f32,
}

impl FloatPosition {
    /// Creates a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Position> for FloatPosition {
    fn from(pos: Position) -> Self {
        Self::new(pos.x as f32, pos.y as f32)
    }
}

impl std::ops::Add for FloatPosition {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// A gameplay object placed in a room, identified by its content table id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Row in the external object table
    pub table_id: i32,
    /// Room-local position
    pub position: FloatPosition,
    /// Rotation around the view axis, in degrees
    pub rotation: f32,
}

/// Reusable content description of one room.
///
/// # Examples
///
/// ```
/// use delve::{Position, RoomData};
///
/// let mut room = RoomData::new("hall", 10, 8);
/// room.add_tile("floor/stone", 0, Position::new(0, 0));
/// room.add_tile("floor/stone", 0, Position::new(1, 0));
///
/// assert_eq!(room.asset_addresses.len(), 1);
/// assert_eq!(room.tiles.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    /// Template name, used for logging and stage snapshots
    pub name: String,
    /// Footprint width in cells
    pub size_x: i32,
    /// Footprint height in cells
    pub size_y: i32,
    /// Deduplicated asset address table
    pub asset_addresses: Vec<String>,
    /// Painted cells
    pub tiles: Vec<TileRecord>,
    /// Placed gameplay objects
    pub objects: Vec<ObjectRecord>,
}

impl RoomData {
    /// Creates an empty template, clamping the footprint to the default size range.
    pub fn new(name: impl Into<String>, size_x: i32, size_y: i32) -> Self {
        Self::with_size_range(name, size_x, size_y, MIN_ROOM_SIZE..=MAX_ROOM_SIZE)
    }

    /// Creates an empty template, clamping the footprint to `sizes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::RoomData;
    ///
    /// let room = RoomData::with_size_range("vault", 36, 4, 6..=40);
    /// assert_eq!((room.size_x, room.size_y), (36, 6));
    /// ```
    pub fn with_size_range(
        name: impl Into<String>,
        size_x: i32,
        size_y: i32,
        sizes: RangeInclusive<i32>,
    ) -> Self {
        let mut room = Self {
            name: name.into(),
            size_x,
            size_y,
            asset_addresses: Vec::new(),
            tiles: Vec::new(),
            objects: Vec::new(),
        };
        room.clamp_size(*sizes.start(), *sizes.end());
        room
    }

    /// Clamps the footprint into `[min, max]` on both axes.
    ///
    /// An inverted range collapses to `min`.
    pub fn clamp_size(&mut self, min: i32, max: i32) {
        let max = max.max(min);
        self.size_x = self.size_x.clamp(min, max);
        self.size_y = self.size_y.clamp(min, max);
    }

    /// Returns the index of `address`, appending it if it is new.
    pub fn get_or_add_address(&mut self, address: &str) -> i32 {
        if let Some(index) = self.asset_addresses.iter().position(|a| a == address) {
            return index as i32;
        }
        self.asset_addresses.push(address.to_string());
        (self.asset_addresses.len() - 1) as i32
    }

    /// Looks up an address by index.
    pub fn address(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.asset_addresses.get(i))
            .map(String::as_str)
    }

    /// Paints a tile, registering its address if needed.
    pub fn add_tile(&mut self, address: &str, layer: i32, position: Position) {
        let address_index = self.get_or_add_address(address);
        self.tiles.push(TileRecord::new(address_index, layer, position));
    }

    /// Places an object.
    pub fn add_object(&mut self, table_id: i32, position: FloatPosition, rotation: f32) {
        self.objects.push(ObjectRecord {
            table_id,
            position,
            rotation,
        });
    }

    /// Number of painted cells.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Layers that have at least one tile.
    pub fn layers(&self) -> BTreeSet<i32> {
        self.tiles.iter().map(|tile| tile.layer).collect()
    }

    /// Smallest and largest painted cell across all layers, or None when empty.
    pub fn tile_bounds(&self) -> Option<(Position, Position)> {
        let first = self.tiles.first()?.position;
        Some(self.tiles.iter().fold((first, first), |(min, max), tile| {
            (
                Position::new(min.x.min(tile.position.x), min.y.min(tile.position.y)),
                Position::new(max.x.max(tile.position.x), max.y.max(tile.position.y)),
            )
        }))
    }

    /// Checks that every tile refers to a real address.
    pub fn validate(&self) -> DelveResult<()> {
        if self.size_x <= 0 || self.size_y <= 0 {
            return Err(DelveError::InvalidState(format!(
                "Room '{}' has empty footprint {}x{}",
                self.name, self.size_x, self.size_y
            )));
        }

        for tile in &self.tiles {
            if self.address(tile.address_index).is_none() {
                return Err(DelveError::AddressOutOfRange {
                    index: tile.address_index,
                    len: self.asset_addresses.len(),
                });
            }
        }
        Ok(())
    }
}
