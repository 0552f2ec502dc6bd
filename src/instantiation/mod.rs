//! # Instantiation Module
//!
//! Turns a finished [`crate::Stage`] into world-space placements.
//!
//! Every room becomes a ground fill, its template's tiles on their layers, and
//! its objects resolved through a [`ContentResolver`]. Once every room is down,
//! each connection is carved into a [`Corridor`].

pub mod corridor;
pub mod instantiator;
pub mod resolver;

pub use corridor::*;
pub use instantiator::*;
pub use resolver::*;

use crate::{Direction, FloatPosition, Position, RoomId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// World-space footprint of a placed room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBounds {
    /// World cell the room is centered on
    pub center: Position,
    /// Width in cells
    pub size_x: i32,
    /// Height in cells
    pub size_y: i32,
}

impl RoomBounds {
    /// Creates bounds for a room of the given size centered on `center`.
    pub fn new(center: Position, size_x: i32, size_y: i32) -> Self {
        Self {
            center,
            size_x,
            size_y,
        }
    }

    /// Top-left cell.
    pub fn min(&self) -> Position {
        self.center - Position::new(self.size_x / 2, self.size_y / 2)
    }

    /// Bottom-right cell.
    pub fn max(&self) -> Position {
        self.min() + Position::new(self.size_x - 1, self.size_y - 1)
    }

    /// Checks whether a cell lies inside the footprint.
    pub fn contains(&self, pos: Position) -> bool {
        let (min, max) = (self.min(), self.max());
        pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y
    }

    /// All cells of the footprint, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Position> {
        let min = self.min();
        let (size_x, size_y) = (self.size_x, self.size_y);
        (0..size_y).flat_map(move |dy| (0..size_x).map(move |dx| min + Position::new(dx, dy)))
    }

    /// The wall cell facing `direction`, in line with the center.
    pub fn boundary_cell(&self, direction: Direction) -> Position {
        let (min, max) = (self.min(), self.max());
        match direction {
            Direction::North => Position::new(self.center.x, min.y),
            Direction::South => Position::new(self.center.x, max.y),
            Direction::East => Position::new(max.x, self.center.y),
            Direction::West => Position::new(min.x, self.center.y),
        }
    }
}

/// A resolved object placed in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnedObject {
    /// Room the object belongs to
    pub room_id: RoomId,
    /// Table id it was resolved from
    pub table_id: i32,
    /// What the engine should spawn
    pub kind: ObjectKind,
    /// World position
    pub position: FloatPosition,
    /// Rotation in degrees
    pub rotation: f32,
}

/// Counters for everything instantiation had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantiationReport {
    /// Rooms laid out
    pub rooms_placed: usize,
    /// Rooms with no template, filled with a bare floor
    pub rooms_without_template: usize,
    /// Tiles whose address could not be resolved
    pub unresolved_tiles: usize,
    /// Objects whose table id could not be resolved
    pub unresolved_objects: usize,
    /// Objects the engine failed to spawn
    pub failed_spawns: usize,
}

/// Everything a stage turns into in world space.
#[derive(Debug, Clone, Default)]
pub struct WorldLayout {
    /// Floor fill of rooms and corridors
    pub ground: HashMap<Position, TileHandle>,
    /// Template tiles, per layer
    pub tilemaps: BTreeMap<i32, HashMap<Position, TileHandle>>,
    /// Resolved objects
    pub objects: Vec<SpawnedObject>,
    /// World footprint of every room
    pub room_bounds: BTreeMap<RoomId, RoomBounds>,
    /// One corridor per connection
    pub corridors: Vec<Corridor>,
    /// First player spawn point found
    pub player_spawn: Option<FloatPosition>,
    /// What had to be skipped
    pub report: InstantiationReport,
}

impl WorldLayout {
    /// Checks whether a world cell has floor.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.ground.contains_key(&pos)
    }

    /// Tile on `layer` at `pos`, if any.
    pub fn tile(&self, layer: i32, pos: Position) -> Option<&TileHandle> {
        self.tilemaps.get(&layer).and_then(|map| map.get(&pos))
    }

    /// The corridor joining two rooms, in either order.
    pub fn corridor_between(&self, a: RoomId, b: RoomId) -> Option<&Corridor> {
        self.corridors
            .iter()
            .find(|c| (c.from == a && c.to == b) || (c.from == b && c.to == a))
    }
}
