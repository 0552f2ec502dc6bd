//! # Rooms
//!
//! A single node of the stage graph.

use crate::{Direction, Position, RoomData, RoomId};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A node in the stage graph.
///
/// Rooms know their grid cell, the template that fills them, and which
/// neighbour sits behind each of their four doors. Connections are only ever
/// created through [`crate::Stage`], which keeps them symmetric.
#[derive(Debug, Clone, Serialize)]
pub struct Room {
    /// Unique identifier within the owning stage
    pub id: RoomId,
    /// Grid cell this room occupies
    pub position: Position,
    /// Content template, None until one is assigned
    #[serde(serialize_with = "serialize_template_name")]
    pub template: Option<Arc<RoomData>>,
    /// Gameplay flag set once the room's encounter is finished
    pub is_cleared: bool,
    /// Neighbour behind each connected direction
    pub(crate) connections: BTreeMap<Direction, RoomId>,
}

impl Room {
    /// Creates an unconnected room.
    pub fn new(id: RoomId, position: Position, template: Option<Arc<RoomData>>) -> Self {
        Self {
            id,
            position,
            template,
            is_cleared: false,
            connections: BTreeMap::new(),
        }
    }

    /// Gets the neighbour connected in `direction`, if any.
    pub fn connection(&self, direction: Direction) -> Option<RoomId> {
        self.connections.get(&direction).copied()
    }

    /// Checks whether `direction` already has a door.
    pub fn is_connected(&self, direction: Direction) -> bool {
        self.connections.contains_key(&direction)
    }

    /// Iterates connections in North, South, East, West order.
    pub fn connections(&self) -> impl Iterator<Item = (Direction, RoomId)> + '_ {
        self.connections.iter().map(|(&direction, &id)| (direction, id))
    }

    /// Number of connected doors.
    pub fn degree(&self) -> usize {
        self.connections.len()
    }

    /// Name of the assigned template, if any.
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref().map(|template| template.name.as_str())
    }
}

fn serialize_template_name<S>(
    template: &Option<Arc<RoomData>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match template {
        Some(template) => serializer.serialize_some(&template.name),
        None => serializer.serialize_none(),
    }
}
