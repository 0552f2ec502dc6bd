//! # Serialized Room Data
//!
//! The on-disk twin of [`RoomData`], with tiles stored as run-length records.

use crate::config::{MAX_ROOM_SIZE, MIN_ROOM_SIZE};
use crate::{compress, decompress, DelveError, DelveResult, ObjectRecord, RoomData, RunRecord};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Current on-disk format version.
pub const ROOM_DATA_VERSION: u32 = 1;

fn default_version() -> u32 {
    ROOM_DATA_VERSION
}

/// Persistence form of a room template.
///
/// Converting to and from [`RoomData`] is lossless up to tile ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRoomData {
    /// Format version, files without one are treated as the current version
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub size_x: i32,
    pub size_y: i32,
    pub asset_addresses: Vec<String>,
    pub tiles_rle: Vec<RunRecord>,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
}

impl SerializedRoomData {
    /// Compresses a room for storage.
    pub fn from_room_data(room: &RoomData) -> Self {
        Self {
            version: ROOM_DATA_VERSION,
            name: room.name.clone(),
            size_x: room.size_x,
            size_y: room.size_y,
            asset_addresses: room.asset_addresses.clone(),
            tiles_rle: compress(&room.tiles),
            objects: room.objects.clone(),
        }
    }

    /// Expands the stored runs back into a room, clamping its footprint to the
    /// default size range.
    ///
    /// Fails on a newer format version, a run with a non-positive length or
    /// one wider than the room, or a run whose address index is outside the
    /// address table.
    pub fn to_room_data(&self) -> DelveResult<RoomData> {
        self.to_room_data_with_sizes(MIN_ROOM_SIZE..=MAX_ROOM_SIZE)
    }

    /// Like [`SerializedRoomData::to_room_data`], clamping to `sizes` instead.
    pub fn to_room_data_with_sizes(&self, sizes: RangeInclusive<i32>) -> DelveResult<RoomData> {
        if self.version > ROOM_DATA_VERSION {
            return Err(DelveError::UnsupportedVersion(self.version));
        }

        let len = self.asset_addresses.len();
        for run in &self.tiles_rle {
            let in_range = usize::try_from(run.address_index).is_ok_and(|index| index < len);
            if !in_range {
                return Err(DelveError::AddressOutOfRange {
                    index: run.address_index,
                    len,
                });
            }
        }

        let mut room = RoomData {
            name: self.name.clone(),
            size_x: self.size_x,
            size_y: self.size_y,
            asset_addresses: self.asset_addresses.clone(),
            tiles: Vec::new(),
            objects: self.objects.clone(),
        };
        room.clamp_size(*sizes.start(), *sizes.end());

        // Runs are horizontal, so none can be wider than the room itself
        if let Some((index, run)) = self
            .tiles_rle
            .iter()
            .enumerate()
            .find(|(_, run)| run.length > room.size_x)
        {
            return Err(DelveError::InvalidRun {
                index,
                reason: format!("length {} exceeds room width {}", run.length, room.size_x),
            });
        }

        room.tiles = decompress(&self.tiles_rle)?;
        Ok(room)
    }

    /// Parses a serialized room from JSON.
    pub fn from_json(json: &str) -> DelveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the serialized room as pretty JSON.
    pub fn to_json(&self) -> DelveResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&RoomData> for SerializedRoomData {
    fn from(room: &RoomData) -> Self {
        Self::from_room_data(room)
    }
}

impl TryFrom<&SerializedRoomData> for RoomData {
    type Error = DelveError;

    fn try_from(serialized: &SerializedRoomData) -> DelveResult<Self> {
        serialized.to_room_data()
    }
}
