//! # Delve
//!
//! Procedural dungeon stages built as a graph of rooms on an integer grid.
//!
//! ## Architecture Overview
//!
//! The crate is split along the path a level takes from nothing to world geometry:
//!
//! - **Stage**: the room graph itself, an arena of rooms keyed by stable ids
//! - **Content**: room templates, the run-length encoded persistence format,
//!   and the template repository the generator draws from
//! - **Generation**: places rooms, builds a spanning tree, picks the boss room,
//!   adds extra loops, and assigns templates
//! - **Instantiation**: turns a finished stage into tile placements, spawned
//!   objects, and corridors between connected rooms
//!
//! Rendering, asset loading, and gameplay spawning live outside this crate and
//! are reached through the [`TemplateRepository`] and [`ContentResolver`] traits.

pub mod content;
pub mod generation;
pub mod instantiation;
pub mod stage;

pub use content::*;
pub use generation::*;
pub use instantiation::*;
pub use stage::*;

/// Core error type for the Delve stage pipeline.
#[derive(thiserror::Error, Debug)]
pub enum DelveError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A run-length record cannot be expanded
    #[error("Invalid tile run {index}: {reason}")]
    InvalidRun { index: usize, reason: String },

    /// A tile references an address that is not in the address table
    #[error("Address index {index} out of range (table has {len} entries)")]
    AddressOutOfRange { index: i32, len: usize },

    /// Serialized data was written by a newer format version
    #[error("Unsupported room data version: {0}")]
    UnsupportedVersion(u32),

    /// Configuration values are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stage or layout state is inconsistent
    #[error("Invalid stage state: {0}")]
    InvalidState(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Result type used throughout the Delve codebase.
pub type DelveResult<T> = Result<T, DelveError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stage layout constants.
pub mod config {
    /// World-space distance between the centers of grid-adjacent rooms
    pub const ROOM_SPACING: i32 = 32;

    /// Width of a carved corridor in tiles
    pub const ROOM_CORRIDOR_SIZE: i32 = 3;

    /// How far a corridor reaches into each room past its boundary cell
    pub const CORRIDOR_EXTENSION: i32 = 1;

    /// Smallest room footprint along either axis
    pub const MIN_ROOM_SIZE: i32 = 6;

    /// Largest room footprint along either axis
    pub const MAX_ROOM_SIZE: i32 = 24;
}
