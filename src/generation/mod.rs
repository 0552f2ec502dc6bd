//! # Generation Module
//!
//! Procedural construction of stage graphs.
//!
//! Generation is split in two halves. The layout half is synchronous and pure:
//! it places rooms on the grid, links them with a spanning tree, picks the boss
//! room and sprinkles extra loops, all driven by one seeded RNG. The content
//! half awaits a [`crate::TemplateRepository`] for every room's template.

pub mod stage;

pub use stage::*;

use crate::config;
use crate::{DelveError, DelveResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

/// Configuration for stage generation and instantiation.
///
/// Serializable so it can be shipped as a JSON file next to the templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Number of rooms to place
    pub room_count: usize,
    /// Minimum room footprint along either axis
    pub min_room_size: i32,
    /// Maximum room footprint along either axis
    pub max_room_size: i32,
    /// World distance between centers of grid-adjacent rooms
    pub room_spacing: i32,
    /// Corridor width in tiles
    pub corridor_size: i32,
    /// How far corridors reach into each room
    pub corridor_extension: i32,
    /// Extra-edge chance lost per hop of distance from the start room
    pub extra_edge_falloff: f64,
    /// Extra-edge chance floor
    pub extra_edge_min_chance: f64,
    /// Optional bound on |x| and |y| of grid cells
    pub grid_extent: Option<i32>,
}

impl StageConfig {
    /// Creates the default configuration with a given seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::StageConfig;
    ///
    /// let config = StageConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.room_spacing > config.max_room_size);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            room_count: 10,
            min_room_size: config::MIN_ROOM_SIZE,
            max_room_size: config::MAX_ROOM_SIZE,
            room_spacing: config::ROOM_SPACING,
            corridor_size: config::ROOM_CORRIDOR_SIZE,
            corridor_extension: config::CORRIDOR_EXTENSION,
            extra_edge_falloff: 0.5,
            extra_edge_min_chance: 0.1,
            grid_extent: None,
        }
    }

    /// Creates a configuration for testing with small stages.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            room_count: 5,
            ..Self::new(seed)
        }
    }

    /// Loads a configuration from a JSON file; missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> DelveResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values can produce a sensible stage.
    pub fn validate(&self) -> DelveResult<()> {
        if self.room_count == 0 {
            return Err(DelveError::InvalidConfig("room_count must be at least 1".to_string()));
        }
        if self.min_room_size < 1 || self.min_room_size > self.max_room_size {
            return Err(DelveError::InvalidConfig(format!(
                "room size range {}..={} is empty",
                self.min_room_size, self.max_room_size
            )));
        }
        if self.room_spacing <= self.max_room_size {
            return Err(DelveError::InvalidConfig(format!(
                "room_spacing {} must exceed max_room_size {}",
                self.room_spacing, self.max_room_size
            )));
        }
        if self.corridor_size < 1 || self.corridor_extension < 0 {
            return Err(DelveError::InvalidConfig(
                "corridor_size must be positive and corridor_extension non-negative".to_string(),
            ));
        }
        if self.extra_edge_falloff.is_nan()
            || self.extra_edge_falloff < 0.0
            || !(0.0..=1.0).contains(&self.extra_edge_min_chance)
        {
            return Err(DelveError::InvalidConfig(
                "extra edge chances must lie in [0, 1]".to_string(),
            ));
        }
        if self.grid_extent.is_some_and(|extent| extent < 0) {
            return Err(DelveError::InvalidConfig("grid_extent must be non-negative".to_string()));
        }
        Ok(())
    }

    /// Allowed room footprint along either axis.
    pub fn room_sizes(&self) -> RangeInclusive<i32> {
        self.min_room_size..=self.max_room_size
    }

    /// Chance of adding an extra edge from a room `distance` hops from the start.
    pub fn extra_edge_chance(&self, distance: u32) -> f64 {
        (1.0 - distance as f64 * self.extra_edge_falloff)
            .max(self.extra_edge_min_chance)
            .clamp(0.0, 1.0)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// What happened during one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Rooms asked for
    pub requested_rooms: usize,
    /// Rooms actually placed
    pub placed_rooms: usize,
    /// Edges created by the spanning tree
    pub tree_edges: usize,
    /// Edges added on top of the tree
    pub extra_edges: usize,
    /// Template requests that came back empty
    pub missing_templates: usize,
    /// Hops from the start room to the boss room
    pub boss_distance: u32,
}

impl GenerationReport {
    /// True when fewer rooms were placed than requested.
    pub fn placement_exhausted(&self) -> bool {
        self.placed_rooms < self.requested_rooms
    }

    /// True when the spanning tree failed to reach every placed room.
    pub fn tree_shortfall(&self) -> bool {
        self.placed_rooms > 0 && self.tree_edges + 1 < self.placed_rooms
    }
}

/// Trait for procedural generators.
///
/// Generators take the configuration and an injected RNG so identical seeds
/// give identical output.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &StageConfig, rng: &mut StdRng) -> DelveResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &StageConfig) -> DelveResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Creates a seeded random number generator from the config.
pub fn create_rng(config: &StageConfig) -> StdRng {
    StdRng::seed_from_u64(config.seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_stage_config_creation() {
        let config = StageConfig::new(12345);
        assert_eq!(config.seed, 12345);
        assert_eq!(config.room_spacing, config::ROOM_SPACING);
        assert_eq!(config.corridor_size, config::ROOM_CORRIDOR_SIZE);
        assert!(config.validate().is_ok());
        assert!(StageConfig::for_testing(1).validate().is_ok());
    }

    #[test]
    fn test_config_validation_failures() {
        let mut config = StageConfig::new(1);
        config.room_count = 0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::new(1);
        config.room_spacing = config.max_room_size;
        assert!(config.validate().is_err());

        let mut config = StageConfig::new(1);
        config.min_room_size = 30;
        assert!(config.validate().is_err());

        let mut config = StageConfig::new(1);
        config.grid_extent = Some(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extra_edge_chance() {
        let config = StageConfig::new(1);
        assert_eq!(config.extra_edge_chance(0), 1.0);
        assert_eq!(config.extra_edge_chance(1), 0.5);
        assert_eq!(config.extra_edge_chance(2), 0.1);
        assert_eq!(config.extra_edge_chance(10), 0.1);
    }

    #[test]
    fn test_config_json_defaults() {
        let config: StageConfig = serde_json::from_str(r#"{"seed": 9, "room_count": 3}"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.room_count, 3);
        assert_eq!(config.max_room_size, config::MAX_ROOM_SIZE);
        assert_eq!(config.grid_extent, None);
    }

    #[test]
    fn test_create_rng_is_deterministic() {
        let config = StageConfig::new(555);
        let a: u64 = create_rng(&config).gen();
        let b: u64 = create_rng(&config).gen();
        assert_eq!(a, b);
    }

    #[test]
    fn test_report_flags() {
        let report = GenerationReport {
            requested_rooms: 5,
            placed_rooms: 3,
            tree_edges: 1,
            ..Default::default()
        };
        assert!(report.placement_exhausted());
        assert!(report.tree_shortfall());
    }
}
