//! # Stage Generation
//!
//! Grows a stage graph outward from a root room at the grid origin.
//!
//! The generator works in this order:
//! 1. Places rooms one at a time on random free cells next to existing rooms
//! 2. Links every room to the root with a randomized breadth-first spanning tree
//! 3. Picks the room farthest from the root as the boss room
//! 4. Adds extra edges between neighbours, likelier close to the start
//! 5. Assigns a Normal template to every room
//! 6. Overwrites the root and boss templates with Start and Boss templates
//!
//! Steps 1-4 fix the topology and never touch the template repository.

use crate::{
    DelveError, DelveResult, Direction, GenerationReport, Generator, Position, RoomCategory,
    RoomId, Stage, StageConfig, TemplateRepository,
};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

/// Builds stage graphs on an unbounded (or optionally bounded) integer grid.
#[derive(Debug, Clone, Default)]
pub struct StageGenerator {
    /// Generation parameters
    pub config: StageConfig,
}

impl StageGenerator {
    /// Creates a generator with the given configuration.
    pub fn new(config: StageConfig) -> Self {
        Self { config }
    }

    /// Generates a stage with templates assigned.
    ///
    /// # Examples
    ///
    /// ```
    /// use delve::{create_rng, RoomCategory, RoomData, StageConfig, StageGenerator, TemplateLibrary};
    ///
    /// let library = TemplateLibrary::new()
    ///     .with_template(RoomCategory::Start, RoomData::new("entrance", 8, 8))
    ///     .with_template(RoomCategory::Normal, RoomData::new("hall", 10, 10))
    ///     .with_template(RoomCategory::Boss, RoomData::new("lair", 16, 16));
    ///
    /// let config = StageConfig::for_testing(3);
    /// let generator = StageGenerator::new(config.clone());
    /// let mut rng = create_rng(&config);
    ///
    /// let stage = tokio_test::block_on(generator.generate_stage(5, &library, &mut rng)).unwrap();
    /// assert_eq!(stage.len(), 5);
    /// assert!(stage.is_connected());
    /// ```
    pub async fn generate_stage<R: TemplateRepository>(
        &self,
        room_count: usize,
        repository: &R,
        rng: &mut StdRng,
    ) -> DelveResult<Stage> {
        let (stage, _) = self
            .generate_stage_with_report(room_count, repository, rng)
            .await?;
        Ok(stage)
    }

    /// Generates a stage and reports what was recovered from along the way.
    pub async fn generate_stage_with_report<R: TemplateRepository>(
        &self,
        room_count: usize,
        repository: &R,
        rng: &mut StdRng,
    ) -> DelveResult<(Stage, GenerationReport)> {
        let (mut stage, mut report) = self.build_layout(room_count, rng)?;

        report.missing_templates += self.assign_room_data(&mut stage, repository, rng).await;
        report.missing_templates += self.set_start_and_boss_rooms(&mut stage, repository, rng).await;

        info!(
            "Generated stage: {} rooms, {} tree edges, {} extra edges, boss {} hops away",
            report.placed_rooms, report.tree_edges, report.extra_edges, report.boss_distance
        );
        Ok((stage, report))
    }

    /// Builds the stage topology without any templates.
    ///
    /// Fails with [`DelveError::InvalidConfig`] when the generator's config
    /// does not validate or `room_count` is zero.
    pub fn build_layout(
        &self,
        room_count: usize,
        rng: &mut StdRng,
    ) -> DelveResult<(Stage, GenerationReport)> {
        self.config.validate()?;
        if room_count == 0 {
            return Err(DelveError::InvalidConfig(
                "cannot generate a stage with zero rooms".to_string(),
            ));
        }

        let mut report = GenerationReport {
            requested_rooms: room_count,
            ..Default::default()
        };

        let (mut stage, root) = self.place_rooms_on_grid(room_count, rng);
        report.placed_rooms = stage.len();

        report.tree_edges = self.build_spanning_tree(&mut stage, root, rng);

        let (boss, boss_distance) = self.designate_boss_room(&mut stage, root);
        report.boss_distance = boss_distance;
        debug!("Boss room is {} at distance {}", boss, boss_distance);

        report.extra_edges = self.add_random_edges(&mut stage, root, rng);

        Ok((stage, report))
    }

    /// Grows rooms outward from the origin until `room_count` exist.
    ///
    /// Each new room goes on a uniformly chosen (room, free direction) pair
    /// across all placed rooms. Stops early, with a warning, when no free
    /// cell is left inside the grid bounds.
    fn place_rooms_on_grid(&self, room_count: usize, rng: &mut StdRng) -> (Stage, RoomId) {
        let mut stage = Stage::new();
        let root = stage.add_room(None, Position::origin());
        stage.set_start_room(root);

        while stage.len() < room_count {
            let candidates: Vec<Position> = stage
                .rooms()
                .flat_map(|room| Direction::ALL.map(|direction| room.position.step(direction)))
                .filter(|&cell| !stage.is_occupied(cell) && self.within_grid(cell))
                .collect();

            if candidates.is_empty() {
                warn!(
                    "Frontier exhausted after {} of {} rooms",
                    stage.len(),
                    room_count
                );
                break;
            }

            let cell = candidates[rng.gen_range(0..candidates.len())];
            stage.add_room(None, cell);
        }

        debug!("Placed {} rooms", stage.len());
        (stage, root)
    }

    fn within_grid(&self, cell: Position) -> bool {
        match self.config.grid_extent {
            Some(extent) => cell.x.abs() <= extent && cell.y.abs() <= extent,
            None => true,
        }
    }

    /// Connects every placed room to the root with a breadth-first tree.
    ///
    /// Directions are shuffled per room, so the tree shape varies with the
    /// seed. Returns the number of tree edges.
    fn build_spanning_tree(&self, stage: &mut Stage, root: RoomId, rng: &mut StdRng) -> usize {
        let target = stage.len().saturating_sub(1);
        let mut edges = 0;
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);

        'search: while let Some(current) = queue.pop_front() {
            let Some(position) = stage.room(current).map(|room| room.position) else {
                continue;
            };

            let mut directions = Direction::ALL;
            directions.shuffle(rng);

            for direction in directions {
                if edges >= target {
                    break 'search;
                }

                let Some(neighbor) = stage.room_at(position.step(direction)).map(|room| room.id)
                else {
                    continue;
                };
                if visited.contains(&neighbor) {
                    continue;
                }

                if stage.connect_in_direction(current, direction) {
                    visited.insert(neighbor);
                    queue.push_back(neighbor);
                    edges += 1;
                }
            }
        }

        if edges < target {
            error!(
                "Spanning tree reached only {} of {} edges; stage is disconnected",
                edges, target
            );
        }
        edges
    }

    /// Marks the room farthest from the root as the boss room.
    fn designate_boss_room(&self, stage: &mut Stage, root: RoomId) -> (RoomId, u32) {
        let (boss, distance) = stage.farthest_from(root).unwrap_or((root, 0));
        stage.set_boss_room(boss);
        (boss, distance)
    }

    /// Adds loops between grid neighbours, keeping the boss room a dead end.
    ///
    /// Returns the number of edges added.
    fn add_random_edges(&self, stage: &mut Stage, root: RoomId, rng: &mut StdRng) -> usize {
        let distances = stage.distances_from(root);
        let boss = stage.boss_room();
        let room_ids: Vec<RoomId> = stage.rooms().map(|room| room.id).collect();
        let mut added = 0;

        for id in room_ids {
            if Some(id) == boss {
                continue;
            }
            let Some(position) = stage.room(id).map(|room| room.position) else {
                continue;
            };
            let distance = distances.get(&id).copied().unwrap_or(u32::MAX);
            let chance = self.config.extra_edge_chance(distance);

            for direction in Direction::ALL {
                if stage.room(id).is_some_and(|room| room.is_connected(direction)) {
                    continue;
                }
                let Some(neighbor) = stage.room_at(position.step(direction)).map(|room| room.id)
                else {
                    continue;
                };
                if Some(neighbor) == boss {
                    continue;
                }

                if rng.gen_bool(chance) && stage.connect_in_direction(id, direction) {
                    added += 1;
                }
            }
        }

        debug!("Added {} extra edges", added);
        added
    }

    /// Gives every room a Normal template. Returns how many requests came back empty.
    async fn assign_room_data<R: TemplateRepository>(
        &self,
        stage: &mut Stage,
        repository: &R,
        rng: &mut StdRng,
    ) -> usize {
        let room_ids: Vec<RoomId> = stage.rooms().map(|room| room.id).collect();
        let mut missing = 0;

        for id in room_ids {
            if !self.assign_template(stage, id, RoomCategory::Normal, repository, rng).await {
                missing += 1;
            }
        }
        missing
    }

    /// Overwrites the start and boss templates. Returns how many requests came back empty.
    async fn set_start_and_boss_rooms<R: TemplateRepository>(
        &self,
        stage: &mut Stage,
        repository: &R,
        rng: &mut StdRng,
    ) -> usize {
        let mut missing = 0;

        if let Some(start) = stage.start_room() {
            if !self.assign_template(stage, start, RoomCategory::Start, repository, rng).await {
                missing += 1;
            }
        }
        if let Some(boss) = stage.boss_room() {
            if !self.assign_template(stage, boss, RoomCategory::Boss, repository, rng).await {
                missing += 1;
            }
        }
        missing
    }

    async fn assign_template<R: TemplateRepository>(
        &self,
        stage: &mut Stage,
        room_id: RoomId,
        category: RoomCategory,
        repository: &R,
        rng: &mut StdRng,
    ) -> bool {
        match repository.random_template(category, rng).await {
            Some(template) => stage.replace_template(room_id, template),
            None => {
                warn!(
                    "No {:?} template available; room {} keeps its previous template",
                    category, room_id
                );
                false
            }
        }
    }
}

impl Generator<Stage> for StageGenerator {
    fn generate(&self, config: &StageConfig, rng: &mut StdRng) -> DelveResult<Stage> {
        config.validate()?;
        let generator = StageGenerator::new(config.clone());
        let (stage, _) = generator.build_layout(config.room_count, rng)?;
        Ok(stage)
    }

    fn validate(&self, stage: &Stage, _config: &StageConfig) -> DelveResult<()> {
        stage.validate()?;
        if !stage.is_connected() {
            return Err(DelveError::GenerationFailed(
                "stage has rooms unreachable from the start".to_string(),
            ));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "StageGenerator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_rng, RoomData, TemplateLibrary};
    use rand::SeedableRng;

    fn library() -> TemplateLibrary {
        TemplateLibrary::new()
            .with_template(RoomCategory::Start, RoomData::new("start", 8, 8))
            .with_template(RoomCategory::Normal, RoomData::new("normal_a", 10, 10))
            .with_template(RoomCategory::Normal, RoomData::new("normal_b", 12, 9))
            .with_template(RoomCategory::Boss, RoomData::new("boss", 20, 20))
    }

    #[test]
    fn test_zero_rooms_is_error() {
        let generator = StageGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            generator.build_layout(0, &mut rng),
            Err(DelveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_room_layout() {
        let generator = StageGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);
        let (stage, report) = generator.build_layout(1, &mut rng).unwrap();

        assert_eq!(stage.len(), 1);
        assert_eq!(stage.edge_count(), 0);
        assert_eq!(stage.start_room(), Some(0));
        assert_eq!(stage.boss_room(), Some(0));
        assert_eq!(report.tree_edges, 0);
        assert_eq!(report.boss_distance, 0);
    }

    #[test]
    fn test_layout_is_tree_plus_extras() {
        let generator = StageGenerator::default();
        let mut rng = StdRng::seed_from_u64(2024);
        let (stage, report) = generator.build_layout(12, &mut rng).unwrap();

        assert_eq!(stage.len(), 12);
        assert_eq!(report.tree_edges, 11);
        assert_eq!(stage.edge_count(), report.tree_edges + report.extra_edges);
        assert!(stage.is_connected());
        assert!(stage.validate().is_ok());
        assert_eq!(stage.room(0).unwrap().position, Position::origin());
    }

    #[test]
    fn test_boss_room_is_dead_end() {
        let generator = StageGenerator::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (stage, report) = generator.build_layout(9, &mut rng).unwrap();
            let boss = stage.boss_room().unwrap();

            assert_ne!(boss, 0);
            assert!(report.boss_distance >= 1);
            assert_eq!(stage.room(boss).unwrap().degree(), 1);
        }
    }

    /// Two rows of three rooms joined as a snake, root at the top left:
    ///
    /// ```text
    /// 0 - 1 - 2
    ///         |
    /// 5 - 4 - 3
    /// ```
    fn snake_stage() -> Stage {
        let mut stage = Stage::new();
        for (x, y) in [(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1)] {
            stage.add_room(None, Position::new(x, y));
        }
        stage.connect_in_direction(0, Direction::East);
        stage.connect_in_direction(1, Direction::East);
        stage.connect_in_direction(2, Direction::South);
        stage.connect_in_direction(3, Direction::West);
        stage.connect_in_direction(4, Direction::West);
        stage.set_start_room(0);
        stage
    }

    #[test]
    fn test_extra_edges_follow_distance_falloff() {
        let mut config = StageConfig::new(1);
        config.extra_edge_falloff = 1.0;
        config.extra_edge_min_chance = 0.0;
        let generator = StageGenerator::new(config.clone());

        // Only room 1 (one hop, chance 0) can reach a non-boss neighbour
        let mut stage = snake_stage();
        assert_eq!(generator.designate_boss_room(&mut stage, 0), (5, 5));
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(generator.add_random_edges(&mut stage, 0, &mut rng), 0);

        config.extra_edge_falloff = 0.0;
        let generator = StageGenerator::new(config);
        let mut stage = snake_stage();
        generator.designate_boss_room(&mut stage, 0);
        assert_eq!(generator.add_random_edges(&mut stage, 0, &mut rng), 1);
        assert_eq!(stage.room(1).unwrap().connection(Direction::South), Some(4));

        // The root sits next to the boss room but never links to it
        assert_eq!(stage.room(0).unwrap().connection(Direction::South), None);
        assert_eq!(stage.room(5).unwrap().degree(), 1);
    }

    #[test]
    fn test_root_links_every_non_boss_neighbour() {
        let generator = StageGenerator::default();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (stage, _) = generator.build_layout(15, &mut rng).unwrap();
            let boss = stage.boss_room().unwrap();
            let root = stage.room(0).unwrap();

            for direction in Direction::ALL {
                let Some(neighbor) = stage.room_at(root.position.step(direction)) else {
                    continue;
                };
                if neighbor.id != boss {
                    assert_eq!(root.connection(direction), Some(neighbor.id));
                }
            }
        }
    }

    #[test]
    fn test_layout_rejects_invalid_config() {
        let mut config = StageConfig::new(1);
        config.extra_edge_min_chance = f64::NAN;
        let generator = StageGenerator::new(config);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            generator.build_layout(6, &mut rng),
            Err(DelveError::InvalidConfig(_))
        ));

        let mut config = StageConfig::new(1);
        config.extra_edge_falloff = f64::NAN;
        let generator = StageGenerator::new(config);
        assert!(matches!(
            generator.build_layout(6, &mut rng),
            Err(DelveError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bounded_grid_exhausts_frontier() {
        let mut config = StageConfig::new(5);
        config.grid_extent = Some(1);
        let generator = StageGenerator::new(config);
        let mut rng = StdRng::seed_from_u64(5);

        let (stage, report) = generator.build_layout(20, &mut rng).unwrap();
        assert_eq!(stage.len(), 9);
        assert!(report.placement_exhausted());
        assert!(!report.tree_shortfall());
        assert!(stage.is_connected());
    }

    #[test]
    fn test_layout_is_reproducible() {
        let generator = StageGenerator::default();
        let (a, _) = generator.build_layout(15, &mut StdRng::seed_from_u64(77)).unwrap();
        let (b, _) = generator.build_layout(15, &mut StdRng::seed_from_u64(77)).unwrap();

        let positions = |stage: &Stage| stage.rooms().map(|r| r.position).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.edges(), b.edges());
        assert_eq!(a.boss_room(), b.boss_room());
    }

    #[tokio::test]
    async fn test_templates_assigned() {
        let config = StageConfig::for_testing(11);
        let generator = StageGenerator::new(config.clone());
        let mut rng = create_rng(&config);

        let (stage, report) = generator
            .generate_stage_with_report(6, &library(), &mut rng)
            .await
            .unwrap();

        assert_eq!(report.missing_templates, 0);
        let boss = stage.boss_room().unwrap();
        for room in stage.rooms() {
            let name = room.template_name().unwrap();
            if room.id == 0 {
                assert_eq!(name, "start");
            } else if room.id == boss {
                assert_eq!(name, "boss");
            } else {
                assert!(name.starts_with("normal_"));
            }
        }
    }

    #[tokio::test]
    async fn test_missing_category_is_not_fatal() {
        let library = TemplateLibrary::new()
            .with_template(RoomCategory::Normal, RoomData::new("normal", 10, 10));
        let generator = StageGenerator::default();
        let mut rng = StdRng::seed_from_u64(8);

        let (stage, report) = generator
            .generate_stage_with_report(4, &library, &mut rng)
            .await
            .unwrap();

        assert_eq!(report.missing_templates, 2);
        for room in stage.rooms() {
            assert_eq!(room.template_name(), Some("normal"));
        }
    }

    #[tokio::test]
    async fn test_empty_repository_leaves_templates_unset() {
        let generator = StageGenerator::default();
        let mut rng = StdRng::seed_from_u64(8);

        let (stage, report) = generator
            .generate_stage_with_report(3, &TemplateLibrary::new(), &mut rng)
            .await
            .unwrap();

        assert_eq!(report.missing_templates, 5);
        assert!(stage.rooms().all(|room| room.template.is_none()));
    }

    #[test]
    fn test_generator_trait() {
        let generator = StageGenerator::default();
        let config = StageConfig::for_testing(31);
        let mut rng = create_rng(&config);

        let stage = generator.generate(&config, &mut rng).unwrap();
        assert_eq!(stage.len(), config.room_count);
        assert!(generator.validate(&stage, &config).is_ok());
        assert_eq!(generator.generator_type(), "StageGenerator");
    }
}
