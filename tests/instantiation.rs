//! Integration tests for laying generated stages out in world space.

use delve::{
    DelveResult, Direction, FloatPosition, ObjectKind, Position, RoomCategory, RoomData, Stage,
    StageConfig, StageGenerator, StageInstantiator, StaticContentResolver, TemplateLibrary,
    TileHandle, WorldLayout,
};
use pathfinding::prelude::bfs_reach;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

const SPAWN_ID: i32 = 1;
const TORCH_ID: i32 = 7;

fn floor_room(name: &str, size: i32) -> RoomData {
    let mut room = RoomData::new(name, size, size);
    for y in -(size / 2)..(size - size / 2) {
        for x in -(size / 2)..(size - size / 2) {
            room.add_tile("floor/stone", 0, Position::new(x, y));
        }
    }
    room
}

fn library() -> TemplateLibrary {
    let mut start = floor_room("start", 8);
    start.add_object(SPAWN_ID, FloatPosition::new(0.5, 0.5), 0.0);
    let mut normal = floor_room("normal", 12);
    normal.add_object(TORCH_ID, FloatPosition::new(2.0, -2.0), 90.0);

    TemplateLibrary::new()
        .with_template(RoomCategory::Start, start)
        .with_template(RoomCategory::Normal, normal)
        .with_template(RoomCategory::Normal, floor_room("wide", 20))
        .with_template(RoomCategory::Boss, floor_room("boss", 24))
}

fn resolver() -> StaticContentResolver {
    StaticContentResolver::new(TileHandle::new("ground/dirt"))
        .with_tile("floor/stone", TileHandle::new("tiles/stone"))
        .with_object(SPAWN_ID, ObjectKind::PlayerSpawn)
        .with_object(
            TORCH_ID,
            ObjectKind::Prop {
                prefab: "torch".to_string(),
            },
        )
}

async fn generate_and_place(seed: u64, room_count: usize) -> DelveResult<(Stage, WorldLayout)> {
    let config = StageConfig::new(seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let stage = StageGenerator::new(config.clone())
        .generate_stage(room_count, &library(), &mut rng)
        .await?;
    let layout = StageInstantiator::new(&config)
        .instantiate(&stage, &resolver())
        .await?;
    Ok((stage, layout))
}

fn walkable_from(layout: &WorldLayout, origin: Position) -> HashSet<Position> {
    bfs_reach(origin, |pos| {
        Direction::ALL
            .iter()
            .map(|dir| pos.step(*dir))
            .filter(|next| layout.is_walkable(*next))
            .collect::<Vec<_>>()
    })
    .collect()
}

#[tokio::test]
async fn test_one_corridor_per_connection() -> DelveResult<()> {
    let (stage, layout) = generate_and_place(21, 12).await?;

    assert_eq!(layout.corridors.len(), stage.edge_count());
    for (low, _, high) in stage.edges() {
        assert!(layout.corridor_between(low, high).is_some());
    }
    Ok(())
}

#[tokio::test]
async fn test_corridors_reach_into_both_rooms() -> DelveResult<()> {
    let (_, layout) = generate_and_place(8, 15).await?;

    for corridor in &layout.corridors {
        let from = layout.room_bounds[&corridor.from];
        let to = layout.room_bounds[&corridor.to];
        assert!(from.contains(corridor.start));
        assert!(to.contains(corridor.end));
        assert_eq!(corridor.cells.len() as u32, corridor.length() * 3);
        assert!(corridor.cells.iter().all(|cell| layout.is_walkable(*cell)));
    }
    Ok(())
}

#[tokio::test]
async fn test_every_room_walkable_from_spawn() -> DelveResult<()> {
    let (stage, layout) = generate_and_place(1337, 20).await?;

    let start = layout.room_bounds[&stage.start_room().unwrap()];
    let reachable = walkable_from(&layout, start.center);
    for bounds in layout.room_bounds.values() {
        assert!(reachable.contains(&bounds.center));
    }
    assert_eq!(reachable.len(), layout.ground.len());
    Ok(())
}

#[tokio::test]
async fn test_templates_and_objects_are_placed() -> DelveResult<()> {
    let (stage, layout) = generate_and_place(5, 6).await?;

    let report = &layout.report;
    assert_eq!(report.rooms_placed, 6);
    assert_eq!(report.rooms_without_template, 0);
    assert_eq!(report.unresolved_tiles, 0);
    assert_eq!(report.unresolved_objects, 0);

    let start = layout.room_bounds[&stage.start_room().unwrap()];
    assert_eq!(
        layout.player_spawn,
        Some(FloatPosition::from(start.center) + FloatPosition::new(0.5, 0.5))
    );
    assert_eq!(
        layout.tile(0, start.center),
        Some(&TileHandle::new("tiles/stone"))
    );
    assert!(layout
        .objects
        .iter()
        .any(|object| object.kind == ObjectKind::PlayerSpawn));
    Ok(())
}

#[tokio::test]
async fn test_vertical_pair_layout() -> DelveResult<()> {
    let mut stage = Stage::new();
    let a = stage.add_room(Some(Arc::new(floor_room("a", 10))), Position::new(0, 0));
    let b = stage.add_room(Some(Arc::new(floor_room("b", 10))), Position::new(0, 1));
    assert!(stage.connect_in_direction(a, Direction::South));
    stage.set_start_room(a);
    stage.set_boss_room(b);

    let layout = StageInstantiator::default()
        .instantiate(&stage, &resolver())
        .await?;

    assert_eq!(layout.room_bounds[&b].center, Position::new(0, 32));
    let corridor = layout.corridor_between(a, b).unwrap();
    assert_eq!(corridor.direction, Direction::South);
    assert_eq!(corridor.start, Position::new(0, 3));
    assert_eq!(corridor.end, Position::new(0, 28));
    assert!(corridor.cells.contains(&Position::new(-1, 16)));
    assert!(corridor.cells.contains(&Position::new(1, 16)));
    assert!(!layout.is_walkable(Position::new(2, 16)));

    // No spawn object in either room, so the start room's center is used
    assert_eq!(layout.player_spawn, Some(FloatPosition::new(0.0, 0.0)));
    Ok(())
}
