//! # Stage Instantiation
//!
//! Lays a finished stage out in world space.
//!
//! Rooms are placed first, each centered on its grid cell scaled by the room
//! spacing. Corridors are carved only after every room is down, since both
//! ends of a corridor depend on the resolved footprint of the rooms it joins.

use crate::{
    carve_corridor, ContentResolver, DelveError, DelveResult, FloatPosition, ObjectKind,
    Position, Room, RoomBounds, RoomId, SpawnedObject, Stage, StageConfig, TileHandle,
    WorldLayout,
};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Converts stage graphs into [`WorldLayout`]s.
#[derive(Debug, Clone)]
pub struct StageInstantiator {
    /// World distance between centers of grid-adjacent rooms
    pub room_spacing: i32,
    /// Corridor width in tiles
    pub corridor_size: i32,
    /// How far corridors reach into each room
    pub corridor_extension: i32,
    /// Smallest footprint a placed room may have
    pub min_room_size: i32,
    /// Largest footprint a placed room may have
    pub max_room_size: i32,
    /// Footprint used for rooms that never received a template
    pub fallback_room_size: i32,
}

impl StageInstantiator {
    /// Creates an instantiator using the layout values of `config`.
    pub fn new(config: &StageConfig) -> Self {
        Self {
            room_spacing: config.room_spacing,
            corridor_size: config.corridor_size,
            corridor_extension: config.corridor_extension,
            min_room_size: config.min_room_size,
            max_room_size: config.max_room_size,
            fallback_room_size: config.min_room_size,
        }
    }

    /// World cell a grid cell's room is centered on.
    pub fn world_center(&self, grid: Position) -> Position {
        grid.scale(self.room_spacing)
    }

    /// Places every room, then carves one corridor per connection.
    ///
    /// Fails only if the resolver has no ground tile. Unresolvable tiles and
    /// objects are skipped and counted in the layout's report.
    pub async fn instantiate<C: ContentResolver>(
        &self,
        stage: &Stage,
        resolver: &C,
    ) -> DelveResult<WorldLayout> {
        let ground = resolver.ground_tile().await.ok_or_else(|| {
            DelveError::InvalidState("content resolver has no ground tile".to_string())
        })?;

        let mut layout = WorldLayout::default();
        let mut tile_cache = HashMap::new();

        for room in stage.rooms() {
            self.place_room(room, &ground, resolver, &mut tile_cache, &mut layout)
                .await;
        }

        if layout.player_spawn.is_none() {
            if let Some(bounds) = stage
                .start_room()
                .and_then(|id| layout.room_bounds.get(&id))
            {
                layout.player_spawn = Some(FloatPosition::from(bounds.center));
            }
        }

        self.carve_corridors(stage, &ground, &mut layout)?;

        info!(
            "Instantiated {} rooms, {} corridors, {} objects",
            layout.report.rooms_placed,
            layout.corridors.len(),
            layout.objects.len()
        );
        Ok(layout)
    }

    async fn place_room<C: ContentResolver>(
        &self,
        room: &Room,
        ground: &TileHandle,
        resolver: &C,
        tile_cache: &mut HashMap<String, Option<TileHandle>>,
        layout: &mut WorldLayout,
    ) {
        let center = self.world_center(room.position);
        let template = room.template.as_deref();

        let bounds = match template {
            Some(template) => RoomBounds::new(
                center,
                self.clamp_size(template.size_x),
                self.clamp_size(template.size_y),
            ),
            None => {
                warn!("Room {} has no template, placing a bare floor", room.id);
                layout.report.rooms_without_template += 1;
                RoomBounds::new(center, self.fallback_room_size, self.fallback_room_size)
            }
        };

        for cell in bounds.cells() {
            layout.ground.insert(cell, ground.clone());
        }
        layout.room_bounds.insert(room.id, bounds);
        layout.report.rooms_placed += 1;

        let Some(template) = template else {
            return;
        };

        for tile in &template.tiles {
            let Some(address) = template.address(tile.address_index) else {
                layout.report.unresolved_tiles += 1;
                continue;
            };

            let handle = match tile_cache.get(address) {
                Some(handle) => handle.clone(),
                None => {
                    let handle = resolver.resolve_tile(address).await;
                    if handle.is_none() {
                        warn!("Tile address '{}' could not be resolved", address);
                    }
                    tile_cache.insert(address.to_string(), handle.clone());
                    handle
                }
            };

            match handle {
                Some(handle) => {
                    layout
                        .tilemaps
                        .entry(tile.layer)
                        .or_default()
                        .insert(center + tile.position, handle);
                }
                None => layout.report.unresolved_tiles += 1,
            }
        }

        for object in &template.objects {
            let Some(kind) = resolver.resolve_object(object.table_id).await else {
                warn!("Object table id {} could not be resolved", object.table_id);
                layout.report.unresolved_objects += 1;
                continue;
            };

            let spawned = SpawnedObject {
                room_id: room.id,
                table_id: object.table_id,
                kind,
                position: FloatPosition::from(center) + object.position,
                rotation: object.rotation,
            };

            if let Err(e) = resolver.spawn(&spawned).await {
                warn!("Failed to spawn object {}: {}", object.table_id, e);
                layout.report.failed_spawns += 1;
                continue;
            }

            if spawned.kind == ObjectKind::PlayerSpawn && layout.player_spawn.is_none() {
                layout.player_spawn = Some(spawned.position);
            }
            layout.objects.push(spawned);
        }

        debug!("Placed room {} at {}", room.id, center);
    }

    fn carve_corridors(
        &self,
        stage: &Stage,
        ground: &TileHandle,
        layout: &mut WorldLayout,
    ) -> DelveResult<()> {
        let mut processed: HashSet<(RoomId, RoomId)> = HashSet::new();

        for room in stage.rooms() {
            for (direction, neighbor) in room.connections() {
                if !processed.insert((room.id.min(neighbor), room.id.max(neighbor))) {
                    continue;
                }

                let from = self.placed_bounds(layout, room.id)?;
                let to = self.placed_bounds(layout, neighbor)?;
                let corridor = carve_corridor(
                    (room.id, &from),
                    (neighbor, &to),
                    direction,
                    self.corridor_size,
                    self.corridor_extension,
                );

                for cell in &corridor.cells {
                    layout.ground.insert(*cell, ground.clone());
                }
                layout.corridors.push(corridor);
            }
        }
        Ok(())
    }

    fn clamp_size(&self, size: i32) -> i32 {
        size.clamp(self.min_room_size, self.max_room_size.max(self.min_room_size))
    }

    fn placed_bounds(&self, layout: &WorldLayout, room_id: RoomId) -> DelveResult<RoomBounds> {
        layout.room_bounds.get(&room_id).copied().ok_or_else(|| {
            DelveError::InvalidState(format!("Room {} was not placed before carving", room_id))
        })
    }
}

impl Default for StageInstantiator {
    fn default() -> Self {
        Self::new(&StageConfig::default())
    }
}
