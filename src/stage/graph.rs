//! # Stage Graph
//!
//! Arena of rooms keyed by id, plus a position index so grid lookups are O(1).
//!
//! Every connection is stored twice, once on each side, and is only created
//! between rooms that really are grid neighbours in the requested direction.

use crate::{DelveError, DelveResult, Direction, Position, Room, RoomData, RoomId};
use log::debug;
use pathfinding::prelude::bfs_reach;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// The full room graph of one level.
///
/// # Examples
///
/// ```
/// use delve::{Direction, Position, Stage};
///
/// let mut stage = Stage::new();
/// let a = stage.add_room(None, Position::new(0, 0));
/// let b = stage.add_room(None, Position::new(0, -1));
///
/// assert!(stage.connect_in_direction(a, Direction::North));
/// assert_eq!(stage.room(b).unwrap().connection(Direction::South), Some(a));
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stage {
    rooms: BTreeMap<RoomId, Room>,
    #[serde(skip)]
    occupied: HashMap<Position, RoomId>,
    next_room_id: RoomId,
    start_room: Option<RoomId>,
    boss_room: Option<RoomId>,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new room and returns its id.
    ///
    /// Ids are handed out sequentially from 0. If the cell is already taken the
    /// room is still added, but [`Stage::room_at`] keeps answering with the
    /// first occupant.
    pub fn add_room(&mut self, template: Option<Arc<RoomData>>, position: Position) -> RoomId {
        let id = self.next_room_id;
        self.next_room_id += 1;

        self.occupied.entry(position).or_insert(id);
        self.rooms.insert(id, Room::new(id, position, template));
        id
    }

    /// Connects `room_id` to whatever room sits one step in `direction`.
    ///
    /// Returns false when the room does not exist, nothing occupies the target
    /// cell, or either side already has a door on that edge.
    pub fn connect_in_direction(&mut self, room_id: RoomId, direction: Direction) -> bool {
        let Some(room) = self.rooms.get(&room_id) else {
            return false;
        };
        if room.is_connected(direction) {
            return false;
        }

        let target = room.position.step(direction);
        let Some(&neighbor_id) = self.occupied.get(&target) else {
            return false;
        };
        if neighbor_id == room_id {
            return false;
        }

        let opposite = direction.opposite();
        match self.rooms.get(&neighbor_id) {
            Some(neighbor) if !neighbor.is_connected(opposite) => {}
            _ => return false,
        }

        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.connections.insert(direction, neighbor_id);
        }
        if let Some(neighbor) = self.rooms.get_mut(&neighbor_id) {
            neighbor.connections.insert(opposite, room_id);
        }

        debug!("Connected room {} {:?} to room {}", room_id, direction, neighbor_id);
        true
    }

    /// Connects two rooms, deriving the direction from their grid positions.
    ///
    /// Returns false if the rooms are not grid-adjacent or the edge is taken.
    pub fn connect_rooms(&mut self, a: RoomId, b: RoomId) -> bool {
        let (Some(room_a), Some(room_b)) = (self.rooms.get(&a), self.rooms.get(&b)) else {
            return false;
        };
        let Some(direction) = Direction::from_delta(room_b.position - room_a.position) else {
            return false;
        };
        if self.occupied.get(&room_b.position) != Some(&b) {
            return false;
        }
        self.connect_in_direction(a, direction)
    }

    /// Swaps the template of a room, leaving everything else untouched.
    ///
    /// Returns false if the room does not exist.
    pub fn replace_template(&mut self, room_id: RoomId, template: Arc<RoomData>) -> bool {
        match self.rooms.get_mut(&room_id) {
            Some(room) => {
                room.template = Some(template);
                true
            }
            None => false,
        }
    }

    /// Sets the cleared flag on a room.
    pub fn mark_cleared(&mut self, room_id: RoomId) -> bool {
        match self.rooms.get_mut(&room_id) {
            Some(room) => {
                room.is_cleared = true;
                true
            }
            None => false,
        }
    }

    /// Number of rooms whose encounter is finished.
    pub fn cleared_count(&self) -> usize {
        self.rooms.values().filter(|room| room.is_cleared).count()
    }

    /// Gets a room by id.
    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    /// Gets the room occupying a grid cell.
    pub fn room_at(&self, position: Position) -> Option<&Room> {
        self.occupied
            .get(&position)
            .and_then(|id| self.rooms.get(id))
    }

    /// Checks whether a grid cell is taken.
    pub fn is_occupied(&self, position: Position) -> bool {
        self.occupied.contains_key(&position)
    }

    /// Iterates rooms in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// True when the stage has no rooms.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// The id the next added room will receive.
    pub fn next_room_id(&self) -> RoomId {
        self.next_room_id
    }

    /// The room the player enters the stage through.
    pub fn start_room(&self) -> Option<RoomId> {
        self.start_room
    }

    /// The room holding the stage boss.
    pub fn boss_room(&self) -> Option<RoomId> {
        self.boss_room
    }

    /// Marks an existing room as the start room.
    pub fn set_start_room(&mut self, room_id: RoomId) -> bool {
        if self.rooms.contains_key(&room_id) {
            self.start_room = Some(room_id);
            true
        } else {
            false
        }
    }

    /// Marks an existing room as the boss room.
    pub fn set_boss_room(&mut self, room_id: RoomId) -> bool {
        if self.rooms.contains_key(&room_id) {
            self.boss_room = Some(room_id);
            true
        } else {
            false
        }
    }

    /// All undirected edges as `(lower id, direction from it, higher id)`.
    pub fn edges(&self) -> Vec<(RoomId, Direction, RoomId)> {
        self.rooms
            .values()
            .flat_map(|room| {
                room.connections()
                    .filter(move |&(_, neighbor)| room.id < neighbor)
                    .map(move |(direction, neighbor)| (room.id, direction, neighbor))
            })
            .collect()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.rooms.values().map(Room::degree).sum::<usize>() / 2
    }

    /// Breadth-first visit order from `origin`, with hop distances.
    ///
    /// Neighbours are expanded in North, South, East, West order.
    pub fn bfs_order(&self, origin: RoomId) -> Vec<(RoomId, u32)> {
        let mut order = Vec::new();
        if !self.rooms.contains_key(&origin) {
            return order;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(origin);
        queue.push_back((origin, 0));

        while let Some((id, distance)) = queue.pop_front() {
            order.push((id, distance));
            if let Some(room) = self.rooms.get(&id) {
                for (_, neighbor) in room.connections() {
                    if visited.insert(neighbor) {
                        queue.push_back((neighbor, distance + 1));
                    }
                }
            }
        }

        order
    }

    /// Hop distance from `origin` to every reachable room.
    pub fn distances_from(&self, origin: RoomId) -> HashMap<RoomId, u32> {
        self.bfs_order(origin).into_iter().collect()
    }

    /// The reachable room farthest from `origin`.
    ///
    /// Ties go to the room the breadth-first search reaches first.
    pub fn farthest_from(&self, origin: RoomId) -> Option<(RoomId, u32)> {
        self.bfs_order(origin)
            .into_iter()
            .fold(None, |best, (id, distance)| match best {
                Some((_, best_distance)) if best_distance >= distance => best,
                _ => Some((id, distance)),
            })
    }

    /// Checks that every room is reachable from the lowest-id room.
    pub fn is_connected(&self) -> bool {
        let Some(&first) = self.rooms.keys().next() else {
            return true;
        };
        let reachable = bfs_reach(first, |id| {
            self.rooms
                .get(id)
                .map(|room| room.connections().map(|(_, n)| n).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .count();
        reachable == self.rooms.len()
    }

    /// Draws the grid graph as text.
    ///
    /// `S` marks the start room, `B` the boss room, `#` every other room;
    /// `-` and `|` are connections.
    pub fn to_ascii(&self) -> String {
        let Some(first) = self.rooms.values().next() else {
            return String::new();
        };
        let (mut min, mut max) = (first.position, first.position);
        for room in self.rooms.values() {
            min = Position::new(min.x.min(room.position.x), min.y.min(room.position.y));
            max = Position::new(max.x.max(room.position.x), max.y.max(room.position.y));
        }

        let width = ((max.x - min.x) * 2 + 1) as usize;
        let height = ((max.y - min.y) * 2 + 1) as usize;
        let mut canvas = vec![vec![' '; width]; height];

        for room in self.rooms.values() {
            let col = ((room.position.x - min.x) * 2) as usize;
            let row = ((room.position.y - min.y) * 2) as usize;
            canvas[row][col] = if Some(room.id) == self.start_room {
                'S'
            } else if Some(room.id) == self.boss_room {
                'B'
            } else {
                '#'
            };

            for (direction, _) in room.connections() {
                match direction {
                    Direction::East => canvas[row][col + 1] = '-',
                    Direction::South => canvas[row + 1][col] = '|',
                    Direction::North | Direction::West => {}
                }
            }
        }

        canvas
            .into_iter()
            .map(|line| line.into_iter().collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Verifies the structural invariants of the graph.
    ///
    /// Every connection must be mirrored by its neighbour, point at the grid
    /// cell one step away, and no two rooms may share a cell.
    pub fn validate(&self) -> DelveResult<()> {
        let mut seen = HashSet::new();
        for room in self.rooms.values() {
            if !seen.insert(room.position) {
                return Err(DelveError::InvalidState(format!(
                    "Room {} shares cell {} with another room",
                    room.id, room.position
                )));
            }

            for (direction, neighbor_id) in room.connections() {
                let neighbor = self.rooms.get(&neighbor_id).ok_or_else(|| {
                    DelveError::InvalidState(format!(
                        "Room {} connects to missing room {}",
                        room.id, neighbor_id
                    ))
                })?;

                if neighbor.connection(direction.opposite()) != Some(room.id) {
                    return Err(DelveError::InvalidState(format!(
                        "Connection {} {:?} -> {} is not mirrored",
                        room.id, direction, neighbor_id
                    )));
                }

                if neighbor.position != room.position.step(direction) {
                    return Err(DelveError::InvalidState(format!(
                        "Rooms {} and {} are connected {:?} but not adjacent",
                        room.id, neighbor_id, direction
                    )));
                }
            }
        }
        Ok(())
    }
}
