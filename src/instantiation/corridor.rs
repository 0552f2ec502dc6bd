//! # Corridor Carving
//!
//! Straight corridors between the facing walls of two connected rooms.
//!
//! A corridor starts `extension` cells inside room A's wall on the side facing
//! room B, ends the same distance inside B's opposite wall, and is
//! `corridor_size` cells wide across the direction of travel. Reaching into
//! both rooms keeps the path walkable whatever the two footprints are.

use crate::{Direction, Position, RoomBounds, RoomId};
use serde::{Deserialize, Serialize};

/// A carved passage between two rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corridor {
    /// Room the corridor leaves from
    pub from: RoomId,
    /// Room the corridor arrives at
    pub to: RoomId,
    /// Direction of travel from `from` to `to`
    pub direction: Direction,
    /// Center of the first strip
    pub start: Position,
    /// Center of the last strip
    pub end: Position,
    /// Every carved cell, strip by strip
    pub cells: Vec<Position>,
}

impl Corridor {
    /// Number of strips along the direction of travel.
    pub fn length(&self) -> u32 {
        self.start.manhattan_distance(self.end) + 1
    }
}

/// Carves the corridor from `from` to `to`, which lies in `direction`.
///
/// # Examples
///
/// ```
/// use delve::{carve_corridor, Direction, Position, RoomBounds};
///
/// let a = RoomBounds::new(Position::new(0, 0), 8, 8);
/// let b = RoomBounds::new(Position::new(0, -32), 8, 8);
/// let corridor = carve_corridor((0, &a), (1, &b), Direction::North, 3, 1);
///
/// assert_eq!(corridor.start, Position::new(0, -3));
/// assert_eq!(corridor.end, Position::new(0, -30));
/// assert_eq!(corridor.cells.len() as u32, corridor.length() * 3);
/// ```
pub fn carve_corridor(
    from: (RoomId, &RoomBounds),
    to: (RoomId, &RoomBounds),
    direction: Direction,
    corridor_size: i32,
    extension: i32,
) -> Corridor {
    let (from_id, from_bounds) = from;
    let (to_id, to_bounds) = to;
    let step = direction.to_delta();

    let start = from_bounds.boundary_cell(direction) - step.scale(extension);
    let end = to_bounds.boundary_cell(direction.opposite()) + step.scale(extension);

    let delta = end - start;
    let steps = delta.x.abs().max(delta.y.abs());
    let half = corridor_size / 2;
    let mut cells = Vec::with_capacity(((steps + 1) * corridor_size.max(0)) as usize);

    for i in 0..=steps {
        let center = if steps == 0 {
            start
        } else {
            Position::new(start.x + delta.x * i / steps, start.y + delta.y * i / steps)
        };

        for k in 0..corridor_size {
            let offset = k - half;
            let cell = if direction.is_vertical() {
                Position::new(center.x + offset, center.y)
            } else {
                Position::new(center.x, center.y + offset)
            };
            cells.push(cell);
        }
    }

    Corridor {
        from: from_id,
        to: to_id,
        direction,
        start,
        end,
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_vertical_corridor_is_continuous() {
        let a = RoomBounds::new(Position::new(0, 0), 10, 8);
        let b = RoomBounds::new(Position::new(0, 32), 6, 12);
        let corridor = carve_corridor((0, &a), (1, &b), Direction::South, 3, 1);

        // a spans y -4..=3, b spans y 26..=37
        assert_eq!(corridor.start, Position::new(0, 2));
        assert_eq!(corridor.end, Position::new(0, 27));

        let cells: HashSet<_> = corridor.cells.iter().copied().collect();
        for y in 2..=27 {
            for x in -1..=1 {
                assert!(cells.contains(&Position::new(x, y)), "missing ({}, {})", x, y);
            }
        }
        assert_eq!(cells.len(), 26 * 3);
    }

    #[test]
    fn test_horizontal_corridor_strips_run_along_y() {
        let a = RoomBounds::new(Position::new(0, 0), 8, 8);
        let b = RoomBounds::new(Position::new(-32, 0), 8, 8);
        let corridor = carve_corridor((0, &a), (1, &b), Direction::West, 3, 1);

        assert_eq!(corridor.start, Position::new(-3, 0));
        assert_eq!(corridor.end, Position::new(-30, 0));
        assert!(corridor.cells.contains(&Position::new(-10, -1)));
        assert!(corridor.cells.contains(&Position::new(-10, 1)));
        assert!(!corridor.cells.contains(&Position::new(-10, 2)));
    }

    #[test]
    fn test_corridor_overlaps_both_rooms() {
        let a = RoomBounds::new(Position::new(0, 0), 24, 24);
        let b = RoomBounds::new(Position::new(32, 0), 6, 6);
        let corridor = carve_corridor((0, &a), (1, &b), Direction::East, 2, 1);

        assert!(a.contains(corridor.start));
        assert!(b.contains(corridor.end));
        assert_eq!(corridor.cells.len() as u32, corridor.length() * 2);
    }
}
