//! # Run-Length Encoding
//!
//! Collapses horizontal strips of identical tiles into single run records.
//!
//! Tiles are sorted by layer, row, address, and column, then any tile directly
//! to the right of the previous one with the same layer and address extends the
//! current run. Order is not preserved through a round trip, the multiset of
//! tiles is.

use crate::{DelveError, DelveResult, Position, TileRecord};
use serde::{Deserialize, Serialize};

/// A horizontal strip of `length` identical tiles starting at `start_position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunRecord {
    pub address_index: i32,
    pub layer: i32,
    pub start_position: Position,
    pub length: i32,
}

/// Compresses tiles into runs.
///
/// # Examples
///
/// ```
/// use delve::{compress, Position, TileRecord};
///
/// let tiles: Vec<_> = (0..3).map(|x| TileRecord::new(1, 0, Position::new(x, 0))).collect();
/// let runs = compress(&tiles);
///
/// assert_eq!(runs.len(), 1);
/// assert_eq!(runs[0].length, 3);
/// ```
pub fn compress(tiles: &[TileRecord]) -> Vec<RunRecord> {
    let mut sorted = tiles.to_vec();
    sorted.sort_by_key(|tile| (tile.layer, tile.position.y, tile.address_index, tile.position.x));

    let mut runs = Vec::new();
    let mut index = 0;

    while index < sorted.len() {
        let start = sorted[index];
        let mut length = 1;
        let mut last_x = start.position.x;

        while let Some(next) = sorted.get(index + length) {
            let extends = next.layer == start.layer
                && next.address_index == start.address_index
                && next.position.y == start.position.y
                && next.position.x == last_x + 1;
            if !extends {
                break;
            }
            last_x = next.position.x;
            length += 1;
        }

        runs.push(RunRecord {
            address_index: start.address_index,
            layer: start.layer,
            start_position: start.position,
            length: length as i32,
        });
        index += length;
    }

    runs
}

/// Expands runs back into individual tiles.
///
/// Runs with a zero or negative length, or whose last tile would fall past
/// `i32::MAX`, are rejected before anything is expanded.
pub fn decompress(runs: &[RunRecord]) -> DelveResult<Vec<TileRecord>> {
    let mut total = 0usize;
    for (index, run) in runs.iter().enumerate() {
        check_run(index, run)?;
        total += run.length as usize;
    }

    let mut tiles = Vec::with_capacity(total);
    for run in runs {
        tiles.extend((0..run.length).map(|offset| {
            TileRecord::new(
                run.address_index,
                run.layer,
                run.start_position + Position::new(offset, 0),
            )
        }));
    }

    Ok(tiles)
}

fn check_run(index: usize, run: &RunRecord) -> DelveResult<()> {
    if run.length <= 0 {
        return Err(DelveError::InvalidRun {
            index,
            reason: format!("length must be positive, got {}", run.length),
        });
    }
    if run.start_position.x.checked_add(run.length - 1).is_none() {
        return Err(DelveError::InvalidRun {
            index,
            reason: format!(
                "run of {} from x = {} overflows the grid",
                run.length, run.start_position.x
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(index: i32, layer: i32, x: i32, y: i32) -> TileRecord {
        TileRecord::new(index, layer, Position::new(x, y))
    }

    fn sorted(mut tiles: Vec<TileRecord>) -> Vec<TileRecord> {
        tiles.sort();
        tiles
    }

    #[test]
    fn test_empty_input() {
        assert!(compress(&[]).is_empty());
        assert!(decompress(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_single_tile_is_run_of_one() {
        let runs = compress(&[tile(2, 1, 5, -3)]);
        assert_eq!(
            runs,
            vec![RunRecord {
                address_index: 2,
                layer: 1,
                start_position: Position::new(5, -3),
                length: 1,
            }]
        );
    }

    #[test]
    fn test_three_in_a_row() {
        let tiles = vec![tile(1, 0, 0, 0), tile(1, 0, 1, 0), tile(1, 0, 2, 0)];
        let runs = compress(&tiles);
        assert_eq!(
            runs,
            vec![RunRecord {
                address_index: 1,
                layer: 0,
                start_position: Position::new(0, 0),
                length: 3,
            }]
        );
        assert_eq!(sorted(decompress(&runs).unwrap()), sorted(tiles));
    }

    #[test]
    fn test_gap_splits_run() {
        let runs = compress(&[tile(1, 0, 0, 0), tile(1, 0, 2, 0)]);
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|run| run.length == 1));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let runs = compress(&[tile(4, 0, 2, 1), tile(4, 0, 0, 1), tile(4, 0, 1, 1)]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start_position, Position::new(0, 1));
        assert_eq!(runs[0].length, 3);
    }

    #[test]
    fn test_address_change_splits_run() {
        let runs = compress(&[tile(1, 0, 0, 0), tile(2, 0, 1, 0), tile(1, 0, 2, 0)]);
        assert_eq!(runs.len(), 3);
    }

    #[test]
    fn test_layers_and_rows_split_runs() {
        let tiles = vec![
            tile(1, 0, 0, 0),
            tile(1, 0, 1, 0),
            tile(1, 1, 0, 0),
            tile(1, 1, 1, 0),
            tile(1, 0, 0, 1),
        ];
        let runs = compress(&tiles);
        assert_eq!(runs.len(), 3);
        assert_eq!(sorted(decompress(&runs).unwrap()), sorted(tiles));
    }

    #[test]
    fn test_duplicate_tiles_survive() {
        let tiles = vec![tile(1, 0, 0, 0), tile(1, 0, 0, 0)];
        let runs = compress(&tiles);
        assert_eq!(runs.len(), 2);
        assert_eq!(decompress(&runs).unwrap(), tiles);
    }

    #[test]
    fn test_decompress_rejects_bad_length() {
        let negative = RunRecord {
            address_index: 0,
            layer: 0,
            start_position: Position::origin(),
            length: -2,
        };
        assert!(matches!(
            decompress(&[negative]),
            Err(DelveError::InvalidRun { index: 0, .. })
        ));

        let zero = RunRecord { length: 0, ..negative };
        let ok = RunRecord { length: 1, ..negative };
        assert!(matches!(
            decompress(&[ok, zero]),
            Err(DelveError::InvalidRun { index: 1, .. })
        ));
    }

    #[test]
    fn test_decompress_checks_every_run_before_expanding() {
        let huge = RunRecord {
            address_index: 0,
            layer: 0,
            start_position: Position::origin(),
            length: i32::MAX,
        };
        let negative = RunRecord { length: -1, ..huge };
        assert!(matches!(
            decompress(&[huge, negative]),
            Err(DelveError::InvalidRun { index: 1, .. })
        ));
    }

    #[test]
    fn test_decompress_rejects_overflowing_run() {
        let run = RunRecord {
            address_index: 0,
            layer: 0,
            start_position: Position::new(i32::MAX - 1, 0),
            length: 5,
        };
        assert!(matches!(
            decompress(&[run]),
            Err(DelveError::InvalidRun { index: 0, .. })
        ));

        let last_cell = RunRecord { length: 2, ..run };
        let tiles = decompress(&[last_cell]).unwrap();
        assert_eq!(tiles[1].position, Position::new(i32::MAX, 0));
    }
}
