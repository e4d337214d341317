//! D8 direction encoding shared by the routing and extraction services
//!
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! `0` = pit (no downslope neighbour), `1`-`8` = direction to the steepest
//! downslope neighbour, [`FLOW_NODATA`] = no elevation at the cell.

/// Direction code of a pit or flat cell
pub const PIT: u8 = 0;

/// Direction code of a cell without elevation data
pub const FLOW_NODATA: u8 = 255;

/// Neighbor offsets `(row, col)` indexed by direction code - 1
pub const D8_OFFSETS: [(isize, isize); 8] = [
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Distance factors for each D8 direction
pub const D8_DIST: [f64; 8] = [
    1.0, std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
    1.0, std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
];

/// Get the opposite direction code
pub fn opposite_dir(dir: u8) -> u8 {
    if dir == PIT || dir > 8 {
        return dir;
    }
    ((dir - 1 + 4) % 8) + 1
}

/// Neighbor of `(row, col)` at offset index `idx`, if inside a `rows x cols` grid
#[inline]
pub fn neighbor(row: usize, col: usize, idx: usize, rows: usize, cols: usize) -> Option<(usize, usize)> {
    let (dr, dc) = D8_OFFSETS[idx];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        None
    } else {
        Some((nr as usize, nc as usize))
    }
}

/// Downstream cell of `(row, col)` given its direction code
#[inline]
pub fn downstream(row: usize, col: usize, dir: u8, rows: usize, cols: usize) -> Option<(usize, usize)> {
    if dir == PIT || dir > 8 {
        return None;
    }
    neighbor(row, col, (dir - 1) as usize, rows, cols)
}
