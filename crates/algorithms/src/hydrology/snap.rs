//! Outlet snapping
//!
//! Moves an outlet onto the stream cell with the highest flow
//! accumulation inside a square search window.

use nestshed_core::raster::Raster;
use nestshed_core::{Error, Result};

/// Snap `(row, col)` to the stream cell with maximum accumulation within
/// `radius` cells (Chebyshev distance).
///
/// Returns the original cell when `radius` is 0 or no stream cell lies in
/// the window. Ties keep the first cell in row-major order.
pub fn snap_outlet(
    accumulation: &Raster<f64>,
    streams: &Raster<u8>,
    outlet: (usize, usize),
    radius: usize,
) -> Result<(usize, usize)> {
    if accumulation.shape() != streams.shape() {
        let (er, ec) = accumulation.shape();
        let (ar, ac) = streams.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let (rows, cols) = accumulation.shape();
    let (row, col) = outlet;
    if row >= rows || col >= cols {
        return Err(Error::IndexOutOfBounds { row, col, rows, cols });
    }
    if radius == 0 {
        return Ok(outlet);
    }

    let mut best: Option<((usize, usize), f64)> = None;

    for r in row.saturating_sub(radius)..=(row + radius).min(rows - 1) {
        for c in col.saturating_sub(radius)..=(col + radius).min(cols - 1) {
            if unsafe { streams.get_unchecked(r, c) } == 0 {
                continue;
            }
            let acc = unsafe { accumulation.get_unchecked(r, c) };
            if acc.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| acc > b) {
                best = Some(((r, c), acc));
            }
        }
    }

    Ok(best.map_or(outlet, |(cell, _)| cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (Raster<f64>, Raster<u8>) {
        let mut acc = Raster::new(5, 5);
        let mut streams = Raster::new(5, 5);
        for row in 0..5 {
            acc.set(row, 3, (row * 10) as f64).unwrap();
            streams.set(row, 3, 1).unwrap();
        }
        (acc, streams)
    }

    #[test]
    fn test_snap_moves_to_channel() {
        let (acc, streams) = channel();
        assert_eq!(snap_outlet(&acc, &streams, (2, 1), 2).unwrap(), (4, 3));
    }

    #[test]
    fn test_snap_zero_radius_keeps_outlet() {
        let (acc, streams) = channel();
        assert_eq!(snap_outlet(&acc, &streams, (2, 1), 0).unwrap(), (2, 1));
    }

    #[test]
    fn test_snap_without_stream_in_window() {
        let (acc, streams) = channel();
        assert_eq!(snap_outlet(&acc, &streams, (0, 0), 1).unwrap(), (0, 0));
    }

    #[test]
    fn test_snap_rejects_outside_cell() {
        let (acc, streams) = channel();
        assert!(snap_outlet(&acc, &streams, (9, 0), 1).is_err());
    }
}
