//! Single-outlet basin extraction
//!
//! Traces every cell whose D8 flow path reaches a given outlet cell.

use crate::hydrology::d8::{neighbor, opposite_dir, FLOW_NODATA, PIT};
use ndarray::Array2;
use nestshed_core::raster::Raster;
use nestshed_core::{Algorithm, Error, Result};
use std::collections::VecDeque;

/// Result of tracing the basin of one outlet
#[derive(Debug, Clone)]
pub enum OutletBasin {
    /// Mask raster (1 = contributing, 0 = outside) and its cell count
    Cells { mask: Raster<u8>, count: usize },
    /// The outlet has no elevation, or is a pit that receives no flow
    NoContributingCells,
}

impl OutletBasin {
    /// Contributing cell count (0 for [`OutletBasin::NoContributingCells`])
    pub fn cell_count(&self) -> usize {
        match self {
            OutletBasin::Cells { count, .. } => *count,
            OutletBasin::NoContributingCells => 0,
        }
    }
}

/// Basin extraction algorithm
#[derive(Debug, Clone, Default)]
pub struct Watershed;

impl Algorithm for Watershed {
    type Input = Raster<u8>;
    type Output = OutletBasin;
    type Params = (usize, usize);
    type Error = Error;

    fn name(&self) -> &'static str {
        "Watershed"
    }

    fn description(&self) -> &'static str {
        "Delineate the basin draining to one outlet cell from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        outlet_basin(&input, params)
    }
}

/// Delineate the basin draining to `outlet` (row, col).
///
/// Breadth-first search upstream: a neighbour belongs to the basin when its
/// flow direction points back to a cell already in the basin. The outlet
/// cell itself is part of the basin.
pub fn outlet_basin(flow_dir: &Raster<u8>, outlet: (usize, usize)) -> Result<OutletBasin> {
    let (rows, cols) = flow_dir.shape();
    let (row, col) = outlet;
    if row >= rows || col >= cols {
        return Err(Error::IndexOutOfBounds { row, col, rows, cols });
    }

    let outlet_dir = unsafe { flow_dir.get_unchecked(row, col) };
    if outlet_dir == FLOW_NODATA {
        return Ok(OutletBasin::NoContributingCells);
    }

    let mut mask = Array2::<u8>::zeros((rows, cols));
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    mask[outlet] = 1;
    queue.push_back(outlet);
    let mut count = 1usize;

    while let Some((r, c)) = queue.pop_front() {
        for idx in 0..8 {
            let Some((nr, nc)) = neighbor(r, c, idx, rows, cols) else {
                continue;
            };
            if mask[(nr, nc)] != 0 {
                continue;
            }

            // The neighbour at direction idx drains here if it points back
            let neighbor_dir = unsafe { flow_dir.get_unchecked(nr, nc) };
            if neighbor_dir == opposite_dir((idx + 1) as u8) {
                mask[(nr, nc)] = 1;
                queue.push_back((nr, nc));
                count += 1;
            }
        }
    }

    if outlet_dir == PIT && count == 1 {
        return Ok(OutletBasin::NoContributingCells);
    }

    let mut output = flow_dir.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = mask;

    Ok(OutletBasin::Cells { mask: output, count })
}
