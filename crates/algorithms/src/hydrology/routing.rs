//! Flow routing
//!
//! Conditions a DEM and derives the grids basin extraction needs:
//! Priority-Flood fill, D8 direction, MFD accumulation and the stream mask.
//! The working set is checked against a memory ceiling before any grid is
//! allocated.

use crate::hydrology::flow_accumulation::{flow_accumulation, MfdParams};
use crate::hydrology::flow_direction::flow_direction;
use crate::hydrology::priority_flood::{priority_flood, PriorityFloodParams};
use crate::hydrology::stream_network::{stream_network, StreamNetworkParams};
use nestshed_core::raster::Raster;
use nestshed_core::{Error, Result};

/// Bytes per cell held while routing: input and filled DEM, accumulation,
/// direction, stream mask, fill bookkeeping and the elevation-sorted queue.
const ROUTING_BYTES_PER_CELL: usize = 64;

/// Bytes per cell held by one basin extraction (mask plus search queue)
const MASK_BYTES_PER_CELL: usize = 2;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Parameters for flow routing
#[derive(Debug, Clone)]
pub struct FlowRoutingParams {
    /// Stream threshold in upstream cells
    pub threshold: f64,
    /// MFD convergence factor (1..=10)
    pub convergence: u32,
    /// Memory ceiling in megabytes
    pub memory_mb: usize,
    /// Priority-Flood epsilon
    pub fill_epsilon: f64,
}

impl Default for FlowRoutingParams {
    fn default() -> Self {
        Self {
            threshold: 1000.0,
            convergence: 5,
            memory_mb: 300,
            fill_epsilon: 1e-5,
        }
    }
}

/// Grids produced by [`route_flow`]
#[derive(Debug, Clone)]
pub struct FlowRouting {
    /// D8 flow direction (see [`crate::hydrology::d8`])
    pub direction: Raster<u8>,
    /// MFD upstream contributing area in cells
    pub accumulation: Raster<f64>,
    /// Stream mask (1 = stream)
    pub streams: Raster<u8>,
}

/// Estimated routing working set in megabytes for a `rows x cols` grid
pub fn routing_memory_mb(rows: usize, cols: usize) -> usize {
    (rows * cols * ROUTING_BYTES_PER_CELL).div_ceil(BYTES_PER_MB)
}

/// Number of concurrent basin extractions that fit in `memory_mb`.
///
/// Always at least 1: a single extraction is allowed once routing fit.
pub fn max_basin_workers(rows: usize, cols: usize, memory_mb: usize) -> usize {
    let mask_bytes = (rows * cols * MASK_BYTES_PER_CELL).max(1);
    ((memory_mb * BYTES_PER_MB) / mask_bytes).max(1)
}

/// Route flow over `dem`.
///
/// Fails with [`Error::MemoryBudget`] when the estimated working set
/// exceeds `params.memory_mb`, and with [`Error::InvalidParameter`] for an
/// out-of-range threshold or convergence factor.
pub fn route_flow(dem: &Raster<f64>, params: FlowRoutingParams) -> Result<FlowRouting> {
    if params.memory_mb == 0 {
        return Err(Error::InvalidParameter {
            name: "memory_mb",
            value: "0".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let (rows, cols) = dem.shape();
    let required_mb = routing_memory_mb(rows, cols);
    if required_mb > params.memory_mb {
        return Err(Error::MemoryBudget {
            required_mb,
            budget_mb: params.memory_mb,
        });
    }

    let filled = priority_flood(dem, PriorityFloodParams { epsilon: params.fill_epsilon })?;
    let direction = flow_direction(&filled)?;
    let accumulation = flow_accumulation(&filled, MfdParams { convergence: params.convergence })?;
    let streams = stream_network(&accumulation, StreamNetworkParams { threshold: params.threshold })?;

    Ok(FlowRouting {
        direction,
        accumulation,
        streams,
    })
}
