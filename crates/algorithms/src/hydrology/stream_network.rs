//! Stream network extraction
//!
//! Cells with flow accumulation >= threshold are classified as stream
//! cells. The output is a binary raster (1 = stream, 0 = non-stream).

use ndarray::Array2;
use nestshed_core::raster::Raster;
use nestshed_core::{Error, Result};

/// Parameters for stream network extraction
#[derive(Debug, Clone)]
pub struct StreamNetworkParams {
    /// Flow accumulation threshold (in cell counts).
    /// Default: 1000.0
    pub threshold: f64,
}

impl Default for StreamNetworkParams {
    fn default() -> Self {
        Self { threshold: 1000.0 }
    }
}

/// Extract the stream network from a flow accumulation raster.
///
/// # Returns
/// Raster<u8> with 1 = stream cell, 0 = non-stream cell
pub fn stream_network(flow_acc: &Raster<f64>, params: StreamNetworkParams) -> Result<Raster<u8>> {
    if !(params.threshold > 0.0) {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: params.threshold.to_string(),
            reason: "must be greater than zero".into(),
        });
    }

    let (rows, cols) = flow_acc.shape();
    let threshold = params.threshold;

    let mut output_data = Array2::<u8>::zeros((rows, cols));

    for row in 0..rows {
        for col in 0..cols {
            let acc = unsafe { flow_acc.get_unchecked(row, col) };
            if !acc.is_nan() && acc >= threshold {
                output_data[(row, col)] = 1;
            }
        }
    }

    let mut output = flow_acc.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(0));
    *output.data_mut() = output_data;

    Ok(output)
}
