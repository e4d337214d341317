//! D8 flow direction algorithm
//!
//! Calculates the direction of flow from each cell to its steepest
//! downslope neighbor using the D8 (deterministic eight-node) method.
//! See [`crate::hydrology::d8`] for the direction encoding.

use crate::hydrology::d8::{neighbor, D8_DIST, FLOW_NODATA, PIT};
use crate::maybe_rayon::*;
use ndarray::Array2;
use nestshed_core::raster::Raster;
use nestshed_core::{Algorithm, Error, Result};

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a filled DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// The input DEM should be hydrologically conditioned (depressions filled)
/// for meaningful results.
///
/// - `0` ([`PIT`]) = pit or flat (no downslope neighbor)
/// - `1`-`8` = direction to the steepest downslope neighbor
/// - `255` ([`FLOW_NODATA`]) = no elevation at the cell
///
/// Ties between equally steep neighbours go to the lowest direction code.
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![PIT; cols];

            for col in 0..cols {
                let center = unsafe { dem.get_unchecked(row, col) };

                if dem.is_nodata(center) {
                    row_data[col] = FLOW_NODATA;
                    continue;
                }

                let mut max_drop = 0.0_f64;
                let mut best_dir = PIT;

                for idx in 0..8 {
                    let Some((nr, nc)) = neighbor(row, col, idx, rows, cols) else {
                        continue;
                    };

                    let next = unsafe { dem.get_unchecked(nr, nc) };
                    if dem.is_nodata(next) {
                        continue;
                    }

                    let drop = (center - next) / (D8_DIST[idx] * cell_size);
                    if drop > max_drop {
                        max_drop = drop;
                        best_dir = (idx + 1) as u8;
                    }
                }

                row_data[col] = best_dir;
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(FLOW_NODATA));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestshed_core::GeoTransform;

    fn dem_from(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_flow_direction_slope_east() {
        let dem = dem_from(5, 5, |_, col| (5 - col) as f64 * 10.0);
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_flow_direction_slope_south() {
        let dem = dem_from(5, 5, |row, _| (5 - row) as f64 * 10.0);
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 7);
    }

    #[test]
    fn test_flow_direction_diagonal() {
        let dem = dem_from(5, 5, |row, col| (10 - row - col) as f64 * 10.0);
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 8);
    }

    #[test]
    fn test_flow_direction_pit() {
        let mut dem = dem_from(5, 5, |_, _| 10.0);
        dem.set(2, 2, 1.0).unwrap();
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), PIT);
    }

    #[test]
    fn test_flow_direction_marks_nodata() {
        let mut dem = dem_from(5, 5, |row, _| (5 - row) as f64 * 10.0);
        dem.set_nodata(Some(-9999.0));
        dem.set(3, 2, -9999.0).unwrap();

        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(3, 2).unwrap(), FLOW_NODATA);
        // Flow never points into a no-data cell
        assert_ne!(fdir.get(2, 2).unwrap(), 7);
        assert_eq!(fdir.nodata(), Some(FLOW_NODATA));
    }

    #[test]
    fn test_algorithm_execute_matches_free_function() {
        let dem = dem_from(5, 5, |row, col| (10 - row - col) as f64 * 10.0);
        let direct = flow_direction(&dem).unwrap();
        let via_trait = FlowDirection.execute(dem, ()).unwrap();

        assert_eq!(FlowDirection.name(), "Flow Direction (D8)");
        assert_eq!(via_trait.data(), direct.data());
    }
}
