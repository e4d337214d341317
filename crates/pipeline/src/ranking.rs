//! Basins ordered from headwater to outlet

use crate::error::{PipelineError, Result};
use crate::model::BasinPolygon;

/// Ranked basins, sorted by minimum elevation descending.
///
/// Equal elevations keep input order, so position 0 is the most upstream
/// basin and a run over the same inputs always ranks the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    basins: Vec<BasinPolygon>,
}

impl Ranking {
    /// Rank basins. Every basin needs a finite elevation.
    pub fn new(mut basins: Vec<BasinPolygon>) -> Result<Self> {
        for basin in &basins {
            if !basin.outlet_elevation.is_some_and(f64::is_finite) {
                return Err(PipelineError::UnrankedBasin(basin.label.clone()));
            }
        }

        basins.sort_by(|a, b| {
            let ea = a.outlet_elevation.unwrap_or(f64::NEG_INFINITY);
            let eb = b.outlet_elevation.unwrap_or(f64::NEG_INFINITY);
            eb.total_cmp(&ea).then_with(|| a.input_index.cmp(&b.input_index))
        });

        Ok(Self { basins })
    }

    pub fn len(&self) -> usize {
        self.basins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.basins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BasinPolygon> {
        self.basins.iter()
    }

    pub fn as_slice(&self) -> &[BasinPolygon] {
        &self.basins
    }

    /// Elevation of the basin at `rank`
    pub fn elevation(&self, rank: usize) -> f64 {
        self.basins[rank].outlet_elevation.unwrap_or(f64::NAN)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.basins.iter().map(|b| b.label.as_str()).collect()
    }
}
