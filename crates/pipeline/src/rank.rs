//! Elevation ranker
//!
//! Attaches each basin's minimum elevation from zonal statistics and orders
//! the basins headwater first.

use crate::error::{check_accounting, PipelineError, Result, Stage, StageFailure};
use crate::model::BasinPolygon;
use crate::ranking::Ranking;
use geo::MultiPolygon;
use nestshed_algorithms::statistics::{polygon_statistics, ZonalResult};
use nestshed_core::Raster;
use nestshed_parallel::{ParallelStrategy, ProcessingMode};
use std::collections::HashMap;
use tracing::debug;

/// Zonal statistics over a set of zones, one result per zone in order
pub trait ZonalMinimum: Sync {
    fn zonal_statistics(&self, zones: &[&MultiPolygon<f64>]) -> Vec<Option<ZonalResult>>;
}

/// Zonal statistics read from an elevation raster
pub struct RasterZonal<'a> {
    values: &'a Raster<f64>,
    mode: ProcessingMode,
}

impl<'a> RasterZonal<'a> {
    pub fn new(values: &'a Raster<f64>, mode: ProcessingMode) -> Self {
        Self { values, mode }
    }
}

impl ZonalMinimum for RasterZonal<'_> {
    fn zonal_statistics(&self, zones: &[&MultiPolygon<f64>]) -> Vec<Option<ZonalResult>> {
        self.mode
            .par_map(0..zones.len(), |i| polygon_statistics(self.values, zones[i]))
    }
}

/// Ranked basins plus the basins that could not be ranked
#[derive(Debug, Clone)]
pub struct RankOutcome {
    pub ranking: Ranking,
    /// Zonal statistics by label, for every ranked basin
    pub statistics: HashMap<String, ZonalResult>,
    pub failures: Vec<StageFailure>,
}

/// Rank basins by minimum elevation.
///
/// A basin with no valid elevation cell is a per-label failure. A zonal
/// engine returning the wrong number of results is fatal.
pub fn rank_basins<Z: ZonalMinimum + ?Sized>(zonal: &Z, basins: Vec<BasinPolygon>) -> Result<RankOutcome> {
    let submitted = basins.len();
    let zones: Vec<&MultiPolygon<f64>> = basins.iter().map(|b| &b.geometry).collect();
    let results = zonal.zonal_statistics(&zones);
    if results.len() != submitted {
        return Err(PipelineError::RankedCountMismatch {
            expected: submitted,
            actual: results.len(),
        });
    }

    let mut ranked = Vec::with_capacity(submitted);
    let mut statistics = HashMap::with_capacity(submitted);
    let mut failures = Vec::new();

    for (basin, stats) in basins.iter().zip(results) {
        match stats {
            Some(stats) if stats.min.is_finite() => {
                debug!("{}: minimum elevation {:.3} over {} cells", basin.label, stats.min, stats.count);
                ranked.push(basin.with_elevation(stats.min));
                statistics.insert(basin.label.clone(), stats);
            }
            _ => failures.push(StageFailure::new(
                basin.label.as_str(),
                Stage::Ranking,
                "no valid elevation cells inside basin",
            )),
        }
    }

    check_accounting(Stage::Ranking, submitted, ranked.len(), failures.len())?;

    Ok(RankOutcome {
        ranking: Ranking::new(ranked)?,
        statistics,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};
    use nestshed_core::GeoTransform;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    fn basin(label: &str, index: usize, geometry: MultiPolygon<f64>) -> BasinPolygon {
        BasinPolygon {
            label: label.into(),
            input_index: index,
            geometry,
            cell_count: 0,
            outlet_cell: (0, 0),
            outlet_elevation: None,
        }
    }

    /// 4x4 surface where elevation is 10 * row + col, row 0 at the top
    fn surface() -> Raster<f64> {
        let mut dem = Raster::new(4, 4);
        dem.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        for row in 0..4 {
            for col in 0..4 {
                dem.set(row, col, (10 * row + col) as f64).unwrap();
            }
        }
        dem.set_nodata(Some(-1.0));
        dem.set(0, 3, -1.0).unwrap();
        dem
    }

    #[test]
    fn test_rank_by_zonal_minimum() {
        let dem = surface();
        let zonal = RasterZonal::new(&dem, ProcessingMode::Sequential);
        let outcome = rank_basins(
            &zonal,
            vec![
                // Bottom two rows: min 20
                basin("down", 0, rect(0.0, 0.0, 4.0, 2.0)),
                // Top-left 2x2: min 0
                basin("up", 1, rect(0.0, 2.0, 2.0, 4.0)),
            ],
        )
        .unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.ranking.labels(), vec!["down", "up"]);
        assert_eq!(outcome.ranking.elevation(0), 20.0);
        assert_eq!(outcome.statistics["up"].count, 4);
    }

    #[test]
    fn test_basin_without_valid_cells_fails_alone() {
        let dem = surface();
        let zonal = RasterZonal::new(&dem, ProcessingMode::Parallel);
        let outcome = rank_basins(
            &zonal,
            vec![
                // Only the no-data cell (0, 3)
                basin("void", 0, rect(3.0, 3.0, 4.0, 4.0)),
                basin("ok", 1, rect(0.0, 0.0, 1.0, 1.0)),
            ],
        )
        .unwrap();

        assert_eq!(outcome.ranking.labels(), vec!["ok"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].label, "void");
        assert_eq!(outcome.failures[0].stage, Stage::Ranking);
    }

    struct ShortZonal;

    impl ZonalMinimum for ShortZonal {
        fn zonal_statistics(&self, _zones: &[&MultiPolygon<f64>]) -> Vec<Option<ZonalResult>> {
            vec![None]
        }
    }

    #[test]
    fn test_result_count_mismatch_is_fatal() {
        let err = rank_basins(
            &ShortZonal,
            vec![basin("a", 0, rect(0.0, 0.0, 1.0, 1.0)), basin("b", 1, rect(1.0, 1.0, 2.0, 2.0))],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::RankedCountMismatch { expected: 2, actual: 1 }));
    }
}
