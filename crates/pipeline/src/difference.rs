//! Hierarchical difference
//!
//! The exclusive area of the basin at rank `i` is its geometry minus every
//! basin at ranks `0..i`, applied one predecessor at a time. Rank 0 keeps
//! its geometry untouched.

use crate::error::{check_accounting, Result, Stage, StageFailure};
use crate::model::{BasinPolygon, ExclusiveAreaPolygon};
use crate::ranking::Ranking;
use geo::MultiPolygon;
use nestshed_algorithms::vector::{difference, intersection_area};
use nestshed_parallel::{ParallelStrategy, ProcessingMode};
use thiserror::Error;
use tracing::{debug, warn};

/// Polygon difference engine
pub trait Overlay: Sync {
    /// Area of `subject` not covered by `clip`
    fn difference(&self, subject: &MultiPolygon<f64>, clip: &MultiPolygon<f64>)
        -> std::result::Result<MultiPolygon<f64>, String>;
}

/// Overlay backed by `geo` boolean operations
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoOverlay;

impl Overlay for GeoOverlay {
    fn difference(
        &self,
        subject: &MultiPolygon<f64>,
        clip: &MultiPolygon<f64>,
    ) -> std::result::Result<MultiPolygon<f64>, String> {
        difference(subject, clip).map_err(|e| e.to_string())
    }
}

/// A difference step that failed for one label
#[derive(Error, Debug, Clone, PartialEq)]
#[error("subtracting {predecessor} from {label} failed: {reason}")]
pub struct OverlayFailure {
    pub label: String,
    pub predecessor: String,
    pub reason: String,
}

/// Exclusive areas in rank order plus the labels whose overlay failed
#[derive(Debug, Clone)]
pub struct DifferenceOutcome {
    pub areas: Vec<ExclusiveAreaPolygon>,
    pub failures: Vec<StageFailure>,
}

/// Subtract every predecessor from `basin`, in order.
///
/// With no predecessors the geometry is returned untouched. An empty
/// accumulator is still passed to the remaining predecessors.
pub fn exclusive_area<O: Overlay + ?Sized>(
    overlay: &O,
    basin: &BasinPolygon,
    predecessors: &[BasinPolygon],
) -> std::result::Result<MultiPolygon<f64>, OverlayFailure> {
    predecessors.iter().try_fold(basin.geometry.clone(), |acc, upstream| {
        overlay
            .difference(&acc, &upstream.geometry)
            .map_err(|reason| OverlayFailure {
                label: basin.label.clone(),
                predecessor: upstream.label.clone(),
                reason,
            })
    })
}

/// Pairs of basins that tie on minimum elevation and overlap. The first of
/// each pair wins the shared area by input order.
fn tied_overlaps(ranking: &Ranking) -> Vec<(&BasinPolygon, &BasinPolygon)> {
    let basins = ranking.as_slice();
    let mut pairs = Vec::new();
    for (i, a) in basins.iter().enumerate() {
        for b in basins[i + 1..].iter().take_while(|b| b.outlet_elevation == a.outlet_elevation) {
            if intersection_area(&a.geometry, &b.geometry) > 0.0 {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

fn warn_on_tied_overlap(ranking: &Ranking) {
    for (a, b) in tied_overlaps(ranking) {
        warn!(
            "{} and {} share minimum elevation {:.3} and overlap; {} is ranked first by input order",
            a.label,
            b.label,
            a.outlet_elevation.unwrap_or(f64::NAN),
            a.label
        );
    }
}

/// Compute the exclusive area of every ranked basin.
///
/// Ranks are independent once the ranking is fixed, so they are spread over
/// `mode`. Output order is rank order regardless of scheduling.
pub fn hierarchical_difference<O: Overlay + ?Sized>(
    overlay: &O,
    ranking: &Ranking,
    mode: ProcessingMode,
) -> Result<DifferenceOutcome> {
    warn_on_tied_overlap(ranking);

    let basins = ranking.as_slice();
    let results = mode.par_map(0..basins.len(), |rank| {
        exclusive_area(overlay, &basins[rank], &basins[..rank])
    });

    let mut areas = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for ((rank, basin), result) in ranking.iter().enumerate().zip(results) {
        match result {
            Ok(geometry) => {
                let area = ExclusiveAreaPolygon::new(basin.label.as_str(), rank, ranking.elevation(rank), geometry);
                debug!("rank {} {}: exclusive area {:.3}", rank, area.label, area.area);
                areas.push(area);
            }
            Err(e) => {
                warn!("{}", e);
                failures.push(StageFailure::new(e.label.as_str(), Stage::Differencing, &e));
            }
        }
    }

    check_accounting(Stage::Differencing, ranking.len(), areas.len(), failures.len())?;
    Ok(DifferenceOutcome { areas, failures })
}
