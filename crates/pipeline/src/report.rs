//! Run summary

use crate::artifacts::ArtifactRef;
use crate::error::StageFailure;
use crate::model::{BasinPolygon, ExclusiveAreaPolygon};
use serde::Serialize;

/// Outcome for one label that reached the end of the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelResult {
    pub label: String,
    pub rank: usize,
    pub min_elevation: f64,
    pub area: f64,
    pub perimeter: f64,
    pub empty: bool,
    pub cell_count: usize,
}

impl LabelResult {
    pub fn new(area: &ExclusiveAreaPolygon, basin: &BasinPolygon) -> Self {
        Self {
            label: area.label.clone(),
            rank: area.rank,
            min_elevation: area.elevation,
            area: area.area,
            perimeter: area.perimeter,
            empty: area.is_empty(),
            cell_count: basin.cell_count,
        }
    }
}

/// Counts per stage, per-label results in rank order, failures and artifacts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub submitted: usize,
    pub delineated: usize,
    pub ranked: usize,
    pub exclusive: usize,
    pub results: Vec<LabelResult>,
    pub failures: Vec<StageFailure>,
    pub artifacts: Vec<ArtifactRef>,
}

impl RunReport {
    /// Every submitted label produced an exclusive area
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.exclusive == self.submitted
    }

    pub fn result(&self, label: &str) -> Option<&LabelResult> {
        self.results.iter().find(|r| r.label == label)
    }

    pub fn failure(&self, label: &str) -> Option<&StageFailure> {
        self.failures.iter().find(|f| f.label == label)
    }
}
