//! Error types for the pipeline
//!
//! [`PipelineError`] aborts a run. Failures confined to one label are
//! collected as [`StageFailure`] records and reported at the end instead.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Fatal pipeline error
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("malformed outlet coordinate on line {line}: {content:?}")]
    MalformedCoordinate { line: usize, content: String },

    #[error("{outlets} outlet coordinates but {labels} collection-point labels")]
    LabelCountMismatch { outlets: usize, labels: usize },

    #[error("duplicate collection-point label {0:?}")]
    DuplicateLabel(String),

    #[error("labels {first:?} and {second:?} map to the same artifact name {name:?}")]
    LabelNameCollision {
        first: String,
        second: String,
        name: String,
    },

    #[error("empty collection-point label at position {0}")]
    EmptyLabel(usize),

    #[error("collection point {index} has no label in property {field:?}")]
    MissingLabel { index: usize, field: String },

    #[error("no {0} supplied")]
    EmptyInput(&'static str),

    #[error("elevation surface has no valid cells")]
    EmptySurface,

    #[error("zonal statistics returned {actual} results for {expected} basins")]
    RankedCountMismatch { expected: usize, actual: usize },

    #[error("basin {0:?} cannot be ranked without a finite elevation")]
    UnrankedBasin(String),

    #[error("{stage}: {succeeded} results + {failed} failures != {submitted} submitted")]
    StageAccounting {
        stage: Stage,
        submitted: usize,
        succeeded: usize,
        failed: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] nestshed_core::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stage a per-label failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Delineation,
    Ranking,
    Differencing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Delineation => "delineation",
            Stage::Ranking => "ranking",
            Stage::Differencing => "differencing",
        };
        f.write_str(name)
    }
}

/// A failure that removes one label from the rest of the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub label: String,
    pub stage: Stage,
    pub reason: String,
}

impl StageFailure {
    pub fn new(label: impl Into<String>, stage: Stage, reason: impl fmt::Display) -> Self {
        Self {
            label: label.into(),
            stage,
            reason: reason.to_string(),
        }
    }
}

/// Check that every submitted unit of a stage came back as a result or a failure
pub(crate) fn check_accounting(stage: Stage, submitted: usize, succeeded: usize, failed: usize) -> Result<()> {
    if succeeded + failed != submitted {
        return Err(PipelineError::StageAccounting {
            stage,
            submitted,
            succeeded,
            failed,
        });
    }
    Ok(())
}
