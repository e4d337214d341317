//! # nestshed pipeline
//!
//! Exclusive contribution areas of nested watersheds.
//!
//! Each labelled outlet is delineated into a basin, basins are ranked by
//! their minimum elevation (headwater first), and each basin's exclusive
//! area is what remains after subtracting every basin ranked before it.
//!
//! ```no_run
//! use nestshed_pipeline::{Pipeline, PipelineConfig, RunInputs};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let report = pipeline.run(&RunInputs {
//!     dem: "dem.tif".into(),
//!     outlets: "outlets.txt".into(),
//!     collection_points: "points.geojson".into(),
//! })?;
//! for result in &report.results {
//!     println!("{} {:.1}", result.label, result.area);
//! }
//! # Ok::<(), nestshed_pipeline::PipelineError>(())
//! ```

pub mod artifacts;
pub mod config;
pub mod delineate;
pub mod difference;
pub mod error;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod rank;
pub mod ranking;
pub mod report;
pub mod surface;

pub use artifacts::{ArtifactKind, ArtifactRef, ArtifactStore};
pub use config::{PipelineConfig, RoutingConfig};
pub use delineate::{BasinDelineator, DelineationError, RasterDelineator};
pub use difference::{exclusive_area, hierarchical_difference, DifferenceOutcome, GeoOverlay, Overlay, OverlayFailure};
pub use error::{PipelineError, Result, Stage, StageFailure};
pub use input::{pair_outlets, parse_outlet_coordinates, read_collection_points, read_outlet_coordinates};
pub use model::{BasinPolygon, CollectionPoint, ExclusiveAreaPolygon, OutletPoint};
pub use pipeline::{run_with, Pipeline, RunInputs, Stages};
pub use rank::{rank_basins, RankOutcome, RasterZonal, ZonalMinimum};
pub use ranking::Ranking;
pub use report::{LabelResult, RunReport};
pub use surface::ElevationSurface;
