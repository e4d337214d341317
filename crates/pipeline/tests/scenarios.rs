//! Behaviour of the whole pipeline over stub services.
//!
//! Basins are axis-aligned rectangles handed out by label, so expected
//! exclusive areas can be worked out by hand.

use approx::assert_relative_eq;
use geo::{LineString, MultiPolygon, Polygon};
use nestshed_algorithms::statistics::ZonalResult;
use nestshed_algorithms::vector::{area, intersection_area, union_all};
use nestshed_core::io::read_feature_collection;
use nestshed_parallel::ProcessingMode;
use nestshed_pipeline::{
    run_with, ArtifactStore, BasinDelineator, BasinPolygon, CollectionPoint, DelineationError,
    GeoOverlay, Overlay, OutletPoint, PipelineError, RunReport, Stage, Stages, ZonalMinimum,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
        vec![],
    )])
}

/// Hands out a fixed basin per label and counts calls
struct StubDelineator {
    basins: HashMap<String, MultiPolygon<f64>>,
    calls: AtomicUsize,
}

impl BasinDelineator for StubDelineator {
    fn delineate(&self, outlet: &OutletPoint) -> Result<BasinPolygon, DelineationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let geometry = self
            .basins
            .get(&outlet.label)
            .cloned()
            .ok_or_else(|| DelineationError::Engine(format!("no basin for {}", outlet.label)))?;
        Ok(BasinPolygon {
            label: outlet.label.clone(),
            input_index: outlet.index,
            geometry,
            cell_count: 1,
            outlet_cell: (0, 0),
            outlet_elevation: None,
        })
    }
}

/// Minimum elevation looked up by geometry
struct StubZonal {
    minima: Vec<(MultiPolygon<f64>, f64)>,
}

impl ZonalMinimum for StubZonal {
    fn zonal_statistics(&self, zones: &[&MultiPolygon<f64>]) -> Vec<Option<ZonalResult>> {
        zones
            .iter()
            .map(|zone| {
                self.minima
                    .iter()
                    .find(|(g, _)| g == *zone)
                    .map(|(_, min)| ZonalResult { count: 1, min: *min, max: *min, mean: *min })
            })
            .collect()
    }
}

#[derive(Default)]
struct CountingOverlay {
    calls: AtomicUsize,
}

impl Overlay for CountingOverlay {
    fn difference(&self, subject: &MultiPolygon<f64>, clip: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        GeoOverlay.difference(subject, clip)
    }
}

struct Fixture {
    delineator: StubDelineator,
    zonal: StubZonal,
    coords: Vec<(f64, f64)>,
    points: Vec<CollectionPoint>,
}

/// One outlet per `(label, minimum elevation, basin)`, in the given order
fn fixture(basins: &[(&str, f64, MultiPolygon<f64>)]) -> Fixture {
    Fixture {
        delineator: StubDelineator {
            basins: basins.iter().map(|(l, _, g)| (l.to_string(), g.clone())).collect(),
            calls: AtomicUsize::new(0),
        },
        zonal: StubZonal {
            minima: basins.iter().map(|(_, z, g)| (g.clone(), *z)).collect(),
        },
        coords: (0..basins.len()).map(|i| (i as f64, i as f64)).collect(),
        points: basins.iter().map(|(l, _, _)| CollectionPoint::new(*l)).collect(),
    }
}

fn run<O: Overlay>(fx: &Fixture, overlay: &O, store: &ArtifactStore, mode: ProcessingMode) -> Result<RunReport, PipelineError> {
    let stages = Stages {
        delineator: &fx.delineator,
        zonal: &fx.zonal,
        overlay,
        store,
        mode,
    };
    run_with(fx.coords.clone(), fx.points.clone(), &stages)
}

fn store(dir: &tempfile::TempDir) -> ArtifactStore {
    ArtifactStore::create(dir.path().join("scratch"), dir.path().join("output")).unwrap()
}

fn exclusive_geometries(store: &ArtifactStore) -> Vec<(String, MultiPolygon<f64>)> {
    let features = read_feature_collection(store.output_dir().join("exclusive_contribution_areas.geojson")).unwrap();
    features
        .iter()
        .map(|f| {
            let label = f.get_property("label").and_then(|v| v.as_label()).unwrap();
            let geometry = match &f.geometry {
                Some(geo::Geometry::MultiPolygon(mp)) => mp.clone(),
                Some(geo::Geometry::Polygon(p)) => MultiPolygon::new(vec![p.clone()]),
                _ => MultiPolygon::new(vec![]),
            };
            (label, geometry)
        })
        .collect()
}

fn nested() -> Fixture {
    // Listed downstream first; ranking must reorder them
    fixture(&[
        ("C", 100.0, rect(0.0, 0.0, 10.0, 10.0)),
        ("B", 150.0, rect(0.0, 0.0, 10.0, 6.0)),
        ("A", 200.0, rect(0.0, 0.0, 10.0, 3.0)),
    ])
}

#[test]
fn scenario_nested_basins() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let fx = nested();

    let report = run(&fx, &GeoOverlay, &store, ProcessingMode::Parallel).unwrap();

    assert!(report.is_complete());
    let order: Vec<&str> = report.results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(order, vec!["A", "B", "C"]);
    assert_relative_eq!(report.result("A").unwrap().area, 30.0, epsilon = 1e-9);
    assert_relative_eq!(report.result("B").unwrap().area, 30.0, epsilon = 1e-9);
    assert_relative_eq!(report.result("C").unwrap().area, 40.0, epsilon = 1e-9);
    assert_eq!(report.result("A").unwrap().min_elevation, 200.0);
}

#[test]
fn scenario_equal_elevation_disjoint() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let fx = fixture(&[
        ("P", 120.0, rect(0.0, 0.0, 2.0, 2.0)),
        ("Q", 120.0, rect(5.0, 0.0, 8.0, 2.0)),
    ]);

    let report = run(&fx, &GeoOverlay, &store, ProcessingMode::Sequential).unwrap();

    assert_eq!(report.results[0].label, "P");
    assert_eq!(report.results[0].rank, 0);
    assert_relative_eq!(report.result("P").unwrap().area, 4.0, epsilon = 1e-9);
    assert_relative_eq!(report.result("Q").unwrap().area, 6.0, epsilon = 1e-9);

    let written = exclusive_geometries(&store);
    assert_eq!(written[1].1, rect(5.0, 0.0, 8.0, 2.0));
}

#[test]
fn scenario_fully_covered_basin_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let fx = fixture(&[
        ("X", 200.0, rect(0.0, 0.0, 1.0, 1.0)),
        ("Y", 150.0, rect(1.0, 0.0, 2.0, 1.0)),
        ("Z", 100.0, rect(0.0, 0.0, 2.0, 1.0)),
    ]);

    let report = run(&fx, &GeoOverlay, &store, ProcessingMode::Sequential).unwrap();

    let z = report.result("Z").unwrap();
    assert!(z.empty);
    assert_eq!(z.area, 0.0);
    assert_eq!(report.exclusive, 3);

    // Explicitly written, not dropped
    let path = store.output_dir().join("exclusive_contribution_area_Z.geojson");
    let features = read_feature_collection(path).unwrap();
    let empty = features.iter().next().and_then(|f| f.get_property("empty")).cloned();
    assert_eq!(empty, Some(true.into()));
}

#[test]
fn scenario_label_count_mismatch_stops_before_delineation() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let mut fx = nested();
    fx.points.pop();

    let err = run(&fx, &GeoOverlay, &store, ProcessingMode::Parallel).unwrap_err();

    assert!(matches!(err, PipelineError::LabelCountMismatch { outlets: 3, labels: 2 }));
    assert_eq!(fx.delineator.calls.load(Ordering::SeqCst), 0);
    assert!(!store.output_dir().join("exclusive_contribution_areas.geojson").exists());
}

#[test]
fn exclusive_areas_are_disjoint_and_cover_all_basins() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let basins = [
        ("ridge", 300.0, rect(2.0, 6.0, 6.0, 9.0)),
        ("spur", 250.0, rect(5.0, 4.0, 9.0, 8.0)),
        ("fan", 180.0, rect(0.0, 3.0, 7.0, 7.0)),
        ("mouth", 90.0, rect(0.0, 0.0, 10.0, 10.0)),
    ];
    let fx = fixture(&basins);

    let report = run(&fx, &GeoOverlay, &store, ProcessingMode::Parallel).unwrap();
    assert_eq!(report.results.len(), basins.len());

    let written = exclusive_geometries(&store);
    for (i, (_, a)) in written.iter().enumerate() {
        for (_, b) in &written[i + 1..] {
            assert!(intersection_area(a, b) < 1e-9);
        }
    }

    let basin_union = union_all(basins.iter().map(|(_, _, g)| g));
    let exclusive_union = union_all(written.iter().map(|(_, g)| g));
    assert_relative_eq!(area(&exclusive_union), area(&basin_union), epsilon = 1e-6);

    let total: f64 = report.results.iter().map(|r| r.area).sum();
    assert_relative_eq!(total, 100.0, epsilon = 1e-6);
}

#[test]
fn headwater_basin_makes_no_overlay_call() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let fx = nested();
    let overlay = CountingOverlay::default();

    let report = run(&fx, &overlay, &store, ProcessingMode::Sequential).unwrap();

    // B subtracts A, C subtracts A then B
    assert_eq!(overlay.calls.load(Ordering::SeqCst), 3);
    let written = exclusive_geometries(&store);
    assert_eq!(written[0].0, "A");
    assert_eq!(written[0].1, rect(0.0, 0.0, 10.0, 3.0));
    assert_eq!(report.results[0].rank, 0);
}

#[test]
fn runs_are_deterministic() {
    let fx = nested();
    let outputs: Vec<Vec<u8>> = [ProcessingMode::Sequential, ProcessingMode::ParallelWith(2)]
        .into_iter()
        .map(|mode| {
            let dir = tempfile::tempdir().unwrap();
            let store = store(&dir);
            run(&fx, &GeoOverlay, &store, mode).unwrap();
            std::fs::read(store.output_dir().join("exclusive_contribution_areas.geojson")).unwrap()
        })
        .collect();
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn delineation_failure_is_reported_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let mut fx = nested();
    fx.delineator.basins.remove("B");

    let report = run(&fx, &GeoOverlay, &store, ProcessingMode::Parallel).unwrap();

    assert_eq!(report.submitted, 3);
    assert_eq!(report.delineated, 2);
    assert_eq!(report.exclusive, 2);
    assert!(!report.is_complete());
    let failure = report.failure("B").unwrap();
    assert_eq!(failure.stage, Stage::Delineation);
    // Without B, C only loses A
    assert_relative_eq!(report.result("C").unwrap().area, 70.0, epsilon = 1e-9);
}

#[test]
fn unrankable_basin_is_reported_per_label() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let mut fx = nested();
    fx.zonal.minima.retain(|(_, z)| *z != 150.0);

    let report = run(&fx, &GeoOverlay, &store, ProcessingMode::Sequential).unwrap();

    assert_eq!(report.ranked, 2);
    assert_eq!(report.failure("B").unwrap().stage, Stage::Ranking);
    assert!(report.result("B").is_none());
}

struct BrokenOverlay;

impl Overlay for BrokenOverlay {
    fn difference(&self, subject: &MultiPolygon<f64>, clip: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>, String> {
        // Fails whenever the 10x6 basin is the clip
        if clip == &rect(0.0, 0.0, 10.0, 6.0) {
            return Err("non-noded intersection".into());
        }
        GeoOverlay.difference(subject, clip)
    }
}

#[test]
fn overlay_failure_accounts_for_every_label() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let fx = nested();

    let report = run(&fx, &BrokenOverlay, &store, ProcessingMode::Parallel).unwrap();

    assert_eq!(report.ranked, 3);
    assert_eq!(report.exclusive, 2);
    let failure = report.failure("C").unwrap();
    assert_eq!(failure.stage, Stage::Differencing);
    assert!(failure.reason.contains('B'));
    assert_eq!(report.exclusive + report.failures.len(), report.ranked);
}

struct ShortZonal;

impl ZonalMinimum for ShortZonal {
    fn zonal_statistics(&self, zones: &[&MultiPolygon<f64>]) -> Vec<Option<ZonalResult>> {
        zones
            .iter()
            .skip(1)
            .map(|_| Some(ZonalResult { count: 1, min: 1.0, max: 1.0, mean: 1.0 }))
            .collect()
    }
}

#[test]
fn zonal_count_mismatch_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let fx = nested();
    let stages = Stages {
        delineator: &fx.delineator,
        zonal: &ShortZonal,
        overlay: &GeoOverlay,
        store: &store,
        mode: ProcessingMode::Sequential,
    };

    let err = run_with(fx.coords.clone(), fx.points.clone(), &stages).unwrap_err();
    assert!(matches!(err, PipelineError::RankedCountMismatch { expected: 3, actual: 2 }));
}

#[test]
fn summary_lists_results_and_failures() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let mut fx = nested();
    fx.delineator.basins.remove("A");

    run(&fx, &GeoOverlay, &store, ProcessingMode::Sequential).unwrap();

    let text = std::fs::read_to_string(store.summary_path()).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(summary["submitted"], 3);
    assert_eq!(summary["results"][0]["label"], "B");
    assert_eq!(summary["failures"][0]["label"], "A");
    assert_eq!(summary["failures"][0]["stage"], "delineation");
}
