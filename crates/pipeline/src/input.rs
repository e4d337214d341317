//! Outlet coordinates and collection-point labels
//!
//! Everything here runs before any geoprocessing, so a bad input file
//! stops the run before a single basin is delineated.

use crate::error::{PipelineError, Result};
use crate::model::{CollectionPoint, OutletPoint};
use nestshed_core::io::read_feature_collection;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

fn is_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains('x') && lower.contains('y')
}

fn parse_coordinate(line: &str) -> Option<(f64, f64)> {
    let mut fields = line.split(',').map(str::trim);
    let x = fields.next()?.parse::<f64>().ok()?;
    let y = fields.next()?.parse::<f64>().ok()?;
    if fields.next().is_some() || !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((x, y))
}

/// Parse `x,y` lines.
///
/// Blank lines and `#` comments are skipped, as is a header line naming
/// both `x` and `y` before the first coordinate. Any other line that is
/// not two finite numbers is fatal.
pub fn parse_outlet_coordinates(text: &str) -> Result<Vec<(f64, f64)>> {
    let mut coords = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_coordinate(line) {
            Some(coord) => coords.push(coord),
            None if coords.is_empty() && is_header(line) => continue,
            None => {
                return Err(PipelineError::MalformedCoordinate {
                    line: idx + 1,
                    content: line.to_string(),
                })
            }
        }
    }

    Ok(coords)
}

/// Read an outlet coordinate file
pub fn read_outlet_coordinates<P: AsRef<Path>>(path: P) -> Result<Vec<(f64, f64)>> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_outlet_coordinates(&text)
}

/// Read collection-point labels.
///
/// `.geojson`/`.json` files are read as features carrying the label in
/// `label_field`; anything else is plain text with one label per line.
pub fn read_collection_points<P: AsRef<Path>>(path: P, label_field: &str) -> Result<Vec<CollectionPoint>> {
    let path = path.as_ref();
    let is_geojson = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("geojson") || e.eq_ignore_ascii_case("json"));

    if is_geojson {
        let features = read_feature_collection(path)?;
        features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                feature
                    .get_property(label_field)
                    .and_then(|v| v.as_label())
                    .map(CollectionPoint::new)
                    .ok_or_else(|| PipelineError::MissingLabel {
                        index,
                        field: label_field.to_string(),
                    })
            })
            .collect()
    } else {
        let text = fs::read_to_string(path)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(CollectionPoint::new)
            .collect())
    }
}

/// Pair coordinates with labels by position.
///
/// Counts must match exactly and labels must be non-empty and unique, both
/// as given and in their file-name form.
pub fn pair_outlets(coords: Vec<(f64, f64)>, points: Vec<CollectionPoint>) -> Result<Vec<OutletPoint>> {
    if coords.len() != points.len() {
        return Err(PipelineError::LabelCountMismatch {
            outlets: coords.len(),
            labels: points.len(),
        });
    }
    if coords.is_empty() {
        return Err(PipelineError::EmptyInput("outlet coordinates"));
    }

    let mut seen = HashSet::new();
    let mut names: HashMap<String, &str> = HashMap::new();
    for (idx, point) in points.iter().enumerate() {
        if point.label.trim().is_empty() {
            return Err(PipelineError::EmptyLabel(idx));
        }
        if !seen.insert(point.label.as_str()) {
            return Err(PipelineError::DuplicateLabel(point.label.clone()));
        }
        let name = sanitize_label(&point.label);
        if let Some(first) = names.get(&name) {
            return Err(PipelineError::LabelNameCollision {
                first: first.to_string(),
                second: point.label.clone(),
                name,
            });
        }
        names.insert(name, point.label.as_str());
    }

    Ok(coords
        .into_iter()
        .zip(points)
        .enumerate()
        .map(|(index, ((x, y), point))| OutletPoint {
            label: point.label,
            index,
            x,
            y,
        })
        .collect())
}

/// File-name-safe form of a label
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect()
}
