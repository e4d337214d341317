//! GeoJSON feature collection I/O
//!
//! Translates between [`FeatureCollection`] and the `geojson` crate's
//! document model. Empty multi-polygons are written as a `MultiPolygon`
//! with no coordinates so that an explicitly empty feature survives a
//! write/read cycle instead of disappearing.

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::Geometry;
use geojson::{feature::Id, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;

fn to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Int(i) => JsonValue::from(*i),
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}

fn from_json(value: &JsonValue) -> AttributeValue {
    match value {
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        _ => AttributeValue::Null,
    }
}

fn encode_feature(feature: &Feature) -> geojson::Feature {
    let geometry = feature
        .geometry
        .as_ref()
        .map(|g| geojson::Geometry::new(geojson::Value::from(g)));

    let properties: JsonObject = feature
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect();

    geojson::Feature {
        bbox: None,
        geometry,
        id: feature.id.clone().map(Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn decode_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(Geometry::<f64>::try_from(g)?),
        None => None,
    };

    let properties = feature
        .properties
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.clone(), from_json(v)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

/// Write a feature collection as a GeoJSON document
pub fn write_feature_collection<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let document = GeoJson::FeatureCollection(geojson::FeatureCollection {
        bbox: None,
        features: collection.iter().map(encode_feature).collect(),
        foreign_members: None,
    });
    fs::write(path.as_ref(), document.to_string())?;
    Ok(())
}

/// Read a GeoJSON document into a feature collection.
///
/// A bare `Feature` document yields a one-element collection; a bare
/// geometry is rejected because it carries no attributes.
pub fn read_feature_collection<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    let document: GeoJson = text.parse()?;

    let features = match document {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(Error::GeoJson(format!(
                "{}: expected a Feature or FeatureCollection, found a bare geometry",
                path.as_ref().display()
            )))
        }
    };

    features
        .into_iter()
        .map(decode_feature)
        .collect::<Result<Vec<_>>>()
        .map(|features| FeatureCollection { features })
}
