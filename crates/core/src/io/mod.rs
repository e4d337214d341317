//! I/O operations for reading and writing geospatial data
//!
//! - GeoTIFF rasters through the `tiff` crate (no GDAL dependency)
//! - GeoJSON feature collections through the `geojson` crate

mod geojson_io;
mod native;

pub use geojson_io::{read_feature_collection, write_feature_collection};
pub use native::{read_geotiff, write_geotiff, GeoTiffOptions};
