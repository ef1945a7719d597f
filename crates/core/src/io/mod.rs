//! I/O for rasters (GeoTIFF) and polygon datasets (GeoJSON)

mod geojson_io;
mod geotiff;

pub use geojson_io::{read_feature_collection, write_feature_collection};
pub use geotiff::{read_geotiff, read_geotiff_from_reader, write_geotiff, write_geotiff_to_writer};
