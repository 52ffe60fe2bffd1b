//! Encodings for a finished point layer.

use crate::core::layer::PointLayer;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// GeoJSON FeatureCollection in EPSG:4326.
pub fn to_geojson(layer: &PointLayer, generated_at: DateTime<Utc>) -> Value {
    let names = layer.field_names();
    let features: Vec<Value> = layer
        .features()
        .iter()
        .map(|feature| {
            let properties: Map<String, Value> = names
                .iter()
                .zip(&feature.attributes)
                .map(|(name, value)| (name.to_string(), Value::String(value.clone())))
                .collect();
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [feature.point.lon, feature.point.lat],
                },
                "properties": properties,
            })
        })
        .collect();

    let mut collection = json!({
        "type": "FeatureCollection",
        "name": layer.name(),
        "generated_at": generated_at.to_rfc3339(),
        "features": features,
    });
    if let Some(extent) = layer.extent() {
        collection["bbox"] = json!([
            extent.min_lon,
            extent.min_lat,
            extent.max_lon,
            extent.max_lat
        ]);
    }
    if let Some(label) = layer.label_field() {
        collection["label_field"] = Value::String(label.to_string());
    }
    collection
}

/// One row per feature: `lon,lat` followed by the layer's fields.
pub fn to_csv(layer: &PointLayer) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["lon", "lat"];
    header.extend(layer.field_names());
    writer.write_record(&header)?;

    for feature in layer.features() {
        let mut row = vec![feature.point.lon.to_string(), feature.point.lat.to_string()];
        row.extend(feature.attributes.iter().cloned());
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()).into())
}

/// Packs named files into a single ZIP archive.
pub fn bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
