//! In-memory point layer that collects the geocoded features of one batch.

use crate::domain::model::{BatchKind, Coordinate, Place, ReversePlace};
use crate::utils::error::{GeocodeError, Result};
use serde::Serialize;

const SIMPLE_FIELDS: &[&str] = &["display_name"];

const DETAIL_FIELDS: &[&str] = &[
    "house_number",
    "road",
    "neighbourhood",
    "locality",
    "town",
    "city",
    "county",
    "state",
    "postcode",
    "country",
    "country_code",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSchema {
    Simple,
    ForwardDetailed,
    ReverseDetailed,
}

impl LayerSchema {
    pub fn for_batch(kind: BatchKind, detailed: bool) -> Self {
        match (kind, detailed) {
            (_, false) => LayerSchema::Simple,
            (BatchKind::Forward, true) => LayerSchema::ForwardDetailed,
            (BatchKind::Reverse, true) => LayerSchema::ReverseDetailed,
        }
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        match self {
            LayerSchema::Simple => SIMPLE_FIELDS.to_vec(),
            LayerSchema::ForwardDetailed => {
                let mut names = vec![
                    "osm_type",
                    "osm_id",
                    "class",
                    "type",
                    "source_addr",
                    "display_name",
                ];
                names.extend_from_slice(DETAIL_FIELDS);
                names
            }
            LayerSchema::ReverseDetailed => {
                let mut names = vec!["osm_type", "osm_id", "display_name"];
                names.extend_from_slice(DETAIL_FIELDS);
                names
            }
        }
    }

    pub fn is_detailed(&self) -> bool {
        !matches!(self, LayerSchema::Simple)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFeature {
    pub point: Coordinate,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLayer {
    name: String,
    schema: LayerSchema,
    label_field: Option<&'static str>,
    features: Vec<PointFeature>,
}

impl PointLayer {
    pub fn new(name: impl Into<String>, schema: LayerSchema, show_labels: bool) -> Self {
        Self {
            name: name.into(),
            schema,
            label_field: show_labels.then_some("display_name"),
            features: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> LayerSchema {
        self.schema
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.schema.field_names()
    }

    pub fn label_field(&self) -> Option<&'static str> {
        self.label_field
    }

    pub fn features(&self) -> &[PointFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn add_feature(&mut self, point: Coordinate, attributes: Vec<String>) -> Result<()> {
        let expected = self.schema.field_names().len();
        if attributes.len() != expected {
            return Err(GeocodeError::ProcessingError {
                message: format!(
                    "layer '{}' expects {} attributes, got {}",
                    self.name,
                    expected,
                    attributes.len()
                ),
            });
        }
        self.features.push(PointFeature { point, attributes });
        Ok(())
    }

    /// Adds a forward search hit at its own location.
    pub fn add_place(&mut self, place: &Place, source: &str) -> Result<()> {
        let attributes = if self.schema.is_detailed() {
            let d = &place.details;
            vec![
                place.osm_type.clone(),
                place.osm_id.clone(),
                place.class.clone(),
                place.place_type.clone(),
                source.to_string(),
                place.display_name.clone(),
                d.house_number.clone(),
                d.road.clone(),
                d.neighbourhood.clone(),
                d.locality.clone(),
                d.town.clone(),
                d.city.clone(),
                d.county.clone(),
                d.state.clone(),
                d.postcode.clone(),
                d.country.clone(),
                d.country_code.clone(),
            ]
        } else {
            vec![place.display_name.clone()]
        };
        self.add_feature(place.location, attributes)
    }

    /// Adds a reverse answer at the point that was looked up.
    pub fn add_reverse(&mut self, point: Coordinate, place: &ReversePlace) -> Result<()> {
        let attributes = if self.schema.is_detailed() {
            let d = &place.details;
            vec![
                place.osm_type.clone(),
                place.osm_id.clone(),
                place.display_name.clone(),
                d.house_number.clone(),
                d.road.clone(),
                d.neighbourhood.clone(),
                d.locality.clone(),
                d.town.clone(),
                d.city.clone(),
                d.county.clone(),
                d.state.clone(),
                d.postcode.clone(),
                d.country.clone(),
                d.country_code.clone(),
            ]
        } else {
            vec![place.display_name.clone()]
        };
        self.add_feature(point, attributes)
    }

    /// Bounding box of all features, `None` for an empty layer.
    pub fn extent(&self) -> Option<Extent> {
        let first = self.features.first()?.point;
        let init = Extent {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        Some(self.features.iter().fold(init, |e, f| Extent {
            min_lon: e.min_lon.min(f.point.lon),
            min_lat: e.min_lat.min(f.point.lat),
            max_lon: e.max_lon.max(f.point.lon),
            max_lat: e.max_lat.max(f.point.lat),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::AddressDetails;

    fn place(lon: f64, lat: f64) -> Place {
        Place {
            location: Coordinate::new(lon, lat),
            display_name: "Somewhere".to_string(),
            osm_type: "node".to_string(),
            osm_id: "1".to_string(),
            class: "place".to_string(),
            place_type: "city".to_string(),
            details: AddressDetails {
                city: "Springfield".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_schemas() {
        assert_eq!(LayerSchema::Simple.field_names(), vec!["display_name"]);
        let forward = LayerSchema::ForwardDetailed.field_names();
        assert_eq!(forward.len(), 17);
        assert_eq!(forward[4], "source_addr");
        let reverse = LayerSchema::ReverseDetailed.field_names();
        assert_eq!(reverse.len(), 14);
        assert!(!reverse.contains(&"class"));
        assert_eq!(
            LayerSchema::for_batch(BatchKind::Reverse, false),
            LayerSchema::Simple
        );
    }

    #[test]
    fn test_add_place_detailed() {
        let mut layer = PointLayer::new("out", LayerSchema::ForwardDetailed, true);
        layer.add_place(&place(-89.6, 39.8), "Springfield IL").unwrap();
        let feature = &layer.features()[0];
        assert_eq!(feature.point, Coordinate::new(-89.6, 39.8));
        assert_eq!(feature.attributes[4], "Springfield IL");
        assert_eq!(feature.attributes[11], "Springfield");
        assert_eq!(layer.label_field(), Some("display_name"));
    }

    #[test]
    fn test_add_feature_checks_arity() {
        let mut layer = PointLayer::new("out", LayerSchema::Simple, false);
        assert!(layer
            .add_feature(Coordinate::new(0.0, 0.0), vec!["a".into(), "b".into()])
            .is_err());
        assert!(layer.is_empty());
    }

    #[test]
    fn test_extent() {
        let mut layer = PointLayer::new("out", LayerSchema::Simple, false);
        assert!(layer.extent().is_none());
        layer.add_place(&place(10.0, 50.0), "").unwrap();
        layer.add_place(&place(-5.0, 52.0), "").unwrap();
        let extent = layer.extent().unwrap();
        assert_eq!(extent.min_lon, -5.0);
        assert_eq!(extent.max_lon, 10.0);
        assert_eq!(extent.min_lat, 50.0);
        assert_eq!(extent.max_lat, 52.0);
    }
}
