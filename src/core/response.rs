//! Parsing of service replies. Nothing here fails the batch: every problem
//! becomes an [`AddressFailure`] for the address that caused it.

use crate::domain::model::{AddressDetails, AddressFailure, Coordinate, Place, ReversePlace};
use serde_json::{Map, Value};

pub const ADDRESS_NOT_FOUND: &str = "[Could not find address]";

type Object = Map<String, Value>;

/// Field as text; missing or null fields are empty.
fn field(obj: &Object, name: &str) -> String {
    match obj.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn number(obj: &Object, name: &str) -> Option<f64> {
    match obj.get(name)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn location(obj: &Object) -> Option<Coordinate> {
    Some(Coordinate::new(number(obj, "lon")?, number(obj, "lat")?))
}

fn details(obj: &Object) -> AddressDetails {
    let Some(Value::Object(address)) = obj.get("address") else {
        return AddressDetails::default();
    };
    AddressDetails {
        house_number: field(address, "house_number"),
        road: field(address, "road"),
        neighbourhood: field(address, "neighbourhood"),
        locality: field(address, "locality"),
        town: field(address, "town"),
        city: field(address, "city"),
        county: field(address, "county"),
        state: field(address, "state"),
        postcode: field(address, "postcode"),
        country: field(address, "country"),
        country_code: field(address, "country_code"),
    }
}

fn parse_json(body: &str) -> Result<Value, AddressFailure> {
    serde_json::from_str(body).map_err(|e| AddressFailure::MalformedResponse(e.to_string()))
}

/// Reads a search reply. An empty list is [`AddressFailure::NoResults`];
/// any hit without usable coordinates fails the whole address.
pub fn parse_search(body: &str) -> Result<Vec<Place>, AddressFailure> {
    let hits = match parse_json(body)? {
        Value::Array(hits) => hits,
        Value::Object(obj) if obj.contains_key("error") => {
            return Err(AddressFailure::Service(field(&obj, "error")));
        }
        _ => {
            return Err(AddressFailure::MalformedResponse(
                "expected a JSON array".to_string(),
            ))
        }
    };
    if hits.is_empty() {
        return Err(AddressFailure::NoResults);
    }

    hits.iter()
        .map(|hit| {
            let obj = hit.as_object().ok_or(AddressFailure::MissingCoordinates)?;
            let location = location(obj).ok_or(AddressFailure::MissingCoordinates)?;
            Ok(Place {
                location,
                display_name: field(obj, "display_name"),
                osm_type: field(obj, "osm_type"),
                osm_id: field(obj, "osm_id"),
                class: field(obj, "class"),
                place_type: field(obj, "type"),
                details: details(obj),
            })
        })
        .collect()
}

/// Reads a reverse reply. An empty object or an `error` member fails the
/// address; coordinates are optional.
pub fn parse_reverse(body: &str) -> Result<ReversePlace, AddressFailure> {
    let obj = match parse_json(body)? {
        Value::Object(obj) => obj,
        _ => {
            return Err(AddressFailure::MalformedResponse(
                "expected a JSON object".to_string(),
            ))
        }
    };
    if obj.is_empty() {
        return Err(AddressFailure::NoResults);
    }
    if obj.contains_key("error") {
        return Err(AddressFailure::Service(field(&obj, "error")));
    }

    Ok(ReversePlace {
        display_name: field(&obj, "display_name"),
        osm_type: field(&obj, "osm_type"),
        osm_id: field(&obj, "osm_id"),
        details: details(&obj),
        geotext: obj
            .get("geotext")
            .and_then(Value::as_str)
            .map(str::to_string),
        location: location(&obj),
    })
}

/// Result of looking up a single point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLookup {
    pub text: String,
    /// Matched outline as WKT, when the service sent one.
    pub outline: Option<String>,
    /// Where to put a marker when there is no outline.
    pub marker: Option<Coordinate>,
}

/// Unlike the batch parsers this never fails: the answer is always
/// something to show.
pub fn parse_point_lookup(body: &str) -> PointLookup {
    let obj = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => obj,
        _ => {
            return PointLookup {
                text: format!("Error: {}", body),
                outline: None,
                marker: None,
            }
        }
    };

    let text = match obj.get("display_name") {
        Some(Value::String(name)) => name.clone(),
        _ => ADDRESS_NOT_FOUND.to_string(),
    };
    let outline = obj
        .get("geotext")
        .and_then(Value::as_str)
        .map(str::to_string);
    let marker = match outline.as_deref().and_then(wkt_point) {
        Some(point) => Some(point),
        None if outline.is_none() => location(&obj),
        None => None,
    };
    PointLookup {
        text,
        outline: outline.filter(|wkt| wkt_point(wkt).is_none()),
        marker,
    }
}

/// Coordinates of a WKT `POINT(x y)`.
fn wkt_point(wkt: &str) -> Option<Coordinate> {
    let rest = wkt.trim();
    let rest = rest
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("point"))
        .map(|_| rest[5..].trim())?;
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    Some(Coordinate::new(x, y))
}
