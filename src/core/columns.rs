//! Header-name heuristics that pre-select which column plays which address
//! role. Explicit choices by header name always win over the guesses.

use crate::utils::error::{GeocodeError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    FullAddress,
    Number,
    Street,
    City,
    County,
    State,
    Country,
    PostalCode,
}

impl fmt::Display for AddressRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressRole::FullAddress => "full address",
            AddressRole::Number => "street number",
            AddressRole::Street => "street name",
            AddressRole::City => "city",
            AddressRole::County => "county",
            AddressRole::State => "state",
            AddressRole::Country => "country",
            AddressRole::PostalCode => "postal code",
        };
        f.write_str(name)
    }
}

/// Column index per address role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub full_address: Option<usize>,
    pub number: Option<usize>,
    pub street: Option<usize>,
    pub city: Option<usize>,
    pub county: Option<usize>,
    pub state: Option<usize>,
    pub country: Option<usize>,
    pub postal_code: Option<usize>,
}

impl ColumnMapping {
    pub fn get(&self, role: AddressRole) -> Option<usize> {
        match role {
            AddressRole::FullAddress => self.full_address,
            AddressRole::Number => self.number,
            AddressRole::Street => self.street,
            AddressRole::City => self.city,
            AddressRole::County => self.county,
            AddressRole::State => self.state,
            AddressRole::Country => self.country,
            AddressRole::PostalCode => self.postal_code,
        }
    }

    pub fn set(&mut self, role: AddressRole, column: Option<usize>) {
        let slot = match role {
            AddressRole::FullAddress => &mut self.full_address,
            AddressRole::Number => &mut self.number,
            AddressRole::Street => &mut self.street,
            AddressRole::City => &mut self.city,
            AddressRole::County => &mut self.county,
            AddressRole::State => &mut self.state,
            AddressRole::Country => &mut self.country,
            AddressRole::PostalCode => &mut self.postal_code,
        };
        *slot = column;
    }

    pub fn is_empty(&self) -> bool {
        *self == ColumnMapping::default()
    }
}

fn classify(header: &str) -> Option<AddressRole> {
    let item = header.trim().to_lowercase();
    if item.contains("num") {
        Some(AddressRole::Number)
    } else if item.contains("name") || item.contains("street") || item.starts_with("road") {
        Some(AddressRole::Street)
    } else if item.contains("city") {
        Some(AddressRole::City)
    } else if item.contains("county") {
        Some(AddressRole::County)
    } else if item.contains("state") {
        Some(AddressRole::State)
    } else if item.contains("country") {
        Some(AddressRole::Country)
    } else if item.contains("postal") || item.contains("zip") {
        Some(AddressRole::PostalCode)
    } else {
        None
    }
}

/// Guesses the structured roles. A later header overrides an earlier one
/// for the same role; the full-address column is never guessed.
pub fn infer_address_columns<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let mut mapping = ColumnMapping::default();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(role) = classify(header.as_ref()) {
            mapping.set(role, Some(idx));
        }
    }
    mapping
}

const LAT_NAMES: [&str; 2] = ["lat", "latitude"];
const LON_NAMES: [&str; 4] = ["lon", "lng", "long", "longitude"];

/// Latitude and longitude column guesses. A header named exactly like a
/// coordinate (`lat`, `Longitude`, ...) beats one that only contains the
/// substring, so `latitude` keeps its role next to `population`.
pub fn infer_point_columns<S: AsRef<str>>(headers: &[S]) -> (Option<usize>, Option<usize>) {
    let names: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();
    let exact = |candidates: &[&str]| names.iter().position(|n| candidates.contains(&n.as_str()));

    let mut lat = None;
    let mut lon = None;
    for (idx, item) in names.iter().enumerate() {
        if item.contains("lat") {
            lat = Some(idx);
        } else if item.contains("lon") || item.contains("lng") {
            lon = Some(idx);
        }
    }
    (exact(&LAT_NAMES).or(lat), exact(&LON_NAMES).or(lon))
}

/// Index of `name` among the headers, compared case-insensitively.
pub fn find_column<S: AsRef<str>>(headers: &[S], role: &str, name: &str) -> Result<usize> {
    let wanted = name.trim().to_lowercase();
    headers
        .iter()
        .position(|h| h.as_ref().trim().to_lowercase() == wanted)
        .ok_or_else(|| GeocodeError::UnknownColumnError {
            role: role.to_string(),
            column: name.to_string(),
        })
}

/// Applies explicit `(role, header)` choices on top of a mapping.
pub fn apply_overrides<S: AsRef<str>>(
    mapping: &mut ColumnMapping,
    headers: &[S],
    overrides: &[(AddressRole, String)],
) -> Result<()> {
    for (role, name) in overrides {
        let idx = find_column(headers, &role.to_string(), name)?;
        mapping.set(*role, Some(idx));
    }
    Ok(())
}
