use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 position in x/y order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAddress {
    pub number: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl StructuredAddress {
    /// House number and street name as a single line. A number without a
    /// street is kept on its own; `None` only when both are empty.
    pub fn street_line(&self) -> Option<String> {
        let name = self.street.as_deref().map(str::trim).unwrap_or_default();
        let number = self.number.as_deref().map(str::trim).unwrap_or_default();
        let line = format!("{} {}", number, name);
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        ![
            &self.number,
            &self.street,
            &self.city,
            &self.county,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .any(|part| part.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressQuery {
    /// A whole address in one string, sent as `q`.
    FullText(String),
    /// Structured fields joined into a single `q` string.
    FreeForm(StructuredAddress),
    /// One service parameter per structured field.
    Structured(StructuredAddress),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeRequest {
    Forward(AddressQuery),
    Reverse(Coordinate),
    /// A row that could not be turned into a request. It is reported as a
    /// failure without contacting the service.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub index: usize,
    /// What the user supplied, used for `source_addr` and the error log.
    pub source: String,
    pub request: GeocodeRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDetails {
    pub house_number: String,
    pub road: String,
    pub neighbourhood: String,
    pub locality: String,
    pub town: String,
    pub city: String,
    pub county: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub country_code: String,
}

/// One hit of a forward search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub location: Coordinate,
    pub display_name: String,
    pub osm_type: String,
    pub osm_id: String,
    pub class: String,
    pub place_type: String,
    pub details: AddressDetails,
}

/// Answer of a reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReversePlace {
    pub display_name: String,
    pub osm_type: String,
    pub osm_id: String,
    pub details: AddressDetails,
    pub geotext: Option<String>,
    pub location: Option<Coordinate>,
}

/// Why a single address produced no features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressFailure {
    NoResults,
    MissingCoordinates,
    MalformedResponse(String),
    Service(String),
    Transport(String),
    InvalidInput(String),
}

impl fmt::Display for AddressFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFailure::NoResults => write!(f, "no results"),
            AddressFailure::MissingCoordinates => write!(f, "result without lat/lon"),
            AddressFailure::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            AddressFailure::Service(msg) => write!(f, "service error: {}", msg),
            AddressFailure::Transport(msg) => write!(f, "network error: {}", msg),
            AddressFailure::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ExecutionMode {
    /// One request at a time, in input order.
    #[default]
    Sequential,
    /// All requests issued up front, bounded by `concurrent_requests`.
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Geojson,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Geojson => "geojson",
            OutputFormat::Csv => "csv",
        }
    }

    pub const NAMES: [&'static str; 2] = ["geojson", "csv"];
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geojson" => Ok(OutputFormat::Geojson),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unsupported output format: {}", other)),
        }
    }
}
