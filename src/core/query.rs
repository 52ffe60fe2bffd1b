//! Request URL assembly for the search and reverse endpoints.

use crate::domain::model::{AddressQuery, Coordinate, StructuredAddress};
use regex::Regex;
use std::sync::OnceLock;
use url::form_urlencoded;

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Trims, collapses whitespace runs to one space and percent-encodes with
/// spaces as `+`.
pub fn encode_value(value: &str) -> String {
    let collapsed = whitespace().replace_all(value.trim(), " ");
    form_urlencoded::byte_serialize(collapsed.as_bytes()).collect()
}

/// `tag=value` pairs joined by single `&`, without a leading separator.
#[derive(Debug, Default, Clone)]
pub struct QueryString {
    buf: String,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded parameter. Blank values are skipped.
    pub fn push(&mut self, tag: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self;
        }
        let encoded = encode_value(value);
        self.push_raw(tag, &encoded)
    }

    pub fn push_opt(&mut self, tag: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.push(tag, v),
            None => self,
        }
    }

    /// Appends a value that is already URL-safe (numbers, flags).
    pub fn push_raw(&mut self, tag: &str, value: &str) -> &mut Self {
        if !self.buf.is_empty() {
            self.buf.push('&');
        }
        self.buf.push_str(tag);
        self.buf.push('=');
        self.buf.push_str(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

/// Non-empty parts in the order number+street, city, county, state,
/// country, postal code, joined with `", "`.
pub fn free_form_text(address: &StructuredAddress) -> String {
    let mut parts = Vec::new();
    if let Some(street) = address.street_line() {
        parts.push(street);
    }
    for part in [
        &address.city,
        &address.county,
        &address.state,
        &address.country,
        &address.postal_code,
    ] {
        if let Some(value) = part.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            parts.push(value.to_string());
        }
    }
    parts.join(", ")
}

/// Parameters that identify the address, before the output options.
pub fn address_params(query: &AddressQuery) -> QueryString {
    let mut qs = QueryString::new();
    match query {
        AddressQuery::FullText(text) => {
            qs.push("q", text);
        }
        AddressQuery::FreeForm(address) => {
            qs.push("q", &free_form_text(address));
        }
        AddressQuery::Structured(address) => {
            qs.push_opt("street", address.street_line().as_deref())
                .push_opt("city", address.city.as_deref())
                .push_opt("county", address.county.as_deref())
                .push_opt("state", address.state.as_deref())
                .push_opt("country", address.country.as_deref())
                .push_opt("postalcode", address.postal_code.as_deref());
        }
    }
    qs
}

/// Full forward search URL.
pub fn search_url(base: &str, query: &AddressQuery, max_results: usize, details: bool) -> String {
    let mut qs = address_params(query);
    qs.push_raw("format", "json")
        .push_raw("limit", &max_results.to_string())
        .push_raw("polygon", "0")
        .push_raw("addressdetails", flag(details));
    format!("{}?{}", base, qs.as_str())
}

/// Reverse lookup URL used by batch runs.
pub fn reverse_url(base: &str, point: Coordinate, zoom: u8, details: bool) -> String {
    let mut qs = QueryString::new();
    qs.push_raw("format", "json")
        .push_raw("lat", &point.lat.to_string())
        .push_raw("lon", &point.lon.to_string())
        .push_raw("zoom", &zoom.to_string())
        .push_raw("addressdetails", flag(details));
    format!("{}?{}", base, qs.as_str())
}

/// Reverse lookup of a single point, asking for the matched outline as WKT.
pub fn point_lookup_url(base: &str, point: Coordinate, zoom: u8) -> String {
    let mut qs = QueryString::new();
    qs.push_raw("format", "json")
        .push_raw("lat", &format!("{:.6}", point.lat))
        .push_raw("lon", &format!("{:.6}", point.lon))
        .push_raw("zoom", &zoom.to_string())
        .push_raw("addressdetails", "0")
        .push_raw("polygon_text", "1");
    format!("{}?{}", base, qs.as_str())
}

fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}
