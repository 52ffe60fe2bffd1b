//! Turns CSV tables and free-form text into batch items.

use crate::core::columns::ColumnMapping;
use crate::domain::model::{AddressQuery, BatchItem, Coordinate, GeocodeRequest, StructuredAddress};
use crate::utils::error::{GeocodeError, Result};
use std::collections::HashMap;

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Picks the delimiter whose most common per-line count is shared by at
/// least 90% of the first few lines, preferring the best agreement and then
/// the most fields. Ragged rows therefore do not rule a delimiter out.
/// Falls back to a comma.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    if lines.is_empty() {
        return b',';
    }

    // (delimiter, lines agreeing, fields per line)
    let mut best: Option<(u8, usize, usize)> = None;
    for delim in CANDIDATE_DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|l| count_outside_quotes(l, delim))
            .collect();
        let Some((count, agreeing)) = modal_count(&counts) else {
            continue;
        };
        if agreeing * 10 < lines.len() * 9 {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, best_agreeing, best_count)) => {
                (agreeing, count) > (best_agreeing, best_count)
            }
        };
        if better {
            best = Some((delim, agreeing, count));
        }
    }
    best.map(|(delim, _, _)| delim).unwrap_or(b',')
}

/// Most frequent non-zero count and how many lines have it. Ties go to the
/// larger count.
fn modal_count(counts: &[usize]) -> Option<(usize, usize)> {
    let mut tally: HashMap<usize, usize> = HashMap::new();
    for &c in counts.iter().filter(|c| **c > 0) {
        *tally.entry(c).or_default() += 1;
    }
    tally
        .into_iter()
        .max_by_key(|&(count, lines)| (lines, count))
}

fn count_outside_quotes(line: &str, delim: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delim && !in_quotes {
            count += 1;
        }
    }
    count
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn cell(&self, row: &[String], column: Option<usize>) -> Option<String> {
        column
            .and_then(|idx| row.get(idx))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Decodes a CSV file with a header row. Rows of uneven width are kept.
pub fn read_table(data: &[u8]) -> Result<Table> {
    let decoded = String::from_utf8_lossy(data);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&decoded);
    let delimiter = sniff_delimiter(text);
    tracing::debug!("Sniffed CSV delimiter {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// One address per non-blank line.
pub fn free_form_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn free_form_items(text: &str) -> Vec<BatchItem> {
    free_form_lines(text)
        .into_iter()
        .enumerate()
        .map(|(index, line)| BatchItem {
            index,
            source: line.clone(),
            request: GeocodeRequest::Forward(AddressQuery::FullText(line)),
        })
        .collect()
}

/// How structured columns are sent when no full-address column is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableQueryMode {
    /// One service parameter per field.
    #[default]
    Structured,
    /// Fields joined into a single free-form query.
    FreeForm,
}

pub fn table_items(table: &Table, mapping: &ColumnMapping, mode: TableQueryMode) -> Vec<BatchItem> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            if let Some(full) = table.cell(row, mapping.full_address) {
                return BatchItem {
                    index,
                    source: full.clone(),
                    request: GeocodeRequest::Forward(AddressQuery::FullText(full)),
                };
            }

            let source = row.join(",");
            let address = StructuredAddress {
                number: table.cell(row, mapping.number),
                street: table.cell(row, mapping.street),
                city: table.cell(row, mapping.city),
                county: table.cell(row, mapping.county),
                state: table.cell(row, mapping.state),
                postal_code: table.cell(row, mapping.postal_code),
                country: table.cell(row, mapping.country),
            };
            // Chosen full-address column empty, or every mapped cell empty.
            if mapping.full_address.is_some() || address.is_empty() {
                return BatchItem {
                    index,
                    source,
                    request: GeocodeRequest::Invalid("empty address".to_string()),
                };
            }

            let query = match mode {
                TableQueryMode::Structured => AddressQuery::Structured(address),
                TableQueryMode::FreeForm => AddressQuery::FreeForm(address),
            };
            BatchItem {
                index,
                source,
                request: GeocodeRequest::Forward(query),
            }
        })
        .collect()
}

pub fn point_items(table: &Table, lat_col: usize, lon_col: usize) -> Vec<BatchItem> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let lat = table.cell(row, Some(lat_col));
            let lon = table.cell(row, Some(lon_col));
            let source = format!(
                "{},{}",
                lat.as_deref().unwrap_or_default(),
                lon.as_deref().unwrap_or_default()
            );
            let request = match parse_point(lat.as_deref(), lon.as_deref()) {
                Ok(point) => GeocodeRequest::Reverse(point),
                Err(reason) => GeocodeRequest::Invalid(reason),
            };
            BatchItem {
                index,
                source,
                request,
            }
        })
        .collect()
}

fn parse_point(lat: Option<&str>, lon: Option<&str>) -> std::result::Result<Coordinate, String> {
    let lat: f64 = lat
        .ok_or("missing latitude")?
        .parse()
        .map_err(|_| "latitude is not a number".to_string())?;
    let lon: f64 = lon
        .ok_or("missing longitude")?
        .parse()
        .map_err(|_| "longitude is not a number".to_string())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinate out of range: {}, {}", lat, lon));
    }
    Ok(Coordinate::new(lon, lat))
}

/// Parses `"lat,lon"` as typed on the command line.
pub fn parse_lat_lon(text: &str) -> Result<Coordinate> {
    let mut parts = text.split(',').map(str::trim);
    let lat = parts.next().filter(|s| !s.is_empty());
    let lon = parts.next().filter(|s| !s.is_empty());
    if parts.next().is_some() {
        return Err(GeocodeError::ProcessingError {
            message: format!("expected 'lat,lon', got '{}'", text),
        });
    }
    parse_point(lat, lon).map_err(|message| GeocodeError::ProcessingError { message })
}
