use crate::config::settings::Settings;
use crate::core::columns::AddressRole;
use crate::core::input::TableQueryMode;
use crate::domain::model::{ExecutionMode, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bulk-nominatim")]
#[command(about = "Bulk geocoding and reverse geocoding with Nominatim", version)]
pub struct CliConfig {
    /// Settings file; defaults are used when it does not exist
    #[arg(short, long, global = true, default_value = "bulk-nominatim.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Log as JSON lines instead of text
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Log CPU/memory usage after each stage
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-run overrides of the settings file.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsOverrides {
    /// Base URL of the Nominatim service
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Reject batches with more addresses than this
    #[arg(long, global = true)]
    pub max_address: Option<usize>,

    /// Level of detail for reverse lookups (0-18)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=18))]
    pub zoom: Option<u8>,

    /// Results kept per address
    #[arg(long, global = true)]
    pub max_results: Option<usize>,

    #[arg(long, global = true, value_enum)]
    pub mode: Option<ExecutionMode>,

    /// Requests in flight at once in concurrent mode
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Output directory
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[arg(long, global = true)]
    pub layer_name: Option<String>,

    #[arg(long, global = true, value_enum, value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    /// Keep OSM ids and address parts, not just the display name
    #[arg(long, global = true)]
    pub detailed: bool,

    /// Mark display_name as the label field of the output layer
    #[arg(long, global = true)]
    pub labels: bool,

    /// Write a single ZIP with all outputs
    #[arg(long, global = true)]
    pub bundle: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.url {
            settings.service.url = url.trim().to_string();
        }
        if let Some(max_address) = self.max_address {
            settings.batch.max_address = max_address;
        }
        if let Some(zoom) = self.zoom {
            settings.batch.level_of_detail = zoom;
        }
        if let Some(max_results) = self.max_results {
            settings.batch.max_results = max_results;
        }
        if let Some(mode) = self.mode {
            settings.batch.mode = mode;
        }
        if let Some(concurrency) = self.concurrency {
            settings.batch.concurrent_requests = concurrency;
        }
        if let Some(output) = &self.output {
            settings.output.path = output.clone();
        }
        if let Some(layer_name) = &self.layer_name {
            settings.output.layer_name = layer_name.clone();
        }
        if !self.format.is_empty() {
            settings.output.formats = self
                .format
                .iter()
                .map(|f| f.extension().to_string())
                .collect();
        }
        if let Some(timeout) = self.timeout {
            settings.service.timeout_seconds = Some(timeout);
        }
        settings.output.detailed |= self.detailed;
        settings.output.show_labels |= self.labels;
        settings.output.bundle |= self.bundle;
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Geocode the rows of a CSV table
    Table(TableArgs),
    /// Geocode free-form addresses, one per line
    Text(TextArgs),
    /// Reverse geocode a CSV of latitude/longitude points
    Reverse(ReverseArgs),
    /// Look up the address at a single "lat,lon" point
    Point {
        #[arg(allow_hyphen_values = true)]
        coordinate: String,
    },
    /// Show, save or reset the settings file
    Settings(SettingsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// CSV file with a header row
    pub input: PathBuf,

    /// Column holding the whole address; the other columns are ignored
    #[arg(long)]
    pub full_address: Option<String>,

    #[arg(long)]
    pub number: Option<String>,

    #[arg(long)]
    pub street: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub county: Option<String>,

    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long)]
    pub postal: Option<String>,

    /// Send the columns as one free-form query instead of separate fields
    #[arg(long)]
    pub free_form: bool,
}

impl TableArgs {
    pub fn column_overrides(&self) -> Vec<(AddressRole, String)> {
        [
            (AddressRole::FullAddress, &self.full_address),
            (AddressRole::Number, &self.number),
            (AddressRole::Street, &self.street),
            (AddressRole::City, &self.city),
            (AddressRole::County, &self.county),
            (AddressRole::State, &self.state),
            (AddressRole::Country, &self.country),
            (AddressRole::PostalCode, &self.postal),
        ]
        .into_iter()
        .filter_map(|(role, column)| column.clone().map(|c| (role, c)))
        .collect()
    }

    pub fn query_mode(&self) -> TableQueryMode {
        if self.free_form {
            TableQueryMode::FreeForm
        } else {
            TableQueryMode::Structured
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TextArgs {
    /// Text file with one address per line; stdin when omitted
    pub input: Option<PathBuf>,

    /// Address given directly, may be repeated
    #[arg(short, long = "address")]
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ReverseArgs {
    /// CSV file with latitude and longitude columns
    pub input: PathBuf,

    #[arg(long)]
    pub lat: Option<String>,

    #[arg(long)]
    pub lon: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SettingsArgs {
    /// Write the effective settings to the settings file
    #[arg(long)]
    pub save: bool,

    /// Reset service URL, max addresses and level of detail first
    #[arg(long)]
    pub restore_defaults: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_command_with_overrides() {
        let config = CliConfig::try_parse_from([
            "bulk-nominatim",
            "table",
            "stores.csv",
            "--street",
            "Addr1",
            "--free-form",
            "--max-address",
            "500",
            "--format",
            "geojson,csv",
            "--mode",
            "concurrent",
        ])
        .unwrap();

        let Command::Table(args) = &config.command else {
            panic!("expected table command");
        };
        assert_eq!(
            args.column_overrides(),
            vec![(AddressRole::Street, "Addr1".to_string())]
        );
        assert_eq!(args.query_mode(), TableQueryMode::FreeForm);

        let mut settings = Settings::default();
        config.overrides.apply(&mut settings);
        assert_eq!(settings.batch.max_address, 500);
        assert_eq!(settings.batch.mode, ExecutionMode::Concurrent);
        assert_eq!(settings.output.formats, vec!["geojson", "csv"]);
    }

    #[test]
    fn test_parse_point_with_negative_latitude() {
        let config =
            CliConfig::try_parse_from(["bulk-nominatim", "point", "-33.8568,151.2153"]).unwrap();
        match config.command {
            Command::Point { coordinate } => assert_eq!(coordinate, "-33.8568,151.2153"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_zoom_is_bounded() {
        assert!(
            CliConfig::try_parse_from(["bulk-nominatim", "--zoom", "19", "point", "1,2"]).is_err()
        );
    }

    #[test]
    fn test_text_addresses() {
        let config =
            CliConfig::try_parse_from(["bulk-nominatim", "text", "-a", "Paris", "-a", "Rome"])
                .unwrap();
        let Command::Text(args) = config.command else {
            panic!("expected text command");
        };
        assert_eq!(args.addresses, vec!["Paris", "Rome"]);
        assert!(args.input.is_none());
    }
}
