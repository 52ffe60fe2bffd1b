pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, Settings};

pub use adapters::NominatimClient;
pub use core::{
    engine::{GeocodeEngine, RunSummary},
    pipeline::{GeocodePipeline, InputSource, TextInput},
};
pub use utils::error::{GeocodeError, Result};
