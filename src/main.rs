use anyhow::Context;
use bulk_nominatim::config::args::{Command, SettingsArgs, TextArgs};
use bulk_nominatim::core::{input, lookup};
use bulk_nominatim::utils::error::{ErrorSeverity, GeocodeError};
use bulk_nominatim::utils::{logger, validation::Validate};
use bulk_nominatim::{
    CliConfig, GeocodeEngine, GeocodePipeline, InputSource, LocalStorage, NominatimClient,
    Settings, TextInput,
};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting bulk-nominatim");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let mut settings = match Settings::load_or_default(&config.config) {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };
    config.overrides.apply(&mut settings);

    // 驗證配置
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let source = match config.command {
        Command::Settings(args) => return settings_command(&config.config, settings, &args),
        Command::Point { coordinate } => {
            return point_command(&settings, &coordinate).await;
        }
        Command::Table(args) => InputSource::Table {
            path: input_path(&args.input)?,
            columns: args.column_overrides(),
            mode: args.query_mode(),
        },
        Command::Text(args) => InputSource::Text(text_input(&args)?),
        Command::Reverse(args) => InputSource::Points {
            path: input_path(&args.input)?,
            lat: args.lat,
            lon: args.lon,
        },
    };

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let client = match NominatimClient::new(&settings.service.user_agent, settings.timeout()) {
        Ok(client) => Arc::new(client),
        Err(e) => fail(&e),
    };
    let storage = LocalStorage::new(settings.output.path.clone());
    let pipeline = GeocodePipeline::new(storage, settings, client, source);
    let engine = GeocodeEngine::new_with_monitoring(pipeline, config.monitor);

    match engine.run().await {
        Ok(summary) => {
            print!("{}", summary.outcome.report);
            println!("📁 Output saved to: {}", summary.output);
            tracing::info!("✅ Batch completed");
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

/// Logs the error and exits with a code matching its severity.
fn fail(e: &GeocodeError) -> ! {
    tracing::error!(
        "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

/// Inputs are read through the output storage, so make them absolute.
fn input_path(path: &Path) -> anyhow::Result<String> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("cannot resolve input path {}", path.display()))?;
    Ok(absolute.to_string_lossy().into_owned())
}

fn text_input(args: &TextArgs) -> anyhow::Result<TextInput> {
    if let Some(path) = &args.input {
        if !args.addresses.is_empty() {
            tracing::warn!("Ignoring --address values, reading {}", path.display());
        }
        return Ok(TextInput::File(input_path(path)?));
    }
    if !args.addresses.is_empty() {
        return Ok(TextInput::Inline(args.addresses.join("\n")));
    }

    tracing::info!("Reading addresses from stdin");
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read addresses from stdin")?;
    Ok(TextInput::Inline(text))
}

async fn point_command(settings: &Settings, coordinate: &str) -> anyhow::Result<()> {
    let point = match input::parse_lat_lon(coordinate) {
        Ok(point) => point,
        Err(e) => fail(&e),
    };
    let client = match NominatimClient::new(&settings.service.user_agent, settings.timeout()) {
        Ok(client) => client,
        Err(e) => fail(&e),
    };

    match lookup::lookup_point(&client, settings, point).await {
        Ok(found) => {
            println!("{}", found.text);
            if let Some(outline) = found.outline {
                println!("Outline: {}", outline);
            }
            if let Some(marker) = found.marker {
                println!("Marker: {:.6},{:.6}", marker.lat, marker.lon);
            }
            Ok(())
        }
        Err(e) => fail(&e),
    }
}

fn settings_command(path: &Path, mut settings: Settings, args: &SettingsArgs) -> anyhow::Result<()> {
    if args.restore_defaults {
        settings.restore_defaults();
    }
    if args.save {
        settings
            .save(path)
            .with_context(|| format!("failed to save settings to {}", path.display()))?;
        println!("✅ Settings saved to {}", path.display());
    }
    print!("{}", settings.to_toml_string()?);
    Ok(())
}
