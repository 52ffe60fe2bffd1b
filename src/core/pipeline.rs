use crate::adapters::export;
use crate::core::batch::{BatchGeocoder, BatchOptions, BatchOutcome};
use crate::core::columns::{self, AddressRole};
use crate::core::input::{self, TableQueryMode};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{BatchItem, BatchKind, OutputFormat};
use crate::domain::ports::ServiceClient;
use crate::utils::error::{GeocodeError, Result};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum TextInput {
    File(String),
    Inline(String),
}

/// Where the addresses or points of a run come from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Table {
        path: String,
        columns: Vec<(AddressRole, String)>,
        mode: TableQueryMode,
    },
    Text(TextInput),
    Points {
        path: String,
        lat: Option<String>,
        lon: Option<String>,
    },
}

impl InputSource {
    pub fn kind(&self) -> BatchKind {
        match self {
            InputSource::Points { .. } => BatchKind::Reverse,
            _ => BatchKind::Forward,
        }
    }
}

pub struct GeocodePipeline<S: Storage, C: ConfigProvider, G: ServiceClient> {
    storage: S,
    config: C,
    client: Arc<G>,
    source: InputSource,
}

impl<S: Storage, C: ConfigProvider, G: ServiceClient + 'static> GeocodePipeline<S, C, G> {
    pub fn new(storage: S, config: C, client: Arc<G>, source: InputSource) -> Self {
        Self {
            storage,
            config,
            client,
            source,
        }
    }

    async fn read_text(&self, path: &str) -> Result<String> {
        let data = self.storage.read_file(path).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn extract_table(
        &self,
        path: &str,
        overrides: &[(AddressRole, String)],
        mode: TableQueryMode,
    ) -> Result<Vec<BatchItem>> {
        let table = input::read_table(&self.storage.read_file(path).await?)?;
        tracing::debug!("Table headers: {:?}", table.headers);

        let mut mapping = columns::infer_address_columns(&table.headers);
        columns::apply_overrides(&mut mapping, &table.headers, overrides)?;
        if mapping.is_empty() {
            return Err(GeocodeError::ConfigError {
                message: format!(
                    "no address columns recognised in {:?}; choose them with --street, --city, ... or --full-address",
                    table.headers
                ),
            });
        }
        tracing::debug!("Column mapping: {:?}", mapping);

        Ok(input::table_items(&table, &mapping, mode))
    }

    async fn extract_points(
        &self,
        path: &str,
        lat: Option<&str>,
        lon: Option<&str>,
    ) -> Result<Vec<BatchItem>> {
        let table = input::read_table(&self.storage.read_file(path).await?)?;
        let (guessed_lat, guessed_lon) = columns::infer_point_columns(&table.headers);

        let lat_col = match lat {
            Some(name) => Some(columns::find_column(&table.headers, "latitude", name)?),
            None => guessed_lat,
        };
        let lon_col = match lon {
            Some(name) => Some(columns::find_column(&table.headers, "longitude", name)?),
            None => guessed_lon,
        };
        let (Some(lat_col), Some(lon_col)) = (lat_col, lon_col) else {
            return Err(GeocodeError::MissingConfigError {
                field: "latitude/longitude columns (--lat, --lon)".to_string(),
            });
        };
        if lat.is_none() || lon.is_none() {
            tracing::info!(
                "Guessed point columns: lat='{}', lon='{}' (override with --lat/--lon)",
                table.headers[lat_col],
                table.headers[lon_col]
            );
        }

        Ok(input::point_items(&table, lat_col, lon_col))
    }

    fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.config.layer_name(), extension)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, G: ServiceClient + 'static> Pipeline
    for GeocodePipeline<S, C, G>
{
    type Output = BatchOutcome;

    async fn extract(&self) -> Result<Vec<BatchItem>> {
        let items = match &self.source {
            InputSource::Table {
                path,
                columns,
                mode,
            } => self.extract_table(path, columns, *mode).await?,
            InputSource::Text(TextInput::File(path)) => {
                input::free_form_items(&self.read_text(path).await?)
            }
            InputSource::Text(TextInput::Inline(text)) => input::free_form_items(text),
            InputSource::Points { path, lat, lon } => {
                self.extract_points(path, lat.as_deref(), lon.as_deref())
                    .await?
            }
        };
        tracing::debug!("Extracted {} items", items.len());
        Ok(items)
    }

    async fn transform(&self, items: Vec<BatchItem>) -> Result<BatchOutcome> {
        let geocoder =
            BatchGeocoder::new(Arc::clone(&self.client), BatchOptions::from_config(&self.config));
        geocoder.run(self.source.kind(), items).await
    }

    async fn load(&self, outcome: &BatchOutcome) -> Result<String> {
        let generated_at = chrono::Utc::now();
        let mut files = Vec::new();

        for format in self.config.output_formats() {
            let data = match format {
                OutputFormat::Geojson => {
                    serde_json::to_vec_pretty(&export::to_geojson(&outcome.layer, generated_at))?
                }
                OutputFormat::Csv => export::to_csv(&outcome.layer)?,
            };
            files.push((self.file_name(format.extension()), data));
        }
        files.push((
            format!("{}_report.txt", self.config.layer_name()),
            outcome.report.to_string().into_bytes(),
        ));

        let written = if self.config.bundle() {
            let name = self.file_name("zip");
            let zip_data = export::bundle(&files)?;
            tracing::debug!("Writing ZIP file ({} bytes)", zip_data.len());
            self.storage.write_file(&name, &zip_data).await?;
            vec![name]
        } else {
            for (name, data) in &files {
                tracing::debug!("Writing {} ({} bytes)", name, data.len());
                self.storage.write_file(name, data).await?;
            }
            files.into_iter().map(|(name, _)| name).collect()
        };

        let base = self.config.output_path().trim_end_matches('/');
        Ok(written
            .iter()
            .map(|name| format!("{}/{}", base, name))
            .collect::<Vec<_>>()
            .join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ExecutionMode, GeocodeRequest};
    use crate::domain::ports::FetchError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_file(path: &str, data: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), data.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                GeocodeError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        formats: Vec<OutputFormat>,
        bundle: bool,
        detailed: bool,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                formats: vec![OutputFormat::Geojson, OutputFormat::Csv],
                bundle: false,
                detailed: false,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn search_url(&self) -> String {
            "http://geo/search".to_string()
        }
        fn reverse_url(&self) -> String {
            "http://geo/reverse".to_string()
        }
        fn max_address(&self) -> usize {
            100
        }
        fn level_of_detail(&self) -> u8 {
            18
        }
        fn max_results(&self) -> usize {
            1
        }
        fn detailed(&self) -> bool {
            self.detailed
        }
        fn show_labels(&self) -> bool {
            false
        }
        fn layer_name(&self) -> &str {
            "places"
        }
        fn output_path(&self) -> &str {
            "test_output"
        }
        fn output_formats(&self) -> Vec<OutputFormat> {
            self.formats.clone()
        }
        fn bundle(&self) -> bool {
            self.bundle
        }
        fn execution_mode(&self) -> ExecutionMode {
            ExecutionMode::Sequential
        }
        fn concurrent_requests(&self) -> usize {
            1
        }
    }

    struct EchoClient;

    #[async_trait]
    impl ServiceClient for EchoClient {
        async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
            if url.contains("reverse") {
                Ok(r#"{"display_name": "Somewhere", "osm_type": "node", "osm_id": 7}"#.to_string())
            } else if url.contains("Nowhere") {
                Ok("[]".to_string())
            } else {
                Ok(r#"[{"lat": "10", "lon": "20", "display_name": "Found", "class": "place"}]"#
                    .to_string())
            }
        }
    }

    fn pipeline(
        storage: MockStorage,
        config: MockConfig,
        source: InputSource,
    ) -> GeocodePipeline<MockStorage, MockConfig, EchoClient> {
        GeocodePipeline::new(storage, config, Arc::new(EchoClient), source)
    }

    #[tokio::test]
    async fn test_extract_table_infers_columns() {
        let storage = MockStorage::with_file(
            "in.csv",
            "id;Street Name;City;Country\n1;Main St;Springfield;USA\n",
        );
        let p = pipeline(
            storage,
            MockConfig::new(),
            InputSource::Table {
                path: "in.csv".to_string(),
                columns: vec![],
                mode: TableQueryMode::Structured,
            },
        );

        let items = p.extract().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "1,Main St,Springfield,USA");
    }

    #[tokio::test]
    async fn test_extract_table_without_address_columns_fails() {
        let storage = MockStorage::with_file("in.csv", "id,value\n1,2\n");
        let p = pipeline(
            storage,
            MockConfig::new(),
            InputSource::Table {
                path: "in.csv".to_string(),
                columns: vec![],
                mode: TableQueryMode::Structured,
            },
        );

        let err = p.extract().await.unwrap_err();
        assert!(matches!(err, GeocodeError::ConfigError { .. }));
    }

    #[tokio::test]
    async fn test_extract_points_requires_columns() {
        let storage = MockStorage::with_file("pts.csv", "x,y\n1,2\n");
        let p = pipeline(
            storage,
            MockConfig::new(),
            InputSource::Points {
                path: "pts.csv".to_string(),
                lat: None,
                lon: None,
            },
        );
        assert!(matches!(
            p.extract().await.unwrap_err(),
            GeocodeError::MissingConfigError { .. }
        ));
    }

    #[tokio::test]
    async fn test_extract_points_with_explicit_columns() {
        let storage = MockStorage::with_file("pts.csv", "x,y\n2.5,1.5\n");
        let p = pipeline(
            storage,
            MockConfig::new(),
            InputSource::Points {
                path: "pts.csv".to_string(),
                lat: Some("Y".to_string()),
                lon: Some("x".to_string()),
            },
        );
        let items = p.extract().await.unwrap();
        assert!(matches!(items[0].request, GeocodeRequest::Reverse(_)));
    }

    #[tokio::test]
    async fn test_full_run_writes_outputs() {
        let storage = MockStorage::with_file("list.txt", "Paris\nNowhere\n");
        let p = pipeline(
            storage.clone(),
            MockConfig::new(),
            InputSource::Text(TextInput::File("list.txt".to_string())),
        );

        let items = p.extract().await.unwrap();
        let outcome = p.transform(items).await.unwrap();
        assert_eq!(outcome.report.stats.successes, 1);
        assert_eq!(outcome.report.stats.errors, 1);

        let output = p.load(&outcome).await.unwrap();
        assert_eq!(
            output,
            "test_output/places.geojson, test_output/places.csv, test_output/places_report.txt"
        );

        let geojson: serde_json::Value =
            serde_json::from_slice(&storage.get_file("places.geojson").await.unwrap()).unwrap();
        assert_eq!(
            geojson["features"][0]["geometry"]["coordinates"],
            serde_json::json!([20.0, 10.0])
        );
        let report =
            String::from_utf8(storage.get_file("places_report.txt").await.unwrap()).unwrap();
        assert!(report.contains("Nowhere (no results)"));
        assert!(report.contains("Number of Errors: 1"));
    }

    #[tokio::test]
    async fn test_bundle_writes_single_zip() {
        let storage = MockStorage::with_file("pts.csv", "lat,lon\n1,2\n");
        let mut config = MockConfig::new();
        config.bundle = true;
        config.detailed = true;
        let p = pipeline(
            storage.clone(),
            config,
            InputSource::Points {
                path: "pts.csv".to_string(),
                lat: None,
                lon: None,
            },
        );

        let items = p.extract().await.unwrap();
        let outcome = p.transform(items).await.unwrap();
        let output = p.load(&outcome).await.unwrap();

        assert_eq!(output, "test_output/places.zip");
        assert!(storage.get_file("places.geojson").await.is_none());
        let zip_data = storage.get_file("places.zip").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["places.csv", "places.geojson", "places_report.txt"]
        );
        assert_eq!(outcome.layer.features()[0].attributes[1], "7");
    }
}
