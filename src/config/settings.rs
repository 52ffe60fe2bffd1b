use crate::adapters::http::DEFAULT_USER_AGENT;
use crate::core::ConfigProvider;
use crate::domain::model::{ExecutionMode, OutputFormat};
use crate::utils::error::{GeocodeError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SERVICE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_MAX_ADDRESS: usize = 100;
pub const DEFAULT_LEVEL_OF_DETAIL: u8 = 18;

/// Persisted settings. Every section and key is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceSettings,
    pub batch: BatchSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub url: String,
    pub search_path: String,
    pub reverse_path: String,
    pub user_agent: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVICE_URL.to_string(),
            search_path: "/search".to_string(),
            reverse_path: "/reverse".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub max_address: usize,
    /// Zoom passed to reverse lookups (0 = country, 18 = building).
    pub level_of_detail: u8,
    pub max_results: usize,
    pub mode: ExecutionMode,
    pub concurrent_requests: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_address: DEFAULT_MAX_ADDRESS,
            level_of_detail: DEFAULT_LEVEL_OF_DETAIL,
            max_results: 1,
            mode: ExecutionMode::Sequential,
            concurrent_requests: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: String,
    pub layer_name: String,
    pub formats: Vec<String>,
    pub detailed: bool,
    pub show_labels: bool,
    pub bundle: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            layer_name: "nominatim".to_string(),
            formats: vec!["geojson".to_string()],
            detailed: false,
            show_labels: false,
            bundle: false,
        }
    }
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults when the file does not exist; a broken file is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No settings file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GeocodeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NOMINATIM_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| GeocodeError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the settings so the next run picks them up.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Puts the service URL, batch limit and level of detail back to their
    /// defaults, leaving output choices alone.
    pub fn restore_defaults(&mut self) {
        self.service.url = DEFAULT_SERVICE_URL.to_string();
        self.batch.max_address = DEFAULT_MAX_ADDRESS;
        self.batch.level_of_detail = DEFAULT_LEVEL_OF_DETAIL;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.service.timeout_seconds.map(Duration::from_secs)
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.service.url.trim().trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("service.url", &self.service.url)?;
        validation::validate_non_empty_string("service.user_agent", &self.service.user_agent)?;
        if let Some(timeout) = self.service.timeout_seconds {
            validation::validate_positive_number("service.timeout_seconds", timeout as usize, 1)?;
        }
        validation::validate_positive_number("batch.max_address", self.batch.max_address, 1)?;
        validation::validate_range("batch.level_of_detail", self.batch.level_of_detail, 0, 18)?;
        validation::validate_range("batch.max_results", self.batch.max_results, 1, 50)?;
        validation::validate_positive_number(
            "batch.concurrent_requests",
            self.batch.concurrent_requests,
            1,
        )?;
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_non_empty_string("output.layer_name", &self.output.layer_name)?;
        let formats: Vec<String> = self
            .output
            .formats
            .iter()
            .map(|f| f.trim().to_ascii_lowercase())
            .collect();
        validation::validate_choices("output.formats", &formats, &OutputFormat::NAMES)?;
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn search_url(&self) -> String {
        self.endpoint(&self.service.search_path)
    }

    fn reverse_url(&self) -> String {
        self.endpoint(&self.service.reverse_path)
    }

    fn max_address(&self) -> usize {
        self.batch.max_address
    }

    fn level_of_detail(&self) -> u8 {
        self.batch.level_of_detail
    }

    fn max_results(&self) -> usize {
        self.batch.max_results
    }

    fn detailed(&self) -> bool {
        self.output.detailed
    }

    fn show_labels(&self) -> bool {
        self.output.show_labels
    }

    fn layer_name(&self) -> &str {
        &self.output.layer_name
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> Vec<OutputFormat> {
        let mut formats: Vec<OutputFormat> = Vec::new();
        for format in self.output.formats.iter().filter_map(|f| f.parse().ok()) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        formats
    }

    fn bundle(&self) -> bool {
        self.output.bundle
    }

    fn execution_mode(&self) -> ExecutionMode {
        self.batch.mode
    }

    fn concurrent_requests(&self) -> usize {
        self.batch.concurrent_requests
    }
}
