use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Settings serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown column '{column}' for {role}")]
    UnknownColumnError { role: String, column: String },

    #[error("No addresses to geocode")]
    NoAddresses,

    #[error("Maximum geocodes to process exceeded: {requested} requested, limit is {limit}")]
    BatchLimitExceeded { requested: usize, limit: usize },

    #[error("Service error: {message}")]
    ServiceError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Output,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GeocodeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GeocodeError::ConfigError { .. }
            | GeocodeError::InvalidConfigValueError { .. }
            | GeocodeError::MissingConfigError { .. }
            | GeocodeError::TomlSerializeError(_) => ErrorCategory::Configuration,
            GeocodeError::CsvError(_)
            | GeocodeError::UnknownColumnError { .. }
            | GeocodeError::NoAddresses
            | GeocodeError::BatchLimitExceeded { .. } => ErrorCategory::Input,
            GeocodeError::HttpError(_) | GeocodeError::ServiceError { .. } => {
                ErrorCategory::Network
            }
            GeocodeError::ZipError(_) | GeocodeError::IoError(_) => ErrorCategory::Output,
            GeocodeError::SerializationError(_) | GeocodeError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GeocodeError::NoAddresses => ErrorSeverity::Low,
            GeocodeError::HttpError(_) | GeocodeError::ServiceError { .. } => {
                ErrorSeverity::Medium
            }
            GeocodeError::IoError(_) | GeocodeError::ZipError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            GeocodeError::BatchLimitExceeded { .. } => {
                "Reduce the number of addresses or raise max_address in the settings"
            }
            GeocodeError::NoAddresses => "Check that the input holds at least one address",
            GeocodeError::UnknownColumnError { .. } => {
                "Use one of the header names printed with --verbose"
            }
            GeocodeError::HttpError(_) | GeocodeError::ServiceError { .. } => {
                "Check the service URL and your network connection, then try again"
            }
            GeocodeError::CsvError(_) => "Make sure the input is a CSV file with a header row",
            GeocodeError::ConfigError { .. }
            | GeocodeError::InvalidConfigValueError { .. }
            | GeocodeError::MissingConfigError { .. }
            | GeocodeError::TomlSerializeError(_) => {
                "Fix the settings file or run `settings --restore-defaults`"
            }
            GeocodeError::IoError(_) | GeocodeError::ZipError(_) => {
                "Check that the output directory exists and is writable"
            }
            GeocodeError::SerializationError(_) | GeocodeError::ProcessingError { .. } => {
                "Run again with --verbose to see the failing step"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GeocodeError::BatchLimitExceeded { requested, limit } => format!(
                "Maximum geocodes to process were exceeded ({} > {}). Please reduce the number and try again or change the maximum geocodes in Settings.",
                requested, limit
            ),
            GeocodeError::NoAddresses => "No addresses to geocode".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeocodeError>;
