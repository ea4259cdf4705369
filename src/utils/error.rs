use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Project {id} does not exist")]
    ProjectNotFound { id: u64 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Project {id} returned invalid JSON: {reason}")]
    InvalidProjectJson { id: u64, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HarvestError::ProjectNotFound { .. } => ErrorSeverity::Low,
            HarvestError::ApiError(_)
            | HarvestError::HttpStatus { .. }
            | HarvestError::InvalidProjectJson { .. } => ErrorSeverity::Medium,
            HarvestError::ConfigError { .. }
            | HarvestError::MissingConfigError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::ValidationError { .. }
            | HarvestError::SerializationError(_)
            | HarvestError::CsvError(_)
            | HarvestError::ZipError(_) => ErrorSeverity::High,
            HarvestError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Transient failures worth another attempt for the same project.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HarvestError::ApiError(_)
                | HarvestError::HttpStatus { .. }
                | HarvestError::InvalidProjectJson { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HarvestError::ApiError(e) if e.is_timeout() => {
                "The Scratch servers did not answer in time".to_string()
            }
            HarvestError::ApiError(e) if e.is_connect() => {
                "Could not connect to the Scratch servers".to_string()
            }
            HarvestError::IoError(e) => format!("Could not read or write a local file: {}", e),
            HarvestError::InvalidConfigValueError { field, reason, .. } => {
                format!("Option '{}' is invalid: {}", field, reason)
            }
            HarvestError::MissingConfigError { field } => {
                format!("Option '{}' is required", field)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HarvestError::ApiError(_) | HarvestError::HttpStatus { .. } => {
                "Check the network connection or the proxy, or raise --timeout / --retry"
            }
            HarvestError::ProjectNotFound { .. } => "The project may be private or deleted",
            HarvestError::InvalidProjectJson { .. } => {
                "The server answered with something other than project JSON; try again later"
            }
            HarvestError::IoError(_) => "Check that the output directory exists and is writable",
            HarvestError::ConfigError { .. }
            | HarvestError::MissingConfigError { .. }
            | HarvestError::InvalidConfigValueError { .. }
            | HarvestError::ValidationError { .. } => "Run with --help to see the accepted options",
            HarvestError::SerializationError(_) | HarvestError::CsvError(_) => {
                "Inspect dataset.csv and the session log for the offending project"
            }
            HarvestError::ZipError(_) => "Check free disk space in the output directory",
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
