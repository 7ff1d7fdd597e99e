use thiserror::Error;

#[derive(Error, Debug)]
pub enum TitrationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Missing required field: {field}")]
    MissingFieldError { field: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Scenario not found: {patient_id}")]
    ScenarioNotFound { patient_id: String },

    #[error("Cannot {operation} while program is in state {from}")]
    InvalidTransition { from: String, operation: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Serialization,
    Configuration,
    Validation,
    Workflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TitrationError {
    pub fn validation(message: impl Into<String>) -> Self {
        TitrationError::ValidationError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TitrationError::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TitrationError::IoError(_) => ErrorCategory::Io,
            TitrationError::SerializationError(_) | TitrationError::TomlError(_) => {
                ErrorCategory::Serialization
            }
            TitrationError::ConfigError { .. } | TitrationError::ScenarioNotFound { .. } => {
                ErrorCategory::Configuration
            }
            TitrationError::ValidationError { .. }
            | TitrationError::MissingFieldError { .. }
            | TitrationError::InvalidValueError { .. } => ErrorCategory::Validation,
            TitrationError::InvalidTransition { .. } => ErrorCategory::Workflow,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Serialization => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Validation => ErrorSeverity::High,
            ErrorCategory::Workflow => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            TitrationError::IoError(_) => {
                "Check that the scenario file exists and the results directory is writable"
            }
            TitrationError::SerializationError(_) => {
                "Check that the scenario or decisions file is valid JSON"
            }
            TitrationError::TomlError(_) => "Check the TOML syntax of the run configuration",
            TitrationError::ConfigError { .. } => "Review the command-line flags and config file",
            TitrationError::ValidationError { .. }
            | TitrationError::MissingFieldError { .. }
            | TitrationError::InvalidValueError { .. } => {
                "Fix the reported field in the scenario, protocol or config and rerun"
            }
            TitrationError::ScenarioNotFound { .. } => {
                "Run with --list to see the available patient ids"
            }
            TitrationError::InvalidTransition { .. } => {
                "Drive the program through its weekly steps in order"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            TitrationError::IoError(e) => format!("Could not read or write a file: {}", e),
            TitrationError::ScenarioNotFound { patient_id } => {
                format!("Patient '{}' is not in the scenarios file", patient_id)
            }
            TitrationError::MissingFieldError { field } => {
                format!("A required field is missing: {}", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TitrationError>;
