use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{service} API returned {status}: {body}")]
    UpstreamError {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Cannot generate schedule: {message}")]
    InfeasibleError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Configuration,
    Input,
    Solver,
    Storage,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ScenarioError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScenarioError::ApiError(_) => ErrorCategory::Network,
            ScenarioError::UpstreamError { .. } => ErrorCategory::Upstream,
            ScenarioError::ConfigError { .. }
            | ScenarioError::MissingConfigError { .. }
            | ScenarioError::InvalidConfigValueError { .. }
            | ScenarioError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            ScenarioError::ValidationError { .. } | ScenarioError::SerializationError(_) => {
                ErrorCategory::Input
            }
            ScenarioError::InfeasibleError { .. } => ErrorCategory::Solver,
            ScenarioError::ZipError(_) | ScenarioError::CsvError(_) | ScenarioError::IoError(_) => {
                ErrorCategory::Storage
            }
            ScenarioError::ProcessingError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Solver | ErrorCategory::Configuration => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage | ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// HTTP status used by the service surfaces.
    pub fn http_status(&self) -> u16 {
        match self {
            ScenarioError::ValidationError { .. } | ScenarioError::SerializationError(_) => 400,
            ScenarioError::InfeasibleError { .. } => 422,
            ScenarioError::UpstreamError { status, .. } if *status == 401 || *status == 403 => {
                *status
            }
            ScenarioError::UpstreamError { .. } | ScenarioError::ApiError(_) => 502,
            _ => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ScenarioError::ApiError(_) => {
                "Check network connectivity and the NX_API_URL_* endpoints".to_string()
            }
            ScenarioError::UpstreamError {
                status, service, ..
            } if *status == 401 || *status == 403 => {
                format!("Check the authorization value forwarded to the {} API", service)
            }
            ScenarioError::UpstreamError { service, .. } => {
                format!("The {} API rejected the request; retry later or inspect its logs", service)
            }
            ScenarioError::MissingConfigError { field } => {
                format!("Set {} in the environment or on the command line", field)
            }
            ScenarioError::InvalidConfigValueError { field, .. }
            | ScenarioError::ConfigValidationError { field, .. } => {
                format!("Fix the value of {}", field)
            }
            ScenarioError::ConfigError { .. } => "Review the solver configuration file".to_string(),
            ScenarioError::ValidationError { .. } | ScenarioError::SerializationError(_) => {
                "Review the scenario action payload and the catalog data".to_string()
            }
            ScenarioError::InfeasibleError { .. } => {
                "Increase SOLVER_MAX_MINUTES, raise maxGap or reduce the number of clients"
                    .to_string()
            }
            ScenarioError::ZipError(_) | ScenarioError::CsvError(_) | ScenarioError::IoError(_) => {
                "Check that the output path is writable".to_string()
            }
            ScenarioError::ProcessingError { .. } => {
                "Report this error with the input scenario".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach an upstream API: {}", self),
            ErrorCategory::Upstream => format!("An upstream API returned an error: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Invalid input: {}", self),
            ErrorCategory::Solver => self.to_string(),
            ErrorCategory::Storage => format!("Could not write the output: {}", self),
            ErrorCategory::Internal => format!("Unexpected error: {}", self),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ScenarioError::ValidationError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_maps_to_unprocessable() {
        let err = ScenarioError::InfeasibleError {
            message: "no room".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Solver);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.http_status(), 422);
        assert!(err.to_string().starts_with("Cannot generate schedule"));
    }

    #[test]
    fn test_upstream_auth_failure_keeps_status() {
        let err = ScenarioError::UpstreamError {
            service: "activity".to_string(),
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.http_status(), 401);
        assert!(err.recovery_suggestion().contains("activity"));

        let err = ScenarioError::UpstreamError {
            service: "resource".to_string(),
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.http_status(), 502);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }
    #[test]
    fn test_severity_per_category() {
        let cases = [
            (ScenarioError::validation("empty"), ErrorSeverity::High, 400),
            (
                ScenarioError::MissingConfigError {
                    field: "NX_API_URL_RESOURCE".to_string(),
                },
                ErrorSeverity::High,
                500,
            ),
            (
                ScenarioError::IoError(std::io::Error::other("disk full")),
                ErrorSeverity::Critical,
                500,
            ),
            (
                ScenarioError::ProcessingError {
                    message: "solver task panicked".to_string(),
                },
                ErrorSeverity::Critical,
                500,
            ),
        ];
        for (err, severity, status) in cases {
            assert_eq!(err.severity(), severity, "{}", err);
            assert_eq!(err.http_status(), status, "{}", err);
        }
        assert!(ErrorSeverity::Medium < ErrorSeverity::High);
    }
}
