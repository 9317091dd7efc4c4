#[cfg(feature = "cli")]
pub mod args;
pub mod cli;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod solver_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_path, validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_API_URL_RESOURCE: &str = "NX_API_URL_RESOURCE";
pub const ENV_API_URL_ACTIVITY: &str = "NX_API_URL_ACTIVITY";
pub const ENV_API_URL_ASSESSMENT: &str = "NX_API_URL_ASSESSMENT";
pub const ENV_SOLVER_MAX_MINUTES: &str = "SOLVER_MAX_MINUTES";
/// Older deployments set this name instead.
pub const ENV_SOLVER_MAX_TIME_MINUTES: &str = "SOLVER_MAX_TIME_MINUTES";
pub const ENV_SOLVER_CONFIG_PATH: &str = "SOLVER_CONFIG_PATH";
pub const ENV_OUTPUT_PATH: &str = "OUTPUT_PATH";

pub const DEFAULT_SOLVER_MAX_MINUTES: f64 = 10.0;

/// Endpoints and time budget shared by every entry point, read from the
/// environment the container images declare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub resource_api_url: String,
    pub activity_api_url: String,
    pub assessment_api_url: String,
    pub solver_max_minutes: f64,
    pub output_path: String,
    pub solver_config_path: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_env_with_default_budget(DEFAULT_SOLVER_MAX_MINUTES)
    }

    pub fn from_env_with_default_budget(default_max_minutes: f64) -> Self {
        Self {
            resource_api_url: env::var(ENV_API_URL_RESOURCE).unwrap_or_default(),
            activity_api_url: env::var(ENV_API_URL_ACTIVITY).unwrap_or_default(),
            assessment_api_url: env::var(ENV_API_URL_ASSESSMENT).unwrap_or_default(),
            solver_max_minutes: read_max_minutes().unwrap_or(default_max_minutes),
            output_path: env::var(ENV_OUTPUT_PATH).unwrap_or_else(|_| "./output".to_string()),
            solver_config_path: env::var(ENV_SOLVER_CONFIG_PATH).ok(),
        }
    }
}

fn read_max_minutes() -> Option<f64> {
    [ENV_SOLVER_MAX_MINUTES, ENV_SOLVER_MAX_TIME_MINUTES]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find_map(|value| match value.trim().parse::<f64>() {
            Ok(minutes) => Some(minutes),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring invalid solver time budget '{}': {}", value, e);
                None
            }
        })
}

impl ConfigProvider for ServiceConfig {
    fn resource_api_url(&self) -> &str {
        &self.resource_api_url
    }

    fn activity_api_url(&self) -> &str {
        &self.activity_api_url
    }

    fn assessment_api_url(&self) -> &str {
        &self.assessment_api_url
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn solver_max_minutes(&self) -> f64 {
        self.solver_max_minutes
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        for (field, url) in [
            (ENV_API_URL_RESOURCE, &self.resource_api_url),
            (ENV_API_URL_ACTIVITY, &self.activity_api_url),
            (ENV_API_URL_ASSESSMENT, &self.assessment_api_url),
        ] {
            validate_required_field(field, url)?;
            validate_url(field, url)?;
        }
        validate_range(ENV_SOLVER_MAX_MINUTES, self.solver_max_minutes, 0.0, 24.0 * 60.0)?;
        validate_path("output_path", &self.output_path)?;

        tracing::debug!("✅ Service configuration validation passed");
        Ok(())
    }
}
