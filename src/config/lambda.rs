use crate::config::ServiceConfig;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::env;

/// Lambda 的時間上限較短，未設定時預設 3 分鐘
pub const DEFAULT_LAMBDA_SOLVER_MAX_MINUTES: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub service: ServiceConfig,
    /// Value of `_HANDLER` (the image `CMD`), e.g. `main.handler`.
    pub handler: String,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        let mut service =
            ServiceConfig::from_env_with_default_budget(DEFAULT_LAMBDA_SOLVER_MAX_MINUTES);
        // Lambda 只有 /tmp 可寫
        service.output_path = env::var(crate::config::ENV_OUTPUT_PATH)
            .unwrap_or_else(|_| "/tmp/scenario-output".to_string());

        Ok(Self {
            service,
            handler: env::var("_HANDLER").unwrap_or_else(|_| "main.handler".to_string()),
        })
    }
}

impl ConfigProvider for LambdaConfig {
    fn resource_api_url(&self) -> &str {
        &self.service.resource_api_url
    }

    fn activity_api_url(&self) -> &str {
        &self.service.activity_api_url
    }

    fn assessment_api_url(&self) -> &str {
        &self.service.assessment_api_url
    }

    fn output_path(&self) -> &str {
        &self.service.output_path
    }

    fn solver_max_minutes(&self) -> f64 {
        self.service.solver_max_minutes
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        self.service.validate()?;
        // Lambda 最長執行 15 分鐘
        crate::utils::validation::validate_range(
            crate::config::ENV_SOLVER_MAX_MINUTES,
            self.service.solver_max_minutes,
            0.0,
            15.0,
        )?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}
