use crate::config::ServiceConfig;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "scenario-solver")]
#[command(
    about = "Generates clinic assessment day schedules from the resource, activity and assessment APIs"
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Solver rules file (TOML); defaults are used when absent
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Solve one scenario action read from a JSON file
    Solve(SolveArgs),
    /// Run the HTTP service (health check + scenario endpoint)
    Serve(ServeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SolveArgs {
    /// Scenario action JSON (camelCase, as sent to the HTTP endpoint)
    #[arg(long)]
    pub scenario: String,

    /// Authorization value forwarded to the upstream APIs
    #[arg(long)]
    pub authorization: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    /// Overrides SOLVER_MAX_MINUTES
    #[arg(long)]
    pub max_minutes: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub resource_api_url: Option<String>,

    #[arg(long)]
    pub activity_api_url: Option<String>,

    #[arg(long)]
    pub assessment_api_url: Option<String>,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value = "5000")]
    pub port: u16,
}

impl SolveArgs {
    /// Environment first, command line overrides on top.
    pub fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::from_env();
        if let Some(url) = &self.resource_api_url {
            config.resource_api_url = url.clone();
        }
        if let Some(url) = &self.activity_api_url {
            config.activity_api_url = url.clone();
        }
        if let Some(url) = &self.assessment_api_url {
            config.assessment_api_url = url.clone();
        }
        if let Some(minutes) = self.max_minutes {
            config.solver_max_minutes = minutes;
        }
        if let Some(path) = &self.output_path {
            config.output_path = path.clone();
        }
        config
    }
}
