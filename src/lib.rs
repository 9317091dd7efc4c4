pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::args::CliConfig;
pub use config::{cli::LocalStorage, solver_config::SolverConfig, ServiceConfig};

#[cfg(feature = "lambda")]
pub use config::lambda::LambdaConfig;

pub use adapters::http::HttpCatalogSource;
pub use core::{
    engine::ScenarioEngine,
    pipeline::{ScenarioJob, ScenarioPipeline},
};
pub use domain::model::{ScenarioAction, ScenarioRequest};
pub use domain::scenario::GeneratedScenario;
pub use utils::error::{Result, ScenarioError};
