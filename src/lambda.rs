#[cfg(feature = "lambda")]
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
#[cfg(feature = "lambda")]
use scenario_solver::config::lambda::LambdaConfig;
#[cfg(feature = "lambda")]
use scenario_solver::utils::{logger, validation::Validate};
#[cfg(feature = "lambda")]
use scenario_solver::{
    GeneratedScenario, HttpCatalogSource, LocalStorage, ScenarioEngine, ScenarioJob,
    ScenarioPipeline, ScenarioRequest, SolverConfig,
};

#[cfg(feature = "lambda")]
async fn function_handler(event: LambdaEvent<ScenarioRequest>) -> Result<GeneratedScenario, Error> {
    tracing::info!("Starting scenario Lambda function ({})", event.context.request_id);

    // 創建Lambda配置
    let lambda_config = LambdaConfig::from_env()?;
    lambda_config.validate()?;
    let solver = SolverConfig::load_optional(lambda_config.service.solver_config_path.as_deref())?;
    solver.validate()?;

    let source = HttpCatalogSource::new(&lambda_config, &solver.upstream)?;
    let storage = LocalStorage::new(lambda_config.service.output_path.clone());
    let job = ScenarioJob::new(event.payload, solver, &lambda_config);

    // 回應直接帶回排程，不寫檔
    let engine = ScenarioEngine::new(ScenarioPipeline::new(storage, source, job));
    let scenario = engine.generate().await.map_err(|e| {
        tracing::error!("❌ {} (Category: {:?})", e, e.category());
        e
    })?;

    tracing::info!(
        "Scenario Lambda function completed: {} via {}",
        scenario.status.as_str(),
        lambda_config.handler
    );
    Ok(scenario)
}

#[cfg(feature = "lambda")]
#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}

