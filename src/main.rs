use anyhow::Context;
use clap::Parser;
use scenario_solver::adapters::server::{self, AppState};
use scenario_solver::config::args::{Command, ServeArgs, SolveArgs};
use scenario_solver::utils::error::ErrorSeverity;
use scenario_solver::utils::{logger, validation::Validate};
use scenario_solver::{
    CliConfig, HttpCatalogSource, LocalStorage, ScenarioEngine, ScenarioError, ScenarioJob,
    ScenarioPipeline, ScenarioRequest, ServiceConfig, SolverConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match &cli.command {
        Command::Solve(_) => logger::init_cli_logger(cli.verbose),
        Command::Serve(_) => logger::init_server_logger(cli.verbose),
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match &cli.command {
        Command::Solve(args) => solve(args, cli.config.as_deref()).await,
        Command::Serve(args) => serve(args, cli.config.as_deref()).await,
    }
}

fn load_solver_config(path: Option<&str>, service: &ServiceConfig) -> SolverConfig {
    let path = path.or(service.solver_config_path.as_deref());
    let config = SolverConfig::load_optional(path).and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    match config {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    }
}

async fn solve(args: &SolveArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    tracing::info!("Starting scenario-solver");

    let service = args.service_config();
    let mut solver = load_solver_config(config_path, &service);
    if let Some(seed) = args.seed {
        solver.solver.seed = Some(seed);
    }

    let content = tokio::fs::read_to_string(&args.scenario)
        .await
        .with_context(|| format!("cannot read scenario file {}", args.scenario))?;
    let mut request: ScenarioRequest = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid scenario action", args.scenario))?;
    if let Some(authorization) = &args.authorization {
        request.authorization = Some(authorization.clone());
    }

    // 驗證配置
    if let Err(e) = service.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        exit_with(&e);
    }

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source = match HttpCatalogSource::new(&service, &solver.upstream) {
        Ok(source) => source,
        Err(e) => exit_with(&e),
    };
    let storage = LocalStorage::new(service.output_path.clone());
    let job = ScenarioJob::new(request, solver, &service);
    let pipeline = ScenarioPipeline::new(storage, source, job);
    let engine = ScenarioEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok((scenario, output_path)) => {
            tracing::info!("✅ Scenario generated: {}", scenario.status.as_str());
            tracing::info!("📁 Output saved to: {}", output_path);
            println!(
                "✅ {} schedule for {} clients (gaps {} min, makespan {} min)",
                scenario.status.as_str(),
                scenario.clients.len(),
                scenario.gap_minutes,
                scenario.makespan_minutes
            );
            println!("📁 Output saved to: {}", output_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Scenario generation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            exit_with(&e)
        }
    }
}

async fn serve(args: &ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let service = ServiceConfig::from_env();
    if let Err(e) = service.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }
    let solver = load_solver_config(config_path, &service);

    let state = match AppState::new(service, solver) {
        Ok(state) => state,
        Err(e) => exit_with(&e),
    };
    server::serve(&args.host, args.port, state)
        .await
        .with_context(|| format!("scenario service on {}:{} stopped", args.host, args.port))
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_with(e: &ScenarioError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
