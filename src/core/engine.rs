use crate::domain::ports::Pipeline;
use crate::domain::scenario::GeneratedScenario;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct ScenarioEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> ScenarioEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Extract and transform: the generated scenario without persisting it.
    pub async fn generate(&self) -> Result<GeneratedScenario> {
        tracing::info!("📡 Fetching catalog...");
        let catalog = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        tracing::info!("🧩 Building schedule...");
        let scenario = self.pipeline.transform(catalog).await?;
        self.monitor.log_stats("Transform");
        tracing::info!(
            "✅ {} schedule for {} clients (gaps {} min, makespan {} min)",
            scenario.status.as_str(),
            scenario.clients.len(),
            scenario.gap_minutes,
            scenario.makespan_minutes
        );

        Ok(scenario)
    }

    /// Full run, returning the scenario and where it was saved.
    pub async fn run(&self) -> Result<(GeneratedScenario, String)> {
        let scenario = self.generate().await?;

        tracing::info!("💾 Saving scenario...");
        let output_path = self.pipeline.load(&scenario).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok((scenario, output_path))
    }
}
