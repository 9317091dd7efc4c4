use crate::config::solver_config::SolverConfig;
use crate::core::assembly::build_problem;
use crate::core::render::render;
use crate::core::solver::{solve, SolverOptions};
use crate::domain::model::{Catalog, ScenarioRequest};
use crate::domain::ports::{CatalogSource, ConfigProvider, Pipeline, Storage};
use crate::domain::scenario::GeneratedScenario;
use crate::utils::error::{Result, ScenarioError};
use crate::utils::validation::Validate;
use std::collections::HashMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const ARCHIVE_NAME: &str = "scenario_output.zip";

/// One scenario to generate: the request plus the rules and budget to
/// solve it with.
#[derive(Debug, Clone)]
pub struct ScenarioJob {
    pub request: ScenarioRequest,
    pub solver: SolverConfig,
    pub budget_minutes: f64,
    pub output_path: String,
}

impl ScenarioJob {
    pub fn new<C: ConfigProvider>(
        request: ScenarioRequest,
        solver: SolverConfig,
        config: &C,
    ) -> Self {
        Self {
            request,
            solver,
            budget_minutes: config.solver_max_minutes(),
            output_path: config.output_path().to_string(),
        }
    }
}

pub struct ScenarioPipeline<S: Storage, C: CatalogSource> {
    storage: S,
    source: C,
    job: ScenarioJob,
}

impl<S: Storage, C: CatalogSource> ScenarioPipeline<S, C> {
    pub fn new(storage: S, source: C, job: ScenarioJob) -> Self {
        Self {
            storage,
            source,
            job,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: CatalogSource> Pipeline for ScenarioPipeline<S, C> {
    async fn extract(&self) -> Result<Catalog> {
        self.job.request.action.validate()?;
        let authorization = self.job.request.authorization.as_deref();

        let (resources, activities, assessments) = tokio::try_join!(
            self.source.fetch_resources(authorization),
            self.source.fetch_activities(authorization),
            self.source.fetch_assessments(authorization),
        )?;

        let mut conditions = HashMap::new();
        for assessment in assessments.iter().filter(|a| a.enabled && !a.deleted) {
            let fetched = self
                .source
                .fetch_conditions(authorization, &assessment.assessment_id)
                .await?;
            tracing::debug!(
                "Fetched {} conditions for {}",
                fetched.len(),
                assessment.assessment_name
            );
            conditions.insert(assessment.assessment_id.clone(), fetched);
        }

        tracing::info!(
            "📦 Catalog: {} resources, {} activities, {} assessments",
            resources.len(),
            activities.len(),
            assessments.len()
        );

        Ok(Catalog {
            resources,
            activities,
            assessments,
            conditions,
        })
    }

    async fn transform(&self, catalog: Catalog) -> Result<GeneratedScenario> {
        let problem = build_problem(&catalog, &self.job.request.action, &self.job.solver)?;
        let options = SolverOptions::new(&self.job.solver.solver, self.job.budget_minutes);
        tracing::info!(
            "🧮 {} clients across {} assessments, {} rooms",
            problem.clients.len(),
            problem.assessments.len(),
            problem.rooms.len()
        );

        // 搜尋是 CPU 密集工作，移出 async runtime
        tokio::task::spawn_blocking(move || -> Result<GeneratedScenario> {
            let solution = solve(&problem, &options)?;
            Ok(render(&problem, &solution))
        })
        .await
        .map_err(|e| ScenarioError::ProcessingError {
            message: format!("solver task failed: {}", e),
        })?
    }

    async fn load(&self, scenario: &GeneratedScenario) -> Result<String> {
        let output_path = format!("{}/{}", self.job.output_path, ARCHIVE_NAME);

        let csv_data = {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in scenario.rows() {
                writer.serialize(row)?;
            }
            writer.into_inner().map_err(|e| ScenarioError::IoError(e.into_error()))?
        };

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file::<_, ()>("scenario.json", FileOptions::default())?;
            zip.write_all(serde_json::to_string_pretty(scenario)?.as_bytes())?;

            zip.start_file::<_, ()>("schedule.csv", FileOptions::default())?;
            zip.write_all(&csv_data)?;

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(ARCHIVE_NAME, &zip_data).await?;

        Ok(output_path)
    }
}
