use crate::domain::model::{Activity, Assessment, Catalog, Condition, Resource};
use crate::domain::scenario::GeneratedScenario;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn resource_api_url(&self) -> &str;
    fn activity_api_url(&self) -> &str;
    fn assessment_api_url(&self) -> &str;
    fn output_path(&self) -> &str;
    fn solver_max_minutes(&self) -> f64;
}

/// Read access to the resource, activity and assessment APIs.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_resources(&self, authorization: Option<&str>) -> Result<Vec<Resource>>;
    async fn fetch_activities(&self, authorization: Option<&str>) -> Result<Vec<Activity>>;
    async fn fetch_assessments(&self, authorization: Option<&str>) -> Result<Vec<Assessment>>;
    async fn fetch_conditions(
        &self,
        authorization: Option<&str>,
        assessment_id: &str,
    ) -> Result<Vec<Condition>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Catalog>;
    async fn transform(&self, catalog: Catalog) -> Result<GeneratedScenario>;
    async fn load(&self, scenario: &GeneratedScenario) -> Result<String>;
}
