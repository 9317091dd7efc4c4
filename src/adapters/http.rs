use crate::config::solver_config::UpstreamSettings;
use crate::domain::model::{Activity, Assessment, Condition, Resource};
use crate::domain::ports::{CatalogSource, ConfigProvider};
use crate::utils::error::{Result, ScenarioError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Resource, activity and assessment APIs over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: Client,
    resource_api_url: String,
    activity_api_url: String,
    assessment_api_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

/// Lists come back either bare or wrapped in `{ "data": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Envelope { data: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) | ListBody::Envelope { data: items } => items,
        }
    }
}

impl HttpCatalogSource {
    pub fn new<C: ConfigProvider>(config: &C, upstream: &UpstreamSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            resource_api_url: trim_base(config.resource_api_url()),
            activity_api_url: trim_base(config.activity_api_url()),
            assessment_api_url: trim_base(config.assessment_api_url()),
            retry_attempts: upstream.retry_attempts,
            retry_delay: Duration::from_millis(upstream.retry_delay_millis),
        })
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        authorization: Option<&str>,
    ) -> Result<Vec<T>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::debug!("🌐 GET {} (attempt {})", url, attempt);

            let mut request = self.client.get(url);
            if let Some(value) = authorization {
                request = request.header(AUTHORIZATION, value);
            }

            let retryable = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let body: ListBody<T> = response.json().await?;
                    let items = body.into_vec();
                    tracing::debug!("📥 {} returned {} records", service, items.len());
                    return Ok(items);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = ScenarioError::UpstreamError {
                        service: service.to_string(),
                        status: status.as_u16(),
                        body,
                    };
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    error
                }
                Err(e) => ScenarioError::ApiError(e),
            };

            if attempt > self.retry_attempts {
                return Err(retryable);
            }
            tracing::warn!(
                "⚠️ {} request failed ({}), retrying in {:?}",
                service,
                retryable,
                self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_resources(&self, authorization: Option<&str>) -> Result<Vec<Resource>> {
        let url = format!("{}/resources", self.resource_api_url);
        self.get_list("resource", &url, authorization).await
    }

    async fn fetch_activities(&self, authorization: Option<&str>) -> Result<Vec<Activity>> {
        let url = format!("{}/activities", self.activity_api_url);
        self.get_list("activity", &url, authorization).await
    }

    async fn fetch_assessments(&self, authorization: Option<&str>) -> Result<Vec<Assessment>> {
        let url = format!("{}/assessments", self.assessment_api_url);
        self.get_list("assessment", &url, authorization).await
    }

    async fn fetch_conditions(
        &self,
        authorization: Option<&str>,
        assessment_id: &str,
    ) -> Result<Vec<Condition>> {
        let url = format!(
            "{}/assessments/{}/conditions",
            self.assessment_api_url, assessment_id
        );
        self.get_list("assessment", &url, authorization).await
    }
}
