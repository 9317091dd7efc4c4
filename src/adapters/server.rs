use crate::adapters::http::HttpCatalogSource;
use crate::config::cli::LocalStorage;
use crate::config::solver_config::SolverConfig;
use crate::config::ServiceConfig;
use crate::core::engine::ScenarioEngine;
use crate::core::pipeline::{ScenarioJob, ScenarioPipeline};
use crate::domain::model::ScenarioRequest;
use crate::domain::scenario::GeneratedScenario;
use crate::utils::error::{Result, ScenarioError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared by every request; the catalog client and its connection pool are
/// built once at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: ServiceConfig,
    pub solver: SolverConfig,
    pub source: HttpCatalogSource,
}

impl AppState {
    pub fn new(service: ServiceConfig, solver: SolverConfig) -> Result<Self> {
        let source = HttpCatalogSource::new(&service, &solver.upstream)?;
        Ok(Self {
            service,
            solver,
            source,
        })
    }
}

/// Error body: `{ error, category, suggestion }` with the status the error
/// maps to.
pub struct ApiError(ScenarioError);

impl From<ScenarioError> for ApiError {
    fn from(error: ScenarioError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let status =
            StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!("❌ {} (Category: {:?})", error, error.category());
        } else {
            tracing::warn!("⚠️ {} (Category: {:?})", error, error.category());
        }

        let body = json!({
            "error": error.user_friendly_message(),
            "category": format!("{:?}", error.category()),
            "suggestion": error.recovery_suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(generate_scenario).post(generate_scenario))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn health() -> &'static str {
    "OK"
}

/// The body is the scenario request; `GET` with a body is accepted like
/// `POST`. The `Authorization` header is used when the body has none.
async fn generate_scenario(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<GeneratedScenario>, ApiError> {
    if body.is_empty() {
        return Err(ScenarioError::validation("request body must be a scenario action").into());
    }
    let mut request: ScenarioRequest = serde_json::from_slice(&body).map_err(ScenarioError::from)?;
    if request.authorization.is_none() {
        request.authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
    }

    let job = ScenarioJob::new(request, state.solver.clone(), &state.service);
    let storage = LocalStorage::new(state.service.output_path.clone());
    let engine = ScenarioEngine::new(ScenarioPipeline::new(storage, state.source.clone(), job));

    Ok(Json(engine.generate().await?))
}

pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("🚀 Scenario service listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
