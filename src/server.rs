//! HTTP boundary exposing the search as a service.
//!
//! Pass-through wrappers around the controller, generator and evaluator:
//! the handlers carry no search logic of their own. Shared state is a set
//! of explicit objects constructed once in `main` and cloned into the
//! router; the synchronous search runs on a blocking thread per request.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::database::{Schema, SqlDatabase};
use crate::llm::LlmClient;
use crate::metrics::MetricsRecord;
use crate::score::ExecutionEvaluator;
use crate::search::{SearchConfig, SearchController};

/// Collaborators shared across requests. Each search still opens its own
/// database connection per evaluation call, so concurrent questions never
/// contend on a handle.
pub struct AppState {
    pub db: Arc<SqlDatabase>,
    pub llm: Arc<LlmClient>,
    pub schema: Schema,
    pub search: SearchConfig,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default = "default_use_search")]
    pub use_search: bool,
    #[serde(default)]
    pub iterations: Option<u32>,
}

fn default_use_search() -> bool {
    true
}

#[derive(Serialize)]
pub struct ResultsPayload {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub sql_query: String,
    pub execution_success: bool,
    pub results: ResultsPayload,
    pub metrics: MetricsRecord,
    pub error_message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/v1/query", post(query))
        .route("/v1/schema", get(schema))
        .route("/v1/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let mut config = state.search.clone();
    if let Some(iterations) = request.iterations {
        config.num_iterations = iterations;
    }
    // Out-of-range budgets are a caller mistake, rejected before any work.
    if let Err(e) = config.validate() {
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    let state_for_task = Arc::clone(&state);
    let question = request.question.clone();
    let use_search = request.use_search;
    // The controller is synchronous; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        let evaluator = ExecutionEvaluator::new(&state_for_task.db);
        let controller =
            SearchController::new(state_for_task.llm.as_ref(), &evaluator, config)?;
        let (sql_query, metrics) = if use_search {
            let outcome = controller.search(&question, &state_for_task.schema);
            (outcome.best_query, MetricsRecord::Mcts(outcome.metrics))
        } else {
            let outcome = controller.baseline(&question, &state_for_task.schema);
            (outcome.query, MetricsRecord::Baseline(outcome.metrics))
        };
        Ok::<_, crate::error::ScoutError>((sql_query, metrics))
    })
    .await
    .map_err(|e| {
        warn!(error = %e, "search task join error");
        (StatusCode::INTERNAL_SERVER_ERROR, "join error".to_string())
    })?;

    let (sql_query, metrics) = result.map_err(|e| {
        warn!(error = %e, "search rejected");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    // One final execution of the chosen query for the response body.
    let outcome = state.db.execute_query(&sql_query);
    info!(
        question = %request.question,
        success = outcome.success,
        rows = outcome.rows.len(),
        "query answered"
    );
    Ok(Json(QueryResponse {
        sql_query,
        execution_success: outcome.success,
        results: ResultsPayload {
            columns: outcome.columns,
            rows: outcome.rows,
        },
        metrics,
        error_message: outcome.error.unwrap_or_default(),
    }))
}

async fn schema(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "schema": state.schema }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now(),
    })
}
