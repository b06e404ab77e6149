//! API Service - Question answering over agriculture and rainfall data
//!
//! Endpoints:
//! - GET /api/health - Row counts, latest year, readiness
//! - GET /api/test - Connectivity check
//! - POST /api/query - Answer a natural-language question
//!
//! The datasets are built once at startup and shared read-only by every
//! request.

mod engine;
mod entities;
mod router;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use collector::{OgdClient, OgdConfig, SourcesConfig};
use engine::{Answer, QueryEngine};
use parser::Datasets;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
struct AppState {
    engine: Arc<QueryEngine>,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    agriculture_rows: usize,
    climate_rows: usize,
    latest_year: i32,
    data_loaded: bool,
}

#[derive(Serialize)]
struct TestResponse {
    message: &'static str,
    timestamp: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

const NO_DATA_ANSWER: &str = "**❌ CRITICAL ERROR**\n\nNo data is loaded. Please ensure:\n\
    1. CSV files are in the 'data' folder\n\
    2. Files are named correctly\n\
    3. Check terminal for detailed error messages.";

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let datasets = state.engine.datasets();
    Json(HealthResponse {
        status: "running",
        agriculture_rows: datasets.agriculture.len(),
        climate_rows: datasets.climate.len(),
        latest_year: datasets.latest_year(),
        data_loaded: !datasets.is_empty(),
    })
}

async fn test_handler() -> Json<TestResponse> {
    Json(TestResponse {
        message: "Backend is working!",
        timestamp: chrono::Local::now().to_rfc3339(),
    })
}

async fn query_handler(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    if !state.engine.has_data() {
        error!("query received but no data is loaded");
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(Answer::plain(NO_DATA_ANSWER))).into_response();
    }

    let question = match payload {
        Ok(Json(request)) => request.question.unwrap_or_default(),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable query body");
            String::new()
        }
    };

    if question.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No question provided");
    }

    info!(question = %question, "new query");
    let (_, answer) = state.engine.ask(&question);
    Json(answer).into_response()
}

/// Turns a panic inside a handler into a JSON 500
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(detail = %detail, "handler panicked");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal error: {}", detail),
    )
}

fn app(engine: Arc<QueryEngine>) -> Router {
    // CORS for web frontend
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/test", get(test_handler))
        .route("/api/query", post(query_handler))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(AppState { engine })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let bind = std::env::var("API_BIND").unwrap_or_else(|_| "127.0.0.1:5000".to_string());
    let sources_path = PathBuf::from(
        std::env::var("SOURCES_CONFIG").unwrap_or_else(|_| "config/sources.json".to_string()),
    );

    println!("=== Agrodata API ===");
    println!("Loading data...");

    let sources = SourcesConfig::load_or_default(&sources_path)?;
    let ogd = OgdConfig::from_env()?;
    let fetch_limit = ogd.fetch_limit;
    let client = OgdClient::new(ogd).context("Failed to build remote client")?;

    let datasets = Datasets::build(&sources, &client, fetch_limit).await;
    if datasets.is_empty() {
        warn!("no data loaded from any source, queries will fail");
    }

    println!("Agriculture rows: {}", datasets.agriculture.len());
    println!("Climate rows: {}", datasets.climate.len());
    println!("Latest year: {}", datasets.latest_year());

    let engine = Arc::new(QueryEngine::new(Arc::new(datasets)));

    println!("API listening on http://{}", bind);
    println!("\nEndpoints:");
    println!("  GET  /api/health");
    println!("  GET  /api/test");
    println!("  POST /api/query {{\"question\": \"...\"}}");

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    axum::serve(listener, app(engine)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use crate::router::Intent;
    use serde_json::Value;

    fn state() -> AppState {
        AppState {
            engine: Arc::new(QueryEngine::new(Arc::new(fixtures::datasets()))),
        }
    }

    fn empty_state() -> AppState {
        AppState {
            engine: Arc::new(QueryEngine::new(Arc::new(Datasets::default()))),
        }
    }

    fn ask(question: &str) -> Result<Json<QueryRequest>, JsonRejection> {
        Ok(Json(QueryRequest {
            question: Some(question.to_string()),
        }))
    }

    async fn body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let Json(health) = health_handler(State(state())).await;
        assert_eq!(health.status, "running");
        assert_eq!(health.agriculture_rows, 13);
        assert_eq!(health.climate_rows, 6);
        assert_eq!(health.latest_year, 2016);
        assert!(health.data_loaded);
    }

    #[tokio::test]
    async fn test_connectivity_endpoint() {
        let Json(check) = test_handler().await;
        assert_eq!(check.message, "Backend is working!");
        assert!(!check.timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_compare_question() {
        let response = query_handler(State(state()), ask("Compare Maharashtra and Gujarat")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body(response).await;
        let answer = json["answer"].as_str().unwrap();
        assert!(answer.contains("Rainfall Comparison"));
        assert!(answer.contains("Top 5 Crops in MAHARASHTRA"));
        assert!(answer.contains("Top 5 Crops in GUJARAT"));
        assert_eq!(json["sources"][0]["name"], "Agriculture & Climate Database");
        assert_eq!(json["sources"][0]["url"], "data.gov.in");
    }

    #[tokio::test]
    async fn test_highest_rice_question() {
        let state = state();
        let (intent, answer) = state.engine.ask("Which state has highest rice production?");
        assert_eq!(intent, Intent::Highest);
        assert!(answer.answer.contains("- **Crop**: RICE\n"));

        let response = query_handler(State(state), ask("Which state has highest rice production?")).await;
        let json = body(response).await;
        assert!(json["answer"].as_str().unwrap().contains("- **Crop**: RICE"));
    }

    #[tokio::test]
    async fn test_compare_wins_over_trend() {
        let (intent, _) = state().engine.ask("Compare the production trend of Punjab and Kerala");
        assert_eq!(intent, Intent::Compare);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let response = query_handler(State(state()), ask("")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(response).await["error"], "No question provided");

        let missing = Ok(Json(QueryRequest { question: None }));
        let response = query_handler(State(state()), missing).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_question_gets_help() {
        let response = query_handler(State(state()), ask("Tell me a joke")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body(response).await;
        assert!(json["answer"]
            .as_str()
            .unwrap()
            .starts_with("❌ Unable to understand the question."));
        assert_eq!(json["sources"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_no_data_is_a_server_error() {
        let response = query_handler(State(empty_state()), ask("Compare Maharashtra and Gujarat")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body(response).await;
        assert!(json["answer"].as_str().unwrap().contains("CRITICAL ERROR"));
        assert_eq!(json["sources"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_panic_becomes_json_500() {
        let response = handle_panic(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(response).await["error"], "Internal error: index out of bounds");
    }
}
