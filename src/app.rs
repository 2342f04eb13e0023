use crate::discover::{self, DiscoverTarget};
use crate::models::{MediaKind, PersonResultPage, ResultPage};
use crate::query::normalize_query;
use crate::search::{self, SearchOutcome, SearchTarget};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{env, net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

const DEFAULT_PORT: u16 = 3000;
const STATIC_DIR: &str = "public";

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
}

pub async fn run_server() -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_env()?);
    let state = AppState { tmdb };

    let app = build_router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(handle_search))
        .route("/discover", get(handle_discover))
        .route("/details/:kind/:id", get(handle_details))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(STATIC_DIR))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn upstream_error(err: anyhow::Error) -> ApiError {
    error!("Upstream request failed: {:?}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to fetch data" })),
    )
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<u32>,
    #[serde(rename = "type")]
    target: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let query = normalize_query(params.q.as_deref().unwrap_or_default());
    if query.is_empty() {
        return Err(bad_request("Query required"));
    }
    let page = params.page.unwrap_or(1);
    let target = match params.target.as_deref() {
        None => SearchTarget::default(),
        Some(value) => SearchTarget::parse(value).ok_or_else(|| bad_request("Unknown search type"))?,
    };

    let outcome = search::dispatch(state.tmdb.as_ref(), &query, page, target)
        .await
        .map_err(upstream_error)?;

    Ok(match outcome {
        SearchOutcome::Titles(results) => Json(ResultPage { results }).into_response(),
        SearchOutcome::Person {
            results,
            matched_names,
        } => Json(PersonResultPage {
            results,
            person_name: matched_names,
        })
        .into_response(),
    })
}

#[derive(Debug, Deserialize)]
struct DiscoverParams {
    page: Option<u32>,
    genre: Option<u32>,
    #[serde(rename = "type")]
    target: Option<String>,
}

async fn handle_discover(
    State(state): State<AppState>,
    Query(params): Query<DiscoverParams>,
) -> Result<Response, ApiError> {
    let page = params.page.unwrap_or(1);
    let target = match params.target.as_deref() {
        None => DiscoverTarget::default(),
        Some(value) => DiscoverTarget::parse(value).ok_or_else(|| bad_request("Unknown media type"))?,
    };

    let results = discover::browse(state.tmdb.as_ref(), target, page, params.genre)
        .await
        .map_err(upstream_error)?;
    Ok(Json(ResultPage { results }).into_response())
}

async fn handle_details(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<Response, ApiError> {
    let kind = MediaKind::parse(&kind).ok_or_else(|| bad_request("Unknown media type"))?;
    let payload = state
        .tmdb
        .details(kind, id)
        .await
        .map_err(upstream_error)?;
    Ok(Json(payload).into_response())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
