//! HTTP server for media proxy endpoints
//!
//! Provides /health, /assets/{namespace} (GET, DELETE) and
//! /assets/{namespace}/batch (POST).

use crate::types::{AssetQuery, BatchItem, BatchRequest, HealthResponse};
use asset_mirror::{MirrorError, RemoteAssetMirror, Resolution, ResolveOptions};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

/// Shared state for the HTTP server
pub struct ServerState {
    pub mirror: RemoteAssetMirror,
    pub default_fallback: String,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(mirror: RemoteAssetMirror, default_fallback: String) -> Self {
        Self {
            mirror,
            default_fallback,
            started_at: Utc::now(),
        }
    }

    fn options(&self, namespace: String, fallback: Option<String>) -> ResolveOptions {
        ResolveOptions {
            namespace,
            fallback: fallback.unwrap_or_else(|| self.default_fallback.clone()),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<String>,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/assets/{namespace}", get(get_asset).delete(evict_asset))
        .route("/assets/{namespace}/batch", post(resolve_batch))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        mirror: state.mirror.stats(),
    })
}

/// Serve a mirrored asset, or point the client at its fallback
async fn get_asset(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    Query(query): Query<AssetQuery>,
) -> Response {
    let opts = state.options(namespace, query.fallback);

    let fallback = match state.mirror.resolve(&query.id, &opts).await {
        Resolution::Local(path) => match tokio::fs::read(&path).await {
            Ok(data) => {
                return (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, content_type_for(&path)),
                        (header::CACHE_CONTROL, "public, max-age=86400"),
                    ],
                    data,
                )
                    .into_response();
            }
            Err(e) => {
                // Removed out-of-band between resolution and read
                warn!(path = ?path, error = %e, "Failed to read mirrored asset");
                opts.fallback
            }
        },
        Resolution::Fallback(fallback) => fallback,
    };

    fallback_response(fallback)
}

fn fallback_response(fallback: String) -> Response {
    if fallback.starts_with("http://") || fallback.starts_with("https://") {
        return (StatusCode::FOUND, [(header::LOCATION, fallback)]).into_response();
    }

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Asset unavailable".to_string(),
            fallback: Some(fallback),
        }),
    )
        .into_response()
}

/// Resolve a gallery of assets in one request
async fn resolve_batch(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    Json(request): Json<BatchRequest>,
) -> Json<Vec<BatchItem>> {
    let opts = state.options(namespace, request.fallback);
    let resolutions = state.mirror.resolve_many(request.ids.as_slice(), &opts).await;

    Json(
        request
            .ids
            .into_iter()
            .zip(resolutions)
            .map(|(id, resolution)| BatchItem::new(id, resolution))
            .collect(),
    )
}

/// Drop an asset from the local mirror
async fn evict_asset(
    State(state): State<SharedState>,
    Path(namespace): Path<String>,
    Query(query): Query<AssetQuery>,
) -> Response {
    match state.mirror.evict(&query.id, &namespace).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ MirrorError::InvalidInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
                fallback: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(id = %query.id, namespace = %namespace, error = %e, "Eviction failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Eviction failed".to_string(),
                    fallback: None,
                }),
            )
                .into_response()
        }
    }
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
