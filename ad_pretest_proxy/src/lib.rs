// THEORY:
// The proxy is the server-side half of the pretest tool. Browsers cannot fetch heatmaps
// from the heatmap host directly (CORS, and the API key must stay secret), so
// `/api/proxy-heatmap` fetches the URL on their behalf, adds the bearer credential from
// the environment and relays bytes and content type unchanged. `/api/analyze` runs the
// whole pretest engine on an uploaded creative and answers with the exported JSON
// document, fetching any external heatmap in-process with the same credential.
//
// Every response, success or failure, is marked `Cache-Control: no-store`.

pub mod error;

use ad_pretest::heatmap_source::{DEFAULT_CONTENT_TYPE, NO_STORE};
use ad_pretest::{
    AnalysisConfig, AnalysisPipeline, HeatmapSource, HttpHeatmapSource, OcrEngine, PixelBuffer, Placement,
};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

pub use error::ProxyError;

pub const BIND_ENV: &str = "AP_BIND";
pub const API_KEY_ENV: &str = "HEATMAP_API_KEY";
pub const MAX_PIXELS_ENV: &str = "AP_MAX_PIXELS";
pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
/// Upper bound on uploaded creatives, encoded.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
/// Upper bound on uploaded creatives, decoded (8000 x 5000).
pub const MAX_PIXELS: u64 = 40_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Bearer credential for the heatmap host. Empty values count as absent.
    pub api_key: Option<String>,
    /// Largest creative `/api/analyze` accepts, in pixels.
    pub max_pixels: u64,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            bind_addr: lookup(BIND_ENV)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            api_key: lookup(API_KEY_ENV).filter(|value| !value.is_empty()),
            max_pixels: lookup(MAX_PIXELS_ENV)
                .and_then(|value| value.trim().parse().ok())
                .filter(|&limit: &u64| limit > 0)
                .unwrap_or(MAX_PIXELS),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    upstream: Arc<HttpHeatmapSource>,
    pipeline: AnalysisPipeline,
    max_pixels: u64,
}

impl AppState {
    pub fn new(cfg: &ServerConfig, ocr: Arc<dyn OcrEngine>) -> Self {
        let upstream = Arc::new(HttpHeatmapSource::direct(cfg.api_key.clone()));
        let source: Arc<dyn HeatmapSource> = upstream.clone();
        let pipeline = AnalysisPipeline::new(AnalysisConfig::default(), source, ocr);
        Self {
            upstream,
            pipeline,
            max_pixels: cfg.max_pixels,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/proxy-heatmap", get(proxy_heatmap))
        .route("/api/analyze", post(analyze))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Binds `cfg.bind_addr` and serves until the task is dropped or the listener fails.
pub async fn start_server(cfg: ServerConfig, ocr: Arc<dyn OcrEngine>) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = router(AppState::new(&cfg, ocr));
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(%local, authenticated = cfg.api_key.is_some(), "ad pretest proxy listening");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server stopped");
        }
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ProxyParams {
    url: Option<String>,
}

async fn proxy_heatmap(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Result<Response, ProxyError> {
    let url = params
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or(ProxyError::MissingUrl)?;
    tracing::debug!(%url, "proxying heatmap");

    let fetched = state.upstream.get(&url).await.map_err(|e| {
        tracing::warn!(%url, error = %e, "heatmap fetch failed");
        ProxyError::from(e)
    })?;

    let content_type = HeaderValue::from_str(&fetched.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let mut response = fetched.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeParams {
    heatmap_url: Option<String>,
    placement: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    Query(params): Query<AnalyzeParams>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    if body.is_empty() {
        return Err(ProxyError::BadRequest("missing image body".into()));
    }
    let placement = match params.placement.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<Placement>().map_err(ProxyError::BadRequest)?,
        _ => Placement::default(),
    };
    let max_pixels = state.max_pixels;
    let pixels = tokio::task::spawn_blocking(move || PixelBuffer::decode_within(&body, max_pixels))
        .await
        .map_err(|e| ProxyError::Internal(format!("decode worker failed: {e}")))?
        .map_err(|e| ProxyError::BadRequest(e.to_string()))?;

    let config = AnalysisConfig {
        external_heatmap_url: params.heatmap_url.filter(|url| !url.trim().is_empty()),
        placement,
        ..AnalysisConfig::default()
    };
    let analysis = state
        .pipeline
        .with_config(config)
        .analyze(pixels)
        .await
        .map_err(|e| ProxyError::Internal(e.to_string()))?;
    for entry in &analysis.diagnostics {
        tracing::debug!(%entry, "analysis");
    }

    let mut response = Json(analysis.export_document()).into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    Ok(response)
}
