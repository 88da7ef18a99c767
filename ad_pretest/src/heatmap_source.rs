// THEORY:
// Retrieving an external heatmap is the pipeline's only suspension point. The
// `HeatmapSource` trait hides where the bytes come from; the pipeline only sees a tagged
// `Result`. There are no retries and no timeout: a failed request is reported once and
// the pipeline falls back to its internal map.
//
// `HttpHeatmapSource` talks to either the heatmap host directly (forwarding an optional
// bearer credential) or to the heatmap proxy, which adds the credential on its side.
// Every request asks for `no-store` so intermediaries never serve a stale heatmap.

use crate::error::FetchError;
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};

/// Route the proxy serves heatmap fetches on.
pub const PROXY_ROUTE: &str = "/api/proxy-heatmap";
/// Content type assumed when the upstream does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";
pub const NO_STORE: &str = "no-store";

/// Raw heatmap bytes as delivered by the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedHeatmap {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

pub trait HeatmapSource: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedHeatmap, FetchError>>;
}

#[derive(Debug, Clone)]
pub struct HttpHeatmapSource {
    client: reqwest::Client,
    bearer: Option<String>,
    proxy_base: Option<String>,
}

impl HttpHeatmapSource {
    /// Fetches heatmap URLs directly, adding `Authorization: Bearer` when a key is given.
    pub fn direct(bearer: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer: bearer.filter(|key| !key.is_empty()),
            proxy_base: None,
        }
    }

    /// Fetches heatmap URLs through a heatmap proxy at `base` (e.g. `http://127.0.0.1:3001`).
    pub fn via_proxy(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer: None,
            proxy_base: Some(base.into().trim_end_matches('/').to_string()),
        }
    }

    pub async fn get(&self, url: &str) -> Result<FetchedHeatmap, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::InputMissing);
        }

        let mut request = match &self.proxy_base {
            Some(base) => self
                .client
                .get(format!("{base}{PROXY_ROUTE}"))
                .query(&[("url", url)]),
            None => self.client.get(url),
        };
        request = request.header(CACHE_CONTROL, NO_STORE);
        if let Some(key) = &self.bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchedHeatmap {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

impl HeatmapSource for HttpHeatmapSource {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedHeatmap, FetchError>> {
        Box::pin(self.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route(
                "/heatmap.png",
                get(|| async { ([(CONTENT_TYPE.as_str(), "image/png")], vec![1u8, 2, 3]) }),
            )
            .route(
                "/untyped",
                get(|| async { axum::body::Body::from(vec![7u8]) }),
            )
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/echo-auth",
                get(|headers: HeaderMap| async move {
                    headers
                        .get(AUTHORIZATION.as_str())
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none")
                        .to_string()
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn fetches_bytes_and_content_type() {
        let base = spawn_upstream().await;
        let source = HttpHeatmapSource::direct(None);
        let fetched = source.fetch(&format!("{base}/heatmap.png")).await.unwrap();
        assert_eq!(fetched.bytes, vec![1, 2, 3]);
        assert_eq!(fetched.content_type, "image/png");
    }

    #[tokio::test]
    async fn missing_content_type_defaults_to_png() {
        let base = spawn_upstream().await;
        let source = HttpHeatmapSource::direct(None);
        let fetched = source.fetch(&format!("{base}/untyped")).await.unwrap();
        assert_eq!(fetched.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn non_success_status_is_an_upstream_failure() {
        let base = spawn_upstream().await;
        let source = HttpHeatmapSource::direct(None);
        let err = source.fetch(&format!("{base}/missing")).await.unwrap_err();
        assert_eq!(err, FetchError::Upstream(404));
    }

    #[tokio::test]
    async fn bearer_is_forwarded() {
        let base = spawn_upstream().await;
        let source = HttpHeatmapSource::direct(Some("secret".into()));
        let fetched = source.get(&format!("{base}/echo-auth")).await.unwrap();
        assert_eq!(fetched.bytes, b"Bearer secret".to_vec());

        let anonymous = HttpHeatmapSource::direct(Some(String::new()));
        let fetched = anonymous.get(&format!("{base}/echo-auth")).await.unwrap();
        assert_eq!(fetched.bytes, b"none".to_vec());
    }

    #[tokio::test]
    async fn empty_url_is_input_missing() {
        let source = HttpHeatmapSource::direct(None);
        assert_eq!(source.get("  ").await.unwrap_err(), FetchError::InputMissing);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_failure() {
        let source = HttpHeatmapSource::direct(None);
        // Port 9 on localhost (discard) is closed in test environments.
        let err = source.get("http://127.0.0.1:9/heatmap.png").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
