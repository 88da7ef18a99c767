// THEORY:
// Every failure the HTTP surface can report maps onto a fixed status table: a missing
// `url` is the caller's fault (400), a non-success answer from the heatmap host is a
// gateway failure (502) carrying the upstream status, and anything else is a 500 whose
// detail goes to the log instead of the client. Bad uploads to `/api/analyze` are 400s.
// Error responses are never cached, same as successful ones.

use ad_pretest::FetchError;
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Errors surfaced by the proxy and analyze routes.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Missing url")]
    MissingUrl,
    #[error("Upstream error: {0}")]
    Upstream(u16),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl | ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FetchError> for ProxyError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InputMissing => ProxyError::MissingUrl,
            FetchError::Upstream(status) => ProxyError::Upstream(status),
            other => ProxyError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match &self {
            ProxyError::Internal(detail) => {
                tracing::error!(detail, "proxy internal error");
                "Proxy error".to_string()
            }
            other => other.to_string(),
        };
        let mut response = (self.status(), body).into_response();
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(ad_pretest::heatmap_source::NO_STORE));
        response
    }
}
