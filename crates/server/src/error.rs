//! Structured errors for the gateway.
//!
//! Every failure becomes an HTTP status and a short plain-text body.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use docmirror_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No fallback name exists in the document.
    #[error("Path {path} not found in {root}")]
    NotFound { path: String, root: String },

    /// Only GET and HEAD are served.
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    /// Lookup or redirect rewriting failed.
    #[error("{0}")]
    Document(#[from] Error),

    /// The response could not be assembled (bad status or header value).
    #[error("RESPONSE_ERROR: {0}")]
    Response(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Document(e) => {
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            GatewayError::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("{}", self);
        }
        (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], self.to_string()).into_response()
    }
}
