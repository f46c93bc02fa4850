//! Crate-wide error taxonomy.
//!
//! Unifies the failure modes of every collaborator (cache, detector, fetcher,
//! compositor, queue) into the five classes the RPC surface understands, and
//! converts to an HTTP response the same way the framework's own per-module
//! error enums do (see `extractors::json::JsonError`).

use http::StatusCode;
use thiserror::Error;

use crate::responder::Responder;
use crate::types::Response;

#[derive(Debug, Error)]
pub enum EmojimiseError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
}

impl EmojimiseError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        EmojimiseError::Internal(err.to_string())
    }
}

impl Responder for EmojimiseError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EmojimiseError::InvalidArgument(m) => (StatusCode::BAD_REQUEST, m.clone()),
            EmojimiseError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            EmojimiseError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
            EmojimiseError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
            EmojimiseError::DeadlineExceeded(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
        };
        tracing::error!(error = %self, status = status.as_u16(), "request failed");
        let body = serde_json::json!({ "error": message }).to_string();
        (status, body).into_response()
    }
}

/// Lets handlers return `Result<R, EmojimiseError>` directly from a route.
impl<T> Responder for Result<T, EmojimiseError>
where
    T: Responder,
{
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
