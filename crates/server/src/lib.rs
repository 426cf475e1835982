//! AICC Server
//!
//! HTTP surface for intent classification and clarification sessions.

pub mod auth;
pub mod http;
pub mod metrics;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;

pub use auth::auth_middleware;
pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use session::{CheckedOutSession, SessionManager};
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Pipeline(#[from] aicc_core::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Another request is advancing the same session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    #[error("Max sessions reached")]
    Capacity,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(e) => match e {
                aicc_core::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                aicc_core::Error::SessionClosed(_) => StatusCode::CONFLICT,
                aicc_core::Error::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                aicc_core::Error::LlmUnavailable(_) => StatusCode::BAD_GATEWAY,
                aicc_core::Error::LlmTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                aicc_core::Error::ConfigInvalid(_) | aicc_core::Error::Inference(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::SessionBusy(_) => StatusCode::CONFLICT,
            ServerError::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Pipeline failures other than bad input hand the customer to a human
    pub fn is_fatal(&self) -> bool {
        match self {
            ServerError::Pipeline(e) => {
                e.is_fatal() && !matches!(e, aicc_core::Error::SessionClosed(_))
            }
            _ => false,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Pipeline(e) => e.code(),
            ServerError::SessionNotFound(_) => "session_not_found",
            ServerError::SessionBusy(_) => "session_busy",
            ServerError::Capacity => "capacity",
            ServerError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if self.is_fatal() {
            tracing::error!(error = %self, code = self.code(), "Request failed, escalating");
            let message = match &self {
                ServerError::Pipeline(e) => e.user_message(),
                _ => self.to_string(),
            };
            serde_json::json!({
                "error": self.code(),
                "message": message,
                "action": "escalate_to_human",
            })
        } else {
            tracing::warn!(error = %self, code = self.code(), "Request rejected");
            serde_json::json!({
                "error": self.code(),
                "message": self.to_string(),
            })
        };

        (status, Json(body)).into_response()
    }
}
