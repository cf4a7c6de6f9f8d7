use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use souq_core::BotError;
use souq_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests, retry in {}s", retry_after_secs(.retry_after))]
    TooManyRequests { retry_after: Duration },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BotError> for ServerError {
    fn from(e: BotError) -> Self {
        match e {
            BotError::PermissionDenied { .. } => ServerError::Forbidden(e.to_string()),
            BotError::Parse(_) | BotError::Validation(_) => ServerError::BadRequest(e.to_string()),
            BotError::Store(store) => match store {
                StoreError::NotFound { .. } => ServerError::NotFound(store.to_string()),
                StoreError::Validation(_) => ServerError::BadRequest(store.to_string()),
                StoreError::InsufficientBalance { .. }
                | StoreError::InsufficientPoints { .. }
                | StoreError::InsufficientStock { .. } => ServerError::Conflict(store.to_string()),
                other => ServerError::Internal(other.to_string()),
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::TooManyRequests { retry_after } => {
                let secs = retry_after_secs(retry_after);
                let body = serde_json::json!({
                    "error": self.to_string(),
                    "retry_after_secs": secs,
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                return response;
            }
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Whole seconds a throttled client should wait, never zero.
fn retry_after_secs(wait: &Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 || secs == 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(retry_after_secs(&Duration::ZERO), 1);
        assert_eq!(retry_after_secs(&Duration::from_millis(300)), 1);
        assert_eq!(retry_after_secs(&Duration::from_secs(2)), 2);
        assert_eq!(retry_after_secs(&Duration::from_millis(2001)), 3);
    }

    #[test]
    fn throttled_response_carries_retry_after() {
        let response = ServerError::TooManyRequests {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
