use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// The request itself is malformed (missing required key, empty body).
    RequestMalformed(String),
    /// A present field could not be coerced to the expected type.
    InvalidInput {
        /// External name of the offending field.
        field: String,
        /// Human readable reason.
        message: String,
    },
    /// Unexpected failure while building features or running the models.
    InternalComputation(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Shorthand for an [`AppError::InvalidInput`] on `field`.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Strips any context wrappers and returns the root error.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// The offending field, when the root error names one.
    pub fn field(&self) -> Option<&str> {
        match self.root() {
            AppError::InvalidInput { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    /// Message that is safe to hand back to the caller.
    ///
    /// Internal failures are reduced to a generic message; their detail only goes to the log.
    pub fn public_message(&self) -> String {
        match self.root() {
            AppError::RequestMalformed(msg) => msg.clone(),
            AppError::InvalidInput { field, message } => format!("{}: {}", field, message),
            AppError::InternalComputation(_) | AppError::WithContext { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::RequestMalformed(msg) => write!(f, "Bad request: {}", msg),
            AppError::InvalidInput { field, message } => {
                write!(f, "Invalid input for '{}': {}", field, message)
            }
            AppError::InternalComputation(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::RequestMalformed(msg) => {
                tracing::warn!("Rejected malformed request: {}", msg);
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::InvalidInput { field, message } => {
                tracing::warn!("Rejected invalid input on '{}': {}", field, message);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": self.public_message(), "field": field }),
                )
            }
            AppError::InternalComputation(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Internal server error",
                        "message": "Error processing request",
                    }),
                )
            }
            AppError::WithContext { source, context } => {
                // Log full context chain, then answer as the root error would
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.root().clone().into_response();
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_root() {
        let err: Result<(), AppError> =
            Err(AppError::InternalComputation("tree walk failed".to_string()));
        let wrapped = err.context("classifier inference").unwrap_err();

        assert_eq!(
            wrapped.root(),
            &AppError::InternalComputation("tree walk failed".to_string())
        );
        assert_eq!(
            wrapped.to_string(),
            "classifier inference: Internal error: tree walk failed"
        );
    }

    #[test]
    fn test_public_message_hides_internal_detail() {
        let err = AppError::InternalComputation("node 17 out of range".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::invalid("people_count", "expected a number");
        assert_eq!(err.public_message(), "people_count: expected a number");
        assert_eq!(err.field(), Some("people_count"));
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::RequestMalformed("marketing_headcount is required".into())
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = AppError::invalid("is_b2b", "must be 0 or 1").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = Err::<(), _>(AppError::InternalComputation("boom".into()))
            .with_context(|| "regressor inference".to_string())
            .unwrap_err()
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
