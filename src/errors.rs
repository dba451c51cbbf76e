use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Body missing or not a JSON object. The detail is only logged.
    BadRequest(String),
    /// Token did not match.
    Forbidden,
    /// Unknown route.
    NotFound,
    /// Invalid fields or an unmet business rule.
    InvalidRequest(String),
    /// Store failure, timeout or any other unexpected condition. The detail is only logged.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

/// Message used for the token mismatch response.
pub const FORBIDDEN_MESSAGE: &str = "FORBIDDEN";

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status(),
        }
    }

    /// Innermost error under any context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Forbidden => write!(f, "Forbidden"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into the wire error envelope.
    ///
    /// Logs once, at the severity of the innermost error, with the whole context
    /// chain. Internal details never reach the caller.
    fn into_response(self) -> Response {
        let (status, message) = match self.root() {
            AppError::BadRequest(_) => {
                tracing::warn!("{}", self);
                (StatusCode::BAD_REQUEST, None)
            }
            AppError::Forbidden => {
                tracing::warn!("{}: token mismatch", self);
                (StatusCode::FORBIDDEN, Some(FORBIDDEN_MESSAGE.to_string()))
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, None),
            AppError::InvalidRequest(msg) => {
                tracing::info!("{}", self);
                (StatusCode::UNPROCESSABLE_ENTITY, Some(msg.clone()))
            }
            AppError::InternalError(_) | AppError::WithContext { .. } => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        wire_response(status, message.map(Value::String).unwrap_or(Value::Null))
    }
}

/// Default message for each code of the recognised error set.
pub fn default_message(status: StatusCode) -> Option<&'static str> {
    match status {
        StatusCode::BAD_REQUEST => Some("Bad Request"),
        StatusCode::FORBIDDEN => Some("Forbidden"),
        StatusCode::NOT_FOUND => Some("Not Found"),
        StatusCode::UNPROCESSABLE_ENTITY => Some("Invalid Request"),
        StatusCode::INTERNAL_SERVER_ERROR => Some("Internal Server Error"),
        _ => None,
    }
}

/// Wraps a payload in the wire envelope.
///
/// Codes of the error set produce `{"error": <message>, "code": <code>}`, falling
/// back to the default message when `payload` is not a non-empty string. Any
/// other code produces `{"response": <payload>, "code": <code>}`.
pub fn envelope(status: StatusCode, payload: Value) -> Value {
    match default_message(status) {
        Some(default) => {
            let message = payload
                .as_str()
                .filter(|msg| !msg.is_empty())
                .unwrap_or(default);
            json!({ "error": message, "code": status.as_u16() })
        }
        None => json!({ "response": payload, "code": status.as_u16() }),
    }
}

/// Status line plus enveloped JSON body.
pub fn wire_response(status: StatusCode, payload: Value) -> Response {
    (status, Json(envelope(status, payload))).into_response()
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

/// Store failures arrive as `anyhow::Error` and always map to an internal error.
impl<T> ResultExt<T> for Result<T, anyhow::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::InternalError(format!("{:#}", e))),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::InternalError(format!("{:#}", e))),
            context: f(),
        })
    }
}
