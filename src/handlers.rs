use crate::config::Config;
use crate::errors::{wire_response, AppError};
use crate::methods::{MethodRouter, RequestContext};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Route served by the method router, without surrounding slashes.
pub const METHOD_ROUTE: &str = "method";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Method dispatch, holding the injected store.
    pub methods: MethodRouter,
    /// Application configuration.
    pub config: Config,
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "scoring-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Opens the `request` span for everything below it, panics included.
///
/// The request id comes from `X-Request-Id` when present, otherwise a fresh one
/// is written into the request headers. Either way it is echoed on the response.
pub async fn request_span(mut request: Request, next: Next) -> Response {
    let request_id = request_id(request.headers());
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// POST /{route}
///
/// Decodes the JSON body, routes on the path and wraps the outcome in the wire
/// envelope. A body that cannot be read, for instance one over the size limit,
/// is a 400.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request_id = request_id(&headers);
    let body = match &body {
        Ok(bytes) => Ok(&bytes[..]),
        Err(e) => Err(AppError::BadRequest(format!("Unreadable request body: {}", e))),
    };
    handle_request(&state, uri.path(), body, &request_id).await
}

/// Turns raw path and body bytes into an enveloped response.
pub async fn handle_request(
    state: &AppState,
    path: &str,
    body: Result<&[u8], AppError>,
    request_id: &str,
) -> Response {
    let mut ctx = RequestContext::new(request_id);
    let result = route(state, path, body, &mut ctx).await;

    let code = match &result {
        Ok((code, _)) => *code,
        Err(err) => err.status(),
    };
    tracing::info!(
        code = code.as_u16(),
        nclients = ?ctx.nclients,
        has = ?ctx.has,
        "Request complete"
    );

    match result {
        Ok((code, payload)) => wire_response(code, payload),
        Err(err) => err.into_response(),
    }
}

async fn route(
    state: &AppState,
    path: &str,
    body: Result<&[u8], AppError>,
    ctx: &mut RequestContext,
) -> Result<(StatusCode, Value), AppError> {
    let body = decode_body(body?)?;

    tracing::info!(path, fields = body.len(), "Request received");

    match path.trim_matches('/') {
        METHOD_ROUTE => state.methods.handle(&body, ctx).await,
        other => {
            tracing::info!(route = other, "Unknown route");
            Err(AppError::NotFound)
        }
    }
}

fn decode_body(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::BadRequest(format!(
            "Expected a JSON object, got {}",
            other
        ))),
        Err(e) => Err(AppError::BadRequest(format!("Malformed JSON body: {}", e))),
    }
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

/// Fallback for paths no route matched.
pub async fn not_found() -> Response {
    AppError::NotFound.into_response()
}

/// Answers a panicked request with a generic internal error.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::InternalError(format!("Handler panicked: {}", detail)).into_response()
}
