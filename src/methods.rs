//! Method dispatch for `POST /method`.
//!
//! A request walks through envelope validation, authentication and method
//! dispatch. Each step either hands over to the next or ends the request with
//! an [`AppError`]; only field validation reports more than one problem at once.

use crate::auth;
use crate::errors::{AppError, ResultExt};
use crate::models::{InterestsArguments, MethodEnvelope, ScoreArguments};
use crate::store::Store;
use axum::http::StatusCode;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const CLIENTS_INTERESTS: &str = "clients_interests";
pub const ONLINE_SCORE: &str = "online_score";

/// Score returned to the admin login without consulting the store.
pub const ADMIN_SCORE: i64 = 42;

/// Per-request facts gathered for the completion log line.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    /// Number of client ids looked up by `clients_interests`.
    pub nclients: Option<usize>,
    /// Score fields the caller filled in.
    pub has: Vec<&'static str>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }
}

/// Routes validated method calls to the store.
#[derive(Clone)]
pub struct MethodRouter {
    store: Arc<dyn Store>,
    store_timeout: Duration,
}

impl MethodRouter {
    pub fn new(store: Arc<dyn Store>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    /// Handles one decoded request body.
    pub async fn handle(
        &self,
        body: &Map<String, Value>,
        ctx: &mut RequestContext,
    ) -> Result<(StatusCode, Value), AppError> {
        let envelope = MethodEnvelope::from_body(body)
            .map_err(|e| AppError::InvalidRequest(format!("INVALID ARGUMENTS: {}", e)))?;

        if !auth::verify(&envelope) {
            tracing::warn!(
                login = envelope.login().unwrap_or_default(),
                "Authentication failed"
            );
            return Err(AppError::Forbidden);
        }

        let empty = Map::new();
        let arguments = envelope.arguments().unwrap_or(&empty);

        match envelope.method() {
            CLIENTS_INTERESTS => self.clients_interests(arguments, ctx).await,
            ONLINE_SCORE => self.online_score(arguments, envelope.is_admin(), ctx).await,
            other => {
                tracing::info!(method = other, "Unknown method");
                Err(AppError::InvalidRequest("Unknown method".to_string()))
            }
        }
    }

    async fn clients_interests(
        &self,
        arguments: &Map<String, Value>,
        ctx: &mut RequestContext,
    ) -> Result<(StatusCode, Value), AppError> {
        let request = InterestsArguments::from_arguments(arguments).map_err(invalid_method_fields)?;

        let client_ids = request.client_ids();
        ctx.nclients = Some(client_ids.len());

        let mut interests = Map::new();
        for &client_id in client_ids {
            let found = self
                .bounded(
                    format!("get_interests({})", client_id),
                    self.store.get_interests(client_id),
                )
                .await?;
            interests.insert(client_id.to_string(), json!(found));
        }

        tracing::debug!(
            clients = client_ids.len(),
            date = ?request.date(),
            "Interests collected"
        );
        Ok((StatusCode::OK, Value::Object(interests)))
    }

    async fn online_score(
        &self,
        arguments: &Map<String, Value>,
        is_admin: bool,
        ctx: &mut RequestContext,
    ) -> Result<(StatusCode, Value), AppError> {
        let request = ScoreArguments::from_arguments(arguments).map_err(invalid_method_fields)?;

        if !request.has_any_required_pair() {
            return Err(AppError::InvalidRequest(
                "No valid pairs for scoring.".to_string(),
            ));
        }

        ctx.has = request.populated_fields();

        if is_admin {
            return Ok((StatusCode::OK, json!({ "score": ADMIN_SCORE })));
        }

        let query = request.as_query();
        let score = self
            .bounded("get_score".to_string(), self.store.get_score(&query))
            .await?;

        Ok((StatusCode::OK, json!({ "score": score })))
    }

    /// Runs a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: String,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.context(operation),
            Err(_) => Err(AppError::InternalError(format!(
                "{} timed out after {:?}",
                operation, self.store_timeout
            ))),
        }
    }
}

fn invalid_method_fields(err: crate::models::InvalidFields) -> AppError {
    AppError::InvalidRequest(format!("INVALID METHOD FIELDS: {}", err))
}
