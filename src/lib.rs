//! Scoring API Library
//!
//! This library provides the request pipeline of the scoring API: field
//! validation, request schemas, token authentication, method dispatch and the
//! HTTP edge adapter that wraps results in the wire envelope.
//!
//! # Modules
//!
//! - `auth`: Token verification for regular and admin callers.
//! - `config`: Configuration management.
//! - `errors`: Error handling types and the wire envelope.
//! - `fields`: Field validators.
//! - `handlers`: HTTP request handlers.
//! - `methods`: Method dispatch (`online_score`, `clients_interests`).
//! - `models`: Request schemas.
//! - `scoring`: In-memory store with the scoring formula.
//! - `store`: Store capability consumed by the method router.

pub mod auth;
pub mod config;
pub mod errors;
pub mod fields;
pub mod handlers;
pub mod methods;
pub mod models;
pub mod scoring;
pub mod store;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::handlers::AppState;

/// Builds the HTTP application around the given state.
///
/// `POST /method` is the only method route; other POST paths reach the same
/// handler so it can answer with the enveloped 404, and any other verb gets the
/// same 404 from the fallback.
pub fn app(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(handlers::health).fallback(handlers::not_found))
        .route("/", post(handlers::dispatch).fallback(handlers::not_found))
        .route(
            "/*path",
            post(handlers::dispatch).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(handlers::request_span))
}
