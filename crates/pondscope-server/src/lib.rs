//! HTTP surface for the pondscope wallet aggregator.
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /api/wallet/multi` | Aggregate one wallet across every source |
//! | `GET /api/wallet/:chain/:address` | One chain indexer's activity (`eth` or `sol`) |
//! | `GET /api/pond0x/manifest/:address` | Pond0x manifest, derived on-chain as fallback |
//! | `GET /api/cache/stats` | Fetch cache diagnostics |
//! | `GET /api/health` | Liveness |
//!
//! CORS is open and every response carries an `x-request-id`. A panicking handler
//! still answers with a JSON 500.

pub mod cli;
pub mod error;
pub mod logging;
pub mod request_id;
pub mod routes;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::routing::{get, post};
use axum::Router;
use pondscope_core::Aggregator;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::request_id::{create_request_id_layers, X_REQUEST_ID};

/// Builds the application router over a shared aggregator.
pub fn app(aggregator: Arc<Aggregator>) -> Router {
    let (set_request_id, propagate_request_id) = create_request_id_layers();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id
        )
    });

    Router::new()
        .route(
            "/api/wallet/multi",
            post(routes::wallet_multi)
                .options(routes::options_ok)
                .fallback(routes::method_not_allowed),
        )
        .route("/api/wallet/:chain/:address", get(routes::chain_activity))
        .route("/api/pond0x/manifest/:address", get(routes::manifest))
        .route("/api/cache/stats", get(routes::cache_stats))
        .route("/api/health", get(routes::health))
        .fallback(routes::not_found)
        .with_state(aggregator)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(cors)
        .layer(trace)
        .layer(propagate_request_id)
        .layer(set_request_id)
}
