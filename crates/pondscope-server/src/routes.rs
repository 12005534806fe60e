//! Request handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pondscope_core::{
    AggregateRequest, AggregateResult, Aggregator, CacheStats, Chain, ChainActivity, Manifest,
    ValidationError, WalletAddress,
};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;

pub type AppState = Arc<Aggregator>;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// POST /api/wallet/multi
pub async fn wallet_multi(
    State(aggregator): State<AppState>,
    body: Result<Json<AggregateRequest>, JsonRejection>,
) -> Result<Json<AggregateResult>, ApiError> {
    let Json(request) =
        body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let targets = request.targets().map_err(|error| match error {
        ValidationError::EmptyAddress => {
            ApiError::BadRequest("No Solana address provided".to_owned())
        }
        other => ApiError::Validation(other),
    })?;

    Ok(Json(aggregator.aggregate(&targets).await))
}

/// GET /api/wallet/:chain/:address
pub async fn chain_activity(
    State(aggregator): State<AppState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<Json<ChainActivity>, ApiError> {
    let chain = chain.parse::<Chain>()?;
    let address = WalletAddress::for_chain(chain, &address)?;

    let (activity, freshness) = aggregator.chain_activity(&address).await?;
    debug!(%address, ?freshness, events = activity.events.len(), "chain activity served");
    Ok(Json(activity))
}

/// GET /api/pond0x/manifest/:address
pub async fn manifest(
    State(aggregator): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Manifest>, ApiError> {
    let address = WalletAddress::solana(&address)?;
    let lookup = aggregator.manifest_or_derived(&address).await?;
    Ok(Json(lookup.manifest))
}

/// GET /api/cache/stats
pub async fn cache_stats(State(aggregator): State<AppState>) -> Json<CacheStats> {
    Json(aggregator.cache().stats().await)
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Bare `OPTIONS` without preflight headers; real preflights are answered by the CORS layer.
pub async fn options_ok() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
