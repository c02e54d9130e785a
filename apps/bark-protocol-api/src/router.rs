use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bark_protocol_claims::ClaimService;
use bark_protocol_client::RpcLedgerClient;
use http::Request;
use serde::{Deserialize, Serialize};
use tower::{
    buffer::BufferLayer, limit::RateLimitLayer, load_shed::LoadShedLayer, timeout::TimeoutLayer,
    ServiceBuilder,
};
use tower_http::{
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::{info, instrument, Level, Span};

use crate::{error, error::ApiError, Result};

pub struct RouterState {
    pub service: ClaimService<RpcLedgerClient>,
}

impl Debug for RouterState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterState")
            .field("token_symbol", &self.service.config().token_symbol)
            .finish()
    }
}

#[instrument]
pub fn get_routes(state: Arc<RouterState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(error::handle_error)) // handle middleware errors explicitly!
        .layer(BufferLayer::new(100)) // buffer up to 100 requests in queue
        .layer(RateLimitLayer::new(1000, Duration::from_secs(10)))
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(LoadShedLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started {} {}", request.method(), request.uri().path())
                })
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        );

    Router::new()
        .route("/", get(root))
        .route("/version", get(get_version))
        .route("/api/eligibility", post(check_eligibility))
        .route("/api/claim", post(submit_claim))
        .route("/api/distribute", post(distribute))
        .route("/api/stats", get(get_stats))
        .layer(middleware)
        .with_state(state)
}

/// Token amounts cross the HTTP boundary as base-10 strings; JSON numbers
/// cannot represent full 64-bit base-unit quantities exactly
mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &u64, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
pub struct EligibilityRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResponse {
    pub is_eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unclaimed_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub wallet_address: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub message: String,
    pub tx_signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeRequest {
    pub wallet_address: String,
    #[serde(with = "amount_string")]
    pub amount: u64,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DistributeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(with = "amount_string")]
    pub total_distributed: u64,
    #[serde(with = "amount_string")]
    pub total_claimed: u64,
    #[serde(with = "amount_string")]
    pub remaining_to_claim: u64,
    pub total_participants: String,
}

async fn root() -> impl IntoResponse {
    "BARK Protocol Airdrop API"
}

async fn get_version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// Read-only eligibility check; safe to poll
#[instrument(skip(state))]
async fn check_eligibility(
    State(state): State<Arc<RouterState>>,
    Json(request): Json<EligibilityRequest>,
) -> Result<impl IntoResponse> {
    let report = state
        .service
        .check_eligibility(&request.address)
        .await
        .map_err(ApiError::Claim)?;

    Ok(Json(EligibilityResponse {
        is_eligible: report.is_eligible,
        total_amount: report.total_amount.map(|a| a.to_string()),
        unclaimed_amount: report.unclaimed_amount.map(|a| a.to_string()),
        reason: report.reason.map(|r| r.as_str().to_string()),
    }))
}

/// Redeem the caller's full unclaimed entitlement
#[instrument(skip(state, request), fields(wallet = %request.wallet_address))]
async fn submit_claim(
    State(state): State<Arc<RouterState>>,
    Json(request): Json<ClaimRequest>,
) -> Result<impl IntoResponse> {
    let receipt = state
        .service
        .submit_claim(&request.wallet_address, &request.signature)
        .await
        .map_err(ApiError::Claim)?;

    Ok(Json(ClaimResponse {
        message: "Airdrop claimed successfully".to_string(),
        tx_signature: receipt.transaction_signature,
    }))
}

/// Admin-initiated grant; increases the recipient's claimable entitlement
#[instrument(skip(state, request), fields(wallet = %request.wallet_address))]
async fn distribute(
    State(state): State<Arc<RouterState>>,
    Json(request): Json<DistributeRequest>,
) -> Result<impl IntoResponse> {
    state
        .service
        .distribute(
            &request.wallet_address,
            request.amount,
            &request.category,
            request.description.as_deref(),
        )
        .await
        .map_err(ApiError::Distribute)?;

    Ok(Json(DistributeResponse {
        success: true,
        message: "Airdrop distributed successfully".to_string(),
    }))
}

/// Campaign-wide aggregates, all amounts as decimal strings
#[instrument(skip(state))]
async fn get_stats(State(state): State<Arc<RouterState>>) -> Result<impl IntoResponse> {
    let stats = state.service.airdrop_stats().await.map_err(ApiError::Claim)?;

    Ok(Json(StatsResponse {
        total_distributed: stats.total_distributed,
        total_claimed: stats.total_claimed,
        remaining_to_claim: stats.remaining_to_claim,
        total_participants: stats.total_participants.to_string(),
    }))
}
