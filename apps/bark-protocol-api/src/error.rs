use std::convert::Infallible;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use bark_protocol_claims::{ClaimError, DistributeError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Distribute(#[from] DistributeError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorBody { error: message }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Input errors: nothing was created, not worth retrying as-is
            ApiError::Claim(e @ (ClaimError::InvalidAddress | ClaimError::UserNotFound)) => {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            }
            // Business-rule rejections: reason is safe to show verbatim
            ApiError::Claim(
                e @ (ClaimError::Ineligible(_)
                | ClaimError::InvalidSignature
                | ClaimError::InsufficientPoolFunds
                | ClaimError::ClaimInProgress),
            ) => error_response(StatusCode::FORBIDDEN, e.to_string()),
            // The ledger's own rejection message is the reason
            ApiError::Claim(e @ ClaimError::TransferFailed(_)) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            // Ambiguous by design: the claim stays processing for reconciliation
            ApiError::Claim(e @ ClaimError::TransferPending) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Claim(e) => {
                error!("claim error: {e:?}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            ApiError::Distribute(
                e @ (DistributeError::InvalidAddress
                | DistributeError::InvalidAmount
                | DistributeError::InsufficientPoolFunds),
            ) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Distribute(e) => {
                error!("distribute error: {e:?}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        }
    }
}

pub async fn handle_error(error: BoxError) -> Result<impl IntoResponse, Infallible> {
    if error.is::<tower::timeout::error::Elapsed>() {
        return Ok((
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({
                "code" : 408,
                "error" : "Request Timeout",
            })),
        ));
    };
    if error.is::<tower::load_shed::error::Overloaded>() {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "code" : 503,
                "error" : "Service Unavailable",
            })),
        ));
    }

    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "code" : 500,
            "error" : "Internal Server Error",
        })),
    ))
}
