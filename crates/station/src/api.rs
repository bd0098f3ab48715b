//! HTTP API for the gas station

use crate::dispenser::{DispenseResult, Dispenser};
use crate::error::{Rejection, StationError};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const SENT_MESSAGE: &str = "Gas sent successfully";
const NOT_CONFIGURED: &str = "Server wallet not configured";
const INVALID_ADDRESS: &str = "Invalid address provided";
const ALREADY_FUNDED: &str = "Address already has sufficient gas";
const FUNDER_INSUFFICIENT: &str = "Funder has insufficient balance";
const SEND_FAILED: &str = "Failed to send gas";
const STATUS_FAILED: &str = "Failed to get funder address";

#[derive(Clone)]
pub struct AppState {
    pub dispenser: Arc<Dispenser>,
}

/// Dispense request
#[derive(Debug, Deserialize)]
pub struct DispenseRequest {
    pub address: Option<String>,
}

/// Successful dispense
#[derive(Debug, Serialize, Deserialize)]
pub struct DispenseResponse {
    pub success: bool,
    pub hash: String,
    pub amount: String,
    pub message: String,
}

/// Funder address and balance for the admin view
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub address: String,
    pub balance: String,
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

/// Error body paired with its status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                success: false,
                error: error.to_string(),
                balance: None,
            },
        }
    }

    fn with_balance(mut self, balance: Option<gas_common::Wei>) -> Self {
        self.body.balance = balance.map(|b| b.to_ether_string());
        self
    }

    /// `fallback` names the failed operation for node and signing errors.
    fn from_station_error(err: &StationError, fallback: &str) -> Self {
        let message = match err {
            StationError::NotConfigured(_) => NOT_CONFIGURED,
            StationError::InsufficientFunderBalance { .. } => FUNDER_INSUFFICIENT,
            StationError::Network(_) | StationError::Signing(_) => fallback,
        };
        Self::new(err.status_code(), message).with_balance(err.balance())
    }
}

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        let message = match rejection {
            Rejection::InvalidAddress(_) => INVALID_ADDRESS,
            Rejection::AlreadyFunded { .. } => ALREADY_FUNDED,
        };
        Self::new(rejection.status_code(), message).with_balance(rejection.balance())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl IntoResponse for DispenseResult {
    fn into_response(self) -> Response {
        match self {
            DispenseResult::Sent { amount, tx_hash } => Json(DispenseResponse {
                success: true,
                hash: tx_hash.to_string(),
                amount: amount.to_ether_string(),
                message: SENT_MESSAGE.to_string(),
            })
            .into_response(),
            DispenseResult::Rejected(rejection) => ApiError::from(rejection).into_response(),
            DispenseResult::Failed(err) => ApiError::from_station_error(&err, SEND_FAILED).into_response(),
        }
    }
}

/// Build the router with all routes
pub fn router(state: AppState, cors_enabled: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/sendGas", post(send_gas_handler))
        .route("/api/getAddress", get(get_address_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Dispense handler
pub async fn send_gas_handler(
    State(state): State<AppState>,
    payload: Result<Json<DispenseRequest>, JsonRejection>,
) -> Response {
    if !state.dispenser.identity().is_configured() {
        error!("Dispense request refused: funder wallet not configured");
        return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, NOT_CONFIGURED).into_response();
    }

    let address = match payload {
        Ok(Json(DispenseRequest { address: Some(address) })) => address,
        Ok(_) => {
            warn!("Dispense request without address");
            return ApiError::new(StatusCode::BAD_REQUEST, INVALID_ADDRESS).into_response();
        }
        Err(rejection) => {
            warn!("Malformed dispense request: {}", rejection);
            return ApiError::new(StatusCode::BAD_REQUEST, INVALID_ADDRESS).into_response();
        }
    };

    info!("Dispense request: address={}", address);
    state.dispenser.dispense(&address).await.into_response()
}

/// Funder status handler
pub async fn get_address_handler(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.dispenser.status().await.map_err(|e| {
        error!("Error getting funder address: {}", e);
        ApiError::from_station_error(&e, STATUS_FAILED)
    })?;

    Ok(Json(StatusResponse {
        success: true,
        address: status.address.to_string(),
        balance: status.balance.to_ether_string(),
    }))
}

/// Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.dispenser.metrics().gather().map_err(|e| {
        error!("Failed to gather metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Health check handler
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "funder_configured": state.dispenser.identity().is_configured(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Root handler with info
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Gas Station",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Sends a small amount of native currency to wallets that cannot pay for gas",
        "endpoints": {
            "POST /api/sendGas": "Request gas for an address",
            "GET /api/getAddress": "Funder address and balance",
            "GET /health": "Health check",
            "GET /metrics": "Prometheus metrics"
        }
    }))
}
