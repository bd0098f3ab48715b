//! Error types for the gas station service

use axum::http::StatusCode;
use gas_common::types::Wei;
use thiserror::Error;

/// Terminal failures of a dispense or status request
#[derive(Error, Debug)]
pub enum StationError {
    #[error("Server wallet not configured: {0}")]
    NotConfigured(String),

    #[error("Funder has insufficient balance: {} ether", .balance.to_ether_string())]
    InsufficientFunderBalance { balance: Wei },

    #[error("RPC error: {0}")]
    Network(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

impl StationError {
    /// Every terminal failure is a server-side condition.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Balance observed when the failure was decided, if any.
    pub fn balance(&self) -> Option<Wei> {
        match self {
            StationError::InsufficientFunderBalance { balance } => Some(*balance),
            _ => None,
        }
    }
}

impl From<gas_crypto::TxError> for StationError {
    fn from(err: gas_crypto::TxError) -> Self {
        StationError::Signing(err.to_string())
    }
}

/// Requests declined before any funds move
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address already has sufficient gas: {} ether", .balance.to_ether_string())]
    AlreadyFunded { balance: Wei },
}

impl Rejection {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn balance(&self) -> Option<Wei> {
        match self {
            Rejection::AlreadyFunded { balance } => Some(*balance),
            Rejection::InvalidAddress(_) => None,
        }
    }
}

pub type StationResult<T> = Result<T, StationError>;
