//! Error types for MPC client operations

use serde::Serialize;
use thiserror::Error;

/// Result type alias for MPC client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the MPC SDK
#[derive(Debug, Error)]
pub enum Error {
    // ============ Authentication Errors ============
    /// Sign-in rejected by the authentication service
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Operation requires an authenticated session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // ============ Key Share Errors ============
    /// Key share generation failed
    #[error("Key share generation failed: {0}")]
    KeyGeneration(String),

    /// Key share not known to the signing party
    #[error("Key share not found: {0}")]
    KeyShareNotFound(String),

    // ============ Connection Errors ============
    /// Signing connection could not be negotiated
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection belongs to a different key share
    #[error("Connection mismatch: {0}")]
    ConnectionMismatch(String),

    /// Timeout waiting for a collaborator
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    // ============ Wallet / Chain Errors ============
    /// Balance query failed
    #[error("Balance query failed: {0}")]
    Balance(String),

    /// Not enough funds for the requested transfer
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: String, required: String },

    /// Signing or broadcasting the transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Invalid address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Cryptographic operation failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    // ============ Orchestration Errors ============
    /// Another operation is already in flight
    #[error("Operation already in progress")]
    Busy,

    /// A wallet handle was published for a superseded key share
    #[error("Stale key share generation {published} (current {current})")]
    StaleGeneration { published: u64, current: u64 },

    // ============ Configuration Errors ============
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ============ Serialization Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialized form of an error as written to the operator log
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: &'static str,
    pub message: String,
}

impl Error {
    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Error::AuthFailed(_) => "auth_failed",
            Error::Unauthorized(_) => "unauthorized",
            Error::KeyGeneration(_) => "key_generation",
            Error::KeyShareNotFound(_) => "key_share_not_found",
            Error::ConnectionFailed(_) => "connection_failed",
            Error::ConnectionMismatch(_) => "connection_mismatch",
            Error::Timeout(_) => "timeout",
            Error::Balance(_) => "balance",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::Transaction(_) => "transaction",
            Error::InvalidAddress(_) => "invalid_address",
            Error::Crypto(_) => "crypto",
            Error::Busy => "busy",
            Error::StaleGeneration { .. } => "stale_generation",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
            Error::Io(_) => "io",
        }
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed(_) | Error::Timeout(_) | Error::Busy | Error::Balance(_)
        )
    }

    /// Build the payload logged after a failed operation
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Deterministic JSON rendering of [`Error::payload`]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.payload())
            .unwrap_or_else(|_| format!("{{\"kind\":\"{}\"}}", self.kind()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Serialization(e.to_string())
    }
}
