//! Error types for the ledger client

use crate::ledger::{EndpointError, TransactionReference};

use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Request rejected by endpoint: {0}")]
    RejectedByEndpoint(String),

    #[error("Transaction {reference} failed during execution: {message}")]
    ExecutionFailed {
        reference: TransactionReference,
        message: String,
    },

    #[error("Endpoint unavailable: {0}")]
    EndpointUnavailable(String),

    #[error("Ledger is already initialized")]
    AlreadyInitialized,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Nonce error for account {account}: {message}")]
    Nonce { account: String, message: String },

    #[error("Timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::EndpointUnavailable(_)
                | ClientError::Timeout { .. }
                | ClientError::RejectedByEndpoint(_)
        )
    }

    /// Whether the ledger consumed the caller's nonce for the request that produced this error
    pub fn consumes_nonce(&self) -> bool {
        matches!(self, ClientError::ExecutionFailed { .. })
    }
}

impl From<EndpointError> for ClientError {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::Rejected(message) => ClientError::RejectedByEndpoint(message),
            e @ EndpointError::NonceMismatch { .. } => ClientError::RejectedByEndpoint(e.to_string()),
            EndpointError::Failed { reference, message } => {
                ClientError::ExecutionFailed { reference, message }
            }
            EndpointError::Unavailable(message) => ClientError::EndpointUnavailable(message),
            EndpointError::AlreadyInitialized => ClientError::AlreadyInitialized,
            EndpointError::NotInitialized => {
                ClientError::RejectedByEndpoint("ledger is not initialized".to_string())
            }
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
