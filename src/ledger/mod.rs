//! Ledger endpoint abstraction
//!
//! This module provides:
//! - The [`LedgerEndpoint`] trait every ledger implementation satisfies
//! - Response classes returned by endpoints ([`EndpointError`])
//! - An in-process reference ledger ([`InMemoryLedger`])
//! - An HTTP client for ledgers published by the node service ([`RemoteLedger`])

pub mod classes;
pub mod memory;
pub mod remote;
pub mod types;

pub use classes::{ExecutionContext, Fields, NativeClass};
pub use memory::InMemoryLedger;
pub use remote::RemoteLedger;
pub use types::{
    ConstructorSignature, MethodSignature, StorageReference, StorageType, StorageValue,
    TransactionReference,
};

use crate::crypto::SignatureAlgorithmId;
use crate::tx::{SignedRequest, TransactionRequest};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response classes of a ledger endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// Refused before inclusion; the caller's nonce is untouched
    #[error("rejected: {0}")]
    Rejected(String),

    /// Refused because the request's nonce is not the caller's current one
    #[error("incorrect nonce: the request reports {found} but the account has {expected}")]
    NonceMismatch { expected: u64, found: u64 },

    /// Included but its code failed; the nonce is consumed and the failure is recorded
    #[error("transaction {reference} failed: {message}")]
    Failed {
        reference: TransactionReference,
        message: String,
    },

    /// The endpoint could not be reached or did not answer
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("not initialized")]
    NotInitialized,
}

pub type EndpointResult<T> = Result<T, EndpointError>;

/// Parameters fixed at ledger initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub chain_id: String,
    pub signature: SignatureAlgorithmId,
    pub initial_gas_price: u64,
    pub max_gas_per_transaction: u64,
    pub min_gas_per_transaction: u64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            signature: SignatureAlgorithmId::Ed25519,
            initial_gas_price: 100,
            max_gas_per_transaction: 1_000_000_000,
            min_gas_per_transaction: 100,
        }
    }
}

impl ConsensusParams {
    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    pub fn with_signature(mut self, signature: SignatureAlgorithmId) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_initial_gas_price(mut self, price: u64) -> Self {
        self.initial_gas_price = price;
        self
    }
}

/// Request that installs the runtime jar and creates manifest and gamete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializationRequest {
    pub consensus: ConsensusParams,
    pub runtime_jar: Vec<u8>,
    /// Base64 public key that will control the gamete
    pub gamete_public_key: String,
    pub green_amount: u128,
    pub red_amount: u128,
}

/// Result of a successful state-changing transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Object(StorageReference),
    Value(Option<StorageValue>),
    Jar(TransactionReference),
}

/// What the ledger recorded for an included transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordedResponse {
    Success(Outcome),
    Failed { message: String },
}

/// A ledger node able to accept signed transactions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerEndpoint: Send + Sync {
    /// Install the runtime and create manifest and gamete, returning the gamete
    async fn initialize(&self, request: InitializationRequest) -> EndpointResult<StorageReference>;

    async fn signature_algorithm(&self) -> EndpointResult<SignatureAlgorithmId>;

    async fn chain_id(&self) -> EndpointResult<String>;

    /// Current minimal gas price accepted by the ledger
    async fn gas_price(&self) -> EndpointResult<u64>;

    /// Authoritative nonce of an account
    async fn nonce(&self, account: &StorageReference) -> EndpointResult<u64>;

    /// Reference of the installed runtime jar
    async fn runtime_jar(&self) -> EndpointResult<TransactionReference>;

    async fn manifest(&self) -> EndpointResult<StorageReference>;

    async fn add_constructor_call(&self, request: SignedRequest) -> EndpointResult<StorageReference>;

    async fn add_method_call(&self, request: SignedRequest) -> EndpointResult<Option<StorageValue>>;

    /// Run a view method; nothing is recorded and no nonce is involved
    async fn run_method_call(&self, request: TransactionRequest)
        -> EndpointResult<Option<StorageValue>>;

    async fn add_jar_store(&self, request: SignedRequest) -> EndpointResult<TransactionReference>;

    /// Recorded response of an included transaction, if any
    async fn response(&self, reference: &TransactionReference)
        -> EndpointResult<Option<RecordedResponse>>;
}
