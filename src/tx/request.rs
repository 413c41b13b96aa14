//! Transaction requests and their canonical, signable form

use crate::crypto::{PublicKey, Signature, SignatureAlgorithm, Signer};
use crate::error::{ClientError, ClientResult};
use crate::ledger::{
    ConstructorSignature, MethodSignature, StorageReference, StorageValue, TransactionReference,
};

use serde::{Deserialize, Serialize};

/// Operation carried by a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestPayload {
    ConstructorCall {
        constructor: ConstructorSignature,
        actuals: Vec<StorageValue>,
    },
    InstanceMethodCall {
        method: MethodSignature,
        receiver: StorageReference,
        actuals: Vec<StorageValue>,
    },
    JarStore {
        jar: Vec<u8>,
        dependencies: Vec<TransactionReference>,
    },
}

/// Unsigned transaction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub caller: StorageReference,
    pub nonce: u64,
    pub chain_id: String,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub classpath: TransactionReference,
    pub payload: RequestPayload,
}

impl TransactionRequest {
    /// Canonical bytes covered by the signature
    pub fn signing_bytes(&self) -> ClientResult<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| ClientError::Internal(format!("cannot encode request: {}", e)))
    }

    pub fn sign(self, signer: &Signer) -> ClientResult<SignedRequest> {
        let signature = signer.sign(&self.signing_bytes()?)?;
        Ok(SignedRequest {
            request: self,
            signature,
        })
    }

    /// Short label of the operation, used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self.payload {
            RequestPayload::ConstructorCall { .. } => "constructor_call",
            RequestPayload::InstanceMethodCall { .. } => "method_call",
            RequestPayload::JarStore { .. } => "jar_store",
        }
    }
}

/// A request together with its caller's signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub request: TransactionRequest,
    pub signature: Signature,
}

impl SignedRequest {
    /// Check the signature against the canonical bytes of the request
    pub fn verify(&self, algorithm: &dyn SignatureAlgorithm, public_key: &PublicKey) -> bool {
        match self.request.signing_bytes() {
            Ok(bytes) => algorithm.verify(public_key, &bytes, &self.signature),
            Err(_) => false,
        }
    }

    /// Reference the ledger assigns to this request
    pub fn reference(&self) -> ClientResult<TransactionReference> {
        let bytes = bincode::serialize(self)
            .map_err(|e| ClientError::Internal(format!("cannot encode request: {}", e)))?;
        Ok(TransactionReference::of_request_bytes(&bytes))
    }
}
