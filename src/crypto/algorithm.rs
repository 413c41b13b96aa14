//! Pluggable signature algorithms

use crate::error::{ClientError, ClientResult};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::{Signer as _, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of a signature algorithm, as agreed between client and ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithmId {
    Ed25519,
    /// Accepts every signature. Only meant for test networks.
    Empty,
}

impl fmt::Display for SignatureAlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithmId::Ed25519 => write!(f, "ed25519"),
            SignatureAlgorithmId::Empty => write!(f, "empty"),
        }
    }
}

impl FromStr for SignatureAlgorithmId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(SignatureAlgorithmId::Ed25519),
            "empty" => Ok(SignatureAlgorithmId::Empty),
            other => Err(ClientError::Crypto(format!(
                "signature algorithm {} is not available",
                other
            ))),
        }
    }
}

/// Encoded public key
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard Base64, the form the ledger stores in accounts
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> ClientResult<Self> {
        BASE64
            .decode(encoded)
            .map(Self)
            .map_err(|e| ClientError::Crypto(format!("invalid public key encoding: {}", e)))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

/// Raw signature bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A signature scheme. Implementations must be usable from any thread.
pub trait SignatureAlgorithm: Send + Sync {
    fn id(&self) -> SignatureAlgorithmId;

    /// Generate a fresh key pair, returning the encoded private key and its public key
    fn generate(&self) -> ClientResult<(Vec<u8>, PublicKey)>;

    /// Derive the public key of an encoded private key
    fn public_key_of(&self, private_key: &[u8]) -> ClientResult<PublicKey>;

    fn sign(&self, private_key: &[u8], payload: &[u8]) -> ClientResult<Signature>;

    fn verify(&self, public_key: &PublicKey, payload: &[u8], signature: &Signature) -> bool;
}

/// Ed25519 over the raw payload
pub struct Ed25519;

impl Ed25519 {
    fn signing_key(private_key: &[u8]) -> ClientResult<SigningKey> {
        let bytes: [u8; 32] = private_key
            .try_into()
            .map_err(|_| ClientError::Crypto("ed25519 private keys are 32 bytes".to_string()))?;
        Ok(SigningKey::from_bytes(&bytes))
    }
}

impl SignatureAlgorithm for Ed25519 {
    fn id(&self) -> SignatureAlgorithmId {
        SignatureAlgorithmId::Ed25519
    }

    fn generate(&self) -> ClientResult<(Vec<u8>, PublicKey)> {
        let signing = SigningKey::generate(&mut OsRng);
        let public = PublicKey(signing.verifying_key().to_bytes().to_vec());
        Ok((signing.to_bytes().to_vec(), public))
    }

    fn public_key_of(&self, private_key: &[u8]) -> ClientResult<PublicKey> {
        let signing = Self::signing_key(private_key)?;
        Ok(PublicKey(signing.verifying_key().to_bytes().to_vec()))
    }

    fn sign(&self, private_key: &[u8], payload: &[u8]) -> ClientResult<Signature> {
        let signing = Self::signing_key(private_key)?;
        Ok(Signature(signing.sign(payload).to_bytes().to_vec()))
    }

    fn verify(&self, public_key: &PublicKey, payload: &[u8], signature: &Signature) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key.as_bytes()) else {
            return false;
        };
        let Ok(verifying) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature.as_bytes()) else {
            return false;
        };
        verifying.verify(payload, &signature).is_ok()
    }
}

/// Signatures are empty and always verify; keys are random so identities stay distinct
pub struct EmptySignature;

impl SignatureAlgorithm for EmptySignature {
    fn id(&self) -> SignatureAlgorithmId {
        SignatureAlgorithmId::Empty
    }

    fn generate(&self) -> ClientResult<(Vec<u8>, PublicKey)> {
        let mut private = vec![0u8; 32];
        OsRng.fill_bytes(&mut private);
        let public = self.public_key_of(&private)?;
        Ok((private, public))
    }

    fn public_key_of(&self, private_key: &[u8]) -> ClientResult<PublicKey> {
        Ok(PublicKey(Sha3_256::digest(private_key).to_vec()))
    }

    fn sign(&self, _private_key: &[u8], _payload: &[u8]) -> ClientResult<Signature> {
        Ok(Signature(Vec::new()))
    }

    fn verify(&self, _public_key: &PublicKey, _payload: &[u8], _signature: &Signature) -> bool {
        true
    }
}

/// Get the implementation of an algorithm
pub fn algorithm_for(id: SignatureAlgorithmId) -> Arc<dyn SignatureAlgorithm> {
    match id {
        SignatureAlgorithmId::Ed25519 => Arc::new(Ed25519),
        SignatureAlgorithmId::Empty => Arc::new(EmptySignature),
    }
}

/// Resolve an algorithm by its configured name
pub fn algorithm_named(name: &str) -> ClientResult<Arc<dyn SignatureAlgorithm>> {
    Ok(algorithm_for(name.parse()?))
}
