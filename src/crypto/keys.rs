//! Key custody and signing capabilities
//!
//! Private keys are stored here and nowhere else. Callers hold a [`KeyHandle`]
//! or a [`Signer`] bound to one.

use super::algorithm::{PublicKey, Signature, SignatureAlgorithm, SignatureAlgorithmId};
use crate::error::{ClientError, ClientResult};

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Opaque reference to a private key held by a [`KeyManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyHandle(u64);

struct StoredKey {
    private: Vec<u8>,
    public: PublicKey,
}

/// Holds the key pairs of every account this process controls
pub struct KeyManager {
    algorithm: Arc<dyn SignatureAlgorithm>,
    keys: DashMap<KeyHandle, StoredKey>,
    next_handle: AtomicU64,
}

impl KeyManager {
    pub fn new(algorithm: Arc<dyn SignatureAlgorithm>) -> Self {
        Self {
            algorithm,
            keys: DashMap::new(),
            next_handle: AtomicU64::new(0),
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithmId {
        self.algorithm.id()
    }

    /// Generate a fresh key pair and keep its private half
    pub fn generate_key_pair(&self) -> ClientResult<(KeyHandle, PublicKey)> {
        let (private, public) = self.algorithm.generate()?;
        let handle = self.store(private, public.clone());
        debug!("Generated {} key pair {:?}", self.algorithm.id(), handle);
        Ok((handle, public))
    }

    /// Take custody of an existing private key
    pub fn import_private_key(&self, private: Vec<u8>) -> ClientResult<(KeyHandle, PublicKey)> {
        let public = self.algorithm.public_key_of(&private)?;
        let handle = self.store(private, public.clone());
        Ok((handle, public))
    }

    pub fn public_key(&self, handle: KeyHandle) -> Option<PublicKey> {
        self.keys.get(&handle).map(|k| k.public.clone())
    }

    pub fn sign(&self, handle: KeyHandle, payload: &[u8]) -> ClientResult<Signature> {
        let key = self
            .keys
            .get(&handle)
            .ok_or_else(|| ClientError::Crypto(format!("no private key for {:?}", handle)))?;
        self.algorithm.sign(&key.private, payload)
    }

    pub fn verify(&self, public_key: &PublicKey, payload: &[u8], signature: &Signature) -> bool {
        self.algorithm.verify(public_key, payload, signature)
    }

    /// Bind a key to a signing capability
    pub fn signer(self: &Arc<Self>, handle: KeyHandle) -> ClientResult<Signer> {
        if !self.keys.contains_key(&handle) {
            return Err(ClientError::Crypto(format!("no private key for {:?}", handle)));
        }
        Ok(Signer {
            algorithm: self.algorithm.id(),
            key: handle,
            manager: self.clone(),
        })
    }

    fn store(&self, private: Vec<u8>, public: PublicKey) -> KeyHandle {
        let handle = KeyHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.keys.insert(handle, StoredKey { private, public });
        handle
    }
}

/// Capability to sign on behalf of one key
#[derive(Clone)]
pub struct Signer {
    algorithm: SignatureAlgorithmId,
    key: KeyHandle,
    manager: Arc<KeyManager>,
}

impl Signer {
    pub fn algorithm(&self) -> SignatureAlgorithmId {
        self.algorithm
    }

    pub fn key(&self) -> KeyHandle {
        self.key
    }

    pub fn public_key(&self) -> ClientResult<PublicKey> {
        self.manager
            .public_key(self.key)
            .ok_or_else(|| ClientError::Crypto(format!("no key for {:?}", self.key)))
    }

    pub fn sign(&self, payload: &[u8]) -> ClientResult<Signature> {
        self.manager.sign(self.key, payload)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("algorithm", &self.algorithm)
            .field("key", &self.key)
            .finish()
    }
}
