//! Key management and signature algorithms

mod algorithm;
mod keys;

pub use algorithm::{
    algorithm_for, algorithm_named, Ed25519, EmptySignature, PublicKey, Signature,
    SignatureAlgorithm, SignatureAlgorithmId,
};
pub use keys::{KeyHandle, KeyManager, Signer};
