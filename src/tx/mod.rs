//! Transaction construction and submission with nonce management and gas pricing

mod builder;
mod gas;
mod nonce;
mod request;
mod sender;

pub use builder::{CommonParams, TransactionBuilder};
pub use gas::GasPriceOracle;
pub use nonce::{NonceReservation, NonceTracker};
pub use request::{RequestPayload, SignedRequest, TransactionRequest};
pub use sender::{Payer, TransactionSubmitter};
