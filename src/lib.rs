//! Ledger client - transaction submission and account provisioning
//!
//! Builds, signs, sequences and submits transactions against a stateful
//! ledger endpoint, with per-account nonce management and gas pricing.
//! Includes a bootstrapper for fresh ledgers, an in-memory reference ledger
//! and an HTTP node service that publishes any endpoint.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod provision;
pub mod tx;

pub use bootstrap::{NodeBootstrapper, Origin};
pub use error::{ClientError, ClientResult};
pub use ledger::{InMemoryLedger, LedgerEndpoint, RemoteLedger};
pub use provision::{Account, AccountProvisioner, Accounts, JarInstaller};
pub use tx::{Payer, TransactionSubmitter};
