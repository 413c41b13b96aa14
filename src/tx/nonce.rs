//! Nonce management for reliable transaction submission
//!
//! Handles:
//! - Local nonce tracking, one counter per account
//! - Per-account serialization of transaction construction
//! - Reconciliation with the ledger after ambiguous submissions

use crate::error::{ClientError, ClientResult};
use crate::ledger::{LedgerEndpoint, StorageReference};

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Per-account nonce state
#[derive(Debug, Default)]
pub struct AccountNonceState {
    /// Next nonce to use; `None` until first use or explicit tracking
    next: Option<u64>,
    /// A submission ended without a definitive answer; the ledger must be asked again
    ambiguous: bool,
}

/// Manages nonces for every account this process submits for
pub struct NonceTracker {
    /// Authoritative source used on first use and for reconciliation
    endpoint: Option<Arc<dyn LedgerEndpoint>>,
    accounts: DashMap<StorageReference, Arc<Mutex<AccountNonceState>>>,
}

impl NonceTracker {
    /// Tracker without a ledger behind it: accounts start at zero
    pub fn new() -> Self {
        Self {
            endpoint: None,
            accounts: DashMap::new(),
        }
    }

    /// Tracker that reads starting nonces from the ledger
    pub fn with_endpoint(endpoint: Arc<dyn LedgerEndpoint>) -> Self {
        Self {
            endpoint: Some(endpoint),
            accounts: DashMap::new(),
        }
    }

    /// Seed the nonce of an account whose history is known, such as a freshly created one
    pub fn track(&self, account: StorageReference, next: u64) {
        self.accounts.insert(
            account,
            Arc::new(Mutex::new(AccountNonceState {
                next: Some(next),
                ambiguous: false,
            })),
        );
        debug!("Tracking nonce {} for {}", next, account);
    }

    /// Reserve the account's next nonce. Other reservations for the same
    /// account wait until this one is committed or released.
    pub async fn reserve(&self, account: StorageReference) -> ClientResult<NonceReservation> {
        let state = self.state_of(account);
        let mut guard = state.lock_owned().await;

        if guard.ambiguous {
            warn!("Reconciling nonce of {} after an ambiguous submission", account);
            let on_chain = self.fetch_nonce(&account).await?;
            crate::metrics::record_nonce_reconciliation();
            guard.next = Some(on_chain);
            guard.ambiguous = false;
        }

        let nonce = match guard.next {
            Some(nonce) => nonce,
            None => {
                let initial = match self.endpoint {
                    Some(_) => self.fetch_nonce(&account).await?,
                    None => 0,
                };
                guard.next = Some(initial);
                initial
            }
        };

        Ok(NonceReservation {
            account,
            nonce,
            guard,
        })
    }

    /// Current nonce of an account, without consuming it
    pub async fn current(&self, account: StorageReference) -> ClientResult<u64> {
        let reservation = self.reserve(account).await?;
        Ok(reservation.nonce())
    }

    /// Return the current nonce and advance by one
    pub async fn next(&self, account: StorageReference) -> ClientResult<u64> {
        let reservation = self.reserve(account).await?;
        let nonce = reservation.nonce();
        reservation.commit();
        debug!("Allocated nonce {} for {}", nonce, account);
        Ok(nonce)
    }

    /// Re-read the authoritative nonce from the ledger
    pub async fn sync(&self, account: StorageReference) -> ClientResult<u64> {
        let state = self.state_of(account);
        let mut guard = state.lock().await;
        let on_chain = self.fetch_nonce(&account).await?;

        if let Some(local) = guard.next {
            if on_chain != local {
                warn!(
                    "Nonce of {} differs from ledger: local {}, ledger {}",
                    account, local, on_chain
                );
            }
        }

        guard.next = Some(on_chain);
        guard.ambiguous = false;
        Ok(on_chain)
    }

    /// Number of accounts with local nonce state
    pub fn tracked_accounts(&self) -> usize {
        self.accounts.len()
    }

    pub(crate) async fn fetch_nonce(&self, account: &StorageReference) -> ClientResult<u64> {
        let endpoint = self.endpoint.as_ref().ok_or_else(|| ClientError::Nonce {
            account: account.to_string(),
            message: "no endpoint to reconcile with".to_string(),
        })?;

        endpoint.nonce(account).await.map_err(ClientError::from)
    }

    fn state_of(&self, account: StorageReference) -> Arc<Mutex<AccountNonceState>> {
        self.accounts
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(AccountNonceState::default())))
            .clone()
    }
}

impl Default for NonceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on an account's next nonce
///
/// Dropping the reservation releases it without consuming the nonce.
pub struct NonceReservation {
    account: StorageReference,
    nonce: u64,
    guard: OwnedMutexGuard<AccountNonceState>,
}

impl NonceReservation {
    pub fn account(&self) -> StorageReference {
        self.account
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The ledger included a transaction with this nonce
    pub fn commit(mut self) {
        self.guard.next = Some(self.nonce + 1);
    }

    /// The ledger refused the transaction; the nonce stays available
    pub fn release(self) {}

    /// The outcome is unknown; the next reservation asks the ledger first
    pub fn mark_ambiguous(mut self) {
        self.guard.ambiguous = true;
    }

    /// Adopt the ledger's view after reconciliation
    pub fn resync(mut self, next: u64) {
        self.guard.next = Some(next);
        self.guard.ambiguous = false;
    }
}
