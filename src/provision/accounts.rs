//! Creation of funded accounts paid by an existing one

use crate::crypto::{KeyHandle, KeyManager, PublicKey, SignatureAlgorithmId};
use crate::error::ClientResult;
use crate::ledger::{ConstructorSignature, StorageReference, StorageValue};
use crate::tx::{Payer, TransactionSubmitter};

use std::sync::Arc;
use tracing::{error, info};

/// An externally owned account. The private key stays in the [`KeyManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub reference: StorageReference,
    pub public_key: PublicKey,
    pub key: KeyHandle,
    pub algorithm: SignatureAlgorithmId,
}

impl Account {
    /// Payer for transactions signed with this account's key
    pub fn payer(&self, keys: &Arc<KeyManager>) -> ClientResult<Payer> {
        Ok(Payer::new(self.reference, keys.signer(self.key)?))
    }
}

/// Accounts in creation order
#[derive(Debug, Clone, Default)]
pub struct Accounts {
    accounts: Vec<Account>,
}

impl Accounts {
    pub fn account(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Account> {
        self.accounts.iter()
    }

    pub fn references(&self) -> Vec<StorageReference> {
        self.accounts.iter().map(|a| a.reference).collect()
    }
}

impl From<Vec<Account>> for Accounts {
    fn from(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }
}

impl IntoIterator for Accounts {
    type Item = Account;
    type IntoIter = std::vec::IntoIter<Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.into_iter()
    }
}

impl<'a> IntoIterator for &'a Accounts {
    type Item = &'a Account;
    type IntoIter = std::slice::Iter<'a, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.accounts.iter()
    }
}

/// Creates funded accounts, one constructor call each
pub struct AccountProvisioner {
    keys: Arc<KeyManager>,
    submitter: Arc<TransactionSubmitter>,
}

impl AccountProvisioner {
    pub fn new(keys: Arc<KeyManager>, submitter: Arc<TransactionSubmitter>) -> Self {
        Self { keys, submitter }
    }

    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Create one account per amount, in order, funded and paid by `origin`.
    ///
    /// Stops at the first failure; accounts created before it remain on the ledger.
    pub async fn create_accounts(&self, origin: &Payer, amounts: &[u128]) -> ClientResult<Accounts> {
        let runtime_jar = self.submitter.endpoint().runtime_jar().await?;
        let mut accounts = Vec::with_capacity(amounts.len());

        for (index, amount) in amounts.iter().enumerate() {
            let (key, public_key) = self.keys.generate_key_pair()?;

            let created = self
                .submitter
                .constructor_call(
                    origin,
                    runtime_jar,
                    ConstructorSignature::externally_owned_account(),
                    vec![
                        StorageValue::BigInteger(*amount),
                        StorageValue::String(public_key.to_base64()),
                    ],
                )
                .await;

            let reference = match created {
                Ok(reference) => reference,
                Err(e) => {
                    error!(
                        "Failed to create account {} of {} funded with {}: {}",
                        index + 1,
                        amounts.len(),
                        amount,
                        e
                    );
                    crate::metrics::record_accounts_created(accounts.len());
                    return Err(e);
                }
            };

            // A new account has never sent anything
            self.submitter.nonces().track(reference, 0);
            info!("Created account {} with {}", reference, amount);

            accounts.push(Account {
                reference,
                public_key,
                key,
                algorithm: self.keys.algorithm(),
            });
        }

        crate::metrics::record_accounts_created(accounts.len());
        Ok(accounts.into())
    }
}
