//! One-time initialization of a ledger endpoint

use crate::crypto::{algorithm_for, KeyManager, Signer};
use crate::error::{ClientError, ClientResult};
use crate::ledger::{
    ConsensusParams, InMemoryLedger, InitializationRequest, LedgerEndpoint, StorageReference,
    TransactionReference,
};
use crate::provision::Account;
use crate::tx::Payer;

use std::sync::Arc;
use tracing::info;

/// The funding account created at initialization, with what is needed to spend from it
#[derive(Debug, Clone)]
pub struct Origin {
    pub account: Account,
    pub signer: Signer,
    pub runtime_jar: TransactionReference,
    pub manifest: StorageReference,
}

impl Origin {
    pub fn reference(&self) -> StorageReference {
        self.account.reference
    }

    pub fn payer(&self) -> Payer {
        Payer::new(self.account.reference, self.signer.clone())
    }
}

/// Brings a fresh ledger endpoint into a usable state
pub struct NodeBootstrapper {
    keys: Arc<KeyManager>,
}

impl NodeBootstrapper {
    /// Bootstrapper whose keys follow the signature algorithm of `consensus`
    pub fn for_consensus(consensus: &ConsensusParams) -> Self {
        Self::new(Arc::new(KeyManager::new(algorithm_for(consensus.signature))))
    }

    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    /// Install the runtime and create the gamete holding `green` and `red` coins.
    ///
    /// Fails with [`ClientError::AlreadyInitialized`] on an initialized endpoint.
    pub async fn initialize(
        &self,
        endpoint: &dyn LedgerEndpoint,
        consensus: ConsensusParams,
        runtime_jar: Vec<u8>,
        green: u128,
        red: u128,
    ) -> ClientResult<Origin> {
        if self.keys.algorithm() != consensus.signature {
            return Err(ClientError::Crypto(format!(
                "keys use {} but the ledger will verify {}",
                self.keys.algorithm(),
                consensus.signature
            )));
        }

        let (key, public_key) = self.keys.generate_key_pair()?;
        let chain_id = consensus.chain_id.clone();

        let gamete = endpoint
            .initialize(InitializationRequest {
                consensus,
                runtime_jar,
                gamete_public_key: public_key.to_base64(),
                green_amount: green,
                red_amount: red,
            })
            .await?;
        let runtime_jar = endpoint.runtime_jar().await?;
        let manifest = endpoint.manifest().await?;

        info!(
            "Bootstrapped ledger {:?}: gamete {}, runtime {}",
            chain_id, gamete, runtime_jar
        );

        Ok(Origin {
            account: Account {
                reference: gamete,
                public_key,
                key,
                algorithm: self.keys.algorithm(),
            },
            signer: self.keys.signer(key)?,
            runtime_jar,
            manifest,
        })
    }

    /// Create and initialize a fresh in-memory ledger
    pub async fn start_in_memory(
        &self,
        consensus: ConsensusParams,
        runtime_jar: Vec<u8>,
        green: u128,
        red: u128,
    ) -> ClientResult<(Arc<InMemoryLedger>, Origin)> {
        let ledger = Arc::new(InMemoryLedger::new());
        let origin = self
            .initialize(ledger.as_ref(), consensus, runtime_jar, green, red)
            .await?;
        Ok((ledger, origin))
    }
}
