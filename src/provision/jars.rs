//! Installation of jars that depend on the runtime

use crate::error::ClientResult;
use crate::ledger::TransactionReference;
use crate::tx::{Payer, TransactionSubmitter};

use std::sync::Arc;
use tracing::info;

/// Installs jars on top of the runtime, paid by an origin account
pub struct JarInstaller {
    submitter: Arc<TransactionSubmitter>,
}

impl JarInstaller {
    pub fn new(submitter: Arc<TransactionSubmitter>) -> Self {
        Self { submitter }
    }

    /// One jar store per jar, each depending on the runtime jar. References follow the order of `jars`.
    pub async fn install_jars(
        &self,
        origin: &Payer,
        jars: Vec<Vec<u8>>,
    ) -> ClientResult<Vec<TransactionReference>> {
        let runtime_jar = self.submitter.endpoint().runtime_jar().await?;
        let mut installed = Vec::with_capacity(jars.len());

        for jar in jars {
            let size = jar.len();
            let reference = self
                .submitter
                .jar_store(origin, runtime_jar, jar, vec![runtime_jar])
                .await?;
            info!("Installed jar {} ({} bytes)", reference, size);
            installed.push(reference);
        }

        Ok(installed)
    }
}
