//! Transaction submitter with outcome classification and nonce reconciliation

use super::builder::{CommonParams, TransactionBuilder};
use super::gas::GasPriceOracle;
use super::nonce::NonceTracker;
use super::request::{RequestPayload, SignedRequest, TransactionRequest};
use crate::config::ClientConfig;
use crate::crypto::Signer;
use crate::error::{ClientError, ClientResult};
use crate::ledger::{
    ConstructorSignature, EndpointError, EndpointResult, LedgerEndpoint, MethodSignature, Outcome,
    RecordedResponse, StorageReference, StorageValue, TransactionReference,
};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// An account paying for transactions, together with its signing capability
#[derive(Debug, Clone)]
pub struct Payer {
    pub account: StorageReference,
    pub signer: Signer,
}

impl Payer {
    pub fn new(account: StorageReference, signer: Signer) -> Self {
        Self { account, signer }
    }
}

/// How a delivery ended
enum Delivery {
    /// The ledger answered definitively
    Settled(ClientResult<Outcome>),
    /// Never included, and the request's nonce is not the caller's current one
    StaleNonce { expected: u64, message: String },
    /// Nobody knows whether the request was included
    Ambiguous(String),
}

impl Delivery {
    /// Definitive refusal by the ledger
    fn refused(e: EndpointError) -> Self {
        match e {
            EndpointError::NonceMismatch { expected, .. } => Delivery::StaleNonce {
                expected,
                message: e.to_string(),
            },
            other => Delivery::Settled(Err(other.into())),
        }
    }
}

enum Reconciliation {
    Included(ClientResult<Outcome>),
    NotIncluded,
    /// The request's nonce went to a different transaction
    Superseded { on_chain: u64, message: String },
    Unknown(String),
}

/// Signs, submits and sequences transactions against one ledger endpoint
pub struct TransactionSubmitter {
    endpoint: Arc<dyn LedgerEndpoint>,
    nonces: Arc<NonceTracker>,
    gas: GasPriceOracle,
    builder: TransactionBuilder,
    config: ClientConfig,
}

impl TransactionSubmitter {
    /// Create a submitter with its own nonce tracker and gas oracle
    pub fn new(endpoint: Arc<dyn LedgerEndpoint>, config: ClientConfig) -> Self {
        let nonces = Arc::new(NonceTracker::with_endpoint(endpoint.clone()));
        Self::with_nonces(endpoint, nonces, config)
    }

    /// Create a submitter sharing an existing nonce tracker
    pub fn with_nonces(
        endpoint: Arc<dyn LedgerEndpoint>,
        nonces: Arc<NonceTracker>,
        config: ClientConfig,
    ) -> Self {
        let gas = GasPriceOracle::with_margin(endpoint.clone(), config.gas_margin_percent);
        Self {
            endpoint,
            nonces,
            gas,
            builder: TransactionBuilder::new(),
            config,
        }
    }

    pub fn endpoint(&self) -> &Arc<dyn LedgerEndpoint> {
        &self.endpoint
    }

    pub fn nonces(&self) -> &Arc<NonceTracker> {
        &self.nonces
    }

    pub fn gas(&self) -> &GasPriceOracle {
        &self.gas
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign an already built request and submit it.
    ///
    /// Nonce state is left to the caller.
    pub async fn submit(&self, request: TransactionRequest, signer: &Signer) -> ClientResult<Outcome> {
        let signed = request.sign(signer)?;
        match self.deliver(signed).await {
            Delivery::Settled(result) => result,
            Delivery::StaleNonce { message, .. } => Err(ClientError::RejectedByEndpoint(message)),
            Delivery::Ambiguous(message) => Err(ClientError::EndpointUnavailable(message)),
        }
    }

    /// Create an object, paid by `payer`
    pub async fn constructor_call(
        &self,
        payer: &Payer,
        classpath: TransactionReference,
        constructor: ConstructorSignature,
        actuals: Vec<StorageValue>,
    ) -> ClientResult<StorageReference> {
        let outcome = self
            .transact(payer, classpath, |common| {
                self.builder
                    .build_constructor_call(common, constructor, actuals)
            })
            .await?;

        match outcome {
            Outcome::Object(reference) => Ok(reference),
            other => Err(unexpected("constructor call", &other)),
        }
    }

    /// Call an instance method, paid by `payer`
    pub async fn method_call(
        &self,
        payer: &Payer,
        classpath: TransactionReference,
        method: MethodSignature,
        receiver: StorageReference,
        actuals: Vec<StorageValue>,
    ) -> ClientResult<Option<StorageValue>> {
        let outcome = self
            .transact(payer, classpath, |common| {
                self.builder
                    .build_method_call(common, method, receiver, actuals)
            })
            .await?;

        match outcome {
            Outcome::Value(value) => Ok(value),
            other => Err(unexpected("method call", &other)),
        }
    }

    /// Install a jar, paid by `payer`
    pub async fn jar_store(
        &self,
        payer: &Payer,
        classpath: TransactionReference,
        jar: Vec<u8>,
        dependencies: Vec<TransactionReference>,
    ) -> ClientResult<TransactionReference> {
        let outcome = self
            .transact(payer, classpath, |common| {
                self.builder.build_jar_store(common, jar, dependencies)
            })
            .await?;

        match outcome {
            Outcome::Jar(reference) => Ok(reference),
            other => Err(unexpected("jar store", &other)),
        }
    }

    /// Run a view method. No nonce, no signature, nothing recorded.
    pub async fn run_view(&self, request: TransactionRequest) -> ClientResult<Option<StorageValue>> {
        match timeout(self.submit_timeout(), self.endpoint.run_method_call(request)).await {
            Ok(result) => result.map_err(ClientError::from),
            Err(_) => Err(ClientError::Timeout {
                operation: "view call".to_string(),
            }),
        }
    }

    /// Build and run a view method call
    pub async fn view_call(
        &self,
        caller: StorageReference,
        classpath: TransactionReference,
        method: MethodSignature,
        receiver: StorageReference,
        actuals: Vec<StorageValue>,
    ) -> ClientResult<Option<StorageValue>> {
        let request = self.builder.build_view_call(
            caller,
            self.config.gas_limit,
            classpath,
            method,
            receiver,
            actuals,
        )?;
        self.run_view(request).await
    }

    /// Reserve a nonce, price, build, sign and deliver; then settle the nonce
    async fn transact<F>(
        &self,
        payer: &Payer,
        classpath: TransactionReference,
        build: F,
    ) -> ClientResult<Outcome>
    where
        F: FnOnce(CommonParams) -> ClientResult<TransactionRequest>,
    {
        // Held until the ledger answers definitively
        let reservation = self.nonces.reserve(payer.account).await?;
        let gas_price = self.gas.safe_gas_price().await?;

        let request = build(CommonParams {
            caller: payer.account,
            nonce: reservation.nonce(),
            chain_id: self.config.chain_id.clone(),
            gas_limit: self.config.gas_limit,
            gas_price,
            classpath,
        })?;
        let kind = request.kind();
        let signed = request.sign(&payer.signer)?;

        let started = Instant::now();
        let delivery = self.deliver(signed).await;
        crate::metrics::record_tx_latency(kind, started.elapsed().as_secs_f64());

        match delivery {
            Delivery::Settled(Ok(outcome)) => {
                reservation.commit();
                crate::metrics::record_tx_submitted(kind);
                Ok(outcome)
            }
            Delivery::Settled(Err(e)) if e.consumes_nonce() => {
                reservation.commit();
                crate::metrics::record_tx_failed(kind);
                Err(e)
            }
            Delivery::Settled(Err(e)) => {
                crate::metrics::record_tx_rejected(kind);
                reservation.release();
                Err(e)
            }
            Delivery::StaleNonce { expected, message } => {
                warn!(
                    "Nonce {} of {} is stale, the ledger expects {}",
                    reservation.nonce(),
                    payer.account,
                    expected
                );
                crate::metrics::record_tx_rejected(kind);
                reservation.resync(expected);
                Err(ClientError::RejectedByEndpoint(message))
            }
            Delivery::Ambiguous(message) => {
                warn!(
                    "Outcome of {} from {} is unknown: {}",
                    kind, payer.account, message
                );
                reservation.mark_ambiguous();
                Err(ClientError::EndpointUnavailable(message))
            }
        }
    }

    /// Send with retry. Only an endpoint that did not answer is retried, and only
    /// after the ledger confirms the request was not included.
    async fn deliver(&self, signed: SignedRequest) -> Delivery {
        let reference = match signed.reference() {
            Ok(reference) => reference,
            Err(e) => return Delivery::Settled(Err(e)),
        };

        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0;
        let mut last_error = String::new();

        while attempts < max_attempts {
            attempts += 1;

            let result = timeout(self.submit_timeout(), self.send_once(signed.clone())).await;

            match result {
                Ok(Ok(outcome)) => {
                    info!(
                        "Transaction {} accepted (attempt {}/{})",
                        reference, attempts, max_attempts
                    );
                    return Delivery::Settled(Ok(outcome));
                }
                Ok(Err(EndpointError::Unavailable(message))) => {
                    warn!(
                        "Endpoint unavailable for {} (attempt {}): {}",
                        reference, attempts, message
                    );
                    last_error = message;
                }
                // A resubmission may be refused because the first attempt landed after all
                Ok(Err(
                    e @ (EndpointError::Rejected(_) | EndpointError::NonceMismatch { .. }),
                )) if attempts > 1 => {
                    return match self.reconcile(&signed.request, reference).await {
                        Reconciliation::Included(result) => Delivery::Settled(result),
                        Reconciliation::NotIncluded => Delivery::refused(e),
                        Reconciliation::Superseded { on_chain, message } => Delivery::StaleNonce {
                            expected: on_chain,
                            message,
                        },
                        Reconciliation::Unknown(why) => Delivery::Ambiguous(why),
                    };
                }
                Ok(Err(e)) => {
                    debug!("Transaction {} settled with {}", reference, e);
                    return Delivery::refused(e);
                }
                Err(_) => {
                    warn!("Transaction send timeout (attempt {})", attempts);
                    last_error = format!(
                        "no answer within {} ms",
                        self.config.submit_timeout_ms
                    );
                }
            }

            match self.reconcile(&signed.request, reference).await {
                Reconciliation::Included(result) => return Delivery::Settled(result),
                Reconciliation::NotIncluded => {}
                Reconciliation::Superseded { on_chain, message } => {
                    return Delivery::StaleNonce {
                        expected: on_chain,
                        message,
                    };
                }
                Reconciliation::Unknown(why) => {
                    return Delivery::Ambiguous(format!("{}; {}", last_error, why));
                }
            }

            // Wait before retry
            if attempts < max_attempts {
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }

        // The last attempt may still be in flight
        Delivery::Ambiguous(last_error)
    }

    /// Decide from the ledger's nonce and records whether a request was included
    async fn reconcile(&self, request: &TransactionRequest, reference: TransactionReference) -> Reconciliation {
        crate::metrics::record_nonce_reconciliation();

        let on_chain = match timeout(self.submit_timeout(), self.endpoint.nonce(&request.caller)).await {
            Ok(Ok(nonce)) => nonce,
            Ok(Err(e)) => return Reconciliation::Unknown(format!("cannot read nonce: {}", e)),
            Err(_) => return Reconciliation::Unknown("nonce query timed out".to_string()),
        };

        if on_chain <= request.nonce {
            debug!(
                "Transaction {} not included: ledger nonce {} for {}",
                reference, on_chain, request.caller
            );
            return Reconciliation::NotIncluded;
        }

        match timeout(self.submit_timeout(), self.endpoint.response(&reference)).await {
            Ok(Ok(Some(RecordedResponse::Success(outcome)))) => {
                info!("Transaction {} was included despite the lost answer", reference);
                Reconciliation::Included(Ok(outcome))
            }
            Ok(Ok(Some(RecordedResponse::Failed { message }))) => {
                Reconciliation::Included(Err(ClientError::ExecutionFailed { reference, message }))
            }
            Ok(Ok(None)) => Reconciliation::Superseded {
                on_chain,
                message: format!(
                    "nonce {} of {} was consumed by another transaction",
                    request.nonce, request.caller
                ),
            },
            Ok(Err(e)) => Reconciliation::Unknown(format!("cannot read response: {}", e)),
            Err(_) => Reconciliation::Unknown("response query timed out".to_string()),
        }
    }

    async fn send_once(&self, signed: SignedRequest) -> EndpointResult<Outcome> {
        match signed.request.payload {
            RequestPayload::ConstructorCall { .. } => self
                .endpoint
                .add_constructor_call(signed)
                .await
                .map(Outcome::Object),
            RequestPayload::InstanceMethodCall { .. } => {
                self.endpoint.add_method_call(signed).await.map(Outcome::Value)
            }
            RequestPayload::JarStore { .. } => {
                self.endpoint.add_jar_store(signed).await.map(Outcome::Jar)
            }
        }
    }

    fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.config.submit_timeout_ms)
    }
}

fn unexpected(operation: &str, outcome: &Outcome) -> ClientError {
    ClientError::Internal(format!("{} produced {:?}", operation, outcome))
}
