//! In-process reference ledger
//!
//! Orders and validates requests the way a real node does, records every
//! included transaction with its response, and runs [`NativeClass`] code.
//! Nothing is persisted.

use super::classes::{
    is_subclass, AccountClass, ExecutionContext, ManifestClass, NativeClass, Store, StoredObject,
    NONCE_FIELD, PUBLIC_KEY_FIELD,
};
use super::types::{
    StorageReference, StorageValue, TransactionReference, EXTERNALLY_OWNED_ACCOUNT, GAMETE,
    MANIFEST,
};
use super::{
    ConsensusParams, EndpointError, EndpointResult, InitializationRequest, LedgerEndpoint, Outcome,
    RecordedResponse,
};
use crate::crypto::{algorithm_for, PublicKey, SignatureAlgorithmId};
use crate::tx::{RequestPayload, SignedRequest, TransactionRequest};

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Gas charged to every included transaction
const BASE_GAS: u64 = 100;
/// Installed jar bytes per extra unit of gas
const JAR_BYTES_PER_GAS: u64 = 100;

struct Initialized {
    consensus: ConsensusParams,
    runtime_jar: TransactionReference,
    manifest: StorageReference,
}

struct JarEntry {
    dependencies: Vec<TransactionReference>,
}

#[derive(Default)]
struct LedgerState {
    initialized: Option<Initialized>,
    store: Store,
    jars: HashMap<TransactionReference, JarEntry>,
    responses: HashMap<TransactionReference, RecordedResponse>,
    gas_price: u64,
}

/// Single-process ledger
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    classes: DashMap<String, Arc<dyn NativeClass>>,
    available: AtomicBool,
    drop_next_response: AtomicBool,
}

impl InMemoryLedger {
    /// Create an uninitialized ledger
    pub fn new() -> Self {
        let classes: DashMap<String, Arc<dyn NativeClass>> = DashMap::new();
        classes.insert(
            EXTERNALLY_OWNED_ACCOUNT.to_string(),
            Arc::new(AccountClass { instantiable: true }),
        );
        classes.insert(
            GAMETE.to_string(),
            Arc::new(AccountClass {
                instantiable: false,
            }),
        );
        classes.insert(MANIFEST.to_string(), Arc::new(ManifestClass));

        Self {
            state: RwLock::new(LedgerState::default()),
            classes,
            available: AtomicBool::new(true),
            drop_next_response: AtomicBool::new(false),
        }
    }

    /// Make a class available to transactions
    pub fn register_class(&self, name: impl Into<String>, class: Arc<dyn NativeClass>) {
        let name = name.into();
        debug!("Registered class {}", name);
        self.classes.insert(name, class);
    }

    /// Change the minimal gas price, as the network would under load
    pub async fn set_gas_price(&self, price: u64) {
        self.state.write().await.gas_price = price;
    }

    /// Simulate the endpoint going offline or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Process the next state-changing request, then report it as unanswered
    pub fn drop_next_response(&self) {
        self.drop_next_response.store(true, Ordering::SeqCst);
    }

    /// Green balance of an object
    pub async fn balance(&self, object: &StorageReference) -> Option<u128> {
        self.state
            .read()
            .await
            .store
            .objects
            .get(object)
            .map(|o| o.balance)
    }

    /// Dependencies of an installed jar
    pub async fn jar_dependencies(&self, jar: &TransactionReference) -> Option<Vec<TransactionReference>> {
        self.state
            .read()
            .await
            .jars
            .get(jar)
            .map(|j| j.dependencies.clone())
    }

    /// Number of transactions recorded so far
    pub async fn recorded_transactions(&self) -> usize {
        self.state.read().await.responses.len()
    }

    fn check_available(&self) -> EndpointResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EndpointError::Unavailable("ledger is offline".to_string()))
        }
    }

    fn class_named(&self, name: &str) -> Option<Arc<dyn NativeClass>> {
        self.classes.get(name).map(|c| c.value().clone())
    }

    /// Validate, include and execute a signed request
    async fn include(&self, signed: SignedRequest) -> EndpointResult<Outcome> {
        self.check_available()?;

        let reference = signed
            .reference()
            .map_err(|e| EndpointError::Rejected(e.to_string()))?;

        let mut state = self.state.write().await;
        admit(&state, &signed)?;

        let request = &signed.request;
        let gas_price = u128::from(request.gas_price);
        let mut staged = state.store.clone();

        // Nonce and full gas are paid whatever the outcome
        if let Some(caller) = staged.objects.get_mut(&request.caller) {
            let nonce = caller.fields.get(NONCE_FIELD).and_then(|v| v.as_long()).unwrap_or(0);
            caller
                .fields
                .insert(NONCE_FIELD.to_string(), StorageValue::Long(nonce + 1));
            caller.balance -= u128::from(request.gas_limit) * gas_price;
        }
        let charged = staged.clone();

        let result = self.execute(&mut staged, &mut state.jars, reference, request);

        let response = match result {
            Ok((outcome, consumed)) => {
                if let Some(caller) = staged.objects.get_mut(&request.caller) {
                    caller.balance += u128::from(request.gas_limit - consumed) * gas_price;
                }
                state.store = staged;
                info!("Included {} {} from {}", request.kind(), reference, request.caller);
                RecordedResponse::Success(outcome)
            }
            Err(message) => {
                state.store = charged;
                info!(
                    "Included failed {} {} from {}: {}",
                    request.kind(),
                    reference,
                    request.caller,
                    message
                );
                RecordedResponse::Failed { message }
            }
        };
        state.responses.insert(reference, response.clone());
        drop(state);

        if self.drop_next_response.swap(false, Ordering::SeqCst) {
            return Err(EndpointError::Unavailable("connection reset".to_string()));
        }

        match response {
            RecordedResponse::Success(outcome) => Ok(outcome),
            RecordedResponse::Failed { message } => Err(EndpointError::Failed { reference, message }),
        }
    }

    /// Run the payload on a staged store, returning the outcome and the gas consumed
    fn execute(
        &self,
        store: &mut Store,
        jars: &mut HashMap<TransactionReference, JarEntry>,
        reference: TransactionReference,
        request: &TransactionRequest,
    ) -> Result<(Outcome, u64), String> {
        let consumed = BASE_GAS.min(request.gas_limit);

        match &request.payload {
            RequestPayload::ConstructorCall {
                constructor,
                actuals,
            } => {
                check_actuals(&constructor.formals, actuals)?;
                let class = self
                    .class_named(&constructor.class)
                    .ok_or_else(|| format!("unknown class {}", constructor.class))?;

                let this = StorageReference::new(reference, 0);
                store
                    .objects
                    .insert(this, StoredObject::new(&constructor.class, request.classpath));
                let mut ctx = ExecutionContext::new(store, request.caller, this);
                class.construct(&mut ctx, actuals)?;
                Ok((Outcome::Object(this), consumed))
            }
            RequestPayload::InstanceMethodCall {
                method,
                receiver,
                actuals,
            } => {
                let value = self.invoke(store, request.caller, method, *receiver, actuals)?;
                Ok((Outcome::Value(value), consumed))
            }
            RequestPayload::JarStore { jar, dependencies } => {
                let extra = jar.len() as u64 / JAR_BYTES_PER_GAS;
                let needed = BASE_GAS + extra;
                if needed > request.gas_limit {
                    return Err(format!("out of gas: jar needs {} units", needed));
                }
                jars.insert(
                    reference,
                    JarEntry {
                        dependencies: dependencies.clone(),
                    },
                );
                Ok((Outcome::Jar(reference), needed))
            }
        }
    }

    fn invoke(
        &self,
        store: &mut Store,
        caller: StorageReference,
        method: &super::MethodSignature,
        receiver: StorageReference,
        actuals: &[StorageValue],
    ) -> Result<Option<StorageValue>, String> {
        check_actuals(&method.formals, actuals)?;
        let class = store
            .objects
            .get(&receiver)
            .map(|o| o.class.clone())
            .ok_or_else(|| format!("unknown receiver {}", receiver))?;
        if !is_subclass(&class, &method.class) {
            return Err(format!("{} is not a {}", receiver, method.class));
        }

        let code = self
            .class_named(&class)
            .ok_or_else(|| format!("unknown class {}", class))?;
        let mut ctx = ExecutionContext::new(store, caller, receiver);
        let value = code.invoke(&mut ctx, &method.name, actuals)?;

        match (&method.returns, value) {
            (None, _) => Ok(None),
            (Some(_), None) => Err(format!("{} returned no value", method)),
            (Some(_), value) => Ok(value),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks performed before inclusion. Any failure leaves the ledger untouched.
fn admit(state: &LedgerState, signed: &SignedRequest) -> EndpointResult<()> {
    let initialized = state
        .initialized
        .as_ref()
        .ok_or(EndpointError::NotInitialized)?;
    let consensus = &initialized.consensus;
    let request = &signed.request;

    let caller = state
        .store
        .objects
        .get(&request.caller)
        .ok_or_else(|| EndpointError::Rejected(format!("unknown caller {}", request.caller)))?;
    let (nonce, key) = caller
        .account_view()
        .ok_or_else(|| EndpointError::Rejected(format!("{} is not an account", request.caller)))?;

    if request.chain_id != consensus.chain_id {
        return Err(EndpointError::Rejected(format!(
            "incorrect chain id: expected {:?}, found {:?}",
            consensus.chain_id, request.chain_id
        )));
    }

    let public_key = PublicKey::from_base64(key)
        .map_err(|_| EndpointError::Rejected("caller has a malformed public key".to_string()))?;
    if !signed.verify(algorithm_for(consensus.signature).as_ref(), &public_key) {
        return Err(EndpointError::Rejected("invalid request signature".to_string()));
    }

    if request.nonce != nonce {
        return Err(EndpointError::NonceMismatch {
            expected: nonce,
            found: request.nonce,
        });
    }

    if request.gas_limit < consensus.min_gas_per_transaction
        || request.gas_limit > consensus.max_gas_per_transaction
    {
        return Err(EndpointError::Rejected(format!(
            "gas limit {} outside [{}, {}]",
            request.gas_limit, consensus.min_gas_per_transaction, consensus.max_gas_per_transaction
        )));
    }

    if request.gas_price < state.gas_price {
        return Err(EndpointError::Rejected(format!(
            "gas price {} below the current {}",
            request.gas_price, state.gas_price
        )));
    }

    let cost = u128::from(request.gas_limit) * u128::from(request.gas_price);
    if caller.balance < cost {
        return Err(EndpointError::Rejected(format!(
            "insufficient funds for gas: {} < {}",
            caller.balance, cost
        )));
    }

    if !state.jars.contains_key(&request.classpath) {
        return Err(EndpointError::Rejected(format!(
            "unknown classpath {}",
            request.classpath
        )));
    }

    if let RequestPayload::JarStore { dependencies, .. } = &request.payload {
        if let Some(missing) = dependencies.iter().find(|d| !state.jars.contains_key(d)) {
            return Err(EndpointError::Rejected(format!("unknown dependency {}", missing)));
        }
    }

    Ok(())
}

fn check_actuals(formals: &[super::StorageType], actuals: &[StorageValue]) -> Result<(), String> {
    if formals.len() != actuals.len() || !formals.iter().zip(actuals).all(|(f, a)| f.accepts(a)) {
        return Err("actual arguments do not match the signature".to_string());
    }
    Ok(())
}

#[async_trait]
impl LedgerEndpoint for InMemoryLedger {
    async fn initialize(&self, request: InitializationRequest) -> EndpointResult<StorageReference> {
        self.check_available()?;
        let mut state = self.state.write().await;
        if state.initialized.is_some() {
            return Err(EndpointError::AlreadyInitialized);
        }

        if request.runtime_jar.is_empty() {
            return Err(EndpointError::Rejected("the runtime jar is empty".to_string()));
        }
        PublicKey::from_base64(&request.gamete_public_key)
            .map_err(|e| EndpointError::Rejected(e.to_string()))?;

        let bytes = bincode::serialize(&request)
            .map_err(|e| EndpointError::Rejected(format!("cannot encode request: {}", e)))?;
        let transaction = TransactionReference::of_request_bytes(&bytes);
        let runtime_jar =
            TransactionReference::of_request_bytes(&[b"jar:".as_slice(), bytes.as_slice()].concat());
        let gamete = StorageReference::new(transaction, 0);
        let manifest = StorageReference::new(transaction, 1);

        let mut gamete_object = StoredObject::new(GAMETE, runtime_jar);
        gamete_object.balance = request.green_amount;
        gamete_object.red_balance = request.red_amount;
        gamete_object.fields.insert(
            PUBLIC_KEY_FIELD.to_string(),
            StorageValue::String(request.gamete_public_key.clone()),
        );
        gamete_object
            .fields
            .insert(NONCE_FIELD.to_string(), StorageValue::Long(0));

        let mut manifest_object = StoredObject::new(MANIFEST, runtime_jar);
        manifest_object.fields.insert(
            "chainId".to_string(),
            StorageValue::String(request.consensus.chain_id.clone()),
        );

        state.store.objects.insert(gamete, gamete_object);
        state.store.objects.insert(manifest, manifest_object);
        state.jars.insert(
            runtime_jar,
            JarEntry {
                dependencies: Vec::new(),
            },
        );
        state
            .responses
            .insert(runtime_jar, RecordedResponse::Success(Outcome::Jar(runtime_jar)));
        state.gas_price = request.consensus.initial_gas_price;

        info!(
            "Initialized ledger {:?}: gamete {} with {} green, {} red",
            request.consensus.chain_id, gamete, request.green_amount, request.red_amount
        );

        state.initialized = Some(Initialized {
            consensus: request.consensus,
            runtime_jar,
            manifest,
        });

        Ok(gamete)
    }

    async fn signature_algorithm(&self) -> EndpointResult<SignatureAlgorithmId> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .initialized
            .as_ref()
            .map(|i| i.consensus.signature)
            .unwrap_or(SignatureAlgorithmId::Ed25519))
    }

    async fn chain_id(&self) -> EndpointResult<String> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .initialized
            .as_ref()
            .map(|i| i.consensus.chain_id.clone())
            .ok_or(EndpointError::NotInitialized)
    }

    async fn gas_price(&self) -> EndpointResult<u64> {
        self.check_available()?;
        Ok(self.state.read().await.gas_price)
    }

    async fn nonce(&self, account: &StorageReference) -> EndpointResult<u64> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .store
            .objects
            .get(account)
            .and_then(|o| o.account_view())
            .map(|(nonce, _)| nonce)
            .ok_or_else(|| EndpointError::Rejected(format!("unknown account {}", account)))
    }

    async fn runtime_jar(&self) -> EndpointResult<TransactionReference> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .initialized
            .as_ref()
            .map(|i| i.runtime_jar)
            .ok_or(EndpointError::NotInitialized)
    }

    async fn manifest(&self) -> EndpointResult<StorageReference> {
        self.check_available()?;
        let state = self.state.read().await;
        state
            .initialized
            .as_ref()
            .map(|i| i.manifest)
            .ok_or(EndpointError::NotInitialized)
    }

    async fn add_constructor_call(&self, request: SignedRequest) -> EndpointResult<StorageReference> {
        if !matches!(request.request.payload, RequestPayload::ConstructorCall { .. }) {
            return Err(EndpointError::Rejected("not a constructor call".to_string()));
        }
        match self.include(request).await? {
            Outcome::Object(reference) => Ok(reference),
            other => Err(EndpointError::Rejected(format!("unexpected outcome {:?}", other))),
        }
    }

    async fn add_method_call(&self, request: SignedRequest) -> EndpointResult<Option<StorageValue>> {
        if !matches!(request.request.payload, RequestPayload::InstanceMethodCall { .. }) {
            return Err(EndpointError::Rejected("not a method call".to_string()));
        }
        match self.include(request).await? {
            Outcome::Value(value) => Ok(value),
            other => Err(EndpointError::Rejected(format!("unexpected outcome {:?}", other))),
        }
    }

    async fn run_method_call(&self, request: TransactionRequest) -> EndpointResult<Option<StorageValue>> {
        self.check_available()?;
        let state = self.state.read().await;
        if state.initialized.is_none() {
            return Err(EndpointError::NotInitialized);
        }

        let RequestPayload::InstanceMethodCall {
            method,
            receiver,
            actuals,
        } = &request.payload
        else {
            return Err(EndpointError::Rejected("views must be method calls".to_string()));
        };

        if !state.store.objects.contains_key(&request.caller) {
            return Err(EndpointError::Rejected(format!("unknown caller {}", request.caller)));
        }
        if !state.jars.contains_key(&request.classpath) {
            return Err(EndpointError::Rejected(format!(
                "unknown classpath {}",
                request.classpath
            )));
        }

        // Views run on a throwaway copy
        let mut scratch = state.store.clone();
        drop(state);

        self.invoke(&mut scratch, request.caller, method, *receiver, actuals)
            .map_err(EndpointError::Rejected)
    }

    async fn add_jar_store(&self, request: SignedRequest) -> EndpointResult<TransactionReference> {
        if !matches!(request.request.payload, RequestPayload::JarStore { .. }) {
            return Err(EndpointError::Rejected("not a jar store".to_string()));
        }
        match self.include(request).await? {
            Outcome::Jar(reference) => Ok(reference),
            other => Err(EndpointError::Rejected(format!("unexpected outcome {:?}", other))),
        }
    }

    async fn response(&self, reference: &TransactionReference) -> EndpointResult<Option<RecordedResponse>> {
        self.check_available()?;
        Ok(self.state.read().await.responses.get(reference).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyManager, Signer};
    use crate::ledger::{ConstructorSignature, MethodSignature};

    struct Fixture {
        ledger: InMemoryLedger,
        gamete: StorageReference,
        runtime: TransactionReference,
        signer: Signer,
        public: PublicKey,
    }

    async fn fixture() -> Fixture {
        let manager = Arc::new(KeyManager::new(algorithm_for(SignatureAlgorithmId::Ed25519)));
        let (handle, public) = manager.generate_key_pair().unwrap();
        let ledger = InMemoryLedger::new();
        let gamete = ledger
            .initialize(InitializationRequest {
                consensus: ConsensusParams::default().with_chain_id("test"),
                runtime_jar: vec![0xca, 0xfe],
                gamete_public_key: public.to_base64(),
                green_amount: 100_000_000,
                red_amount: 0,
            })
            .await
            .unwrap();
        let runtime = ledger.runtime_jar().await.unwrap();

        Fixture {
            ledger,
            gamete,
            runtime,
            signer: manager.signer(handle).unwrap(),
            public,
        }
    }

    fn receive(f: &Fixture, nonce: u64, amount: u128) -> SignedRequest {
        TransactionRequest {
            caller: f.gamete,
            nonce,
            chain_id: "test".to_string(),
            gas_limit: 10_000,
            gas_price: 100,
            classpath: f.runtime,
            payload: RequestPayload::InstanceMethodCall {
                method: MethodSignature::receive(),
                receiver: f.gamete,
                actuals: vec![StorageValue::BigInteger(amount)],
            },
        }
        .sign(&f.signer)
        .unwrap()
    }

    #[tokio::test]
    async fn test_initialize_only_once() {
        let f = fixture().await;
        let again = f
            .ledger
            .initialize(InitializationRequest {
                consensus: ConsensusParams::default(),
                runtime_jar: vec![1],
                gamete_public_key: f.public.to_base64(),
                green_amount: 1,
                red_amount: 0,
            })
            .await;
        assert_eq!(again, Err(EndpointError::AlreadyInitialized));
        assert_eq!(f.ledger.nonce(&f.gamete).await.unwrap(), 0);
        assert_eq!(f.ledger.chain_id().await.unwrap(), "test");
    }

    #[tokio::test]
    async fn test_included_call_charges_used_gas_only() {
        let f = fixture().await;
        f.ledger.add_method_call(receive(&f, 0, 0)).await.unwrap();

        assert_eq!(f.ledger.nonce(&f.gamete).await.unwrap(), 1);
        assert_eq!(
            f.ledger.balance(&f.gamete).await,
            Some(100_000_000 - u128::from(BASE_GAS) * 100)
        );
    }

    #[tokio::test]
    async fn test_wrong_nonce_is_rejected_without_effects() {
        let f = fixture().await;
        let err = f.ledger.add_method_call(receive(&f, 3, 0)).await.unwrap_err();

        assert_eq!(
            err,
            EndpointError::NonceMismatch {
                expected: 0,
                found: 3
            }
        );
        assert_eq!(f.ledger.nonce(&f.gamete).await.unwrap(), 0);
        assert_eq!(f.ledger.balance(&f.gamete).await, Some(100_000_000));
        assert_eq!(f.ledger.recorded_transactions().await, 1);
    }

    #[tokio::test]
    async fn test_failed_execution_consumes_nonce_and_gas() {
        let f = fixture().await;
        // more than the gamete holds once gas is charged
        let signed = receive(&f, 0, 100_000_000);
        let reference = signed.reference().unwrap();

        let err = f.ledger.add_method_call(signed).await.unwrap_err();
        assert!(matches!(err, EndpointError::Failed { reference: r, .. } if r == reference));
        assert_eq!(f.ledger.nonce(&f.gamete).await.unwrap(), 1);
        assert_eq!(f.ledger.balance(&f.gamete).await, Some(100_000_000 - 1_000_000));
        assert!(matches!(
            f.ledger.response(&reference).await.unwrap(),
            Some(RecordedResponse::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn test_low_gas_price_is_rejected() {
        let f = fixture().await;
        f.ledger.set_gas_price(150).await;
        let err = f.ledger.add_method_call(receive(&f, 0, 0)).await.unwrap_err();
        assert!(matches!(err, EndpointError::Rejected(m) if m.contains("gas price")));
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected() {
        let f = fixture().await;
        let mut signed = receive(&f, 0, 0);
        signed.request.gas_price = 101;
        let err = f.ledger.add_method_call(signed).await.unwrap_err();
        assert!(matches!(err, EndpointError::Rejected(m) if m.contains("signature")));
    }

    #[tokio::test]
    async fn test_constructor_creates_account() {
        let f = fixture().await;
        let signed = TransactionRequest {
            caller: f.gamete,
            nonce: 0,
            chain_id: "test".to_string(),
            gas_limit: 10_000,
            gas_price: 100,
            classpath: f.runtime,
            payload: RequestPayload::ConstructorCall {
                constructor: ConstructorSignature::externally_owned_account(),
                actuals: vec![
                    StorageValue::BigInteger(5_000),
                    StorageValue::String(f.public.to_base64()),
                ],
            },
        }
        .sign(&f.signer)
        .unwrap();

        let account = f.ledger.add_constructor_call(signed).await.unwrap();
        assert_ne!(account.transaction, f.runtime);
        assert_eq!(f.ledger.nonce(&account).await.unwrap(), 0);
        assert_eq!(f.ledger.balance(&account).await, Some(5_000));
    }

    #[tokio::test]
    async fn test_view_leaves_state_untouched() {
        let f = fixture().await;
        let request = receive(&f, 0, 1_000).request;
        f.ledger.run_method_call(request).await.unwrap();

        assert_eq!(f.ledger.nonce(&f.gamete).await.unwrap(), 0);
        assert_eq!(f.ledger.balance(&f.gamete).await, Some(100_000_000));
    }

    #[tokio::test]
    async fn test_dropped_response_is_still_recorded() {
        let f = fixture().await;
        let signed = receive(&f, 0, 0);
        let reference = signed.reference().unwrap();
        f.ledger.drop_next_response();

        let err = f.ledger.add_method_call(signed).await.unwrap_err();
        assert!(matches!(err, EndpointError::Unavailable(_)));
        assert_eq!(f.ledger.nonce(&f.gamete).await.unwrap(), 1);
        assert!(matches!(
            f.ledger.response(&reference).await.unwrap(),
            Some(RecordedResponse::Success(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_ledger() {
        let f = fixture().await;
        f.ledger.set_available(false);
        assert!(matches!(
            f.ledger.gas_price().await,
            Err(EndpointError::Unavailable(_))
        ));
    }
}
