//! Native classes executed by the in-memory ledger
//!
//! A class is Rust code registered under a name. Constructors and methods see
//! the store only through an [`ExecutionContext`], which works on a staged copy
//! that the ledger discards if the code fails.

use super::types::{
    StorageReference, StorageValue, TransactionReference, EXTERNALLY_OWNED_ACCOUNT, GAMETE,
    MANIFEST,
};
use crate::crypto::PublicKey;

use std::collections::{BTreeMap, HashMap};

/// Named fields of an object
pub type Fields = BTreeMap<String, StorageValue>;

/// Field holding the Base64 public key of an account
pub(crate) const PUBLIC_KEY_FIELD: &str = "publicKey";
/// Field holding the nonce of an account
pub(crate) const NONCE_FIELD: &str = "nonce";

#[derive(Debug, Clone)]
pub(crate) struct StoredObject {
    pub class: String,
    pub classpath: TransactionReference,
    pub fields: Fields,
    pub balance: u128,
    pub red_balance: u128,
}

impl StoredObject {
    pub fn new(class: &str, classpath: TransactionReference) -> Self {
        Self {
            class: class.to_string(),
            classpath,
            fields: Fields::new(),
            balance: 0,
            red_balance: 0,
        }
    }

    /// Nonce and key of an account; `None` for objects that cannot pay
    pub fn account_view(&self) -> Option<(u64, &str)> {
        let nonce = self.fields.get(NONCE_FIELD)?.as_long()?;
        let key = self.fields.get(PUBLIC_KEY_FIELD)?.as_str()?;
        Some((u64::try_from(nonce).ok()?, key))
    }
}

/// Objects of the ledger, keyed by reference
#[derive(Debug, Clone, Default)]
pub(crate) struct Store {
    pub objects: HashMap<StorageReference, StoredObject>,
}

/// Code running inside a transaction
pub struct ExecutionContext<'a> {
    store: &'a mut Store,
    caller: StorageReference,
    this: StorageReference,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(store: &'a mut Store, caller: StorageReference, this: StorageReference) -> Self {
        Self {
            store,
            caller,
            this,
        }
    }

    /// Account that signed and paid for the transaction
    pub fn caller(&self) -> StorageReference {
        self.caller
    }

    /// Object being constructed or receiving the call
    pub fn this(&self) -> StorageReference {
        self.this
    }

    pub fn field(&self, name: &str) -> Option<StorageValue> {
        self.field_of(self.this, name)
    }

    pub fn field_of(&self, object: StorageReference, name: &str) -> Option<StorageValue> {
        self.store
            .objects
            .get(&object)
            .and_then(|o| o.fields.get(name).cloned())
    }

    pub fn set_field(&mut self, name: &str, value: StorageValue) -> Result<(), String> {
        let this = self.this;
        let object = self
            .store
            .objects
            .get_mut(&this)
            .ok_or_else(|| format!("unknown object {}", this))?;
        object.fields.insert(name.to_string(), value);
        Ok(())
    }

    pub fn class_of(&self, object: StorageReference) -> Option<String> {
        self.store.objects.get(&object).map(|o| o.class.clone())
    }

    pub fn balance_of(&self, object: StorageReference) -> Result<u128, String> {
        self.store
            .objects
            .get(&object)
            .map(|o| o.balance)
            .ok_or_else(|| format!("unknown object {}", object))
    }

    /// Move green coins between two objects
    pub fn transfer(
        &mut self,
        from: StorageReference,
        to: StorageReference,
        amount: u128,
    ) -> Result<(), String> {
        if !self.store.objects.contains_key(&to) {
            return Err(format!("unknown object {}", to));
        }

        let source = self
            .store
            .objects
            .get_mut(&from)
            .ok_or_else(|| format!("unknown object {}", from))?;
        if source.balance < amount {
            return Err(format!(
                "insufficient funds: {} has {}, needs {}",
                from, source.balance, amount
            ));
        }
        source.balance -= amount;

        if let Some(target) = self.store.objects.get_mut(&to) {
            target.balance += amount;
        }
        Ok(())
    }
}

/// Code of a class
pub trait NativeClass: Send + Sync {
    /// Initialize `ctx.this()`. An error fails the transaction.
    fn construct(&self, ctx: &mut ExecutionContext<'_>, actuals: &[StorageValue]) -> Result<(), String>;

    /// Run an instance method on `ctx.this()`. An error fails the transaction.
    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        actuals: &[StorageValue],
    ) -> Result<Option<StorageValue>, String>;
}

/// Whether an object of `class` can receive calls to methods declared in `declaring`
pub(crate) fn is_subclass(class: &str, declaring: &str) -> bool {
    class == declaring || (class == GAMETE && declaring == EXTERNALLY_OWNED_ACCOUNT)
}

/// Accounts controlled by a key pair. The gamete shares this code.
pub(crate) struct AccountClass {
    pub instantiable: bool,
}

impl NativeClass for AccountClass {
    fn construct(&self, ctx: &mut ExecutionContext<'_>, actuals: &[StorageValue]) -> Result<(), String> {
        if !self.instantiable {
            return Err("this class cannot be instantiated by a transaction".to_string());
        }

        let (funds, key) = match actuals {
            [StorageValue::BigInteger(funds), StorageValue::String(key)] => (*funds, key.clone()),
            _ => return Err("expected (BigInteger, String)".to_string()),
        };
        PublicKey::from_base64(&key).map_err(|e| e.to_string())?;

        ctx.transfer(ctx.caller(), ctx.this(), funds)?;
        ctx.set_field(PUBLIC_KEY_FIELD, StorageValue::String(key))?;
        ctx.set_field(NONCE_FIELD, StorageValue::Long(0))
    }

    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        actuals: &[StorageValue],
    ) -> Result<Option<StorageValue>, String> {
        match (method, actuals) {
            ("balance", []) => Ok(Some(StorageValue::BigInteger(ctx.balance_of(ctx.this())?))),
            ("nonce", []) => Ok(ctx.field(NONCE_FIELD)),
            ("publicKey", []) => Ok(ctx.field(PUBLIC_KEY_FIELD)),
            ("receive", [StorageValue::BigInteger(amount)]) => {
                ctx.transfer(ctx.caller(), ctx.this(), *amount)?;
                Ok(None)
            }
            _ => Err(format!("unknown method {}", method)),
        }
    }
}

/// Holds the ledger-wide parameters
pub(crate) struct ManifestClass;

impl NativeClass for ManifestClass {
    fn construct(&self, _ctx: &mut ExecutionContext<'_>, _actuals: &[StorageValue]) -> Result<(), String> {
        Err(format!("{} cannot be instantiated by a transaction", MANIFEST))
    }

    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        actuals: &[StorageValue],
    ) -> Result<Option<StorageValue>, String> {
        match (method, actuals) {
            ("chainId", []) => Ok(ctx.field("chainId")),
            _ => Err(format!("unknown method {}", method)),
        }
    }
}
