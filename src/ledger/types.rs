//! Ledger-side identifiers, values and code signatures

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Class of the origin account created at initialization
pub const GAMETE: &str = "Gamete";
/// Class of the manifest object created at initialization
pub const MANIFEST: &str = "Manifest";
/// Class of accounts controlled by an external key pair
pub const EXTERNALLY_OWNED_ACCOUNT: &str = "ExternallyOwnedAccount";

/// Reference to a transaction, the SHA3-256 hash of its request
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionReference([u8; 32]);

impl TransactionReference {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Reference of the request whose canonical bytes are given
    pub fn of_request_bytes(bytes: &[u8]) -> Self {
        Self(Sha3_256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionReference({})", self)
    }
}

impl FromStr for TransactionReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| format!("invalid transaction reference: {}", e))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "transaction references are 32 bytes".to_string())?;
        Ok(Self(bytes))
    }
}

impl Serialize for TransactionReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TransactionReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            Ok(Self(<[u8; 32]>::deserialize(deserializer)?))
        }
    }
}

/// Reference to an object in the store: the transaction that created it and a progressive
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageReference {
    pub transaction: TransactionReference,
    pub progressive: u32,
}

impl StorageReference {
    pub fn new(transaction: TransactionReference, progressive: u32) -> Self {
        Self {
            transaction,
            progressive,
        }
    }
}

impl fmt::Display for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:x}", self.transaction, self.progressive)
    }
}

impl fmt::Debug for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageReference({})", self)
    }
}

impl FromStr for StorageReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (transaction, progressive) = s
            .split_once('#')
            .ok_or_else(|| format!("invalid storage reference {}", s))?;
        let progressive = u32::from_str_radix(progressive, 16)
            .map_err(|e| format!("invalid progressive in {}: {}", s, e))?;
        Ok(Self::new(transaction.parse()?, progressive))
    }
}

/// Types of formal parameters and return values
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Boolean,
    Int,
    Long,
    BigInteger,
    String,
    Class(String),
}

impl StorageType {
    pub fn class(name: impl Into<String>) -> Self {
        StorageType::Class(name.into())
    }

    /// Whether a value can be passed where this type is expected
    pub fn accepts(&self, value: &StorageValue) -> bool {
        match (self, value) {
            (StorageType::Boolean, StorageValue::Boolean(_)) => true,
            (StorageType::Int, StorageValue::Int(_)) => true,
            (StorageType::Long, StorageValue::Long(_)) => true,
            (StorageType::BigInteger, StorageValue::BigInteger(_)) => true,
            (StorageType::String, StorageValue::String(_)) => true,
            (StorageType::Class(_), StorageValue::Reference(_)) => true,
            (StorageType::BigInteger | StorageType::String | StorageType::Class(_), StorageValue::Null) => {
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Boolean => write!(f, "boolean"),
            StorageType::Int => write!(f, "int"),
            StorageType::Long => write!(f, "long"),
            StorageType::BigInteger => write!(f, "BigInteger"),
            StorageType::String => write!(f, "String"),
            StorageType::Class(name) => write!(f, "{}", name),
        }
    }
}

/// Values passed to and returned from code in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageValue {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    BigInteger(u128),
    String(String),
    Reference(StorageReference),
}

impl StorageValue {
    pub fn as_big_integer(&self) -> Option<u128> {
        match self {
            StorageValue::BigInteger(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            StorageValue::Long(v) => Some(*v),
            StorageValue::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StorageValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<StorageReference> {
        match self {
            StorageValue::Reference(r) => Some(*r),
            _ => None,
        }
    }
}

impl fmt::Display for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageValue::Null => write!(f, "null"),
            StorageValue::Boolean(v) => write!(f, "{}", v),
            StorageValue::Int(v) => write!(f, "{}", v),
            StorageValue::Long(v) => write!(f, "{}", v),
            StorageValue::BigInteger(v) => write!(f, "{}", v),
            StorageValue::String(s) => write!(f, "{}", s),
            StorageValue::Reference(r) => write!(f, "{}", r),
        }
    }
}

/// Constructor of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructorSignature {
    pub class: String,
    pub formals: Vec<StorageType>,
}

impl ConstructorSignature {
    pub fn new(class: impl Into<String>, formals: Vec<StorageType>) -> Self {
        Self {
            class: class.into(),
            formals,
        }
    }

    /// `ExternallyOwnedAccount(BigInteger funds, String publicKey)`
    pub fn externally_owned_account() -> Self {
        Self::new(
            EXTERNALLY_OWNED_ACCOUNT,
            vec![StorageType::BigInteger, StorageType::String],
        )
    }
}

impl fmt::Display for ConstructorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.class, join_types(&self.formals))
    }
}

/// Instance method of a class. `returns` is `None` for void methods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub class: String,
    pub name: String,
    pub formals: Vec<StorageType>,
    pub returns: Option<StorageType>,
}

impl MethodSignature {
    pub fn void(class: impl Into<String>, name: impl Into<String>, formals: Vec<StorageType>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            formals,
            returns: None,
        }
    }

    pub fn returning(
        class: impl Into<String>,
        name: impl Into<String>,
        returns: StorageType,
        formals: Vec<StorageType>,
    ) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            formals,
            returns: Some(returns),
        }
    }

    /// `BigInteger ExternallyOwnedAccount.balance()`
    pub fn balance() -> Self {
        Self::returning(EXTERNALLY_OWNED_ACCOUNT, "balance", StorageType::BigInteger, vec![])
    }

    /// `long ExternallyOwnedAccount.nonce()`
    pub fn nonce() -> Self {
        Self::returning(EXTERNALLY_OWNED_ACCOUNT, "nonce", StorageType::Long, vec![])
    }

    /// `String ExternallyOwnedAccount.publicKey()`
    pub fn public_key() -> Self {
        Self::returning(EXTERNALLY_OWNED_ACCOUNT, "publicKey", StorageType::String, vec![])
    }

    /// `void ExternallyOwnedAccount.receive(BigInteger)`
    pub fn receive() -> Self {
        Self::void(EXTERNALLY_OWNED_ACCOUNT, "receive", vec![StorageType::BigInteger])
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let returns = self
            .returns
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "void".to_string());
        write!(
            f,
            "{} {}.{}({})",
            returns,
            self.class,
            self.name,
            join_types(&self.formals)
        )
    }
}

fn join_types(types: &[StorageType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_reference_display_parse() {
        let reference = StorageReference::new(TransactionReference::of_request_bytes(b"tx"), 26);
        let shown = reference.to_string();
        assert!(shown.ends_with("#1a"));
        assert_eq!(shown.parse::<StorageReference>().unwrap(), reference);
        assert!("abc".parse::<StorageReference>().is_err());
        assert!("00#1".parse::<StorageReference>().is_err());
    }

    #[test]
    fn test_transaction_reference_json_is_hex() {
        let reference = TransactionReference::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: TransactionReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reference);
    }

    #[test]
    fn test_type_compatibility() {
        let person = StorageType::class("Person");
        assert!(person.accepts(&StorageValue::Null));
        assert!(StorageType::String.accepts(&StorageValue::String("x".into())));
        assert!(!StorageType::Int.accepts(&StorageValue::Long(3)));
        assert!(!StorageType::Boolean.accepts(&StorageValue::Null));
    }

    #[test]
    fn test_signature_display() {
        assert_eq!(
            ConstructorSignature::externally_owned_account().to_string(),
            "ExternallyOwnedAccount(BigInteger,String)"
        );
        assert_eq!(
            MethodSignature::void("Ponzi", "invest", vec![StorageType::BigInteger]).to_string(),
            "void Ponzi.invest(BigInteger)"
        );
    }
}
