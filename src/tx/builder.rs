//! Pure assembly and structural validation of transaction requests

use super::request::{RequestPayload, TransactionRequest};
use crate::error::{ClientError, ClientResult};
use crate::ledger::{
    ConstructorSignature, MethodSignature, StorageReference, StorageType, StorageValue,
    TransactionReference,
};

/// Fields shared by every state-changing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonParams {
    pub caller: StorageReference,
    pub nonce: u64,
    pub chain_id: String,
    pub gas_limit: u64,
    pub gas_price: u64,
    pub classpath: TransactionReference,
}

/// Builds unsigned requests. Holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionBuilder;

impl TransactionBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build_constructor_call(
        &self,
        common: CommonParams,
        constructor: ConstructorSignature,
        actuals: Vec<StorageValue>,
    ) -> ClientResult<TransactionRequest> {
        check_gas(common.gas_limit)?;
        check_name("class", &constructor.class)?;
        check_actuals(&constructor.to_string(), &constructor.formals, &actuals)?;

        Ok(assemble(
            common,
            RequestPayload::ConstructorCall {
                constructor,
                actuals,
            },
        ))
    }

    pub fn build_method_call(
        &self,
        common: CommonParams,
        method: MethodSignature,
        receiver: StorageReference,
        actuals: Vec<StorageValue>,
    ) -> ClientResult<TransactionRequest> {
        check_gas(common.gas_limit)?;
        check_method(&method)?;
        check_actuals(&method.to_string(), &method.formals, &actuals)?;

        Ok(assemble(
            common,
            RequestPayload::InstanceMethodCall {
                method,
                receiver,
                actuals,
            },
        ))
    }

    pub fn build_jar_store(
        &self,
        common: CommonParams,
        jar: Vec<u8>,
        dependencies: Vec<TransactionReference>,
    ) -> ClientResult<TransactionRequest> {
        check_gas(common.gas_limit)?;
        if jar.is_empty() {
            return Err(ClientError::MalformedRequest("jar is empty".to_string()));
        }
        if dependencies.is_empty() {
            return Err(ClientError::MalformedRequest(
                "a jar needs at least one dependency".to_string(),
            ));
        }

        Ok(assemble(common, RequestPayload::JarStore { jar, dependencies }))
    }

    /// Request for a view method. Never signed, so nonce, chain id and price are placeholders.
    pub fn build_view_call(
        &self,
        caller: StorageReference,
        gas_limit: u64,
        classpath: TransactionReference,
        method: MethodSignature,
        receiver: StorageReference,
        actuals: Vec<StorageValue>,
    ) -> ClientResult<TransactionRequest> {
        let common = CommonParams {
            caller,
            nonce: 0,
            chain_id: String::new(),
            gas_limit,
            gas_price: 0,
            classpath,
        };
        self.build_method_call(common, method, receiver, actuals)
    }
}

fn assemble(common: CommonParams, payload: RequestPayload) -> TransactionRequest {
    TransactionRequest {
        caller: common.caller,
        nonce: common.nonce,
        chain_id: common.chain_id,
        gas_limit: common.gas_limit,
        gas_price: common.gas_price,
        classpath: common.classpath,
        payload,
    }
}

fn check_gas(gas_limit: u64) -> ClientResult<()> {
    if gas_limit == 0 {
        return Err(ClientError::MalformedRequest(
            "gas limit must be positive".to_string(),
        ));
    }
    Ok(())
}

fn check_name(what: &str, name: &str) -> ClientResult<()> {
    if name.trim().is_empty() {
        return Err(ClientError::MalformedRequest(format!("empty {} name", what)));
    }
    Ok(())
}

fn check_method(method: &MethodSignature) -> ClientResult<()> {
    check_name("class", &method.class)?;
    check_name("method", &method.name)
}

fn check_actuals(
    code: &str,
    formals: &[StorageType],
    actuals: &[StorageValue],
) -> ClientResult<()> {
    if formals.len() != actuals.len() {
        return Err(ClientError::MalformedRequest(format!(
            "{} expects {} arguments, got {}",
            code,
            formals.len(),
            actuals.len()
        )));
    }

    for (position, (formal, actual)) in formals.iter().zip(actuals).enumerate() {
        if !formal.accepts(actual) {
            return Err(ClientError::MalformedRequest(format!(
                "argument {} of {} must be {}, got {:?}",
                position, code, formal, actual
            )));
        }
    }

    Ok(())
}
