#![allow(dead_code)]

use ledger_client::config::ClientConfig;
use ledger_client::ledger::{
    ConsensusParams, ConstructorSignature, ExecutionContext, MethodSignature, NativeClass,
    StorageType, StorageValue,
};
use ledger_client::{InMemoryLedger, NodeBootstrapper, Origin, TransactionSubmitter};

use std::sync::Arc;

pub const CHAIN_ID: &str = "integration";
pub const PONZI: &str = "SimplePonzi";

/// Each investment must exceed the previous one by 10% and pays the previous investor
pub struct SimplePonzi;

impl NativeClass for SimplePonzi {
    fn construct(&self, ctx: &mut ExecutionContext<'_>, _actuals: &[StorageValue]) -> Result<(), String> {
        ctx.set_field("currentInvestment", StorageValue::BigInteger(10))?;
        let creator = ctx.caller();
        ctx.set_field("currentInvestor", StorageValue::Reference(creator))
    }

    fn invoke(
        &self,
        ctx: &mut ExecutionContext<'_>,
        method: &str,
        actuals: &[StorageValue],
    ) -> Result<Option<StorageValue>, String> {
        match (method, actuals) {
            ("invest", [StorageValue::BigInteger(amount)]) => {
                let current = ctx
                    .field("currentInvestment")
                    .and_then(|v| v.as_big_integer())
                    .unwrap_or(0);
                let minimum = current * 11 / 10;
                if *amount < minimum {
                    return Err(format!("you must invest at least {}", minimum));
                }

                let previous = ctx
                    .field("currentInvestor")
                    .and_then(|v| v.as_reference())
                    .ok_or("no current investor")?;
                ctx.transfer(ctx.caller(), ctx.this(), *amount)?;
                ctx.transfer(ctx.this(), previous, *amount)?;

                ctx.set_field("currentInvestment", StorageValue::BigInteger(*amount))?;
                let investor = ctx.caller();
                ctx.set_field("currentInvestor", StorageValue::Reference(investor))?;
                Ok(None)
            }
            ("currentInvestment", []) => Ok(ctx.field("currentInvestment")),
            _ => Err(format!("unknown method {}", method)),
        }
    }
}

pub fn ponzi_constructor() -> ConstructorSignature {
    ConstructorSignature::new(PONZI, vec![])
}

pub fn invest() -> MethodSignature {
    MethodSignature::void(PONZI, "invest", vec![StorageType::BigInteger])
}

pub fn current_investment() -> MethodSignature {
    MethodSignature::returning(PONZI, "currentInvestment", StorageType::BigInteger, vec![])
}

pub fn consensus() -> ConsensusParams {
    ConsensusParams::default()
        .with_chain_id(CHAIN_ID)
        .with_initial_gas_price(1)
}

pub fn client_config() -> ClientConfig {
    ClientConfig {
        chain_id: CHAIN_ID.to_string(),
        gas_limit: 10_000,
        retry_delay_ms: 10,
        submit_timeout_ms: 5_000,
        ..ClientConfig::default()
    }
}

pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub origin: Origin,
    pub bootstrapper: NodeBootstrapper,
    pub submitter: Arc<TransactionSubmitter>,
}

/// A fresh in-memory ledger funded with `green`, with the Ponzi class registered
pub async fn harness(green: u128) -> Harness {
    let bootstrapper = NodeBootstrapper::for_consensus(&consensus());
    let (ledger, origin) = bootstrapper
        .start_in_memory(consensus(), b"runtime".to_vec(), green, 0)
        .await
        .unwrap();
    ledger.register_class(PONZI, Arc::new(SimplePonzi));

    let submitter = Arc::new(TransactionSubmitter::new(ledger.clone(), client_config()));

    Harness {
        ledger,
        origin,
        bootstrapper,
        submitter,
    }
}
