//! Gas price sampling with a safety margin

use crate::error::{ClientError, ClientResult};
use crate::ledger::{EndpointError, LedgerEndpoint};

use std::sync::Arc;
use tracing::debug;

/// Gas price oracle for transactions
pub struct GasPriceOracle {
    endpoint: Arc<dyn LedgerEndpoint>,
    /// Margin over the network price (e.g. 10 = 10% above)
    margin_percent: u64,
}

impl GasPriceOracle {
    /// Create an oracle with the default 10% margin
    pub fn new(endpoint: Arc<dyn LedgerEndpoint>) -> Self {
        Self::with_margin(endpoint, 10)
    }

    pub fn with_margin(endpoint: Arc<dyn LedgerEndpoint>, margin_percent: u64) -> Self {
        Self {
            endpoint,
            margin_percent,
        }
    }

    /// Price to use for the next submission. Sampled every call, never cached.
    pub async fn safe_gas_price(&self) -> ClientResult<u64> {
        let price = self.endpoint.gas_price().await.map_err(|e| match e {
            EndpointError::Unavailable(message) => {
                ClientError::EndpointUnavailable(format!("cannot read gas price: {}", message))
            }
            other => ClientError::from(other),
        })?;

        let safe = apply_margin(price, self.margin_percent);
        crate::metrics::record_gas_price(safe);
        debug!("Gas price {} -> safe {}", price, safe);
        Ok(safe)
    }

    /// Maximal cost of a transaction
    pub fn cost(gas_limit: u64, gas_price: u64) -> u128 {
        u128::from(gas_limit) * u128::from(gas_price)
    }
}

/// `ceil(price * (100 + margin) / 100)`, saturating, never below `price`
fn apply_margin(price: u64, margin_percent: u64) -> u64 {
    let scaled = u128::from(price) * u128::from(100 + margin_percent);
    let rounded = scaled.div_ceil(100);
    u64::try_from(rounded).unwrap_or(u64::MAX).max(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedgerEndpoint;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_margin_rounds_up() {
        assert_eq!(apply_margin(100, 10), 110);
        assert_eq!(apply_margin(101, 10), 112);
        assert_eq!(apply_margin(1, 10), 2);
        assert_eq!(apply_margin(0, 10), 0);
        assert_eq!(apply_margin(7, 0), 7);
        assert_eq!(apply_margin(u64::MAX, 10), u64::MAX);
    }

    #[tokio::test]
    async fn test_rising_price_gives_non_decreasing_safe_price() {
        let network = Arc::new(AtomicU64::new(100));
        let mut endpoint = MockLedgerEndpoint::new();
        let source = network.clone();
        endpoint
            .expect_gas_price()
            .returning(move || Ok(source.fetch_add(15, Ordering::SeqCst)));

        let oracle = GasPriceOracle::new(Arc::new(endpoint));
        let first = oracle.safe_gas_price().await.unwrap();
        let second = oracle.safe_gas_price().await.unwrap();
        let third = oracle.safe_gas_price().await.unwrap();

        assert_eq!(first, 110);
        assert!(second >= first);
        assert!(third >= second);
        assert!(second >= 115);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let mut endpoint = MockLedgerEndpoint::new();
        endpoint
            .expect_gas_price()
            .times(1)
            .returning(|| Err(EndpointError::Unavailable("timeout".into())));

        let oracle = GasPriceOracle::new(Arc::new(endpoint));
        assert!(matches!(
            oracle.safe_gas_price().await,
            Err(ClientError::EndpointUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_uninitialized_ledger_is_not_unavailable() {
        let mut endpoint = MockLedgerEndpoint::new();
        endpoint
            .expect_gas_price()
            .returning(|| Err(EndpointError::NotInitialized));

        let oracle = GasPriceOracle::new(Arc::new(endpoint));
        assert!(matches!(
            oracle.safe_gas_price().await,
            Err(ClientError::RejectedByEndpoint(_))
        ));
    }

    #[test]
    fn test_cost() {
        assert_eq!(GasPriceOracle::cost(10_000, 110), 1_100_000);
    }
}
