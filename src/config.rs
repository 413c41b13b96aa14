//! Configuration management for the ledger client
//!
//! Loads configuration from TOML files with environment variable substitution.

use crate::crypto::SignatureAlgorithmId;
use crate::ledger::ConsensusParams;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub client: ClientConfig,
    pub node: NodeConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
}

/// Transaction submission settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub chain_id: String,
    pub gas_limit: u64,
    pub gas_margin_percent: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub submit_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: String::new(),
            gas_limit: 10_000,
            gas_margin_percent: 10,
            max_retries: 3,
            retry_delay_ms: 500,
            submit_timeout_ms: 30_000,
        }
    }
}

/// Settings of the ledger started by the binary
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub signature: String,
    pub initial_gas_price: u64,
    pub max_gas_per_transaction: u64,
    pub min_gas_per_transaction: u64,
    /// Kept as `u64`: TOML integers are 64-bit
    pub green_amount: u64,
    pub red_amount: u64,
    pub runtime_jar: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let consensus = ConsensusParams::default();
        Self {
            signature: consensus.signature.to_string(),
            initial_gas_price: consensus.initial_gas_price,
            max_gas_per_transaction: consensus.max_gas_per_transaction,
            min_gas_per_transaction: consensus.min_gas_per_transaction,
            green_amount: 100_000_000,
            red_amount: 0,
            runtime_jar: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Settings {
    /// Load settings from the file named by `LEDGER_CLIENT_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("LEDGER_CLIENT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.client.gas_limit == 0 {
            anyhow::bail!("client.gas_limit must be positive");
        }

        if self.client.submit_timeout_ms == 0 {
            anyhow::bail!("client.submit_timeout_ms must be positive");
        }

        self.signature_algorithm()?;

        if self.node.min_gas_per_transaction > self.node.max_gas_per_transaction {
            anyhow::bail!("node.min_gas_per_transaction exceeds node.max_gas_per_transaction");
        }

        if self.client.gas_limit > self.node.max_gas_per_transaction {
            tracing::warn!(
                "client.gas_limit {} exceeds the node maximum {}",
                self.client.gas_limit,
                self.node.max_gas_per_transaction
            );
        }

        Ok(())
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithmId> {
        self.node
            .signature
            .parse()
            .map_err(|e| anyhow::anyhow!("node.signature: {}", e))
    }

    /// Consensus parameters for a ledger started from these settings
    pub fn consensus(&self) -> Result<ConsensusParams> {
        Ok(ConsensusParams {
            chain_id: self.client.chain_id.clone(),
            signature: self.signature_algorithm()?,
            initial_gas_price: self.node.initial_gas_price,
            max_gas_per_transaction: self.node.max_gas_per_transaction,
            min_gas_per_transaction: self.node.min_gas_per_transaction,
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid pattern");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[client]
chain_id = "${LEDGER_TEST_CHAIN}"
gas_limit = 20000

[node]
signature = "ed25519"
green_amount = 100000000

[api]
host = "127.0.0.1"
port = 8001

[metrics]
enabled = false
port = 9101
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_load_from_file() {
        env::set_var("LEDGER_TEST_CHAIN", "marabunta");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.client.chain_id, "marabunta");
        assert_eq!(settings.client.gas_limit, 20_000);
        assert_eq!(settings.client.max_retries, 3);
        assert_eq!(settings.node.red_amount, 0);

        let consensus = settings.consensus().unwrap();
        assert_eq!(consensus.chain_id, "marabunta");
        assert_eq!(consensus.signature, SignatureAlgorithmId::Ed25519);
    }

    #[test]
    fn test_shipped_default_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let settings = Settings::load_from(&path).unwrap();

        assert_eq!(settings.node.green_amount, 100_000_000);
        assert_eq!(settings.node.red_amount, 0);
        assert_eq!(settings.api.port, 8001);
        assert_eq!(settings.client.gas_margin_percent, 10);
        assert!(settings.consensus().is_ok());
    }

    #[test]
    fn test_rejects_unknown_algorithm() {
        let text = SAMPLE.replace("\"ed25519\"", "\"sha256dsa\"");
        assert!(Settings::parse(&text).is_err());
    }

    #[test]
    fn test_rejects_zero_gas_limit() {
        let text = SAMPLE.replace("gas_limit = 20000", "gas_limit = 0");
        assert!(Settings::parse(&text).is_err());
    }
}
