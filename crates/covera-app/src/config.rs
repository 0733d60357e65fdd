//! Application Configuration
//!
//! `AppConfig` is read from TOML, overlaid with `COVERA_*` environment
//! variables and validated before the app is built. Every section has
//! defaults pointing at the public Arc testnet deployment.

use covera_core::effects::ChainSpec;
use covera_core::errors::{CoveraError, Result};
use covera_core::identifiers::Address;
use covera_core::types::Wei;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `backend.api_url`
pub const ENV_API_URL: &str = "COVERA_API_URL";
/// Environment variable overriding `chain.network.rpc_url`
pub const ENV_RPC_URL: &str = "COVERA_RPC_URL";
/// Environment variable overriding `flow.confirmation_timeout_ms`
pub const ENV_CONFIRMATION_TIMEOUT_MS: &str = "COVERA_CONFIRMATION_TIMEOUT_MS";

/// Resolve the default directory for exported key bundles.
///
/// Priority:
/// 1. `$COVERA_PATH/.covera/keys` if COVERA_PATH is set
/// 2. `~/.covera/keys`
/// 3. `./.covera/keys`
pub fn default_key_dir() -> PathBuf {
    std::env::var("COVERA_PATH")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".covera")
        .join("keys")
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend API
    pub backend: BackendConfig,
    /// Chain and payment targets
    pub chain: ChainConfig,
    /// Flow engine timing
    pub flow: FlowConfig,
    /// Background portfolio refresh
    pub polling: PollingConfig,
    /// Identity handling
    pub identity: IdentityConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the API
    pub api_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

/// Chain, contract and payment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Network the wallet must be on
    pub network: ChainSpec,
    /// Premium pool receiving policy payments
    pub pool_address: Address,
    /// Insurance contract receiving stakes
    pub insurance_contract: Address,
    /// Native value sent with a policy purchase
    pub policy_payment: String,
    /// Gas limit for policy payments
    pub policy_gas_limit: u64,
    /// Gas limit for `stake()` calls
    pub stake_gas_limit: u64,
    /// Call data for `stake()`
    pub stake_call_data: String,
    /// Native value requested for a manual transfer
    pub manual_payment: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            network: ChainSpec::default(),
            pool_address: Address::new("0xcE33FBE1a657cFaDea3Bb594b15857C08d9E6Ad6"),
            insurance_contract: Address::new("0xae4be2CC77c853c7F23461B1a7A2a46887a1a4e5"),
            policy_payment: "0.0001".to_string(),
            policy_gas_limit: 100_000,
            stake_gas_limit: 120_000,
            stake_call_data: "0x3a4b66f1".to_string(),
            manual_payment: "0.01".to_string(),
        }
    }
}

/// Parsed payment targets handed to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTerms {
    /// Network
    pub network: ChainSpec,
    /// Premium pool
    pub pool_address: Address,
    /// Insurance contract
    pub insurance_contract: Address,
    /// Policy payment value
    pub policy_value: Wei,
    /// Policy gas limit
    pub policy_gas_limit: u64,
    /// Stake gas limit
    pub stake_gas_limit: u64,
    /// Stake call data
    pub stake_call_data: String,
    /// Manual transfer value
    pub manual_value: Wei,
}

impl ChainConfig {
    /// Parse the string-typed values
    pub fn payment_terms(&self) -> Result<PaymentTerms> {
        let policy_value = Wei::parse_ether(&self.policy_payment)
            .map_err(|e| CoveraError::invalid(format!("chain.policy_payment: {e}")))?;
        let manual_value = Wei::parse_ether(&self.manual_payment)
            .map_err(|e| CoveraError::invalid(format!("chain.manual_payment: {e}")))?;
        Ok(PaymentTerms {
            network: self.network.clone(),
            pool_address: self.pool_address.clone(),
            insurance_contract: self.insurance_contract.clone(),
            policy_value,
            policy_gas_limit: self.policy_gas_limit,
            stake_gas_limit: self.stake_gas_limit,
            stake_call_data: self.stake_call_data.clone(),
            manual_value,
        })
    }
}

/// Flow engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Upper bound on waiting for finality
    pub confirmation_timeout_ms: u64,
    /// Delay between narration lines
    pub narration_step_ms: u64,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

impl FlowConfig {
    /// Confirmation timeout as a `Duration`
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    /// Narration delay as a `Duration`
    pub fn narration_step(&self) -> Duration {
        Duration::from_millis(self.narration_step_ms)
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_ms: 180_000,
            narration_step_ms: 600,
            event_buffer: 256,
        }
    }
}

/// Background refresh configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Portfolio refresh interval
    pub portfolio_interval_ms: u64,
    /// Protocol events fetched per refresh
    pub events_limit: usize,
}

impl PollingConfig {
    /// Refresh interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.portfolio_interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            portfolio_interval_ms: 10_000,
            events_limit: 8,
        }
    }
}

/// Identity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Directory generated key bundles are written to
    pub key_dir: PathBuf,
    /// Address used for oracle simulations without a session identity
    pub demo_address: Address,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            demo_address: Address::new("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CoveraError::invalid(format!("Invalid TOML: {e}")))
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoveraError::storage(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load, apply the environment and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Merge with values from `lookup`
    pub fn merge_with_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.backend.api_url = url;
        }
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.chain.network.rpc_url = url;
        }
        if let Some(raw) = lookup(ENV_CONFIRMATION_TIMEOUT_MS) {
            self.flow.confirmation_timeout_ms = raw.trim().parse().map_err(|_| {
                CoveraError::invalid(format!(
                    "{ENV_CONFIRMATION_TIMEOUT_MS} must be an integer, got '{raw}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.api_url.trim().is_empty() {
            return Err(CoveraError::invalid("backend.api_url must not be empty"));
        }
        if self.chain.network.rpc_url.trim().is_empty() {
            return Err(CoveraError::invalid("chain.network.rpc_url must not be empty"));
        }
        if self.backend.request_timeout_ms == 0 {
            return Err(CoveraError::invalid("backend.request_timeout_ms must be positive"));
        }
        if self.flow.confirmation_timeout_ms == 0 {
            return Err(CoveraError::invalid(
                "flow.confirmation_timeout_ms must be positive",
            ));
        }
        if self.polling.portfolio_interval_ms == 0 {
            return Err(CoveraError::invalid(
                "polling.portfolio_interval_ms must be positive",
            ));
        }
        if self.flow.event_buffer == 0 {
            return Err(CoveraError::invalid("flow.event_buffer must be positive"));
        }
        if self.chain.policy_gas_limit == 0 || self.chain.stake_gas_limit == 0 {
            return Err(CoveraError::invalid("gas limits must be positive"));
        }
        if !self.chain.stake_call_data.starts_with("0x") {
            return Err(CoveraError::invalid("chain.stake_call_data must be 0x-prefixed hex"));
        }
        self.chain.payment_terms().map(|_| ())
    }
}
