//! Process configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional config
//! file, `TELEMETRY_*` environment variables, then the bare variable names the
//! original deployment used (`RPC_URL`, `CONTRACT_ADDRESS`, `ENCRYPTION_KEY`,
//! `PORT`, `ALLOWED_ORIGINS`).

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::crypto::ReadingCipher;
use crate::pipeline::PipelineOptions;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Bare environment names and the keys they override
const LEGACY_ENV: [(&str, &str); 4] = [
    ("RPC_URL", "rpc_url"),
    ("CONTRACT_ADDRESS", "contract_address"),
    ("ENCRYPTION_KEY", "encryption_key"),
    ("PORT", "port"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Ledger JSON-RPC endpoint
    pub rpc_url: String,
    /// Reading registry contract address
    pub contract_address: String,
    /// Hex-encoded AES-256 key shared with the edge gateways
    pub encryption_key: String,
    /// HTTP listen port
    pub port: u16,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Deadline for each ledger call
    pub rpc_timeout_secs: u64,
    /// Maximum in-flight per-index fetches for batch queries
    pub fetch_concurrency: usize,
    /// Stats window clamp
    pub stats_max_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: String::new(),
            encryption_key: String::new(),
            port: DEFAULT_PORT,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            rpc_timeout_secs: 10,
            fetch_concurrency: 8,
            stats_max_limit: 100,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("encryption_key", &"<redacted>")
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rpc_timeout_secs", &self.rpc_timeout_secs)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("stats_max_limit", &self.stats_max_limit)
            .finish()
    }
}

impl Config {
    /// Layer defaults, `path` (if it exists) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("rpc_url", defaults.rpc_url)?
            .set_default("contract_address", defaults.contract_address)?
            .set_default("encryption_key", defaults.encryption_key)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("allowed_origins", defaults.allowed_origins)?
            .set_default("rpc_timeout_secs", defaults.rpc_timeout_secs)?
            .set_default("fetch_concurrency", defaults.fetch_concurrency as u64)?
            .set_default("stats_max_limit", defaults.stats_max_limit)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TELEMETRY")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("allowed_origins"),
        );

        for (var, key) in LEGACY_ENV {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            builder = builder.set_override("allowed_origins", split_origins(&origins))?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Reject settings the service cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url must not be empty".to_string()));
        }
        validate_address(&self.contract_address)?;
        self.cipher()?;
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(ConfigError::Invalid("rpc_timeout_secs must be non-zero".to_string()));
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid("fetch_concurrency must be non-zero".to_string()));
        }
        if self.stats_max_limit == 0 {
            return Err(ConfigError::Invalid("stats_max_limit must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Cipher for the configured key
    pub fn cipher(&self) -> Result<ReadingCipher, ConfigError> {
        if self.encryption_key.trim().is_empty() {
            return Err(ConfigError::Invalid("encryption_key is required".to_string()));
        }
        ReadingCipher::from_hex(&self.encryption_key)
            .map_err(|e| ConfigError::Invalid(format!("encryption_key: {}", e)))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            fetch_concurrency: self.fetch_concurrency,
            stats_max_limit: self.stats_max_limit,
        }
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// EVM-style address: `0x` followed by 40 hex characters
fn validate_address(address: &str) -> Result<(), ConfigError> {
    let digits = address.strip_prefix("0x").ok_or_else(|| {
        ConfigError::Invalid("contract_address must start with '0x'".to_string())
    })?;
    if digits.len() != 40 || hex::decode(digits).is_err() {
        return Err(ConfigError::Invalid(
            "contract_address must be 20 hex-encoded bytes".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn valid() -> Config {
        Config {
            contract_address: REGISTRY.to_string(),
            encryption_key: KEY.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid();
        assert!(config.validate().is_ok());
        assert_eq!(config.rpc_timeout(), Duration::from_secs(10));
        assert_eq!(config.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn test_missing_key_rejected() {
        let config = Config {
            encryption_key: String::new(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_short_key_rejected() {
        let config = Config {
            encryption_key: "abcd".to_string(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("encryption_key"));
    }

    #[test]
    fn test_bad_address_rejected() {
        for address in ["", "5FbDB2315678afecb367f032d93F642f64180aa3", "0x1234", "0xZZbDB2315678afecb367f032d93F642f64180aa3"] {
            let config = Config {
                contract_address: address.to_string(),
                ..valid()
            };
            assert!(config.validate().is_err(), "accepted {address:?}");
        }
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(Config { port: 0, ..valid() }.validate().is_err());
        assert!(Config { rpc_timeout_secs: 0, ..valid() }.validate().is_err());
        assert!(Config { fetch_concurrency: 0, ..valid() }.validate().is_err());
        assert!(Config { stats_max_limit: 0, ..valid() }.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains(KEY));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins("http://localhost:3000, https://dashboard.example ,"),
            vec!["http://localhost:3000", "https://dashboard.example"]
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "contract_address: \"{REGISTRY}\"").unwrap();
        writeln!(file, "fetch_concurrency: 3").unwrap();
        writeln!(file, "stats_max_limit: 250").unwrap();
        writeln!(file, "allowed_origins:").unwrap();
        writeln!(file, "  - \"https://dashboard.example\"").unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.contract_address, REGISTRY);
        assert_eq!(config.fetch_concurrency, 3);
        assert_eq!(config.stats_max_limit, 250);
        assert_eq!(config.rpc_timeout_secs, 10);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config.rpc_timeout_secs, 10);
        assert_eq!(config.fetch_concurrency, 8);
    }
}
