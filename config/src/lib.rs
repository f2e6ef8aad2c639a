//! Cipherpool Configuration
//!
//! Shared configuration crate for all cipherpool components.
//!
//! Handles loading configuration from:
//! 1. CP_CONFIG env var (explicit path)
//! 2. ./cipherpool.toml (current directory)
//! 3. ~/.cipherpool/cipherpool.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

use cipherpool_confidential::TransferFaultPolicy;
use cipherpool_privacy::{Address, MAX_LEVELS};

/// Global config instance for convenience access
pub static GLOBAL_CONFIG: OnceLock<CipherpoolConfig> = OnceLock::new();

const CONFIG_FILE_NAME: &str = "cipherpool.toml";
const CONFIG_DIR_NAME: &str = ".cipherpool";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_LEVELS: usize = 20;
const DEFAULT_ROOT_HISTORY_SIZE: usize = 30;
const DEFAULT_DENOMINATION: u64 = 1_000_000_000;
const DEFAULT_POOL_ADDRESS: &str = "0x00000000000000000000000000000000000c1e55";

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CipherpoolConfig {
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub disclosure: DisclosureConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Shielded pool parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Commitment tree depth (capacity = 2^levels)
    #[serde(default = "default_levels")]
    pub levels: usize,
    /// Number of recent roots accepted in proofs
    #[serde(default = "default_root_history_size")]
    pub root_history_size: usize,
    /// Fixed amount per note, in the asset's smallest unit
    #[serde(default = "default_denomination")]
    pub denomination: u64,
    /// Principal of the pool itself (escrow account in the ledger), 0x-hex
    #[serde(default = "default_pool_address")]
    pub address: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            root_history_size: DEFAULT_ROOT_HISTORY_SIZE,
            denomination: DEFAULT_DENOMINATION,
            address: DEFAULT_POOL_ADDRESS.into(),
        }
    }
}

fn default_levels() -> usize {
    DEFAULT_LEVELS
}
fn default_root_history_size() -> usize {
    DEFAULT_ROOT_HISTORY_SIZE
}
fn default_denomination() -> u64 {
    DEFAULT_DENOMINATION
}
fn default_pool_address() -> String {
    DEFAULT_POOL_ADDRESS.into()
}

/// Proof verifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Path to a compressed arkworks Groth16 (BN254) verifying key
    #[serde(default)]
    pub verifying_key_path: Option<String>,
}

/// Decryption oracle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisclosureConfig {
    /// ed25519 public key of the decryption oracle, hex
    #[serde(default)]
    pub oracle_public_key: Option<String>,
}

/// Confidential ledger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// What an unwrap from a never-funded account does
    #[serde(default)]
    pub transfer_fault_policy: TransferFaultPolicy,
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl CipherpoolConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string (no env overrides)
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check CP_CONFIG env var
        if let Ok(path) = env::var("CP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./cipherpool.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.cipherpool/cipherpool.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Pool
        env_parse("CP_LEVELS", &mut self.pool.levels);
        env_parse("CP_ROOT_HISTORY", &mut self.pool.root_history_size);
        env_parse("CP_DENOMINATION", &mut self.pool.denomination);
        env_string("CP_POOL_ADDRESS", &mut self.pool.address);

        // Verifier / oracle
        env_option_string("CP_VERIFYING_KEY", &mut self.verifier.verifying_key_path);
        env_option_string("CP_ORACLE_PUBKEY", &mut self.disclosure.oracle_public_key);

        // Ledger
        if let Ok(v) = env::var("CP_TRANSFER_FAULT_POLICY") {
            self.ledger.transfer_fault_policy = match v.to_ascii_lowercase().as_str() {
                "zero_amount" | "zero" => TransferFaultPolicy::ZeroAmount,
                _ => TransferFaultPolicy::Reject,
            };
        }
    }

    /// Reject parameter combinations the pool cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pool.levels == 0 || self.pool.levels > MAX_LEVELS {
            bail!(
                "pool.levels must be within 1..={}, got {}",
                MAX_LEVELS,
                self.pool.levels
            );
        }
        if self.pool.root_history_size == 0 {
            bail!("pool.root_history_size must be non-zero");
        }
        if self.pool.denomination == 0 {
            bail!("pool.denomination must be non-zero");
        }
        self.pool_address()?;
        if self.disclosure.oracle_public_key.is_some() {
            self.oracle_public_key()?;
        }
        Ok(())
    }

    /// Pool principal as raw bytes
    pub fn pool_address(&self) -> Result<Address> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(strip_0x(&self.pool.address), &mut bytes)
            .with_context(|| format!("Invalid pool.address: {}", self.pool.address))?;
        Ok(Address::new(bytes))
    }

    /// Oracle public key as raw bytes, if configured
    pub fn oracle_public_key(&self) -> Result<Option<[u8; 32]>> {
        let Some(key) = &self.disclosure.oracle_public_key else {
            return Ok(None);
        };
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(strip_0x(key), &mut bytes)
            .with_context(|| format!("Invalid disclosure.oracle_public_key: {}", key))?;
        Ok(Some(bytes))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.verifier.verifying_key_path = Some("./keys/withdraw_vk.bin".into());
        toml::to_string_pretty(&sample).unwrap_or_default()
    }

    /// Get the global config instance, initializing it if necessary.
    ///
    /// Falls back to defaults if loading fails.
    pub fn global() -> &'static CipherpoolConfig {
        GLOBAL_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                log::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            })
        })
    }

    /// Initialize the global config with a specific instance.
    ///
    /// Returns `Err(config)` if already initialized.
    pub fn set_global(config: CipherpoolConfig) -> Result<(), CipherpoolConfig> {
        GLOBAL_CONFIG.set(config)
    }
}

/// Shorthand for `CipherpoolConfig::global()`.
#[inline]
pub fn global_config() -> &'static CipherpoolConfig {
    CipherpoolConfig::global()
}

fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CipherpoolConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pool.levels, DEFAULT_LEVELS);
        assert_eq!(config.ledger.transfer_fault_policy, TransferFaultPolicy::Reject);
        assert_eq!(config.oracle_public_key().unwrap(), None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CipherpoolConfig::from_toml(
            r#"
            [pool]
            levels = 31
            denomination = 100

            [ledger]
            transfer_fault_policy = "zero_amount"
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.levels, 31);
        assert_eq!(config.pool.denomination, 100);
        assert_eq!(config.pool.root_history_size, DEFAULT_ROOT_HISTORY_SIZE);
        assert_eq!(
            config.ledger.transfer_fault_policy,
            TransferFaultPolicy::ZeroAmount
        );
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(CipherpoolConfig::from_toml("[pool]\nlevels = 0").is_err());
        assert!(CipherpoolConfig::from_toml("[pool]\nlevels = 40").is_err());
        assert!(CipherpoolConfig::from_toml("[pool]\nroot_history_size = 0").is_err());
        assert!(CipherpoolConfig::from_toml("[pool]\naddress = \"0x1234\"").is_err());
        assert!(
            CipherpoolConfig::from_toml("[disclosure]\noracle_public_key = \"zz\"").is_err()
        );
    }

    #[test]
    fn test_pool_address_parses() {
        let config = CipherpoolConfig::default();
        let address = config.pool_address().unwrap();
        assert_eq!(address.as_bytes()[18..], [0x1e, 0x55]);
        assert_eq!(address.to_string(), DEFAULT_POOL_ADDRESS);
    }

    #[test]
    fn test_sample_roundtrips() {
        let sample = CipherpoolConfig::generate_sample();
        let parsed = CipherpoolConfig::from_toml(&sample).unwrap();
        assert_eq!(
            parsed.verifier.verifying_key_path.as_deref(),
            Some("./keys/withdraw_vk.bin")
        );
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[pool]\ndenomination = 7\n").unwrap();

        // SAFETY: only this test touches CP_ROOT_HISTORY
        unsafe { env::set_var("CP_ROOT_HISTORY", "12") };
        let config = CipherpoolConfig::load_from(&path).unwrap();
        unsafe { env::remove_var("CP_ROOT_HISTORY") };

        assert_eq!(config.pool.denomination, 7);
        assert_eq!(config.pool.root_history_size, 12);
    }
}
