use crate::error::{BlockchainError, Result};
use log::info;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

const DEFAULT_DB_PATH: &str = "data";
const DEFAULT_WALLET_FILE: &str = "wallet.dat";

const DB_PATH_KEY: &str = "LEDGER_DB_PATH";
const WALLET_FILE_KEY: &str = "LEDGER_WALLET_FILE";
const MINING_ADDRESS_KEY: &str = "LEDGER_MINING_ADDRESS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory of the sled database holding the chain
    pub db_path: PathBuf,
    /// File the CLI keeps its wallets in
    pub wallet_file: PathBuf,
    /// Address credited with block rewards when `send` is not given a miner
    pub mining_address: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            wallet_file: PathBuf::from(DEFAULT_WALLET_FILE),
            mining_address: None,
        }
    }
}

impl Config {
    /// Defaults, overlaid by the TOML file at `path` (or `ledger.toml` if it
    /// exists), overlaid by `LEDGER_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BlockchainError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Config> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(DB_PATH_KEY) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(wallet_file) = lookup(WALLET_FILE_KEY) {
            self.wallet_file = PathBuf::from(wallet_file);
        }
        if let Some(addr) = lookup(MINING_ADDRESS_KEY) {
            self.mining_address = Some(addr);
        }
    }
}
