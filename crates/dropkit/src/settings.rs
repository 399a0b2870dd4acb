//! Settings
//!
//! Defaults, overridden by an optional TOML file, overridden by `DROPKIT_*` environment
//! variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use config::{Config, ConfigError, File, FileFormat};
use dropkit_common::{Address, Commitment};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::controller::ControllerConfig;

/// Mint program id
pub const ENV_PROGRAM_ID: &str = "DROPKIT_PROGRAM_ID";
/// Program config account
pub const ENV_CONFIG_ADDRESS: &str = "DROPKIT_CONFIG_ADDRESS";
/// Treasury
pub const ENV_TREASURY: &str = "DROPKIT_TREASURY";
/// Sale start, unix time in milliseconds
pub const ENV_START_DATE: &str = "DROPKIT_START_DATE";
/// Rpc endpoint
pub const ENV_RPC_ENDPOINT: &str = "DROPKIT_RPC_ENDPOINT";
/// Commitment level
pub const ENV_COMMITMENT: &str = "DROPKIT_COMMITMENT";
/// Skip preflight
pub const ENV_SKIP_PREFLIGHT: &str = "DROPKIT_SKIP_PREFLIGHT";
/// Confirmation timeout in milliseconds
pub const ENV_TX_TIMEOUT_MS: &str = "DROPKIT_TX_TIMEOUT_MS";
/// Log level
pub const ENV_LOG_LEVEL: &str = "DROPKIT_LOG_LEVEL";

const DEFAULT_WORK_DIR: &str = ".dropkit";
const DEFAULT_RPC_ENDPOINT: &str = "https://api.devnet.solana.com";

/// Settings Error
#[derive(Debug, Error)]
pub enum Error {
    /// Config Error
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Environment variable could not be parsed
    #[error("Invalid value `{value}` for {var}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Value found
        value: String,
    },
    /// Rpc endpoint is not a valid url
    #[error("Invalid rpc endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        /// Configured endpoint
        endpoint: String,
        /// Parse error
        source: url::ParseError,
    },
    /// Required setting is missing
    #[error("Missing setting: {0}")]
    Missing(&'static str),
    /// dropkit Error
    #[error(transparent)]
    Common(#[from] dropkit_common::Error),
}

/// Drop being sold
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Mint program id
    pub program_id: Option<Address>,
    /// Program config account
    pub config_address: Option<Address>,
    /// Treasury credited by mints
    pub treasury: Option<Address>,
    /// Sale start until the ledger reports one, unix time in milliseconds
    #[serde(default)]
    pub start_date: u64,
}

/// Ledger connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rpc {
    /// Rpc endpoint url
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    /// Commitment waited for when confirming mints
    #[serde(default)]
    pub commitment: Commitment,
    /// Skip preflight checks
    #[serde(default)]
    pub skip_preflight: bool,
    /// Confirmation budget in milliseconds
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,
}

impl Rpc {
    /// Parsed rpc endpoint
    pub fn endpoint_url(&self) -> Result<Url, Error> {
        Url::parse(&self.endpoint).map_err(|source| Error::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })
    }
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            endpoint: default_rpc_endpoint(),
            commitment: Commitment::default(),
            skip_preflight: false,
            tx_timeout_ms: default_tx_timeout_ms(),
        }
    }
}

/// Presentation timings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ui {
    /// How long a notification stays visible
    #[serde(default = "default_notification_auto_hide_ms")]
    pub notification_auto_hide_ms: u64,
    /// Countdown refresh interval
    #[serde(default = "default_countdown_tick_ms")]
    pub countdown_tick_ms: u64,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            notification_auto_hide_ms: default_notification_auto_hide_ms(),
            countdown_tick_ms: default_countdown_tick_ms(),
        }
    }
}

/// Logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logging {
    /// `EnvFilter` directive, e.g. `info` or `dropkit=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_rpc_endpoint() -> String {
    DEFAULT_RPC_ENDPOINT.to_string()
}

fn default_tx_timeout_ms() -> u64 {
    30_000
}

fn default_notification_auto_hide_ms() -> u64 {
    6_000
}

fn default_countdown_tick_ms() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// dropkit settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Drop
    #[serde(default)]
    pub program: Program,
    /// Ledger connection
    #[serde(default)]
    pub rpc: Rpc,
    /// Presentation
    #[serde(default)]
    pub ui: Ui,
    /// Logging
    #[serde(default)]
    pub logging: Logging,
}

impl Settings {
    /// Load settings, falling back to defaults when the file cannot be read
    ///
    /// Environment overrides are applied in both cases.
    #[must_use]
    pub fn new<P>(config_file_name: Option<P>) -> Self
    where
        P: Into<PathBuf>,
    {
        let settings = match Self::load(config_file_name) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Error reading config file, falling back to defaults. Error: {e}");
                Self::default()
            }
        };

        match settings.clone().from_env() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Ignoring environment overrides. Error: {e}");
                settings
            }
        }
    }

    /// Load settings from a TOML file, `~/.dropkit/config.toml` when none is given
    pub fn load<P>(config_file_name: Option<P>) -> Result<Self, Error>
    where
        P: Into<PathBuf>,
    {
        let path = match config_file_name {
            Some(path) => path.into(),
            None => default_config_path()?,
        };

        Self::from_source(File::from(path.as_path()).format(FileFormat::Toml))
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        Self::from_source(File::from_str(toml, FileFormat::Toml))
    }

    fn from_source<S>(source: S) -> Result<Self, Error>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            // use defaults
            .add_source(Config::try_from(&Self::default())?)
            // override with file contents
            .add_source(source)
            .build()?;

        let settings: Self = config.try_deserialize()?;
        settings.rpc.endpoint_url()?;

        Ok(settings)
    }

    /// Apply `DROPKIT_*` environment overrides
    pub fn from_env(self) -> Result<Self, Error> {
        self.from_env_with(|var| std::env::var(var).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn from_env_with<F>(mut self, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PROGRAM_ID) {
            self.program.program_id = Some(Address::from_str(&value)?);
        }

        if let Some(value) = lookup(ENV_CONFIG_ADDRESS) {
            self.program.config_address = Some(Address::from_str(&value)?);
        }

        if let Some(value) = lookup(ENV_TREASURY) {
            self.program.treasury = Some(Address::from_str(&value)?);
        }

        if let Some(value) = lookup(ENV_START_DATE) {
            self.program.start_date = parse_env(ENV_START_DATE, value)?;
        }

        if let Some(value) = lookup(ENV_RPC_ENDPOINT) {
            if Url::parse(&value).is_err() {
                return Err(Error::InvalidEnv {
                    var: ENV_RPC_ENDPOINT,
                    value,
                });
            }
            self.rpc.endpoint = value;
        }

        if let Some(value) = lookup(ENV_COMMITMENT) {
            self.rpc.commitment = parse_env(ENV_COMMITMENT, value)?;
        }

        if let Some(value) = lookup(ENV_SKIP_PREFLIGHT) {
            self.rpc.skip_preflight = parse_env(ENV_SKIP_PREFLIGHT, value)?;
        }

        if let Some(value) = lookup(ENV_TX_TIMEOUT_MS) {
            self.rpc.tx_timeout_ms = parse_env(ENV_TX_TIMEOUT_MS, value)?;
        }

        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = value;
        }

        Ok(self)
    }
}

impl TryFrom<&Settings> for ControllerConfig {
    type Error = Error;

    fn try_from(settings: &Settings) -> Result<Self, Self::Error> {
        Ok(Self {
            program_id: settings
                .program
                .program_id
                .clone()
                .ok_or(Error::Missing("program.program_id"))?,
            config_address: settings
                .program
                .config_address
                .clone()
                .ok_or(Error::Missing("program.config_address"))?,
            treasury: settings
                .program
                .treasury
                .clone()
                .ok_or(Error::Missing("program.treasury"))?,
            start_date_ms: settings.program.start_date,
            tx_timeout: Duration::from_millis(settings.rpc.tx_timeout_ms),
            commitment: settings.rpc.commitment,
            skip_preflight: settings.rpc.skip_preflight,
            countdown_tick: Duration::from_millis(settings.ui.countdown_tick_ms.max(1)),
            notification_auto_hide: Duration::from_millis(settings.ui.notification_auto_hide_ms),
        })
    }
}

fn parse_env<T: FromStr>(var: &'static str, value: String) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidEnv { var, value })
}

fn default_config_path() -> Result<PathBuf, Error> {
    let home = home::home_dir().ok_or(ConfigError::NotFound("Config Path".to_string()))?;
    Ok(work_dir_config(&home.join(DEFAULT_WORK_DIR)))
}

fn work_dir_config(work_dir: &Path) -> PathBuf {
    work_dir.join("config.toml")
}
