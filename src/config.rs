// src/config.rs

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use ethers_core::types::U256;
use thiserror::Error;

pub const DEFAULT_GAS_LIMIT: u64 = 200_000;
pub const DEFAULT_MAX_GAS_PRICE_GWEI: f64 = 21.0;
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 10;

const WEI_PER_GWEI: f64 = 1_000_000_000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown option name requested: {0}")]
    UnknownOption(String),
    #[error("Empty provider_url value provided")]
    EmptyProviderUrl,
    #[error("invalid value for option '{name}': {value}")]
    InvalidValue { name: String, value: String },
}

/// Names of the per-endpoint options a client is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainOption {
    GasLimit,
    MaxGasPrice,
    NetworkTimeout,
}

impl ChainOption {
    pub const ALL: [ChainOption; 3] = [
        ChainOption::GasLimit,
        ChainOption::MaxGasPrice,
        ChainOption::NetworkTimeout,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChainOption::GasLimit => "gas_limit",
            ChainOption::MaxGasPrice => "max_gas_price",
            ChainOption::NetworkTimeout => "network_timeout",
        }
    }
}

impl FromStr for ChainOption {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ChainOption::ALL
            .into_iter()
            .find(|option| option.name() == name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))
    }
}

/// Value of a [`ChainOption`] as returned by [`ChainConfig::get_option`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionValue {
    Integer(u64),
    Gwei(f64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Integer(v) => write!(f, "{}", v),
            OptionValue::Gwei(v) => write!(f, "{}", v),
        }
    }
}

/// Per-endpoint settings, fixed for the lifetime of a client.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainConfig {
    /// Gas limit used for contract calls before the node estimate replaces it
    pub gas_limit: u64,
    /// Hard ceiling for the gas price (legacy) or the tip (EIP-1559), in Gwei
    pub max_gas_price: f64,
    /// Transport timeout in seconds
    pub network_timeout: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            max_gas_price: DEFAULT_MAX_GAS_PRICE_GWEI,
            network_timeout: DEFAULT_NETWORK_TIMEOUT_SECS,
        }
    }
}

impl ChainConfig {
    /// Overlays named options on top of the defaults.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (name, value) in options {
            config.set_option(name.as_ref().parse()?, value.as_ref())?;
        }
        Ok(config)
    }

    fn set_option(&mut self, option: ChainOption, raw: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            name: option.name().to_string(),
            value: raw.to_string(),
        };
        let raw = raw.trim();
        match option {
            ChainOption::GasLimit => self.gas_limit = raw.parse().map_err(|_| invalid())?,
            ChainOption::NetworkTimeout => {
                self.network_timeout = raw.parse().map_err(|_| invalid())?
            }
            ChainOption::MaxGasPrice => {
                let gwei: f64 = raw.parse().map_err(|_| invalid())?;
                if !gwei.is_finite() || gwei < 0.0 {
                    return Err(invalid());
                }
                self.max_gas_price = gwei;
            }
        }
        Ok(())
    }

    /// Returns the configured value for a named option.
    pub fn get_option(&self, name: &str) -> Result<OptionValue, ConfigError> {
        Ok(match name.parse::<ChainOption>()? {
            ChainOption::GasLimit => OptionValue::Integer(self.gas_limit),
            ChainOption::MaxGasPrice => OptionValue::Gwei(self.max_gas_price),
            ChainOption::NetworkTimeout => OptionValue::Integer(self.network_timeout),
        })
    }

    /// The `max_gas_price` ceiling converted to wei, rounded up.
    pub fn max_gas_price_wei(&self) -> U256 {
        let wei = (self.max_gas_price * WEI_PER_GWEI).ceil();
        if wei <= 0.0 {
            return U256::zero();
        }
        // `as` saturates for values past u128::MAX
        U256::from(wei as u128)
    }
}

/// Process-level configuration, loaded once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// JSON-RPC endpoint of the node
    pub provider_url: String,
    pub chain: ChainConfig,
}

impl Config {
    /// Loads configuration from environment variables (and a `.env` file if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider_url = env::var("PROVIDER_URL").context("PROVIDER_URL must be set")?;
        if provider_url.trim().is_empty() {
            return Err(ConfigError::EmptyProviderUrl.into());
        }

        let overrides: Vec<(&str, String)> = [
            ("gas_limit", "GAS_LIMIT"),
            ("max_gas_price", "MAX_GAS_PRICE"),
            ("network_timeout", "NETWORK_TIMEOUT"),
        ]
        .into_iter()
        .filter_map(|(option, var)| env::var(var).ok().map(|value| (option, value)))
        .collect();

        let chain = ChainConfig::from_options(overrides)
            .context("GAS_LIMIT, MAX_GAS_PRICE and NETWORK_TIMEOUT must be valid numbers")?;

        Ok(Config {
            provider_url,
            chain,
        })
    }
}
