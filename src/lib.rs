// src/lib.rs

//! Builds, prices and signs transactions for EVM-compatible chains over JSON-RPC.
//!
//! [`ChainClient`] talks to one endpoint and assembles [`TransactionDraft`]s;
//! [`NativeCoin`] and [`Erc20`] turn user amounts into drafts; [`Account`]
//! signs them.

pub mod blockchain;
pub mod config;
pub mod utils;

// Re-export commonly used types
pub use blockchain::{
    address::Address,
    client::ChainClient,
    models::{ChainQueryError, Error, FeeFields, Result, SignedTransaction, TransactionDraft, Wei},
    services::{
        coin::{double_int_multiply, Coin},
        native::NativeCoin,
        token::{Contract, Erc20},
        wallet::Account,
    },
    transport::{HttpTransport, Transport, TransportError},
};
pub use config::{ChainConfig, ChainOption, Config, ConfigError, OptionValue};
pub use ethers_core::types::{Bytes, H160, H256, U256};
