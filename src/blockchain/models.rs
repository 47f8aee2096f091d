// src/blockchain/models.rs
use std::cmp::Ordering;
use std::fmt;

use ethers_core::types::{
    transaction::{eip2718::TypedTransaction, eip2930::AccessList},
    Bytes, Eip1559TransactionRequest, TransactionRequest, H160, H256, U256, U64,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{blockchain::address::Address, config::ConfigError};

// --- Error types ---

/// A chain query that failed in transport, was rejected by the node, or came
/// back with neither an error nor a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainQueryError {
    pub operation: &'static str,
    pub reason: Option<String>,
}

impl ChainQueryError {
    pub fn failed(operation: &'static str, reason: impl fmt::Display) -> Self {
        Self {
            operation,
            reason: Some(reason.to_string()),
        }
    }

    pub fn missing(operation: &'static str) -> Self {
        Self {
            operation,
            reason: None,
        }
    }
}

impl fmt::Display for ChainQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "Failed to {}: {}", self.operation, reason),
            None => write!(f, "Failed to {}", self.operation),
        }
    }
}

impl std::error::Error for ChainQueryError {}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bad address provided: {0}")]
    InvalidAddress(String),
    #[error("Empty private key specified")]
    EmptyPrivateKey,
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("amount from another token or blockchain provided: expected {expected} decimals, got {actual}")]
    DecimalsMismatch { expected: u32, actual: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ChainQuery(#[from] ChainQueryError),
    #[error("Insufficient funds: balance_wei({balance}) < token_quantity_wei({requested})")]
    InsufficientFunds { balance: U256, requested: U256 },
    #[error("Token address is not a contract: {0}")]
    NotAContract(Address),
    #[error("Too low gas_limit option specified: {0}")]
    GasLimitTooLow(u64),
    #[error("ABI error: {0}")]
    Abi(String),
    #[error("failed to sign transaction: {0}")]
    Signing(String),
}

impl Error {
    /// Caller-side input problems, as opposed to chain or funding failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress(_)
                | Error::EmptyPrivateKey
                | Error::InvalidPrivateKey(_)
                | Error::InvalidAmount(_)
                | Error::DecimalsMismatch { .. }
                | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// --- Amount Models ---

/// An integer amount in the smallest unit of a coin, tagged with that coin's decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wei {
    amount: U256,
    decimals: u32,
}

impl Wei {
    pub fn new(amount: U256, decimals: u32) -> Self {
        Self { amount, decimals }
    }

    /// Parses a decimal integer string such as `"10000000000000000"`.
    pub fn from_dec_str(wei: &str, decimals: u32) -> Result<Self> {
        let wei = wei.trim();
        if wei.is_empty() {
            return Err(Error::InvalidAmount("empty amount".to_string()));
        }
        let amount =
            U256::from_dec_str(wei).map_err(|e| Error::InvalidAmount(format!("{}: {}", wei, e)))?;
        Ok(Self::new(amount, decimals))
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn wei_str(&self) -> String {
        self.amount.to_string()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn ensure_decimals(&self, expected: u32) -> Result<()> {
        if self.decimals != expected {
            return Err(Error::DecimalsMismatch {
                expected,
                actual: self.decimals,
            });
        }
        Ok(())
    }

    pub fn checked_cmp(&self, other: &Wei) -> Result<Ordering> {
        other.ensure_decimals(self.decimals)?;
        Ok(self.amount.cmp(&other.amount))
    }

    pub fn checked_add(&self, other: &Wei) -> Result<Wei> {
        other.ensure_decimals(self.decimals)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| Error::InvalidAmount("amount overflow".to_string()))?;
        Ok(Wei::new(amount, self.decimals))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount)
    }
}

// --- Chain Models ---

/// The subset of a block header the client needs; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlock {
    pub number: Option<U64>,
    pub hash: Option<H256>,
    pub timestamp: Option<U256>,
    pub gas_limit: Option<U256>,
    pub base_fee_per_gas: Option<U256>,
}

// --- Transaction Models ---

/// Fee fields of a draft: either a legacy gas price or the EIP-1559 pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeeFields {
    Legacy {
        #[serde(rename = "gasPrice")]
        gas_price: U256,
    },
    Eip1559 {
        #[serde(rename = "maxFeePerGas")]
        max_fee_per_gas: U256,
        #[serde(rename = "maxPriorityFeePerGas")]
        max_priority_fee_per_gas: U256,
        #[serde(rename = "accessList")]
        access_list: AccessList,
    },
}

impl FeeFields {
    pub fn eip1559(max_fee_per_gas: U256, max_priority_fee_per_gas: U256) -> Self {
        FeeFields::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
            access_list: AccessList::default(),
        }
    }

    /// `gasPrice` for legacy drafts, `maxFeePerGas` otherwise.
    pub fn price_per_gas(&self) -> U256 {
        match self {
            FeeFields::Legacy { gas_price } => *gas_price,
            FeeFields::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

/// A fully populated, unsigned transaction.
///
/// Serializes to the field mapping signers and `eth_sendRawTransaction`
/// tooling expect: quantities as minimal `0x` hex, `to` as lowercase hex,
/// `chainId` as a plain integer and `data` as `null` when there is no call-data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    nonce: U256,
    to: H160,
    gas: U256,
    value: U256,
    chain_id: u64,
    data: Option<Bytes>,
    #[serde(flatten)]
    fees: FeeFields,
}

impl TransactionDraft {
    pub(crate) fn new(
        nonce: U256,
        to: Address,
        gas: U256,
        value: U256,
        chain_id: u64,
        data: Option<Bytes>,
        fees: FeeFields,
    ) -> Self {
        Self {
            nonce,
            to: to.as_h160(),
            gas,
            value,
            chain_id,
            data: data.filter(|d| !d.is_empty()),
            fees,
        }
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    pub fn to(&self) -> Address {
        Address::from(self.to)
    }

    pub fn gas(&self) -> U256 {
        self.gas
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }

    pub fn fees(&self) -> &FeeFields {
        &self.fees
    }

    pub fn is_eip1559(&self) -> bool {
        matches!(self.fees, FeeFields::Eip1559 { .. })
    }

    /// Upper bound of the fee in wei (`gas × price`), as a decimal string.
    pub fn cost_estimate(&self) -> String {
        self.gas.saturating_mul(self.fees.price_per_gas()).to_string()
    }

    /// The field mapping as JSON.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn to_typed_transaction(&self) -> TypedTransaction {
        match &self.fees {
            FeeFields::Legacy { gas_price } => {
                let mut tx = TransactionRequest::new()
                    .to(self.to)
                    .nonce(self.nonce)
                    .gas(self.gas)
                    .value(self.value)
                    .gas_price(*gas_price)
                    .chain_id(self.chain_id);
                if let Some(data) = &self.data {
                    tx = tx.data(data.clone());
                }
                tx.into()
            }
            FeeFields::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
                access_list,
            } => {
                let mut tx = Eip1559TransactionRequest::new()
                    .to(self.to)
                    .nonce(self.nonce)
                    .gas(self.gas)
                    .value(self.value)
                    .max_fee_per_gas(*max_fee_per_gas)
                    .max_priority_fee_per_gas(*max_priority_fee_per_gas)
                    .access_list(access_list.clone())
                    .chain_id(self.chain_id);
                if let Some(data) = &self.data {
                    tx = tx.data(data.clone());
                }
                tx.into()
            }
        }
    }
}

/// Signed transaction bytes, `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction(String);

impl SignedTransaction {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_bytes(raw: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
