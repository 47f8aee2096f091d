//! Chain client for EVM-compatible networks.
//!
//! Owns the RPC transport and the per-endpoint configuration, memoizes the
//! chain facts that never change for an endpoint (network id, EIP-1559
//! support, deployed bytecode) and assembles unsigned transactions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ethers_core::abi::Token;
use ethers_core::types::{Bytes, H160, H256, U256};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{
    blockchain::{
        address::Address,
        models::{
            ChainQueryError, Error, FeeFields, LatestBlock, Result, SignedTransaction,
            TransactionDraft, Wei,
        },
        services::{fees::FeeResolver, token::Contract},
        transport::{HttpTransport, Transport},
    },
    config::{ChainConfig, Config, OptionValue},
    utils::to_quantity,
};

/// Decimals of the chain's native coin.
pub const NATIVE_COIN_DECIMALS: u32 = 18;

/// Gas used by a plain value transfer to an account without code.
pub const PLAIN_TRANSFER_GAS: u64 = 21_000;

pub struct ChainClient {
    transport: Arc<dyn Transport>,
    config: ChainConfig,
    network_id: OnceCell<u64>,
    eip1559: OnceCell<bool>,
    // Deployed bytecode does not change, so entries are never invalidated.
    code_cache: DashMap<H160, Bytes>,
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("provider_url", &self.transport.url())
            .field("config", &self.config)
            .field("network_id", &self.network_id.get())
            .field("eip1559", &self.eip1559.get())
            .finish()
    }
}

impl ChainClient {
    /// Create a client talking JSON-RPC over HTTP to `provider_url`.
    pub fn connect(provider_url: &str, config: ChainConfig) -> Result<Self> {
        let transport =
            HttpTransport::new(provider_url, Duration::from_secs(config.network_timeout))?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::connect(&config.provider_url, config.chain.clone())
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: ChainConfig) -> Self {
        Self {
            transport,
            config,
            network_id: OnceCell::new(),
            eip1559: OnceCell::new(),
            code_cache: DashMap::new(),
        }
    }

    pub fn provider_url(&self) -> &str {
        self.transport.url()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn get_option(&self, name: &str) -> Result<OptionValue> {
        Ok(self.config.get_option(name)?)
    }

    pub fn native_coin_decimals(&self) -> u32 {
        NATIVE_COIN_DECIMALS
    }

    /// Wraps a decimal wei string as a native-coin amount.
    pub fn make_native_wei(&self, wei: &str) -> Result<Wei> {
        Wei::from_dec_str(wei, NATIVE_COIN_DECIMALS)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: &str,
        params: Value,
    ) -> Result<T> {
        let result = self
            .transport
            .request(method, params)
            .await
            .map_err(|e| ChainQueryError::failed(operation, e))?
            .ok_or_else(|| ChainQueryError::missing(operation))?;

        serde_json::from_value(result)
            .map_err(|e| Error::from(ChainQueryError::failed(operation, e)))
    }

    /// Network id reported by `net_version`, queried once per client.
    pub async fn get_network_id(&self) -> Result<u64> {
        let id = self
            .network_id
            .get_or_try_init(|| async move {
                let version: Value = self
                    .query("get network id", "net_version", json!([]))
                    .await?;
                // nodes answer with a decimal string, some with a bare number
                let id = match &version {
                    Value::String(s) => s.trim().parse::<u64>().ok(),
                    Value::Number(n) => n.as_u64(),
                    _ => None,
                }
                .ok_or_else(|| {
                    ChainQueryError::failed(
                        "get network id",
                        format!("unexpected net_version {}", version),
                    )
                })?;
                info!("connected to network {} at {}", id, self.provider_url());
                Ok::<_, Error>(id)
            })
            .await?;
        Ok(*id)
    }

    /// Whether the chain has a fee market, decided once from the latest block.
    pub async fn is_eip1559(&self) -> Result<bool> {
        let eip1559 = self
            .eip1559
            .get_or_try_init(|| async move {
                let block = self.get_latest_block().await?;
                Ok::<_, Error>(block.base_fee_per_gas.is_some())
            })
            .await?;
        Ok(*eip1559)
    }

    /// Always fetched fresh.
    pub async fn get_latest_block(&self) -> Result<LatestBlock> {
        self.query(
            "get latest block",
            "eth_getBlockByNumber",
            json!(["latest", false]),
        )
        .await
    }

    /// Bytecode deployed at `address`, empty for accounts without code.
    pub async fn get_contract_code(&self, address: &Address) -> Result<Bytes> {
        let key = address.as_h160();
        if let Some(code) = self.code_cache.get(&key) {
            return Ok(code.value().clone());
        }

        let code: Bytes = self
            .query(
                "get contract code",
                "eth_getCode",
                json!([address.to_lowercase_hex(), "latest"]),
            )
            .await?;
        debug!("fetched {} bytes of code for {}", code.len(), address);
        self.code_cache.insert(key, code.clone());
        Ok(code)
    }

    pub async fn is_contract(&self, address: &Address) -> Result<bool> {
        Ok(!self.get_contract_code(address).await?.is_empty())
    }

    /// Transaction count of `account`. Never cached.
    pub async fn get_account_nonce(&self, account: &Address) -> Result<u64> {
        let count: U256 = self
            .query(
                "get account nonce",
                "eth_getTransactionCount",
                json!([account.to_lowercase_hex(), "latest"]),
            )
            .await?;
        if count > U256::from(u64::MAX) {
            return Err(ChainQueryError::failed("get account nonce", "nonce out of range").into());
        }
        Ok(count.as_u64())
    }

    pub async fn get_address_balance(&self, address: &Address) -> Result<Wei> {
        let balance: U256 = self
            .query(
                "get account balance",
                "eth_getBalance",
                json!([address.to_lowercase_hex(), "latest"]),
            )
            .await?;
        Ok(Wei::new(balance, NATIVE_COIN_DECIMALS))
    }

    pub async fn get_gas_price(&self) -> Result<U256> {
        self.query("get gas price", "eth_gasPrice", json!([])).await
    }

    pub async fn estimate_gas(&self, call: &Value) -> Result<U256> {
        self.query("estimate gas", "eth_estimateGas", json!([call]))
            .await
    }

    /// Broadcasts signed transaction bytes and returns the transaction hash.
    pub async fn send_transaction(&self, signed: &SignedTransaction) -> Result<H256> {
        let hash: H256 = self
            .query(
                "send transaction",
                "eth_sendRawTransaction",
                json!([signed.as_str()]),
            )
            .await?;
        info!("sent transaction {:?}", hash);
        Ok(hash)
    }

    /// ABI-encoded call-data for `method` of `contract`.
    pub fn get_contract_method_data(
        &self,
        contract: &dyn Contract,
        method: &str,
        args: &[Token],
    ) -> Result<Bytes> {
        let function = contract
            .abi()
            .function(method)
            .map_err(|e| Error::Abi(e.to_string()))?;
        let data = function
            .encode_input(args)
            .map_err(|e| Error::Abi(format!("{}: {}", method, e)))?;
        Ok(Bytes::from(data))
    }

    /// Performs a read-only `eth_call` against `contract` and decodes the outputs.
    pub async fn call_contract_method(
        &self,
        contract: &dyn Contract,
        method: &str,
        args: &[Token],
    ) -> Result<Vec<Token>> {
        let data = self.get_contract_method_data(contract, method, args)?;
        let raw: Bytes = self
            .query(
                "call contract method",
                "eth_call",
                json!([
                    {
                        "to": contract.contract_address().to_lowercase_hex(),
                        "data": data,
                    },
                    "latest"
                ]),
            )
            .await?;
        if raw.is_empty() {
            return Err(ChainQueryError::missing("call contract method").into());
        }

        let function = contract
            .abi()
            .function(method)
            .map_err(|e| Error::Abi(e.to_string()))?;
        function
            .decode_output(&raw)
            .map_err(|e| Error::Abi(format!("{}: {}", method, e)))
    }

    async fn gas_limit_for(&self, to: &Address) -> Result<u64> {
        if self.get_contract_code(to).await?.is_empty() {
            return Ok(PLAIN_TRANSFER_GAS);
        }
        Ok(self.config.gas_limit)
    }

    async fn resolve_fees(&self) -> Result<FeeFields> {
        let resolver = FeeResolver::new(self.config.max_gas_price_wei());

        if !self.is_eip1559().await? {
            let gas_price = self.get_gas_price().await?;
            return Ok(resolver.legacy(gas_price));
        }

        let block = self.get_latest_block().await?;
        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| ChainQueryError::missing("get base fee"))?;
        let gas_price = self.get_gas_price().await?;
        Ok(resolver.eip1559(base_fee, gas_price))
    }

    /// Builds an unsigned transaction from `from` to `to`.
    ///
    /// The nonce is read live from the chain. Transfers to accounts without
    /// code use 21000 gas; contract calls use the node's estimate for the
    /// configured `gas_limit`, which fails with [`Error::GasLimitTooLow`] if
    /// the estimate comes back equal to the limit itself.
    pub async fn assemble_transaction(
        &self,
        from: &Address,
        to: &Address,
        data: &Bytes,
        value: &Wei,
    ) -> Result<TransactionDraft> {
        value.ensure_decimals(NATIVE_COIN_DECIMALS)?;

        let nonce = self.get_account_nonce(from).await?;
        let gas_limit = self.gas_limit_for(to).await?;
        let chain_id = self.get_network_id().await?;
        let data = (!data.is_empty()).then(|| data.clone());

        let mut gas = U256::from(gas_limit);
        if gas_limit > PLAIN_TRANSFER_GAS {
            let call = json!({
                "from": from.to_lowercase_hex(),
                "to": to.to_lowercase_hex(),
                "gas": to_quantity(gas),
                "value": to_quantity(value.amount()),
                "data": data,
            });
            let estimate = self.estimate_gas(&call).await?;
            if estimate == gas {
                return Err(Error::GasLimitTooLow(gas_limit));
            }
            debug!("gas estimate {} replaces configured limit {}", estimate, gas_limit);
            gas = estimate;
        }

        let fees = self.resolve_fees().await?;
        let draft = TransactionDraft::new(
            U256::from(nonce),
            *to,
            gas,
            value.amount(),
            chain_id,
            data,
            fees,
        );
        info!(
            "assembled transaction from {} to {} (nonce {}, gas {}, cost estimate {} wei)",
            from,
            to,
            nonce,
            draft.gas(),
            draft.cost_estimate()
        );
        Ok(draft)
    }
}
