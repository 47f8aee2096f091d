// src/blockchain/services/token.rs

use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::abi::{Abi, Token};
use ethers_core::types::{Bytes, U256};
use lazy_static::lazy_static;
use tracing::{debug, info};

use crate::blockchain::{
    address::Address,
    client::ChainClient,
    models::{ChainQueryError, Error, Result, TransactionDraft, Wei},
    services::coin::Coin,
};

/// Minimal ERC20 interface.
pub const ERC20_ABI: &str = r#"[{"constant":true,"inputs":[],"name":"totalSupply","outputs":[{"name":"supply","type":"uint256"}],"payable":false,"stateMutability":"view","type":"function"},{"constant":true,"inputs":[],"name":"name","outputs":[{"name":"","type":"string"}],"payable":false,"stateMutability":"view","type":"function"},{"constant":true,"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint256"}],"payable":false,"stateMutability":"view","type":"function"},{"constant":true,"inputs":[{"name":"_owner","type":"address"}],"name":"balanceOf","outputs":[{"name":"balance","type":"uint256"}],"payable":false,"stateMutability":"view","type":"function"},{"constant":true,"inputs":[{"name":"_owner","type":"address"},{"name":"_spender","type":"address"}],"name":"allowance","outputs":[{"name":"remaining","type":"uint256"}],"payable":false,"stateMutability":"view","type":"function"},{"anonymous":false,"inputs":[{"indexed":true,"name":"_owner","type":"address"},{"indexed":true,"name":"_spender","type":"address"},{"indexed":false,"name":"_value","type":"uint256"}],"name":"Approval","type":"event"},{"anonymous":false,"inputs":[{"indexed":true,"name":"_from","type":"address"},{"indexed":true,"name":"_to","type":"address"},{"indexed":false,"name":"_value","type":"uint256"}],"name":"Transfer","type":"event"},{"constant":false,"inputs":[{"name":"_spender","type":"address"},{"name":"_value","type":"uint256"}],"name":"approve","outputs":[{"name":"success","type":"bool"}],"payable":false,"stateMutability":"nonpayable","type":"function"},{"constant":false,"inputs":[{"name":"_to","type":"address"},{"name":"_value","type":"uint256"}],"name":"transfer","outputs":[{"name":"success","type":"bool"}],"payable":false,"stateMutability":"nonpayable","type":"function"},{"constant":false,"inputs":[{"name":"_from","type":"address"},{"name":"_to","type":"address"},{"name":"_value","type":"uint256"}],"name":"transferFrom","outputs":[{"name":"success","type":"bool"}],"payable":false,"stateMutability":"nonpayable","type":"function"}]"#;

lazy_static! {
    static ref PARSED_ERC20_ABI: std::result::Result<Abi, String> =
        serde_json::from_str(ERC20_ABI).map_err(|e| e.to_string());
}

fn erc20_abi() -> Result<&'static Abi> {
    PARSED_ERC20_ABI
        .as_ref()
        .map_err(|e| Error::Abi(e.clone()))
}

/// A deployed contract the client can encode calls for.
pub trait Contract: Send + Sync {
    fn contract_address(&self) -> Address;

    fn abi(&self) -> &Abi;
}

// Query failures from generic contract calls carry a token-specific operation name.
fn relabel(operation: &'static str) -> impl FnOnce(Error) -> Error {
    move |err| match err {
        Error::ChainQuery(query) => Error::ChainQuery(ChainQueryError {
            operation,
            reason: query.reason,
        }),
        other => other,
    }
}

fn first_uint(tokens: Vec<Token>, operation: &'static str) -> Result<U256> {
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| ChainQueryError::failed(operation, "unexpected return value").into())
}

/// ERC20 token binding.
#[derive(Debug, Clone)]
pub struct Erc20 {
    address: Address,
    decimals: u32,
    abi: &'static Abi,
    client: Arc<ChainClient>,
}

impl Erc20 {
    /// Binds to the token at `address`.
    ///
    /// Fails with [`Error::NotAContract`] when nothing is deployed there; the
    /// token's decimals are read once here and never again.
    pub async fn new(address: Address, client: Arc<ChainClient>) -> Result<Self> {
        let abi = erc20_abi()?;
        if !client.is_contract(&address).await? {
            return Err(Error::NotAContract(address));
        }

        let mut token = Self {
            address,
            decimals: 0,
            abi,
            client,
        };
        token.decimals = token.fetch_decimals().await?;
        info!("bound ERC20 token {} ({} decimals)", address, token.decimals);
        Ok(token)
    }

    async fn fetch_decimals(&self) -> Result<u32> {
        const OPERATION: &str = "get token decimals";
        let tokens = self
            .client
            .call_contract_method(self, "decimals", &[])
            .await
            .map_err(relabel(OPERATION))?;
        let decimals = first_uint(tokens, OPERATION)?;
        if decimals > U256::from(u32::MAX) {
            return Err(ChainQueryError::failed(OPERATION, "decimals out of range").into());
        }
        Ok(decimals.as_u32())
    }

    /// Call-data for `transfer(to, amount)`.
    pub fn build_transfer_data(&self, to: &Address, amount: &Wei) -> Result<Bytes> {
        amount.ensure_decimals(self.decimals)?;
        self.client.get_contract_method_data(
            self,
            "transfer",
            &[Token::Address(to.as_h160()), Token::Uint(amount.amount())],
        )
    }

    /// A draft calling this token's contract with `data`.
    pub async fn build_transaction(
        &self,
        from: &Address,
        data: &Bytes,
        native_value: &Wei,
    ) -> Result<TransactionDraft> {
        debug!("building token transaction for {}", self.address);
        self.client
            .assemble_transaction(from, &self.address, data, native_value)
            .await
    }
}

impl Contract for Erc20 {
    fn contract_address(&self) -> Address {
        self.address
    }

    fn abi(&self) -> &Abi {
        self.abi
    }
}

#[async_trait]
impl Coin for Erc20 {
    fn client(&self) -> &ChainClient {
        &self.client
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    async fn balance(&self, address: &Address) -> Result<Wei> {
        const OPERATION: &str = "get token balance";
        let tokens = self
            .client
            .call_contract_method(self, "balanceOf", &[Token::Address(address.as_h160())])
            .await
            .map_err(relabel(OPERATION))?;
        Ok(Wei::new(first_uint(tokens, OPERATION)?, self.decimals))
    }
}
