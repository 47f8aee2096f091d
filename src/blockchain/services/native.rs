use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::types::Bytes;

use crate::blockchain::{
    address::Address,
    client::{ChainClient, NATIVE_COIN_DECIMALS},
    models::{Result, TransactionDraft, Wei},
    services::coin::Coin,
};

/// The chain's own currency (ETH on mainnet).
#[derive(Debug, Clone)]
pub struct NativeCoin {
    client: Arc<ChainClient>,
}

impl NativeCoin {
    pub fn new(client: Arc<ChainClient>) -> Self {
        Self { client }
    }

    /// Plain value transfer, no call-data.
    pub async fn build_transaction(
        &self,
        from: &Address,
        to: &Address,
        value: &Wei,
    ) -> Result<TransactionDraft> {
        self.client
            .assemble_transaction(from, to, &Bytes::new(), value)
            .await
    }
}

#[async_trait]
impl Coin for NativeCoin {
    fn client(&self) -> &ChainClient {
        &self.client
    }

    fn decimals(&self) -> u32 {
        NATIVE_COIN_DECIMALS
    }

    async fn balance(&self, address: &Address) -> Result<Wei> {
        self.client.get_address_balance(address).await
    }
}
