use ethers_core::types::U256;
use tracing::debug;

use crate::blockchain::models::FeeFields;

/// Tip used when the node's gas price is below the base fee.
pub const DEFAULT_PRIORITY_FEE_WEI: u64 = 1_000_000_000;

/// Turns live fee readings into draft fee fields, capped by the configured
/// `max_gas_price` ceiling.
///
/// Under EIP-1559 only the tip is capped; `maxFeePerGas` is `2 × base_fee + tip`
/// and may exceed the ceiling when the base fee is high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FeeResolver {
    ceiling: U256,
}

impl FeeResolver {
    pub(crate) fn new(ceiling: U256) -> Self {
        Self { ceiling }
    }

    /// `gasPrice = min(node gas price, ceiling)`.
    pub(crate) fn legacy(&self, node_gas_price: U256) -> FeeFields {
        let gas_price = node_gas_price.min(self.ceiling);
        debug!(
            "legacy fee: node gas price {} capped at {} -> {}",
            node_gas_price, self.ceiling, gas_price
        );
        FeeFields::Legacy { gas_price }
    }

    /// Derives the tip from `node_gas_price - base_fee` and the max fee from
    /// twice the base fee plus that tip.
    pub(crate) fn eip1559(&self, base_fee: U256, node_gas_price: U256) -> FeeFields {
        let tip = node_gas_price
            .checked_sub(base_fee)
            .unwrap_or_else(|| U256::from(DEFAULT_PRIORITY_FEE_WEI))
            .min(self.ceiling);

        let max_fee = base_fee.saturating_mul(U256::from(2)).saturating_add(tip);
        if max_fee.is_zero() {
            debug!("eip1559 fee resolved to zero, using ceiling {}", self.ceiling);
            return FeeFields::eip1559(self.ceiling, self.ceiling);
        }

        debug!(
            "eip1559 fee: base fee {}, node gas price {} -> max fee {}, tip {}",
            base_fee, node_gas_price, max_fee, tip
        );
        FeeFields::eip1559(max_fee, tip)
    }
}
