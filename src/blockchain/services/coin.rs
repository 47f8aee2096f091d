use async_trait::async_trait;
use ethers_core::types::U256;
use tracing::debug;

use crate::blockchain::{
    address::Address,
    client::ChainClient,
    models::{Error, Result, Wei},
    services::wallet::Account,
};

/// Something that can be held and sent: the native coin or a token.
#[async_trait]
pub trait Coin: Send + Sync {
    fn client(&self) -> &ChainClient;

    fn decimals(&self) -> u32;

    fn make_wei(&self, wei: &str) -> Result<Wei> {
        Wei::from_dec_str(wei, self.decimals())
    }

    async fn balance(&self, address: &Address) -> Result<Wei>;

    async fn account_balance(&self, account: &Account) -> Result<Wei> {
        self.balance(&account.address()).await
    }

    /// Scales a user-facing `amount` to this coin's units and checks it
    /// against the current balance of `account`.
    async fn amount_to_send(&self, account: &Account, amount: f64) -> Result<Wei> {
        if self.decimals() > MAX_DECIMALS {
            return Err(Error::InvalidAmount(format!(
                "unsupported decimals: {}",
                self.decimals()
            )));
        }
        let scale = U256::exp10(self.decimals() as usize);
        let requested = double_int_multiply(amount, scale)?;

        let balance = self.account_balance(account).await?;
        debug!(
            "amount to send from {}: {} (balance {})",
            account.address(),
            requested,
            balance
        );
        if balance.amount() < requested {
            return Err(Error::InsufficientFunds {
                balance: balance.amount(),
                requested,
            });
        }

        Ok(Wei::new(requested, self.decimals()))
    }
}

/// Largest decimals count whose unit scale `10^decimals` fits in a `U256`.
pub const MAX_DECIMALS: u32 = 77;

/// Multiplies a float amount by an integer scale, keeping the integer part exact.
///
/// Only the fractional remainder goes through a floating multiply, so rounding
/// error is bounded by that remainder and does not grow with the magnitude.
/// This is still an approximation: `0.1 + 0.2` style inputs carry their float
/// representation into the result.
pub fn double_int_multiply(value: f64, scale: U256) -> Result<U256> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidAmount(value.to_string()));
    }

    let overflow = || Error::InvalidAmount(format!("{} overflows at scale {}", value, scale));
    let whole = value.floor();
    let scaled = f64_to_u256(whole)
        .and_then(|whole| whole.checked_mul(scale))
        .ok_or_else(overflow)?;
    if whole == value {
        return Ok(scaled);
    }

    let fraction = f64_to_u256((value - whole) * u256_to_f64(scale)).ok_or_else(overflow)?;
    scaled.checked_add(fraction).ok_or_else(overflow)
}

// Truncates a non-negative finite float. None if it does not fit in 256 bits.
fn f64_to_u256(value: f64) -> Option<U256> {
    let value = value.trunc();
    if value < u128::MAX as f64 {
        return Some(U256::from(value as u128));
    }

    // value >= 2^128 here, so the binary exponent is positive
    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as usize - 1075;
    let mantissa = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
    if exponent > 256 - 53 {
        return None;
    }
    Some(U256::from(mantissa) << exponent)
}

fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei_per_ether() -> U256 {
        U256::exp10(18)
    }

    #[test]
    fn test_fraction_at_18_decimals_is_exact() {
        assert_eq!(
            double_int_multiply(0.01, wei_per_ether()).unwrap(),
            U256::from(10_000_000_000_000_000u64)
        );
        assert_eq!(
            double_int_multiply(1.5, wei_per_ether()).unwrap(),
            U256::from(1_500_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_whole_amounts() {
        assert_eq!(
            double_int_multiply(10.0, wei_per_ether()).unwrap(),
            U256::from(10) * wei_per_ether()
        );
        assert_eq!(
            double_int_multiply(0.0, U256::from(1_000_000)).unwrap(),
            U256::zero()
        );
        assert_eq!(
            double_int_multiply(3.0, U256::one()).unwrap(),
            U256::from(3)
        );
    }

    #[test]
    fn test_integer_part_does_not_drift() {
        // 2^60 * 1e18 is far beyond f64 precision
        let value = (1u64 << 60) as f64;
        assert_eq!(
            double_int_multiply(value, wei_per_ether()).unwrap(),
            U256::from(1u64 << 60) * wei_per_ether()
        );
    }

    #[test]
    fn test_fraction_is_truncated() {
        // 0.5 of a 6-decimal unit is dropped
        assert_eq!(
            double_int_multiply(0.0000005, U256::from(1_000_000)).unwrap(),
            U256::zero()
        );
        assert_eq!(
            double_int_multiply(2.25, U256::from(100)).unwrap(),
            U256::from(225)
        );
    }

    #[test]
    fn test_scales_beyond_u128() {
        let scale = U256::exp10(40);
        assert_eq!(double_int_multiply(0.0, scale).unwrap(), U256::zero());
        assert_eq!(
            double_int_multiply(3.0, scale).unwrap(),
            U256::from(3) * scale
        );
        assert_eq!(
            double_int_multiply(1.5, scale).unwrap(),
            U256::from(15) * U256::exp10(39)
        );

        let max_scale = U256::exp10(MAX_DECIMALS as usize);
        assert_eq!(double_int_multiply(1.0, max_scale).unwrap(), max_scale);
        assert!(double_int_multiply(0.5, max_scale).is_ok());
    }

    #[test]
    fn test_whole_part_beyond_u128() {
        // 2^130 is exact in f64
        let value = 2f64.powi(130);
        assert_eq!(
            double_int_multiply(value, U256::from(10)).unwrap(),
            (U256::one() << 130) * U256::from(10)
        );
    }

    #[test]
    fn test_rejects_unusable_values() {
        assert!(double_int_multiply(-1.0, U256::from(10)).is_err());
        assert!(double_int_multiply(f64::NAN, U256::from(10)).is_err());
        assert!(double_int_multiply(f64::INFINITY, U256::from(10)).is_err());
        assert!(double_int_multiply(f64::MAX, U256::one()).is_err());
        assert!(double_int_multiply(1e70, wei_per_ether()).is_err());
        assert!(double_int_multiply(10.0, U256::exp10(MAX_DECIMALS as usize)).is_err());
    }
}
