//! Small helpers shared across the crate.

use ethers_core::types::U256;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG`, defaulting
/// to `evm_tx_builder=info`. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evm_tx_builder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Minimal `0x` hex form used for JSON-RPC quantities.
pub fn to_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_quantity() {
        assert_eq!(to_quantity(U256::zero()), "0x0");
        assert_eq!(to_quantity(U256::from(21_000)), "0x5208");
        assert_eq!(to_quantity(U256::from(200_000)), "0x30d40");
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
