// src/blockchain/address.rs

use std::fmt;
use std::str::FromStr;

use ethers_core::{types::H160, utils::to_checksum};
use serde::{Serialize, Serializer};

use crate::blockchain::models::Error;

/// A validated 20-byte account or contract address.
///
/// Input may be all-lowercase, all-uppercase or EIP-55 mixed case, with or
/// without the `0x` prefix. Mixed-case input must carry a valid checksum.
/// The canonical form is the EIP-55 checksum string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(H160);

impl Address {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let bad = || Error::InvalidAddress(input.to_string());

        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }

        let bytes = hex::decode(digits).map_err(|_| bad())?;
        let address = H160::from_slice(&bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && &to_checksum(&address, None)[2..] != digits {
            return Err(bad());
        }

        Ok(Self(address))
    }

    /// The EIP-55 checksum form, `0x`-prefixed.
    pub fn checksum(&self) -> String {
        to_checksum(&self.0, None)
    }

    /// Lowercase `0x`-prefixed hex, as used in the `to` field of drafts.
    pub fn to_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_bytes()))
    }

    pub fn as_h160(&self) -> H160 {
        self.0
    }
}

impl From<H160> for Address {
    fn from(inner: H160) -> Self {
        Self(inner)
    }
}

impl From<Address> for H160 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.checksum())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.checksum())
    }
}
