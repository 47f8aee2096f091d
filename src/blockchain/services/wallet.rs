use std::fmt;

use ethers_signers::{LocalWallet, Signer};
use k256::ecdsa::SigningKey;
use secrecy::{ExposeSecret, Secret};
use tracing::{debug, info};

use crate::blockchain::{
    address::Address,
    client::ChainClient,
    models::{Error, Result, SignedTransaction, TransactionDraft},
};

/// A local secp256k1 key pair able to sign drafts.
pub struct Account {
    key: Secret<[u8; 32]>,
    wallet: LocalWallet,
    address: Address,
}

impl Account {
    /// Loads an account from a hex private key, with or without `0x`.
    pub fn new(private_key: &str) -> Result<Self> {
        let digits = private_key.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        if digits.is_empty() {
            return Err(Error::EmptyPrivateKey);
        }

        let bytes = hex::decode(digits).map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| Error::InvalidPrivateKey("not a valid secp256k1 scalar".to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// A fresh random account.
    pub fn generate_new() -> Self {
        let account = Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()));
        info!("generated new account {}", account.address);
        account
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let mut key = [0u8; 32];
        key.copy_from_slice(&signing_key.to_bytes());
        let wallet = LocalWallet::from(signing_key);
        let address = Address::from(wallet.address());
        Self {
            key: Secret::new(key),
            wallet,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Lowercase hex without the `0x` prefix.
    pub fn private_key(&self) -> String {
        hex::encode(self.key.expose_secret())
    }

    /// Current transaction count of this account.
    pub async fn nonce(&self, client: &ChainClient) -> Result<u64> {
        client.get_account_nonce(&self.address).await
    }

    /// Signs `draft` as a legacy (EIP-155) or EIP-1559 transaction, matching
    /// its fee fields. The result can be passed to
    /// [`ChainClient::send_transaction`].
    pub async fn sign_transaction(&self, draft: &TransactionDraft) -> Result<SignedTransaction> {
        let tx = draft.to_typed_transaction();
        let signature = self
            .wallet
            .sign_transaction(&tx)
            .await
            .map_err(|e| Error::Signing(e.to_string()))?;
        debug!("signed transaction with nonce {} from {}", draft.nonce(), self.address);
        Ok(SignedTransaction::from_bytes(&tx.rlp_signed(&signature)))
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
