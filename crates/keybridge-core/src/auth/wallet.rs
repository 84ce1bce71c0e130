/*
[INPUT]:  Message to sign and wallet private key
[OUTPUT]: Hex signatures and wallet address for wallet login
[POS]:    Auth layer - signing-capable wallet collaborator
[UPDATE]: When adding new wallet types or changing signature format
*/

use std::str::FromStr;

use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{KeybridgeError, Result};

/// Trait for wallet signing operations
///
/// The trait is async to support hardware wallets and external signers.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Get the wallet address
    fn address(&self) -> &str;

    /// Sign a personal message and return the 0x-prefixed hex signature
    async fn sign_message(&self, message: &str) -> Result<String>;
}

/// Signer for EVM-compatible wallets backed by a local private key
pub struct EvmWalletSigner {
    signer: PrivateKeySigner,
    address: String,
}

impl EvmWalletSigner {
    /// Create a new EVM wallet signer from a hex-encoded private key
    ///
    /// Supports both "0x"-prefixed and non-prefixed hex strings.
    pub fn new(private_key_hex: &str) -> Result<Self> {
        let private_key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());
        let signer = PrivateKeySigner::from_str(private_key_hex)
            .map_err(|e| KeybridgeError::Config(format!("Invalid EVM private key: {}", e)))?;

        let address = signer.address().to_checksum(None);

        Ok(Self { signer, address })
    }
}

#[async_trait]
impl WalletSigner for EvmWalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, message: &str) -> Result<String> {
        let signature = self
            .signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| {
                KeybridgeError::InvalidSignatureFormat(format!("Failed to sign message: {}", e))
            })?;

        // [r, s, v] with v in {27, 28}
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}

/// Mock wallet signer for testing
#[derive(Debug, Clone)]
pub struct MockWalletSigner {
    address: String,
    signature: String,
}

impl MockWalletSigner {
    /// Create a new mock signer with predetermined signature
    pub fn new(address: &str, signature: &str) -> Self {
        Self {
            address: address.to_string(),
            signature: signature.to_string(),
        }
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, _message: &str) -> Result<String> {
        Ok(self.signature.clone())
    }
}

/// Login message in the format the web client asks wallets to sign
pub fn login_message(address: &str, at: DateTime<Utc>) -> String {
    format!(
        "Sign this message to authenticate with your wallet.\n\n\
         Wallet: {address}\n\
         Timestamp: {}\n\n\
         This request will not trigger a blockchain transaction or cost any gas fees.",
        at.timestamp_millis()
    )
}
