/*
[INPUT]:  Claimed wallet address, hex signature, signed message
[OUTPUT]: Bearer token plus account for a proven wallet owner
[POS]:    Auth layer - wallet login entry point
[UPDATE]: When login steps or failure reporting change
*/

use std::sync::Arc;

use tracing::{info, warn};

use super::SessionIssuer;
use super::recover::{
    decode_signature_hex, is_wallet_address, normalize_wallet_address, recover_address,
    verify_wallet_address,
};
use crate::error::{KeybridgeError, Result};
use crate::types::LoginResponse;

/// Orchestrates signature recovery, account find-or-create and session issuance
///
/// No challenge nonce is tracked: any valid (message, signature) pair for an
/// address logs that address in, including a replayed one.
#[derive(Debug, Clone)]
pub struct WalletAuthFlow {
    issuer: Arc<SessionIssuer>,
}

impl WalletAuthFlow {
    pub fn new(issuer: Arc<SessionIssuer>) -> Self {
        Self { issuer }
    }

    pub fn issuer(&self) -> &Arc<SessionIssuer> {
        &self.issuer
    }

    /// Complete wallet login
    ///
    /// 1. Recover the signer from (message, signature)
    /// 2. Compare with the claimed address
    /// 3. Find or create the account
    /// 4. Issue a session
    ///
    /// Every failure surfaces as [`KeybridgeError::AuthenticationFailed`]; the
    /// specific reason is only traced.
    pub async fn authenticate(
        &self,
        wallet_address: &str,
        signature: &str,
        message: &str,
    ) -> Result<LoginResponse> {
        match self.try_authenticate(wallet_address, signature, message).await {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!(
                    wallet = %wallet_address,
                    reason = %err,
                    "wallet authentication failed"
                );
                Err(KeybridgeError::AuthenticationFailed)
            }
        }
    }

    async fn try_authenticate(
        &self,
        wallet_address: &str,
        signature: &str,
        message: &str,
    ) -> Result<LoginResponse> {
        let wallet_address = wallet_address.trim();
        if !is_wallet_address(wallet_address) {
            return Err(KeybridgeError::InvalidWalletAddress(
                wallet_address.to_string(),
            ));
        }

        let signature = decode_signature_hex(signature)?;
        let recovered = recover_address(message, &signature)?;
        verify_wallet_address(wallet_address, &recovered)?;

        let now = self.issuer.clock().now();
        let (account, created) = self
            .issuer
            .store()
            .find_or_create_account(&normalize_wallet_address(wallet_address), now)
            .await?;
        if created {
            info!(account_id = %account.id, wallet = %account.wallet_address, "account created");
        }

        let token = self.issuer.issue_for_account(&account).await?;
        info!(account_id = %account.id, "wallet login succeeded");

        Ok(LoginResponse { token, account })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::auth::token::hash_token;
    use crate::auth::{EvmWalletSigner, TokenSigner, WalletSigner};
    use crate::clock::{Clock, ManualClock};
    use crate::config::SessionConfig;
    use crate::store::{CredentialStore, JsonCredentialStore};

    const TEST_PK: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn flow() -> WalletAuthFlow {
        let store: Arc<dyn CredentialStore> = Arc::new(JsonCredentialStore::in_memory());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let issuer =
            SessionIssuer::new(store, TokenSigner::generate(), clock, &SessionConfig::default())
                .unwrap();
        WalletAuthFlow::new(Arc::new(issuer))
    }

    #[tokio::test]
    async fn test_authenticate_creates_account_and_session() {
        let flow = flow();
        let wallet = EvmWalletSigner::new(TEST_PK).unwrap();
        let signature = wallet.sign_message("hello").await.unwrap();

        let login = flow
            .authenticate(wallet.address(), &signature, "hello")
            .await
            .unwrap();
        assert_eq!(login.account.wallet_address, wallet.address().to_ascii_lowercase());

        let store = flow.issuer().store();
        let session = store
            .session_by_hash(&hash_token(&login.token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.account_id, login.account.id);
    }

    #[tokio::test]
    async fn test_repeat_login_reuses_account() {
        let flow = flow();
        let wallet = EvmWalletSigner::new(TEST_PK).unwrap();
        let signature = wallet.sign_message("hello").await.unwrap();

        let first = flow
            .authenticate(wallet.address(), &signature, "hello")
            .await
            .unwrap();
        let second = flow
            .authenticate(&wallet.address().to_ascii_uppercase().replacen("0X", "0x", 1), &signature, "hello")
            .await
            .unwrap();

        assert_eq!(first.account.id, second.account.id);
        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn test_malformed_inputs_fail_uniformly() {
        let flow = flow();
        let wallet = EvmWalletSigner::new(TEST_PK).unwrap();
        let signature = wallet.sign_message("hello").await.unwrap();

        let cases = [
            ("not-an-address", signature.as_str()),
            (wallet.address(), "0x1234"),
            (wallet.address(), "not hex"),
        ];
        for (address, signature) in cases {
            let err = flow.authenticate(address, signature, "hello").await.unwrap_err();
            assert!(matches!(err, KeybridgeError::AuthenticationFailed));
        }
        assert!(flow.issuer().store().list_accounts().await.unwrap().is_empty());
    }
}
