/*
[INPUT]:  Account ids, raw bearer tokens, credential store, signing key, clock
[OUTPUT]: Issued tokens, session rows, revocations and resolved accounts
[POS]:    Auth layer - session lifecycle (issue / validate / revoke)
[UPDATE]: When session validity rules or token claims change
*/

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use super::TokenSigner;
use super::token::{TokenClaims, decode_token, encode_token, hash_token};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{KeybridgeError, Result};
use crate::store::CredentialStore;
use crate::types::{Account, Session};

/// A token that passed every check, with its stored session row
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub claims: TokenClaims,
    pub session: Session,
}

/// Issues, validates and revokes wallet sessions
#[derive(Debug)]
pub struct SessionIssuer {
    store: Arc<dyn CredentialStore>,
    signer: TokenSigner,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: TokenSigner,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            signer,
            clock,
            ttl: config.ttl(),
        })
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue a new session for `account_id` and return the raw token
    pub async fn issue(&self, account_id: &str) -> Result<String> {
        let account = self.resolve(account_id).await?;
        self.issue_for_account(&account).await
    }

    /// Same as [`SessionIssuer::issue`] for an already loaded account
    pub async fn issue_for_account(&self, account: &Account) -> Result<String> {
        let now = self.clock.now();
        let claims = TokenClaims::new(&account.id, &account.wallet_address, now, self.ttl);
        let token = encode_token(&self.signer, &claims)?;

        let session = Session::new(account.id.clone(), hash_token(&token), now, self.ttl);
        let session_id = session.id.clone();
        self.store.insert_session(session).await?;

        info!(
            account_id = %account.id,
            session_id = %session_id,
            "session issued"
        );
        Ok(token)
    }

    /// Deactivate the session behind `token`.
    ///
    /// Returns `false` for unknown or already revoked tokens; never an error for those.
    pub async fn revoke(&self, token: &str) -> Result<bool> {
        let token_hash = hash_token(token.trim());
        let revoked = self.store.deactivate_session(&token_hash).await?;
        if revoked {
            info!("session revoked");
        } else {
            debug!("revoke requested for unknown or inactive session");
        }
        Ok(revoked)
    }

    pub async fn resolve(&self, account_id: &str) -> Result<Account> {
        self.store
            .account(account_id)
            .await?
            .ok_or(KeybridgeError::AccountNotFound)
    }

    /// Check token signature, embedded expiry and the stored session row
    pub async fn validate(&self, token: &str) -> Result<ValidatedSession> {
        let now = self.clock.now();
        let claims = decode_token(&self.signer, token, now)?;

        let session = self
            .store
            .session_by_hash(&hash_token(token.trim()))
            .await?
            .ok_or(KeybridgeError::InvalidToken)?;
        if session.account_id != claims.sub {
            return Err(KeybridgeError::InvalidToken);
        }
        if !session.is_usable(now) {
            return Err(if session.is_active {
                KeybridgeError::SessionExpired
            } else {
                KeybridgeError::SessionRevoked
            });
        }

        Ok(ValidatedSession { claims, session })
    }

    /// Resolve a bearer token to the account it was issued for
    pub async fn authorize(&self, token: &str) -> Result<Account> {
        let validated = self.validate(token).await?;
        self.resolve(&validated.claims.sub).await
    }

    pub async fn is_valid(&self, token: &str) -> bool {
        self.validate(token).await.is_ok()
    }
}
