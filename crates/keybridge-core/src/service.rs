/*
[INPUT]:  Boundary request payloads and bearer tokens
[OUTPUT]: Boundary response payloads for login, profile, provider linking, contacts
[POS]:    Service layer - wires the auth, external and store components together
[UPDATE]: When boundary operations or their gating change
*/

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::auth::{SessionIssuer, TokenKeyStore, WalletAuthFlow};
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::error::{KeybridgeError, Result};
use crate::external::{ContactsFetcher, ExternalAuthStateMachine};
use crate::provider::{HttpProviderClient, ProviderClient};
use crate::store::{CredentialStore, JsonCredentialStore};
use crate::types::{
    Account, CodeRequestHandle, ContactsResponse, LoginResponse, LogoutResponse, ProfileResponse,
    SendCodeRequest, SendCodeResponse, SignInRequest, SignInResponse, VerifySignatureRequest,
};

/// Boundary facade; every call except `verify_signature` needs a bearer token
#[derive(Debug, Clone)]
pub struct KeybridgeService {
    flow: WalletAuthFlow,
    external: Option<Arc<ExternalAuthStateMachine>>,
    contacts: Option<ContactsFetcher>,
}

impl KeybridgeService {
    pub fn new(flow: WalletAuthFlow) -> Self {
        Self {
            flow,
            external: None,
            contacts: None,
        }
    }

    pub fn with_provider(mut self, external: Arc<ExternalAuthStateMachine>) -> Self {
        self.contacts = Some(ContactsFetcher::new(external.clone()));
        self.external = Some(external);
        self
    }

    /// Open the store and signing key under `data_dir` and wire every component
    ///
    /// A configured provider section is validated here, so bad credentials
    /// fail at start-up rather than on the first provider call.
    pub async fn open(data_dir: impl AsRef<Path>, config: &CoreConfig) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let store: Arc<dyn CredentialStore> = Arc::new(JsonCredentialStore::open(data_dir).await?);
        let signer = TokenKeyStore::new(data_dir).load_or_create()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let issuer = SessionIssuer::new(store, signer, clock.clone(), &config.session)?;
        let service = Self::new(WalletAuthFlow::new(Arc::new(issuer)));

        let Some(provider_config) = config.provider.as_ref() else {
            info!(data_dir = %data_dir.display(), "service ready without provider");
            return Ok(service);
        };
        let provider: Arc<dyn ProviderClient> = Arc::new(HttpProviderClient::new(provider_config)?);
        let external = ExternalAuthStateMachine::new(provider, provider_config, clock)?;
        info!(
            data_dir = %data_dir.display(),
            provider = %provider_config.base_url,
            "service ready"
        );
        Ok(service.with_provider(Arc::new(external)))
    }

    pub fn flow(&self) -> &WalletAuthFlow {
        &self.flow
    }

    pub fn issuer(&self) -> &Arc<SessionIssuer> {
        self.flow.issuer()
    }

    pub fn external(&self) -> Result<&Arc<ExternalAuthStateMachine>> {
        self.external.as_ref().ok_or_else(|| {
            KeybridgeError::InvalidCredentialsConfigured("no provider configured".to_string())
        })
    }

    pub async fn verify_signature(&self, request: &VerifySignatureRequest) -> Result<LoginResponse> {
        self.flow
            .authenticate(&request.wallet_address, &request.signature, &request.message)
            .await
    }

    /// Unknown or already revoked tokens yield `success: false`
    pub async fn logout(&self, token: &str) -> Result<LogoutResponse> {
        let success = self.issuer().revoke(bearer_token(token)).await?;
        Ok(LogoutResponse { success })
    }

    pub async fn profile(&self, token: &str) -> Result<ProfileResponse> {
        let account = self.authorize(token).await?;
        Ok(ProfileResponse { account })
    }

    pub async fn send_code(&self, token: &str, request: &SendCodeRequest) -> Result<SendCodeResponse> {
        self.authorize(token).await?;
        let handle = self.external()?.request_code(&request.phone_number).await?;
        Ok(SendCodeResponse {
            success: true,
            code_request_handle: handle,
        })
    }

    /// Complete the provider sign-in and link it to the caller's wallet
    pub async fn sign_in(&self, token: &str, request: &SignInRequest) -> Result<SignInResponse> {
        let account = self.authorize(token).await?;
        let handle = CodeRequestHandle::new(request.code_request_handle.clone());
        let external_user = self
            .external()?
            .verify_code(
                &request.phone_number,
                &request.code,
                &handle,
                Some(&account.wallet_address),
            )
            .await?;
        Ok(SignInResponse {
            success: true,
            external_user,
        })
    }

    pub async fn contacts(&self, token: &str) -> Result<ContactsResponse> {
        let account = self.authorize(token).await?;
        let fetcher = self.contacts.as_ref().ok_or_else(|| {
            KeybridgeError::InvalidCredentialsConfigured("no provider configured".to_string())
        })?;
        let contacts = fetcher.fetch_contacts(&account.wallet_address).await?;
        Ok(ContactsResponse {
            success: true,
            contacts,
        })
    }

    async fn authorize(&self, token: &str) -> Result<Account> {
        self.issuer().authorize(bearer_token(token)).await
    }
}

/// Accept both a raw token and an `Authorization: Bearer <token>` value
pub fn bearer_token(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .map(str::trim)
        .unwrap_or(raw)
}
