/*
[INPUT]:  Phone numbers, verification codes, provider sessions
[OUTPUT]: Code-request handles, signed-in provider users, dialog lists
[POS]:    Provider layer - opaque external messaging-provider capability
[UPDATE]: When the provider contract or its implementations change
*/

pub mod http;
pub mod mock;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CodeRequestHandle, DialogEntity, ProviderSession, ProviderUser};

pub use http::HttpProviderClient;
pub use mock::ScriptedProvider;

/// Successful provider sign-in
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub user: ProviderUser,
    pub session: ProviderSession,
}

/// Capability the external-auth state machine drives
///
/// Implementations map "invalid code / sign-in denied" to
/// `AuthenticationRejected` and transport failures to `ProviderUnavailable`.
#[async_trait]
pub trait ProviderClient: Send + Sync + fmt::Debug {
    /// Ask the provider to deliver a verification code to `phone_number`
    async fn send_code(&self, phone_number: &str) -> Result<CodeRequestHandle>;

    /// Exchange the delivered code for a resumable provider session
    async fn sign_in(
        &self,
        phone_number: &str,
        code: &str,
        handle: &CodeRequestHandle,
    ) -> Result<SignInOutcome>;

    /// `Ok(false)` when the provider no longer accepts `session`
    async fn check_authorization(&self, session: &ProviderSession) -> Result<bool>;

    async fn list_dialogs(&self, session: &ProviderSession) -> Result<Vec<DialogEntity>>;
}
