/*
[INPUT]:  Scripted provider behaviour (accepted code, users, dialogs, faults)
[OUTPUT]: Deterministic ProviderClient for tests and local runs
[POS]:    Provider layer - test double for the provider capability
[UPDATE]: When tests need new provider behaviours
*/

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ProviderClient, SignInOutcome};
use crate::error::{KeybridgeError, Result};
use crate::types::{CodeRequestHandle, DialogEntity, ProviderSession, ProviderUser};

#[derive(Debug, Default)]
struct Script {
    accepted_code: Option<String>,
    users: HashMap<String, ProviderUser>,
    dialogs: Vec<DialogEntity>,
    latest_handle: HashMap<String, CodeRequestHandle>,
    handles_issued: u32,
    sessions_issued: u32,
    revoked: HashSet<String>,
    revoke_all: bool,
    unavailable: bool,
    listing_fails: bool,
    delay: Option<Duration>,
    /// Held back after the next handle is issued, then cleared
    code_reply_delay: Option<Duration>,
    sign_in_calls: u32,
}

/// Provider double issuing handles `H1`, `H2`, ... and accepting one code
///
/// With no accepted code configured every sign-in is rejected.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<Script>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that accepts `code` for every phone number
    pub fn accepting(code: &str) -> Self {
        let provider = Self::new();
        provider.with_script(|s| s.accepted_code = Some(code.to_string()));
        provider
    }

    pub fn with_user(self, phone_number: &str, user: ProviderUser) -> Self {
        self.with_script(|s| {
            s.users.insert(phone_number.to_string(), user);
        });
        self
    }

    pub fn with_dialogs(self, dialogs: Vec<DialogEntity>) -> Self {
        self.with_script(|s| s.dialogs = dialogs);
        self
    }

    /// Stop authorizing every session issued so far
    pub fn revoke_all_sessions(&self) {
        self.with_script(|s| s.revoke_all = true);
    }

    pub fn revoke_session(&self, session: &ProviderSession) {
        self.with_script(|s| {
            s.revoked.insert(session.expose().to_string());
        });
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.with_script(|s| s.unavailable = unavailable);
    }

    pub fn set_listing_fails(&self, fails: bool) {
        self.with_script(|s| s.listing_fails = fails);
    }

    /// Sleep this long before answering any call
    pub fn set_delay(&self, delay: Duration) {
        self.with_script(|s| s.delay = Some(delay));
    }

    /// Issue the next handle right away but deliver it only after `delay`
    pub fn delay_next_code_reply(&self, delay: Duration) {
        self.with_script(|s| s.code_reply_delay = Some(delay));
    }

    pub fn sign_in_calls(&self) -> u32 {
        self.with_script(|s| s.sign_in_calls)
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        let mut guard = self.script.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    async fn before_call(&self) -> Result<()> {
        let (delay, unavailable) = self.with_script(|s| (s.delay, s.unavailable));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unavailable {
            return Err(KeybridgeError::ProviderUnavailable(
                "scripted outage".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_user(phone_number: &str) -> ProviderUser {
    let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();
    ProviderUser {
        id: digits.parse().unwrap_or(1),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        username: None,
        phone: Some(digits),
        bot: false,
        mutual_contact: false,
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn send_code(&self, phone_number: &str) -> Result<CodeRequestHandle> {
        self.before_call().await?;
        let (handle, reply_delay) = self.with_script(|s| {
            s.handles_issued += 1;
            let handle = CodeRequestHandle::new(format!("H{}", s.handles_issued));
            s.latest_handle
                .insert(phone_number.to_string(), handle.clone());
            (handle, s.code_reply_delay.take())
        });
        if let Some(delay) = reply_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(handle)
    }

    async fn sign_in(
        &self,
        phone_number: &str,
        code: &str,
        handle: &CodeRequestHandle,
    ) -> Result<SignInOutcome> {
        self.before_call().await?;
        self.with_script(|s| {
            s.sign_in_calls += 1;
            if s.latest_handle.get(phone_number) != Some(handle) {
                return Err(KeybridgeError::AuthenticationRejected(
                    "PHONE_CODE_EXPIRED".to_string(),
                ));
            }
            if s.accepted_code.as_deref() != Some(code) {
                return Err(KeybridgeError::AuthenticationRejected(
                    "PHONE_CODE_INVALID".to_string(),
                ));
            }
            let user = s
                .users
                .get(phone_number)
                .cloned()
                .unwrap_or_else(|| default_user(phone_number));
            s.sessions_issued += 1;
            let session = ProviderSession::new(format!("session-{}-{}", user.id, s.sessions_issued));
            Ok(SignInOutcome { user, session })
        })
    }

    async fn check_authorization(&self, session: &ProviderSession) -> Result<bool> {
        self.before_call().await?;
        Ok(self.with_script(|s| !s.revoke_all && !s.revoked.contains(session.expose())))
    }

    async fn list_dialogs(&self, _session: &ProviderSession) -> Result<Vec<DialogEntity>> {
        self.before_call().await?;
        self.with_script(|s| {
            if s.listing_fails {
                Err(KeybridgeError::ProviderUnavailable(
                    "dialog listing failed".to_string(),
                ))
            } else {
                Ok(s.dialogs.clone())
            }
        })
    }
}
