/*
[INPUT]:  Phone numbers, verification codes, code request handles, linked wallets
[OUTPUT]: Per-phone sign-in flow state, cached provider sessions, wallet links
[POS]:    External layer - two-step provider sign-in state machine
[UPDATE]: When flow transitions, handle rules or provider timeouts change
*/

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::cache::{ProviderSessionCache, WalletLinks};
use crate::auth::{is_wallet_address, normalize_wallet_address};
use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::error::{KeybridgeError, Result};
use crate::provider::ProviderClient;
use crate::types::{CodeRequestHandle, ExternalUser, ProviderSession};

/// Where a phone number stands in the provider sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Unauthenticated,
    CodeRequested {
        handle: CodeRequestHandle,
        requested_at: DateTime<Utc>,
    },
    Authenticated {
        external_id: String,
    },
}

/// Per-phone entry; `latest_request` is the newest code request started,
/// `settled_request` the newest one whose outcome has been applied
#[derive(Debug)]
struct PhoneFlow {
    state: FlowState,
    latest_request: u64,
    settled_request: u64,
}

#[derive(Debug, Default)]
struct Flows {
    by_phone: HashMap<String, PhoneFlow>,
    next_request: u64,
}

/// Holds the code request handle between the two provider calls and binds
/// the resulting provider session to a wallet
///
/// Flows are keyed by normalized phone number and never interfere with each
/// other. Only the handle of the newest code request started for a phone
/// number is kept; replies from older requests that arrive late are dropped.
#[derive(Debug)]
pub struct ExternalAuthStateMachine {
    provider: Arc<dyn ProviderClient>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
    code_ttl: chrono::Duration,
    flows: Mutex<Flows>,
    sessions: ProviderSessionCache,
    links: WalletLinks,
}

impl ExternalAuthStateMachine {
    /// Fails with `InvalidCredentialsConfigured` when the provider section is unusable
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        config: &ProviderConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            request_timeout: config.timeout(),
            code_ttl: config.code_ttl(),
            flows: Mutex::new(Flows::default()),
            sessions: ProviderSessionCache::new(clock.clone(), config.session_max_age()),
            links: WalletLinks::new(),
            clock,
        })
    }

    /// Override the per-call provider timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &Arc<dyn ProviderClient> {
        &self.provider
    }

    /// Ask the provider to deliver a code; replaces any pending handle for the phone
    ///
    /// Also drops flows of other phones that have gone idle.
    pub async fn request_code(&self, phone_number: &str) -> Result<CodeRequestHandle> {
        let phone = normalize_phone_number(phone_number)?;
        let request = self.start_request(&phone);
        let sent = self
            .call("send_code", self.provider.send_code(&phone))
            .await;

        let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        let Some(flow) = flows
            .by_phone
            .get_mut(&phone)
            .filter(|flow| flow.latest_request == request)
        else {
            if sent.is_ok() {
                info!(phone = %mask_phone(&phone), "code request superseded by a newer one");
            }
            return sent;
        };
        flow.settled_request = request;

        let handle = match sent {
            Ok(handle) => handle,
            Err(err) => {
                if flow.state == FlowState::Unauthenticated {
                    flows.by_phone.remove(&phone);
                }
                return Err(err);
            }
        };
        let replaced = std::mem::replace(
            &mut flow.state,
            FlowState::CodeRequested {
                handle: handle.clone(),
                requested_at: self.clock.now(),
            },
        );
        info!(
            phone = %mask_phone(&phone),
            replaced_pending = matches!(replaced, FlowState::CodeRequested { .. }),
            "verification code requested"
        );
        Ok(handle)
    }

    /// Exchange a delivered code for a provider session
    ///
    /// A handle that is not the latest for the phone, or that is older than the
    /// code TTL, is rejected without calling the provider. A provider
    /// rejection leaves the flow waiting for another attempt.
    pub async fn verify_code(
        &self,
        phone_number: &str,
        code: &str,
        handle: &CodeRequestHandle,
        linked_wallet: Option<&str>,
    ) -> Result<ExternalUser> {
        let phone = normalize_phone_number(phone_number)?;
        if let Some(wallet) = linked_wallet {
            if !is_wallet_address(wallet) {
                return Err(KeybridgeError::InvalidWalletAddress(wallet.to_string()));
            }
        }
        self.ensure_pending(&phone, handle)?;

        let outcome = self
            .call("sign_in", self.provider.sign_in(&phone, code, handle))
            .await
            .inspect_err(|err| {
                warn!(phone = %mask_phone(&phone), reason = %err, "provider sign-in failed");
            })?;

        let now = self.clock.now();
        let external_id = outcome.user.id.to_string();
        self.sessions.insert(&external_id, outcome.session);
        if let Some(wallet) = linked_wallet {
            if let Some(previous) = self.links.link(wallet, &external_id) {
                if previous != external_id {
                    info!(wallet = %normalize_wallet_address(wallet), previous = %previous, "wallet link replaced");
                }
            }
        }

        {
            let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
            // a newer code request keeps its pending handle
            if let Some(flow) = flows.by_phone.get_mut(&phone) {
                if matches!(&flow.state, FlowState::CodeRequested { handle: h, .. } if h == handle)
                {
                    flow.state = FlowState::Authenticated {
                        external_id: external_id.clone(),
                    };
                }
            }
        }

        info!(
            phone = %mask_phone(&phone),
            external_id = %external_id,
            linked = linked_wallet.is_some(),
            "provider sign-in completed"
        );
        Ok(ExternalUser::from_provider(&outcome.user, now))
    }

    pub fn state(&self, phone_number: &str) -> FlowState {
        let Ok(phone) = normalize_phone_number(phone_number) else {
            return FlowState::Unauthenticated;
        };
        let flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        flows
            .by_phone
            .get(&phone)
            .map(|flow| flow.state.clone())
            .unwrap_or(FlowState::Unauthenticated)
    }

    pub fn session_for(&self, external_id: &str) -> Option<ProviderSession> {
        self.sessions.get(external_id)
    }

    pub fn linked_identity(&self, wallet: &str) -> Option<String> {
        self.links.get(wallet)
    }

    /// Drop the cached session; flows bound to it restart from `Unauthenticated`
    pub fn evict(&self, external_id: &str) -> bool {
        let removed = self.sessions.remove(external_id);
        let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        for flow in flows.by_phone.values_mut() {
            if matches!(&flow.state, FlowState::Authenticated { external_id: id } if id == external_id)
            {
                flow.state = FlowState::Unauthenticated;
            }
        }
        let now = self.clock.now();
        flows.by_phone.retain(|_, flow| !self.is_idle(flow, now));
        if removed {
            info!(external_id, "provider session evicted");
        }
        removed
    }

    /// Bound a provider call by the request timeout
    pub(crate) async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "provider call timed out"
                );
                Err(KeybridgeError::ProviderUnavailable(format!(
                    "{operation} timed out"
                )))
            }
        }
    }

    fn ensure_pending(&self, phone: &str, handle: &CodeRequestHandle) -> Result<()> {
        let flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        match flows.by_phone.get(phone).map(|flow| &flow.state) {
            Some(FlowState::CodeRequested {
                handle: pending,
                requested_at,
            }) if pending == handle => {
                if self.clock.now() - *requested_at >= self.code_ttl {
                    warn!(phone = %mask_phone(phone), "code request handle expired");
                    Err(KeybridgeError::AuthenticationRejected(
                        "verification code expired, request a new code".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            _ => {
                warn!(phone = %mask_phone(phone), "stale or unknown code request handle");
                Err(KeybridgeError::AuthenticationRejected(
                    "code request is no longer valid, request a new code".to_string(),
                ))
            }
        }
    }

    /// Register a new code request for `phone` and prune idle flows
    fn start_request(&self, phone: &str) -> u64 {
        let now = self.clock.now();
        let mut flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        let before = flows.by_phone.len();
        flows.by_phone.retain(|_, flow| !self.is_idle(flow, now));
        let pruned = before - flows.by_phone.len();
        if pruned > 0 {
            debug!(pruned, "idle sign-in flows dropped");
        }

        flows.next_request += 1;
        let request = flows.next_request;
        flows
            .by_phone
            .entry(phone.to_string())
            .or_insert(PhoneFlow {
                state: FlowState::Unauthenticated,
                latest_request: 0,
                settled_request: 0,
            })
            .latest_request = request;
        request
    }

    /// No request in flight and nothing worth keeping
    fn is_idle(&self, flow: &PhoneFlow, now: DateTime<Utc>) -> bool {
        if flow.latest_request != flow.settled_request {
            return false;
        }
        match &flow.state {
            FlowState::Unauthenticated => true,
            FlowState::CodeRequested { requested_at, .. } => now - *requested_at >= self.code_ttl,
            FlowState::Authenticated { .. } => false,
        }
    }

    #[cfg(test)]
    fn tracked_phones(&self) -> usize {
        let flows = self.flows.lock().unwrap_or_else(|e| e.into_inner());
        flows.by_phone.len()
    }
}

/// `+` followed by 7 to 15 digits; spaces, dashes and parentheses are dropped
pub fn normalize_phone_number(raw: &str) -> Result<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(KeybridgeError::InvalidPhoneNumber(mask_phone(raw)));
    }
    Ok(format!("+{digits}"))
}

/// Keep only the last four characters for logs
pub(crate) fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.trim().chars().collect();
    let visible: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{visible}")
}
