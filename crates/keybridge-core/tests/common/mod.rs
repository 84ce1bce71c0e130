/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for keybridge-core tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use keybridge_core::{
    Clock, CredentialStore, DialogEntity, ExternalAuthStateMachine, JsonCredentialStore,
    KeybridgeService, ManualClock, ProviderClient, ProviderConfig, ProviderUser, SessionConfig,
    SessionIssuer, TokenSigner, WalletAuthFlow,
};
use uuid::Uuid;
use wiremock::MockServer;

/// Well-known development key; its address is `TEST_ADDRESS`
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
pub const OTHER_PRIVATE_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub const PHONE: &str = "+15551234567";
pub const CODE: &str = "12345";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Wallet login stack on an in-memory store with a manual clock
pub struct AuthHarness {
    pub flow: WalletAuthFlow,
    pub issuer: Arc<SessionIssuer>,
    pub store: Arc<dyn CredentialStore>,
    pub clock: ManualClock,
}

pub fn auth_harness() -> AuthHarness {
    let store: Arc<dyn CredentialStore> = Arc::new(JsonCredentialStore::in_memory());
    let clock = ManualClock::new(Utc::now());
    let issuer = Arc::new(
        SessionIssuer::new(
            store.clone(),
            TokenSigner::generate(),
            Arc::new(clock.clone()),
            &SessionConfig::default(),
        )
        .expect("default session config is valid"),
    );
    AuthHarness {
        flow: WalletAuthFlow::new(issuer.clone()),
        issuer,
        store,
        clock,
    }
}

pub fn provider_config() -> ProviderConfig {
    ProviderConfig::new(12345, "0123456789abcdef0123456789abcdef")
}

pub fn state_machine(
    provider: Arc<dyn ProviderClient>,
    clock: &ManualClock,
) -> Arc<ExternalAuthStateMachine> {
    let clock: Arc<dyn Clock> = Arc::new(clock.clone());
    Arc::new(
        ExternalAuthStateMachine::new(provider, &provider_config(), clock)
            .expect("test provider config is valid"),
    )
}

/// Service with both wallet login and a provider attached
pub fn service_with(provider: Arc<dyn ProviderClient>) -> (KeybridgeService, AuthHarness) {
    let harness = auth_harness();
    let machine = state_machine(provider, &harness.clock);
    let service = KeybridgeService::new(harness.flow.clone()).with_provider(machine);
    (service, harness)
}

pub fn person(id: i64, first_name: &str, bot: bool) -> ProviderUser {
    ProviderUser {
        id,
        first_name: Some(first_name.to_string()),
        last_name: None,
        username: Some(first_name.to_ascii_lowercase()),
        phone: Some(format!("1555000{id:04}")),
        bot,
        mutual_contact: !bot,
    }
}

/// Two people, one bot, one group, one channel
pub fn mixed_dialogs() -> Vec<DialogEntity> {
    vec![
        DialogEntity::User(person(1, "Ada", false)),
        DialogEntity::User(person(2, "Helper", true)),
        DialogEntity::Group {
            id: 3,
            title: "team".to_string(),
        },
        DialogEntity::Channel {
            id: 4,
            title: "announcements".to_string(),
        },
        DialogEntity::User(person(5, "Grace", false)),
    ]
}

pub fn temp_dir(prefix: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("{prefix}-{}", Uuid::new_v4()));
    path
}
