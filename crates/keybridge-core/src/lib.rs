/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public keybridge core surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod external;
pub mod provider;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{
    EvmWalletSigner,
    MockWalletSigner,
    SessionIssuer,
    TokenKeyStore,
    TokenSigner,
    WalletAuthFlow,
    WalletSigner,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CoreConfig, ProviderConfig, SessionConfig};
pub use error::{KeybridgeError, Result};

// Re-export commonly used types from external
pub use external::{ContactsFetcher, ExternalAuthStateMachine, FlowState};

pub use provider::{HttpProviderClient, ProviderClient, ScriptedProvider};
pub use service::KeybridgeService;
pub use store::{CredentialStore, JsonCredentialStore};

// Re-export all types
pub use types::*;
