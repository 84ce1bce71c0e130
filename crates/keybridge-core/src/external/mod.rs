/*
[INPUT]:  Provider client, provider configuration, clock
[OUTPUT]: Provider sign-in flows, session cache, wallet links, contacts
[POS]:    External layer - linking a provider account to a wallet identity
[UPDATE]: When external auth or contact retrieval changes
*/

pub mod cache;
pub mod contacts;
pub mod state;

pub use cache::{ProviderSessionCache, WalletLinks};
pub use contacts::ContactsFetcher;
pub use state::{ExternalAuthStateMachine, FlowState, normalize_phone_number};
