/*
[INPUT]:  Wallet signatures, account ids and bearer tokens
[OUTPUT]: Recovered addresses, issued/revoked sessions, login responses
[POS]:    Auth layer - wallet login and session lifecycle
[UPDATE]: When auth flow, token format or signature methods change
*/

pub mod flow;
pub mod issuer;
pub mod key_store;
pub mod recover;
pub mod signer;
pub mod token;
pub mod wallet;

pub use flow::WalletAuthFlow;
pub use issuer::{SessionIssuer, ValidatedSession};
pub use key_store::TokenKeyStore;
pub use recover::{is_wallet_address, normalize_wallet_address, recover_address};
pub use signer::TokenSigner;
pub use token::{TokenClaims, hash_token};
pub use wallet::{EvmWalletSigner, MockWalletSigner, WalletSigner, login_message};
