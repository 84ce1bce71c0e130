/*
[INPUT]:  Account and session records
[OUTPUT]: Durable lookups by wallet address, account id and token hash
[POS]:    Storage layer - sole owner of account and session persistence
[UPDATE]: When adding store backends or record queries
*/

pub mod json;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Account, Session};

pub use json::JsonCredentialStore;

/// Persistence seam for accounts and sessions
///
/// Implementations must make `find_or_create_account` atomic per address and
/// reject a second session with an already stored `token_hash`.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Return the account for `wallet_address`, creating it if absent.
    ///
    /// The boolean is `true` when this call created the account.
    async fn find_or_create_account(
        &self,
        wallet_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(Account, bool)>;

    async fn account_by_wallet(&self, wallet_address: &str) -> Result<Option<Account>>;

    async fn account(&self, account_id: &str) -> Result<Option<Account>>;

    async fn insert_session(&self, session: Session) -> Result<()>;

    async fn session_by_hash(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Flip `is_active` to false. Returns `false` if no active session had this hash.
    async fn deactivate_session(&self, token_hash: &str) -> Result<bool>;

    async fn sessions_for_account(&self, account_id: &str) -> Result<Vec<Session>>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;
}
