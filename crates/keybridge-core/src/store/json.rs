/*
[INPUT]:  Data directory (or none for a process-local store)
[OUTPUT]: CredentialStore backed by accounts.json / sessions.json
[POS]:    Storage layer - default store implementation
[UPDATE]: When the on-disk layout or uniqueness rules change
*/

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::CredentialStore;
use crate::error::{KeybridgeError, Result};
use crate::types::{Account, Session};

const ACCOUNTS_FILE: &str = "accounts.json";
const SESSIONS_FILE: &str = "sessions.json";

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    /// lower-cased wallet address -> account id
    by_wallet: HashMap<String, String>,
    /// token hash -> session
    sessions: HashMap<String, Session>,
}

impl Tables {
    fn from_records(accounts: Vec<Account>, sessions: Vec<Session>) -> Result<Self> {
        let mut tables = Tables::default();
        for account in accounts {
            let wallet = account.wallet_address.to_ascii_lowercase();
            if tables.by_wallet.insert(wallet, account.id.clone()).is_some() {
                return Err(KeybridgeError::Storage(format!(
                    "duplicate wallet address {} in {ACCOUNTS_FILE}",
                    account.wallet_address
                )));
            }
            tables.accounts.insert(account.id.clone(), account);
        }
        for session in sessions {
            let hash = session.token_hash.clone();
            if tables.sessions.insert(hash, session).is_some() {
                return Err(KeybridgeError::Storage(format!(
                    "duplicate token hash in {SESSIONS_FILE}"
                )));
            }
        }
        Ok(tables)
    }
}

/// Credential store keeping every table behind one lock
///
/// Mutations are serialized, so find-or-create cannot race into two accounts
/// for the same address. When opened on a directory, each mutation rewrites
/// the affected file before the lock is released; a failed write undoes the
/// in-memory change, so memory never runs ahead of disk.
#[derive(Debug)]
pub struct JsonCredentialStore {
    dir: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl JsonCredentialStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            tables: Mutex::new(Tables::default()),
        }
    }

    /// Open (or initialize) a store under `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;

        let accounts: Vec<Account> = load_records(&dir.join(ACCOUNTS_FILE)).await?;
        let sessions: Vec<Session> = load_records(&dir.join(SESSIONS_FILE)).await?;
        debug!(
            dir = %dir.display(),
            accounts = accounts.len(),
            sessions = sessions.len(),
            "credential store loaded"
        );

        Ok(Self {
            dir: Some(dir),
            tables: Mutex::new(Tables::from_records(accounts, sessions)?),
        })
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    async fn save_accounts(&self, tables: &Tables) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let mut accounts: Vec<&Account> = tables.accounts.values().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        write_records(&dir.join(ACCOUNTS_FILE), &accounts).await
    }

    async fn save_sessions(&self, tables: &Tables) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let mut sessions: Vec<&Session> = tables.sessions.values().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        write_records(&dir.join(SESSIONS_FILE), &sessions).await
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn find_or_create_account(
        &self,
        wallet_address: &str,
        now: DateTime<Utc>,
    ) -> Result<(Account, bool)> {
        let wallet = wallet_address.to_ascii_lowercase();
        let mut tables = self.tables.lock().await;

        if let Some(account) = tables
            .by_wallet
            .get(&wallet)
            .and_then(|id| tables.accounts.get(id))
        {
            return Ok((account.clone(), false));
        }

        let account = Account::new(wallet.clone(), now);
        tables.by_wallet.insert(wallet, account.id.clone());
        tables.accounts.insert(account.id.clone(), account.clone());
        let saved = self.save_accounts(&tables).await;
        if let Err(err) = saved {
            tables.by_wallet.remove(&account.wallet_address);
            tables.accounts.remove(&account.id);
            return Err(err);
        }
        Ok((account, true))
    }

    async fn account_by_wallet(&self, wallet_address: &str) -> Result<Option<Account>> {
        let wallet = wallet_address.to_ascii_lowercase();
        let tables = self.tables.lock().await;
        Ok(tables
            .by_wallet
            .get(&wallet)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn account(&self, account_id: &str) -> Result<Option<Account>> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.get(account_id).cloned())
    }

    async fn insert_session(&self, session: Session) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if !tables.accounts.contains_key(&session.account_id) {
            return Err(KeybridgeError::AccountNotFound);
        }
        if tables.sessions.contains_key(&session.token_hash) {
            return Err(KeybridgeError::Storage(
                "session token hash already exists".to_string(),
            ));
        }
        let token_hash = session.token_hash.clone();
        tables.sessions.insert(token_hash.clone(), session);
        let saved = self.save_sessions(&tables).await;
        if let Err(err) = saved {
            tables.sessions.remove(&token_hash);
            return Err(err);
        }
        Ok(())
    }

    async fn session_by_hash(&self, token_hash: &str) -> Result<Option<Session>> {
        let tables = self.tables.lock().await;
        Ok(tables.sessions.get(token_hash).cloned())
    }

    async fn deactivate_session(&self, token_hash: &str) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let flipped = match tables.sessions.get_mut(token_hash) {
            Some(session) if session.is_active => {
                session.is_active = false;
                true
            }
            _ => false,
        };
        if flipped {
            let saved = self.save_sessions(&tables).await;
            if let Err(err) = saved {
                if let Some(session) = tables.sessions.get_mut(token_hash) {
                    session.is_active = true;
                }
                return Err(err);
            }
        }
        Ok(flipped)
    }

    async fn sessions_for_account(&self, account_id: &str) -> Result<Vec<Session>> {
        let tables = self.tables.lock().await;
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|session| session.account_id == account_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sessions)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let tables = self.tables.lock().await;
        let mut accounts: Vec<Account> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }
}

async fn load_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !fs::try_exists(path).await? {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

async fn write_records<T: serde::Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let content = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
