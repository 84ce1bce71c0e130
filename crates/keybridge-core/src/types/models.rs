/*
[INPUT]:  Domain records and provider schema definitions
[OUTPUT]: Typed Rust structs with serialization support
[POS]:    Data layer - accounts, sessions, provider identities and contacts
[UPDATE]: When the stored schema or the provider schema changes
*/

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable user identity, one per lower-cased wallet address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// `wallet_address` must already be normalized
    pub fn new(wallet_address: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            wallet_address,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Issued wallet session; the raw token is never stored, only its hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub account_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    pub fn new(account_id: String, token_hash: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id,
            token_hash,
            expires_at: now + ttl,
            created_at: now,
            is_active: true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Inactive or expired rows are kept for audit but never authorize anything
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// Opaque handle the provider returns for a sent verification code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeRequestHandle(pub String);

impl CodeRequestHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeRequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resumable provider credential; contents are never logged
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSession(String);

impl ProviderSession {
    pub fn new(session: impl Into<String>) -> Self {
        Self(session.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProviderSession(<redacted>)")
    }
}

/// Provider-side user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub mutual_contact: bool,
}

/// Entry of the provider's dialog list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DialogEntity {
    User(ProviderUser),
    Group { id: i64, title: String },
    Channel { id: i64, title: String },
}

/// Identity returned after a successful provider sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUser {
    /// External-identity-id: the provider's user id in string form
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub auth_date: i64,
}

impl ExternalUser {
    pub fn from_provider(user: &ProviderUser, auth_date: DateTime<Utc>) -> Self {
        Self {
            id: user.id.to_string(),
            first_name: user.first_name.clone().unwrap_or_default(),
            last_name: user.last_name.clone().unwrap_or_default(),
            username: user.username.clone().unwrap_or_default(),
            auth_date: auth_date.timestamp(),
        }
    }
}

/// Normalized contact entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub phone_number: String,
    pub is_mutual_contact: bool,
}

impl Contact {
    /// People only; bots, groups and channels map to `None`
    pub fn from_dialog(entity: &DialogEntity) -> Option<Self> {
        match entity {
            DialogEntity::User(user) if !user.bot => Some(Self {
                id: user.id.to_string(),
                first_name: user.first_name.clone().unwrap_or_default(),
                last_name: user.last_name.clone().unwrap_or_default(),
                username: user.username.clone().unwrap_or_default(),
                phone_number: user.phone.clone().unwrap_or_default(),
                is_mutual_contact: user.mutual_contact,
            }),
            _ => None,
        }
    }
}
