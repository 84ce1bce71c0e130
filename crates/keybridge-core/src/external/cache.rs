/*
[INPUT]:  External identity ids, provider sessions, wallet addresses, clock
[OUTPUT]: Process-lifetime provider-session cache and wallet-to-identity links
[POS]:    External layer - in-memory state owned by the external auth machine
[UPDATE]: When cache expiry or link semantics change
*/

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::auth::normalize_wallet_address;
use crate::clock::Clock;
use crate::types::ProviderSession;

#[derive(Debug, Clone)]
struct CachedSession {
    session: ProviderSession,
    stored_at: DateTime<Utc>,
}

/// Provider sessions keyed by external identity id
///
/// At most one entry per identity; a later insert overwrites. Nothing is
/// persisted, so a restart empties the cache.
#[derive(Debug)]
pub struct ProviderSessionCache {
    clock: Arc<dyn Clock>,
    max_age: Option<Duration>,
    entries: RwLock<HashMap<String, CachedSession>>,
}

impl ProviderSessionCache {
    pub fn new(clock: Arc<dyn Clock>, max_age: Option<Duration>) -> Self {
        Self {
            clock,
            max_age,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, external_id: &str, session: ProviderSession) {
        let entry = CachedSession {
            session,
            stored_at: self.clock.now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(external_id.to_string(), entry);
    }

    /// Cached session, dropping it first if older than the configured max age
    pub fn get(&self, external_id: &str) -> Option<ProviderSession> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            let entry = entries.get(external_id)?;
            if !self.is_stale(entry, now) {
                return Some(entry.session.clone());
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries
            .get(external_id)
            .is_some_and(|entry| self.is_stale(entry, now))
        {
            entries.remove(external_id);
            info!(external_id, "provider session aged out of cache");
        }
        None
    }

    pub fn remove(&self, external_id: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(external_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_stale(&self, entry: &CachedSession, now: DateTime<Utc>) -> bool {
        self.max_age
            .is_some_and(|max_age| now - entry.stored_at >= max_age)
    }
}

/// Wallet address to external identity id, one identity per wallet
#[derive(Debug, Default)]
pub struct WalletLinks {
    links: RwLock<HashMap<String, String>>,
}

impl WalletLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `wallet` to `external_id`, returning the identity it replaced
    pub fn link(&self, wallet: &str, external_id: &str) -> Option<String> {
        let mut links = self.links.write().unwrap_or_else(|e| e.into_inner());
        links.insert(normalize_wallet_address(wallet), external_id.to_string())
    }

    pub fn get(&self, wallet: &str) -> Option<String> {
        let links = self.links.read().unwrap_or_else(|e| e.into_inner());
        links.get(&normalize_wallet_address(wallet)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::clock::ManualClock;

    #[test]
    fn test_insert_overwrites() {
        let clock = ManualClock::new(Utc::now());
        let cache = ProviderSessionCache::new(Arc::new(clock), None);

        cache.insert("42", ProviderSession::new("first"));
        cache.insert("42", ProviderSession::new("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("42").unwrap().expose(), "second");
    }

    #[test]
    fn test_entries_age_out_with_clock() {
        let clock = ManualClock::new(Utc::now());
        let cache = ProviderSessionCache::new(Arc::new(clock.clone()), Some(Duration::hours(1)));

        cache.insert("42", ProviderSession::new("s"));
        clock.advance(Duration::minutes(59));
        assert!(cache.get("42").is_some());

        clock.advance(Duration::minutes(1));
        assert!(cache.get("42").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove() {
        let cache = ProviderSessionCache::new(Arc::new(ManualClock::default()), None);
        cache.insert("42", ProviderSession::new("s"));
        assert!(cache.remove("42"));
        assert!(!cache.remove("42"));
    }

    #[test]
    fn test_links_ignore_address_case() {
        let links = WalletLinks::new();
        assert!(links
            .link("0xABCDEF0000000000000000000000000000000001", "42")
            .is_none());
        assert_eq!(
            links.get("0xabcdef0000000000000000000000000000000001").as_deref(),
            Some("42")
        );

        let previous = links.link("0xabcdef0000000000000000000000000000000001", "43");
        assert_eq!(previous.as_deref(), Some("42"));
        assert_eq!(
            links.get("0xABCDEF0000000000000000000000000000000001").as_deref(),
            Some("43")
        );
    }
}
