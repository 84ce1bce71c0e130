/*
[INPUT]:  Wallet address with a linked provider identity
[OUTPUT]: Normalized contact list of people (no bots, groups or channels)
[POS]:    External layer - contact retrieval through the cached provider session
[UPDATE]: When contact normalization or session re-validation changes
*/

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::ExternalAuthStateMachine;
use crate::auth::normalize_wallet_address;
use crate::error::{KeybridgeError, Result};
use crate::types::Contact;

/// Reads contacts for a wallet through its linked provider session
#[derive(Debug, Clone)]
pub struct ContactsFetcher {
    auth: Arc<ExternalAuthStateMachine>,
}

impl ContactsFetcher {
    pub fn new(auth: Arc<ExternalAuthStateMachine>) -> Self {
        Self { auth }
    }

    /// Fetch the wallet's provider contacts
    ///
    /// A session the provider no longer authorizes is evicted and reported as
    /// `SessionExpired`; the caller has to sign in to the provider again.
    pub async fn fetch_contacts(&self, wallet_address: &str) -> Result<Vec<Contact>> {
        let wallet = normalize_wallet_address(wallet_address);
        let external_id = self
            .auth
            .linked_identity(&wallet)
            .ok_or(KeybridgeError::NotLinked)?;
        let session = self
            .auth
            .session_for(&external_id)
            .ok_or(KeybridgeError::NotAuthenticated)?;

        let provider = self.auth.provider();
        let authorized = self
            .auth
            .call("check_authorization", provider.check_authorization(&session))
            .await?;
        if !authorized {
            info!(wallet = %wallet, external_id = %external_id, "provider no longer authorizes session");
            self.auth.evict(&external_id);
            return Err(KeybridgeError::SessionExpired);
        }

        let dialogs = match self
            .auth
            .call("list_dialogs", provider.list_dialogs(&session))
            .await
        {
            Ok(dialogs) => dialogs,
            Err(KeybridgeError::SessionExpired) => {
                self.auth.evict(&external_id);
                return Err(KeybridgeError::SessionExpired);
            }
            Err(err) => {
                warn!(external_id = %external_id, reason = %err, "contact listing failed");
                return Err(err);
            }
        };

        let contacts: Vec<Contact> = dialogs.iter().filter_map(Contact::from_dialog).collect();
        debug!(
            external_id = %external_id,
            dialogs = dialogs.len(),
            contacts = contacts.len(),
            "contacts fetched"
        );
        Ok(contacts)
    }
}
