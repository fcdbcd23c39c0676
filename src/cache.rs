// Serializable credential cache. Only `identity` mutates it; everyone else
// sees whether it is empty, which accounts it knows and whether it changed.

use serde::{Deserialize, Serialize};

/// A signed-in identity known to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// `<object id>.<tenant id>`
    pub home_account_id: String,
    pub username: Option<String>,
    pub realm: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AccessTokenEntry {
    pub home_account_id: String,
    pub secret: String,
    /// Lower-cased granted scopes.
    pub target: Vec<String>,
    /// Unix timestamp.
    pub expires_on: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RefreshTokenEntry {
    pub home_account_id: String,
    pub secret: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheData {
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    access_tokens: Vec<AccessTokenEntry>,
    #[serde(default)]
    refresh_tokens: Vec<RefreshTokenEntry>,
}

#[derive(Debug, Default, Clone)]
pub struct CredentialCache {
    data: CacheData,
    changed: bool,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deserialize(blob: &str) -> Result<Self, serde_json::Error> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(CredentialCache {
            data: serde_json::from_str(blob)?,
            changed: false,
        })
    }

    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.data)
    }

    /// Set whenever sign in or a refresh touched the cache since it was
    /// loaded or last saved.
    pub fn has_state_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn mark_saved(&mut self) {
        self.changed = false;
    }

    pub fn is_empty(&self) -> bool {
        self.data.accounts.is_empty()
            && self.data.access_tokens.is_empty()
            && self.data.refresh_tokens.is_empty()
    }

    /// Accounts in the order they first signed in.
    pub fn accounts(&self) -> &[Account] {
        &self.data.accounts
    }

    pub(crate) fn upsert_account(&mut self, account: Account) {
        match self
            .data
            .accounts
            .iter_mut()
            .find(|a| a.home_account_id == account.home_account_id)
        {
            Some(existing) => *existing = account,
            None => self.data.accounts.push(account),
        }
        self.changed = true;
    }

    /// Replaces any token for the same account that overlaps `entry`'s scopes.
    pub(crate) fn store_access_token(&mut self, entry: AccessTokenEntry) {
        self.data.access_tokens.retain(|t| {
            t.home_account_id != entry.home_account_id
                || !t.target.iter().any(|s| entry.target.contains(s))
        });
        self.data.access_tokens.push(entry);
        self.changed = true;
    }

    pub(crate) fn store_refresh_token(&mut self, entry: RefreshTokenEntry) {
        self.data
            .refresh_tokens
            .retain(|t| t.home_account_id != entry.home_account_id);
        self.data.refresh_tokens.push(entry);
        self.changed = true;
    }

    /// An access token for `account` covering every scope in `scopes` that
    /// is still valid at `not_before`.
    pub(crate) fn find_access_token(
        &self,
        account: &Account,
        scopes: &[String],
        not_before: i64,
    ) -> Option<&AccessTokenEntry> {
        self.data.access_tokens.iter().find(|t| {
            t.home_account_id == account.home_account_id
                && t.expires_on > not_before
                && scopes
                    .iter()
                    .all(|s| t.target.contains(&s.to_ascii_lowercase()))
        })
    }

    pub(crate) fn find_refresh_token(&self, account: &Account) -> Option<&RefreshTokenEntry> {
        self.data
            .refresh_tokens
            .iter()
            .find(|t| t.home_account_id == account.home_account_id)
    }
}
