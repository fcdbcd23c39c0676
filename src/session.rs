//! Session lifecycle.
//!
//! A [`Session`] owns the credential cache for one process run: it loads the
//! cache when opened, decides whether a cached token can be reused, drives
//! the two-step device sign in, and writes the cache back when closed.
//! Nothing outside this module sees a raw token except the request
//! dispatcher.

use crate::cache::{Account, CredentialCache};
use crate::config::ClientConfig;
use crate::error::{AuthError, StoreError};
use crate::flow::{AuthorizationFlow, FlowStateFile, FlowStatus};
use crate::identity::{DeviceFlow, IdentityProvider, MicrosoftIdentity};
use crate::token_store::{FileTokenStore, TokenStore};
use tracing::{debug, info, warn};

pub struct Session {
    config: ClientConfig,
    provider: Box<dyn IdentityProvider>,
    store: Box<dyn TokenStore>,
    flow: AuthorizationFlow,
    cache: CredentialCache,
    access_token: Option<String>,
    account: Option<Account>,
    closed: bool,
}

impl Session {
    /// Load the credential cache. An unreadable or corrupt cache is logged
    /// and treated as empty, which just means "signed out".
    pub fn open(
        config: ClientConfig,
        provider: Box<dyn IdentityProvider>,
        store: Box<dyn TokenStore>,
    ) -> Self {
        let cache = match store.load() {
            Ok(Some(blob)) => CredentialCache::deserialize(&blob).unwrap_or_else(|e| {
                warn!(error = %e, "token cache is corrupt, starting signed out");
                CredentialCache::new()
            }),
            Ok(None) => {
                debug!("no token cache yet");
                CredentialCache::new()
            }
            Err(e) => {
                warn!(error = %e, "token cache unreadable, starting signed out");
                CredentialCache::new()
            }
        };
        let flow = AuthorizationFlow::new(FlowStateFile::new(config.flow_file.clone()));

        Session {
            config,
            provider,
            store,
            flow,
            cache,
            access_token: None,
            account: None,
            closed: false,
        }
    }

    /// Session backed by the cache file and the Microsoft identity platform.
    pub fn open_default(config: ClientConfig) -> Result<Self, AuthError> {
        let provider = MicrosoftIdentity::new(&config)?;
        let store = FileTokenStore::new(config.cache_file.clone());
        Ok(Self::open(config, Box::new(provider), Box::new(store)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Try to pick up a token without user interaction. `false` is the
    /// normal "please log in" answer, not an error.
    pub fn authenticate(&mut self, force_refresh: bool) -> bool {
        if force_refresh {
            debug!("silent sign in skipped on request");
            return false;
        }
        if self.cache.is_empty() {
            debug!("token cache empty");
            return false;
        }
        let Some(account) = self.cache.accounts().first().cloned() else {
            debug!("no cached account");
            return false;
        };

        match self
            .provider
            .acquire_token_silent(&self.config.scopes, &account, &mut self.cache)
        {
            Ok(Some(result)) => {
                debug!(account = %result.account.home_account_id, "signed in from cache");
                self.access_token = Some(result.access_token);
                self.account = Some(result.account);
                true
            }
            Ok(None) => {
                debug!(account = %account.home_account_id, "cached sign in no longer usable");
                false
            }
            Err(e) => {
                warn!(error = %e, "silent sign in failed");
                false
            }
        }
    }

    /// Never performs I/O.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub(crate) fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Step one of sign in: get a user code and park the flow on disk.
    /// Replaces any flow that is still pending.
    pub fn initiate_flow(&mut self) -> Result<DeviceFlow, AuthError> {
        if let Ok(FlowStatus::Pending(_)) = self.flow.status() {
            info!("replacing pending device flow");
        }
        self.flow
            .initiate(self.provider.as_ref(), &self.config.scopes)
    }

    /// Step two of sign in: wait for the user, then persist the cache
    /// immediately and drop the parked flow.
    pub fn complete_flow(&mut self) -> Result<Account, AuthError> {
        let result =
            self.flow
                .complete(self.provider.as_ref(), &self.config.scopes, &mut self.cache)?;
        self.access_token = Some(result.access_token);
        self.account = Some(result.account.clone());

        // The device code is single use, so the parked flow goes even if
        // the save fails.
        let saved = self.save_cache();
        let finished = self.flow.finish();
        saved?;
        finished?;
        Ok(result.account)
    }

    /// Forget the token, empty the cache and delete the cache file.
    /// Returns whether a cache file was removed.
    pub fn logout(&mut self) -> Result<bool, StoreError> {
        self.access_token = None;
        self.account = None;
        self.cache = CredentialCache::new();
        let removed = self.store.clear()?;
        info!(removed, "signed out");
        Ok(removed)
    }

    /// Write the cache if it changed since it was loaded or last saved.
    pub fn persist(&mut self) -> Result<bool, StoreError> {
        if !self.cache.has_state_changed() {
            debug!("token cache unchanged");
            return Ok(false);
        }
        self.save_cache()?;
        Ok(true)
    }

    /// End of the session. Write failures are surfaced because a lost
    /// token means signing in again.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.persist().map(|_| ())
    }

    fn save_cache(&mut self) -> Result<(), StoreError> {
        let blob = self.cache.serialize()?;
        self.store.save(&blob)?;
        self.cache.mark_saved();
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.persist() {
            warn!(error = %e, "token cache not saved");
        }
    }
}
