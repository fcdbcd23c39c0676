// Test doubles for the identity provider and the token store.

use crate::cache::{AccessTokenEntry, Account, CredentialCache};
use crate::error::{AuthError, StoreError};
use crate::identity::{AuthResult, DeviceFlow, IdentityProvider};
use crate::token_store::TokenStore;
use std::cell::{Cell, RefCell};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

pub(crate) const FAKE_TOKEN: &str = "fake-access-token";

pub(crate) fn fake_account() -> Account {
    Account {
        home_account_id: "fake-uid.fake-tenant".into(),
        username: Some("ada@example.com".into()),
        realm: Some("fake-tenant".into()),
    }
}

pub(crate) fn sample_flow() -> DeviceFlow {
    DeviceFlow {
        user_code: "ABCD-1234".into(),
        device_code: "device-code".into(),
        verification_uri: "https://microsoft.com/devicelogin".into(),
        expires_in: 900,
        interval: 5,
        message: None,
        expires_at: Some(4_102_444_800),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProviderCalls {
    pub device_code: usize,
    pub device_token: usize,
    pub silent: usize,
}

/// Identity provider that never touches the network. Completing a flow
/// signs in [`fake_account`]; silent acquisition returns whatever that
/// account has in the cache. Clones share their call counters.
#[derive(Default, Clone)]
pub(crate) struct FakeProvider {
    refusal: Option<(String, String)>,
    completion_error: Rc<RefCell<Option<AuthError>>>,
    calls: Rc<Cell<ProviderCalls>>,
}

impl FakeProvider {
    pub fn refusing_device_codes(error: &str, description: &str) -> Self {
        FakeProvider {
            refusal: Some((error.into(), description.into())),
            ..Default::default()
        }
    }

    pub fn completing_with(outcome: Result<(), AuthError>) -> Self {
        FakeProvider {
            completion_error: Rc::new(RefCell::new(outcome.err())),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> ProviderCalls {
        self.calls.get()
    }

    fn record(&self, f: impl FnOnce(&mut ProviderCalls)) {
        let mut calls = self.calls.get();
        f(&mut calls);
        self.calls.set(calls);
    }
}

impl IdentityProvider for FakeProvider {
    fn initiate_device_flow(&self, _scopes: &[String]) -> Result<DeviceFlow, AuthError> {
        self.record(|c| c.device_code += 1);
        match &self.refusal {
            Some((error, description)) => Err(AuthError::Provider {
                error: error.clone(),
                description: description.clone(),
            }),
            None => Ok(sample_flow()),
        }
    }

    fn acquire_token_by_device_flow(
        &self,
        _flow: &DeviceFlow,
        scopes: &[String],
        cache: &mut CredentialCache,
    ) -> Result<AuthResult, AuthError> {
        self.record(|c| c.device_token += 1);
        if let Some(err) = self.completion_error.borrow_mut().take() {
            return Err(err);
        }
        let account = fake_account();
        let expires_on = chrono::Utc::now().timestamp() + 3600;
        cache.upsert_account(account.clone());
        cache.store_access_token(AccessTokenEntry {
            home_account_id: account.home_account_id.clone(),
            secret: FAKE_TOKEN.into(),
            target: scopes.iter().map(|s| s.to_ascii_lowercase()).collect(),
            expires_on,
        });
        Ok(AuthResult {
            access_token: FAKE_TOKEN.into(),
            account,
            expires_on,
        })
    }

    fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut CredentialCache,
    ) -> Result<Option<AuthResult>, AuthError> {
        self.record(|c| c.silent += 1);
        let now = chrono::Utc::now().timestamp();
        Ok(cache
            .find_access_token(account, scopes, now)
            .map(|entry| AuthResult {
                access_token: entry.secret.clone(),
                account: account.clone(),
                expires_on: entry.expires_on,
            }))
    }
}

#[derive(Debug, Default)]
struct SpyState {
    blob: Option<String>,
    saves: usize,
    clears: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory store that counts writes. Clones share state, so a test keeps
/// one handle and gives the other to the session.
#[derive(Debug, Default, Clone)]
pub(crate) struct SpyStore {
    state: Rc<RefCell<SpyState>>,
}

impl SpyStore {
    pub fn with_blob(blob: impl Into<String>) -> Self {
        let store = SpyStore::default();
        store.state.borrow_mut().blob = Some(blob.into());
        store
    }

    pub fn failing_reads() -> Self {
        let store = SpyStore::with_blob("{}");
        store.state.borrow_mut().fail_reads = true;
        store
    }

    pub fn failing_writes() -> Self {
        let store = SpyStore::default();
        store.state.borrow_mut().fail_writes = true;
        store
    }

    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }

    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }

    pub fn blob(&self) -> Option<String> {
        self.state.borrow().blob.clone()
    }
}

fn spy_error(what: &str) -> StoreError {
    StoreError::Io {
        path: PathBuf::from("spy"),
        source: io::Error::new(io::ErrorKind::PermissionDenied, what.to_string()),
    }
}

impl TokenStore for SpyStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(spy_error("read refused"));
        }
        Ok(state.blob.clone())
    }

    fn save(&self, blob: &str) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(spy_error("write refused"));
        }
        state.saves += 1;
        state.blob = Some(blob.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<bool, StoreError> {
        let mut state = self.state.borrow_mut();
        state.clears += 1;
        Ok(state.blob.take().is_some())
    }
}
