// Two-step device sign in. `login get` and `login verify` run in separate
// processes, so the pending flow is handed over through its own file.
//
// NoFlow --initiate--> Pending --complete--> NoFlow
//                         |  terminal failure (denied, expired) -> NoFlow
//                         |  transient failure (network)        -> Pending

use crate::cache::CredentialCache;
use crate::error::AuthError;
use crate::identity::{AuthResult, DeviceFlow, IdentityProvider};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The JSON file holding the pending [`DeviceFlow`], by default
/// `~/.mstodo_device_flow.json`.
#[derive(Debug, Clone)]
pub struct FlowStateFile {
    path: PathBuf,
}

impl FlowStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FlowStateFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state_error(&self, reason: impl ToString) -> AuthError {
        AuthError::FlowState {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn load(&self) -> Result<Option<DeviceFlow>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.state_error(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| self.state_error(e))
    }

    /// Last writer wins if two `login get` runs race.
    pub fn save(&self, flow: &DeviceFlow) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.state_error(e))?;
            }
        }
        let json = serde_json::to_string_pretty(flow).map_err(|e| self.state_error(e))?;
        fs::write(&self.path, json).map_err(|e| self.state_error(e))
    }

    pub fn remove(&self) -> Result<bool, AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.state_error(e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStatus {
    NoFlow,
    Pending(DeviceFlow),
}

pub struct AuthorizationFlow {
    state: FlowStateFile,
}

impl AuthorizationFlow {
    pub fn new(state: FlowStateFile) -> Self {
        AuthorizationFlow { state }
    }

    pub fn state_file(&self) -> &FlowStateFile {
        &self.state
    }

    pub fn status(&self) -> Result<FlowStatus, AuthError> {
        Ok(match self.state.load()? {
            Some(flow) => FlowStatus::Pending(flow),
            None => FlowStatus::NoFlow,
        })
    }

    /// Request a user code and park the flow for a later `complete`.
    /// Nothing is written when the provider refuses.
    pub fn initiate(
        &self,
        provider: &dyn IdentityProvider,
        scopes: &[String],
    ) -> Result<DeviceFlow, AuthError> {
        let flow = provider.initiate_device_flow(scopes)?;
        self.state.save(&flow)?;
        info!(path = %self.state.path().display(), "device flow pending");
        Ok(flow)
    }

    /// Wait for the user to finish the pending flow. On success the tokens
    /// are in `cache` and the caller must persist it and then call
    /// [`AuthorizationFlow::finish`].
    pub fn complete(
        &self,
        provider: &dyn IdentityProvider,
        scopes: &[String],
        cache: &mut CredentialCache,
    ) -> Result<AuthResult, AuthError> {
        let FlowStatus::Pending(flow) = self.status()? else {
            return Err(AuthError::NoPendingFlow);
        };

        match provider.acquire_token_by_device_flow(&flow, scopes, cache) {
            Ok(result) => Ok(result),
            Err(err) if err.is_terminal() => {
                warn!(error = %err, "device flow ended");
                if let Err(remove_err) = self.finish() {
                    warn!(error = %remove_err, "could not remove login state file");
                }
                Err(err)
            }
            Err(err) => {
                debug!(error = %err, "device flow left pending");
                Err(err)
            }
        }
    }

    /// Drop the pending flow.
    pub fn finish(&self) -> Result<(), AuthError> {
        if self.state.remove()? {
            debug!(path = %self.state.path().display(), "login state file removed");
        }
        Ok(())
    }
}
