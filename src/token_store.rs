// Durable storage for the serialized credential cache.

use crate::error::StoreError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistence for one serialized credential cache blob.
///
/// `load` returning `Ok(None)` means "nothing stored yet". `save` replaces
/// whatever was stored before.
pub trait TokenStore {
    fn load(&self) -> Result<Option<String>, StoreError>;
    fn save(&self, blob: &str) -> Result<(), StoreError>;
    /// Remove the stored blob. Returns whether anything was removed.
    fn clear(&self) -> Result<bool, StoreError>;
}

/// Token cache kept in a single file, by default `~/.mstodo_token_cache.json`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn save(&self, blob: &str) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        // Write beside the target and rename over it so a crash never
        // leaves a half-written cache.
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(blob.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        debug!(path = %self.path.display(), bytes = blob.len(), "token cache written");
        Ok(())
    }

    fn clear(&self) -> Result<bool, StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
