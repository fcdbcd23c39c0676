// Client configuration: who we are to the identity provider, where the
// API lives and where the two per-user files are kept.

use std::path::{Path, PathBuf};

/// Built-in public client registered for device-code sign in.
pub const DEFAULT_CLIENT_ID: &str = "82faeadf-5106-4aa0-bb0d-2c94b300e92a";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_SCOPES: &[&str] = &["Tasks.Read", "Tasks.ReadWrite"];

const TOKEN_CACHE_FILE: &str = ".mstodo_token_cache.json";
const FLOW_STATE_FILE: &str = ".mstodo_device_flow.json";

/// Identity and endpoints used by every part of the core. Built once in
/// `main` and handed to the session and the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub client_id: String,
    pub tenant: String,
    pub authority_host: String,
    pub graph_endpoint: String,
    pub scopes: Vec<String>,
    pub cache_file: PathBuf,
    pub flow_file: PathBuf,
}

impl ClientConfig {
    /// Defaults with both per-user files placed under `home`.
    pub fn with_home(home: &Path) -> Self {
        ClientConfig {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            graph_endpoint: DEFAULT_GRAPH_ENDPOINT.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            cache_file: home.join(TOKEN_CACHE_FILE),
            flow_file: home.join(FLOW_STATE_FILE),
        }
    }

    /// Defaults rooted at `MSTODO_HOME`, or the user's home directory.
    pub fn from_env() -> Self {
        let home = std::env::var_os("MSTODO_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(default_home);
        Self::with_home(&home)
    }

    /// `https://login.microsoftonline.com/<tenant>`
    pub fn authority(&self) -> String {
        format!(
            "{}/{}",
            self.authority_host.trim_end_matches('/'),
            self.tenant
        )
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    pub fn with_graph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graph_endpoint = endpoint.into();
        self
    }

    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = path.into();
        self
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn files_live_under_home() {
        let config = ClientConfig::with_home(Path::new("/home/ada"));
        assert_eq!(
            config.cache_file,
            PathBuf::from("/home/ada/.mstodo_token_cache.json")
        );
        assert_eq!(
            config.flow_file,
            PathBuf::from("/home/ada/.mstodo_device_flow.json")
        );
        assert_ne!(config.cache_file, config.flow_file);
    }

    #[test]
    fn authority_joins_host_and_tenant() {
        let config = ClientConfig::with_home(Path::new("/tmp"))
            .with_authority_host("http://127.0.0.1:9000/")
            .with_tenant("consumers");
        assert_eq!(config.authority(), "http://127.0.0.1:9000/consumers");
    }

    #[test]
    fn default_scopes_cover_read_and_write() {
        let config = ClientConfig::with_home(Path::new("/tmp"));
        assert_eq!(config.scopes, vec!["Tasks.Read", "Tasks.ReadWrite"]);
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
    }
}
