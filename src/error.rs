// Error taxonomy for the core. Command bodies wrap these in `anyhow`.

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single authenticated API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token in the session; nothing was sent.
    #[error("not authenticated, run `mstodo login get` and `mstodo login verify` first")]
    Unauthenticated,

    /// Connection refused, DNS failure, timeout.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a status >= 400.
    #[error("{}", http_message(*status, body.as_ref()))]
    Http { status: u16, body: Option<Value> },

    /// A success status with a body that is not JSON.
    #[error("unreadable response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn http_message(status: u16, body: Option<&Value>) -> String {
    match body.and_then(error_code) {
        Some(code) => format!("HTTP {status}: {code}"),
        None => format!("HTTP {status}"),
    }
}

// Graph errors come as `{"error":{"code":..,"message":..}}`; some endpoints
// send a bare `{"error":"Code"}`.
fn error_code(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(code) => Some(code.clone()),
        Value::Object(obj) => {
            let code = obj.get("code").and_then(Value::as_str)?;
            match obj.get("message").and_then(Value::as_str) {
                Some(message) if !message.is_empty() => Some(format!("{code} ({message})")),
                _ => Some(code.to_string()),
            }
        }
        _ => None,
    }
}

/// Failures of the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize credential cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while signing in through the device flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider rejected the request.
    #[error("{error}: {description}")]
    Provider { error: String, description: String },

    #[error("no pending login found, run `mstodo login get` first")]
    NoPendingFlow,

    #[error("the verification code has expired, run `mstodo login get` again")]
    FlowExpired,

    #[error("sign in was declined")]
    AccessDenied,

    #[error("identity provider unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response from identity provider: {0}")]
    Decode(String),

    #[error("cannot use login state file {}: {reason}", path.display())]
    FlowState { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Terminal failures end the pending flow; transient ones leave it in
    /// place so `login verify` can be re-run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthError::Provider { .. } | AuthError::FlowExpired | AuthError::AccessDenied
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn http_error_shows_bare_code() {
        let err = ApiError::Http {
            status: 404,
            body: Some(json!({"error": "ItemNotFound"})),
        };
        assert_eq!(err.to_string(), "HTTP 404: ItemNotFound");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn http_error_shows_graph_code_and_message() {
        let err = ApiError::Http {
            status: 400,
            body: Some(json!({"error": {"code": "invalidRequest", "message": "Bad title"}})),
        };
        assert_eq!(err.to_string(), "HTTP 400: invalidRequest (Bad title)");
    }

    #[test]
    fn http_error_without_body() {
        let err = ApiError::Http {
            status: 503,
            body: None,
        };
        assert_eq!(err.to_string(), "HTTP 503");
    }

    #[test]
    fn only_provider_outcomes_are_terminal() {
        assert!(AuthError::FlowExpired.is_terminal());
        assert!(AuthError::AccessDenied.is_terminal());
        assert!(AuthError::Provider {
            error: "invalid_grant".into(),
            description: "bad code".into()
        }
        .is_terminal());
        assert!(!AuthError::NoPendingFlow.is_terminal());
        assert!(!AuthError::Decode("truncated".into()).is_terminal());
    }
}
