// API client module: a small blocking dispatcher that sends one
// authenticated JSON call per invocation and maps the outcome onto
// `ApiError`. It never retries and never re-authenticates.

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::Session;
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("mstodo/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The verbs the API is called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl ApiMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Patch => "PATCH",
            ApiMethod::Delete => "DELETE",
        }
    }
}

impl From<ApiMethod> for reqwest::Method {
    fn from(method: ApiMethod) -> Self {
        match method {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
            ApiMethod::Patch => reqwest::Method::PATCH,
            ApiMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for ApiMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(ApiMethod::Get),
            "POST" => Ok(ApiMethod::Post),
            "PATCH" => Ok(ApiMethod::Patch),
            "DELETE" => Ok(ApiMethod::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

/// Sends authenticated calls to the API base on behalf of a [`Session`].
pub struct RequestDispatcher {
    client: Client,
    base_url: String,
    debug: bool,
}

impl RequestDispatcher {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = config.graph_endpoint.trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(RequestDispatcher {
            client,
            base_url,
            debug: false,
        })
    }

    /// Echo every request and response to stderr. Returned values are
    /// unaffected.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Perform one call against `path` (relative to the API base).
    ///
    /// A 204 yields an empty JSON object. A status >= 400 yields
    /// [`ApiError::Http`] with the body when it is JSON. Anything else is the
    /// parsed body.
    pub fn execute(
        &self,
        session: &Session,
        path: &str,
        method: ApiMethod,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let token = session.access_token().ok_or(ApiError::Unauthenticated)?;
        let url = format!("{}{}", self.base_url, path);

        if self.debug {
            trace_request(method, &url, body);
        }
        debug!(%method, %url, "dispatching request");

        let mut request = self.client.request(method.into(), &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let headers = self.debug.then(|| response.headers().clone());
        let text = response.text().map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        if let Some(headers) = &headers {
            trace_response(status, headers, &text);
        }
        debug!(status = status.as_u16(), %url, "response received");

        interpret(status, &text, &url)
    }
}

fn interpret(status: StatusCode, text: &str, url: &str) -> Result<Value, ApiError> {
    if status == StatusCode::NO_CONTENT {
        return Ok(Value::Object(Map::new()));
    }
    if status.as_u16() >= 400 {
        return Err(ApiError::Http {
            status: status.as_u16(),
            body: serde_json::from_str(text).ok(),
        });
    }
    serde_json::from_str(text).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

fn trace_request(method: ApiMethod, url: &str, body: Option<&Value>) {
    eprintln!("> {method} {url}");
    if let Some(body) = body {
        eprintln!("> {}", pretty(body));
    }
}

fn trace_response(status: StatusCode, headers: &HeaderMap, text: &str) {
    eprintln!("< {status}");
    for (name, value) in headers {
        eprintln!("< {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    if !text.is_empty() {
        match serde_json::from_str::<Value>(text) {
            Ok(json) => eprintln!("< {}", pretty(&json)),
            Err(_) => eprintln!("< {text}"),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
