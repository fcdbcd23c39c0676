//! Identity provider integration.
//!
//! Implements the OAuth 2.0 Device Authorization Grant (RFC 8628) against the
//! Microsoft identity platform, plus silent reuse of cached tokens:
//!
//! 1. `POST {authority}/oauth2/v2.0/devicecode` for a user code
//! 2. the user enters the code at the verification URI
//! 3. `POST {authority}/oauth2/v2.0/token` until the user finishes
//! 4. tokens land in the [`CredentialCache`]; later runs reuse them or
//!    redeem the refresh token without user interaction

use crate::cache::{AccessTokenEntry, Account, CredentialCache, RefreshTokenEntry};
use crate::config::ClientConfig;
use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("mstodo/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
/// Scopes the platform always needs to hand out an account and a refresh token.
const RESERVED_SCOPES: &[&str] = &["openid", "profile", "offline_access"];
/// Cached access tokens this close to expiry are not reused.
const EXPIRY_BUFFER_SECS: i64 = 5 * 60;
const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Device flow record: what the user needs to act on, and what the process
/// needs to finish the flow later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlow {
    pub user_code: String,
    pub device_code: String,
    pub verification_uri: String,
    /// Lifetime in seconds of the codes, as issued.
    pub expires_in: u64,
    /// Minimum seconds between polls.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub message: Option<String>,
    /// Unix timestamp after which the codes are useless.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

fn default_interval() -> u64 {
    5
}

impl DeviceFlow {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A usable access token and the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub access_token: String,
    pub account: Account,
    pub expires_on: i64,
}

/// The identity provider as the session sees it. Implementations own every
/// mutation of the credential cache.
pub trait IdentityProvider {
    /// Ask for a user code. A response without one is an error carrying the
    /// provider's `error` and `error_description`.
    fn initiate_device_flow(&self, scopes: &[String]) -> Result<DeviceFlow, AuthError>;

    /// Block until the user finishes, declines, or the code expires. On
    /// success the tokens are in `cache`.
    fn acquire_token_by_device_flow(
        &self,
        flow: &DeviceFlow,
        scopes: &[String],
        cache: &mut CredentialCache,
    ) -> Result<AuthResult, AuthError>;

    /// Token for `account` from the cache, refreshing it if needed.
    /// `Ok(None)` means the user has to sign in again.
    fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut CredentialCache,
    ) -> Result<Option<AuthResult>, AuthError>;
}

/// Public client on the Microsoft identity platform.
pub struct MicrosoftIdentity {
    client: Client,
    client_id: String,
    authority: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    client_info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    oid: Option<String>,
    tid: Option<String>,
    preferred_username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    uid: String,
    utid: String,
}

enum TokenOutcome {
    Granted(TokenResponse),
    Rejected(OAuthError),
}

impl MicrosoftIdentity {
    pub fn new(config: &ClientConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(AuthError::Transport)?;
        Ok(MicrosoftIdentity {
            client,
            client_id: config.client_id.clone(),
            authority: config.authority(),
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/oauth2/v2.0/{name}", self.authority)
    }

    fn redeem(&self, form: &[(&str, &str)]) -> Result<TokenOutcome, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .form(form)
            .send()
            .map_err(AuthError::Transport)?;
        let status = response.status();
        let body = response.text().map_err(AuthError::Transport)?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map(TokenOutcome::Granted)
                .map_err(|e| AuthError::Decode(format!("token response: {e}")));
        }
        serde_json::from_str(&body)
            .map(TokenOutcome::Rejected)
            .map_err(|_| AuthError::Decode(format!("HTTP {status}: {body}")))
    }

    /// Write a token response into the cache under the account it names.
    /// `known` is used when the response carries no identity of its own.
    fn store_tokens(
        &self,
        response: TokenResponse,
        scopes: &[String],
        known: Option<&Account>,
        cache: &mut CredentialCache,
    ) -> AuthResult {
        let claims = response
            .id_token
            .as_deref()
            .and_then(decode_id_token)
            .unwrap_or_default();
        let home_account_id = response
            .client_info
            .as_deref()
            .and_then(decode_client_info)
            .map(|info| format!("{}.{}", info.uid, info.utid))
            .or_else(|| match (&claims.oid, &claims.tid) {
                (Some(oid), Some(tid)) => Some(format!("{oid}.{tid}")),
                _ => None,
            })
            .or_else(|| known.map(|a| a.home_account_id.clone()))
            .unwrap_or_else(|| "default".to_string());

        let account = Account {
            username: claims
                .preferred_username
                .or_else(|| known.and_then(|a| a.username.clone())),
            realm: claims.tid.or_else(|| known.and_then(|a| a.realm.clone())),
            home_account_id,
        };

        let target = match &response.scope {
            Some(granted) => granted
                .split_whitespace()
                .map(str::to_ascii_lowercase)
                .collect(),
            None => scopes.iter().map(|s| s.to_ascii_lowercase()).collect(),
        };
        let expires_on = now() + response.expires_in.unwrap_or(3600);

        cache.upsert_account(account.clone());
        cache.store_access_token(AccessTokenEntry {
            home_account_id: account.home_account_id.clone(),
            secret: response.access_token.clone(),
            target,
            expires_on,
        });
        if let Some(refresh_token) = response.refresh_token {
            cache.store_refresh_token(RefreshTokenEntry {
                home_account_id: account.home_account_id.clone(),
                secret: refresh_token,
            });
        }

        AuthResult {
            access_token: response.access_token,
            account,
            expires_on,
        }
    }
}

impl IdentityProvider for MicrosoftIdentity {
    fn initiate_device_flow(&self, scopes: &[String]) -> Result<DeviceFlow, AuthError> {
        let scope = request_scope(scopes);
        debug!(authority = %self.authority, scope = %scope, "requesting device code");

        let response = self
            .client
            .post(self.endpoint("devicecode"))
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .map_err(AuthError::Transport)?;
        let status = response.status();
        let body = response.text().map_err(AuthError::Transport)?;
        let value: Value = serde_json::from_str(&body)
            .map_err(|_| AuthError::Decode(format!("HTTP {status}: {body}")))?;

        if value.get("user_code").is_none() {
            let field = |name: &str, default: &str| {
                value
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or(default)
                    .to_string()
            };
            return Err(AuthError::Provider {
                error: field("error", "Unknown error"),
                description: field("error_description", "No details"),
            });
        }

        let mut flow: DeviceFlow = serde_json::from_value(value)
            .map_err(|e| AuthError::Decode(format!("device code response: {e}")))?;
        flow.expires_at = expiry_after(now(), flow.expires_in);
        info!(expires_in = flow.expires_in, "device code issued");
        Ok(flow)
    }

    fn acquire_token_by_device_flow(
        &self,
        flow: &DeviceFlow,
        scopes: &[String],
        cache: &mut CredentialCache,
    ) -> Result<AuthResult, AuthError> {
        let mut interval = flow.interval;
        loop {
            if flow.is_expired_at(now()) {
                return Err(AuthError::FlowExpired);
            }

            let outcome = self.redeem(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id.as_str()),
                ("device_code", flow.device_code.as_str()),
                ("client_info", "1"),
            ])?;
            match outcome {
                TokenOutcome::Granted(response) => {
                    let result = self.store_tokens(response, scopes, None, cache);
                    info!(account = %result.account.home_account_id, "device flow completed");
                    return Ok(result);
                }
                TokenOutcome::Rejected(err) => match err.error.as_str() {
                    "authorization_pending" => {}
                    "slow_down" => interval += SLOW_DOWN_STEP_SECS,
                    "access_denied" | "authorization_declined" => {
                        return Err(AuthError::AccessDenied)
                    }
                    "expired_token" | "code_expired" => return Err(AuthError::FlowExpired),
                    _ => {
                        return Err(AuthError::Provider {
                            error: err.error,
                            description: err.error_description.unwrap_or_default(),
                        })
                    }
                },
            }

            debug!(interval, "authorization pending");
            thread::sleep(Duration::from_secs(interval));
        }
    }

    fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &Account,
        cache: &mut CredentialCache,
    ) -> Result<Option<AuthResult>, AuthError> {
        if let Some(cached) = cache.find_access_token(account, scopes, now() + EXPIRY_BUFFER_SECS) {
            debug!(account = %account.home_account_id, "reusing cached access token");
            return Ok(Some(AuthResult {
                access_token: cached.secret.clone(),
                account: account.clone(),
                expires_on: cached.expires_on,
            }));
        }

        let Some(refresh_token) = cache.find_refresh_token(account).map(|t| t.secret.clone())
        else {
            debug!(account = %account.home_account_id, "no refresh token cached");
            return Ok(None);
        };

        let scope = request_scope(scopes);
        let outcome = self.redeem(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ])?;
        match outcome {
            TokenOutcome::Granted(response) => {
                debug!(account = %account.home_account_id, "access token refreshed");
                Ok(Some(self.store_tokens(response, scopes, Some(account), cache)))
            }
            TokenOutcome::Rejected(err) => {
                warn!(error = %err.error, "refresh token rejected");
                Ok(None)
            }
        }
    }
}

fn request_scope(scopes: &[String]) -> String {
    scopes
        .iter()
        .map(String::as_str)
        .chain(RESERVED_SCOPES.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

// The id token is only read for account display data; it is not verified.
fn decode_id_token(token: &str) -> Option<IdTokenClaims> {
    decode_segment(token.split('.').nth(1)?)
}

fn decode_client_info(info: &str) -> Option<ClientInfo> {
    decode_segment(info)
}

/// `None` when `expires_in` does not fit; such a flow never expires locally
/// and the provider's `expired_token` ends it instead.
fn expiry_after(now: i64, expires_in: u64) -> Option<i64> {
    i64::try_from(expires_in)
        .ok()
        .and_then(|secs| now.checked_add(secs))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
