// Shared fixtures: a mock server standing in for both the identity platform
// and the API, and a session signed in against it.

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use mockito::{Matcher, Mock, ServerGuard};
use mstodo::config::ClientConfig;
use mstodo::session::Session;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const ACCESS_TOKEN: &str = "at-graph-1";
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

pub fn config(server: &ServerGuard, home: &TempDir) -> ClientConfig {
    ClientConfig::with_home(home.path())
        .with_authority_host(server.url())
        .with_graph_endpoint(server.url())
}

fn encode(value: Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

/// Device code endpoint handing out `ABCD-1234`. Not yet created.
pub fn device_code_mock(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/common/oauth2/v2.0/devicecode")
        .match_body(Matcher::UrlEncoded(
            "scope".into(),
            "Tasks.Read Tasks.ReadWrite openid profile offline_access".into(),
        ))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "user_code": "ABCD-1234",
                "device_code": "device-code-1",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 5,
                "message": "To sign in, use a web browser..."
            })
            .to_string(),
        )
}

/// Token endpoint granting the device code right away. Not yet created.
pub fn token_mock(server: &mut ServerGuard) -> Mock {
    let claims = json!({
        "oid": "user-oid",
        "tid": "tenant-id",
        "preferred_username": "ada@example.com"
    });
    server
        .mock("POST", "/common/oauth2/v2.0/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), DEVICE_CODE_GRANT.into()),
            Matcher::UrlEncoded("device_code".into(), "device-code-1".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "token_type": "Bearer",
                "access_token": ACCESS_TOKEN,
                "expires_in": 3600,
                "scope": "Tasks.Read Tasks.ReadWrite openid profile",
                "refresh_token": "rt-1",
                "id_token": format!("header.{}.signature", encode(claims)),
                "client_info": encode(json!({"uid": "user-oid", "utid": "tenant-id"}))
            })
            .to_string(),
        )
}

/// Run both sign-in steps against `server` and return the signed-in session.
pub fn signed_in_session(server: &mut ServerGuard, home: &TempDir) -> Session {
    let _device = device_code_mock(server).create();
    let _token = token_mock(server).create();

    let mut session = Session::open_default(config(server, home)).unwrap();
    session.initiate_flow().unwrap();
    session.complete_flow().unwrap();
    assert!(session.is_authenticated());
    session
}
