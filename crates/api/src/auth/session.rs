//! Signed session cookie.
//!
//! The cookie value is `<payload>.<signature>` where `payload` is the
//! base64url (unpadded) JSON of [`SessionData`] and `signature` the
//! base64url HMAC-SHA256 of the payload under the server's session secret.
//! A value that fails to parse or verify is treated as no session at all.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use oxadmin_core::types::DbId;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

pub const SESSION_COOKIE: &str = "session";

type HmacSha256 = Hmac<Sha256>;

/// What the browser carries between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub user_id: Option<DbId>,
    #[serde(default)]
    pub language: Option<String>,
}

fn mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length")
}

/// Serialize and sign a session.
pub fn encode(session: &SessionData, secret: &str) -> String {
    let json = serde_json::to_vec(session).unwrap_or_else(|_| b"{}".to_vec());
    let payload = URL_SAFE_NO_PAD.encode(json);
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{payload}.{signature}")
}

/// Verify and deserialize a cookie value.
pub fn decode(value: &str, secret: &str) -> Option<SessionData> {
    let (payload, signature) = value.split_once('.')?;
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mut mac = mac(secret);
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).ok()?;
    let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&json).ok()
}

/// Raw value of the session cookie, looking through every `Cookie` header.
pub fn read_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
}

/// The verified session from request headers, if any.
pub fn from_headers(headers: &HeaderMap, secret: &str) -> Option<SessionData> {
    read_cookie(headers).and_then(|value| decode(value, secret))
}

/// `Set-Cookie` value storing `session`.
pub fn set_cookie(session: &SessionData, secret: &str, secure: bool) -> String {
    cookie_header(&encode(session, secret), secure, false)
}

/// `Set-Cookie` value expiring the session immediately.
pub fn clear_cookie(secure: bool) -> String {
    cookie_header("", secure, true)
}

fn cookie_header(value: &str, secure: bool, expire: bool) -> String {
    let mut attrs = vec![
        format!("{SESSION_COOKIE}={value}"),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        "Path=/".to_string(),
    ];
    if secure {
        attrs.push("Secure".to_string());
    }
    if expire {
        attrs.push("Max-Age=0".to_string());
    }
    attrs.join("; ")
}
