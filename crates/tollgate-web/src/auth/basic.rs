//! HTTP Basic credentials: `Authorization: Basic base64(tenant-id:secret)`.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub struct BasicCredentials {
    pub tenant_id: String,
    pub secret: String,
}

/// Extracts Basic credentials from the request headers.
///
/// Returns `None` when the header is absent, uses another scheme, or does
/// not decode to UTF-8 `user:password`.
pub fn extract(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (tenant_id, secret) = decoded.split_once(':')?;
    Some(BasicCredentials {
        tenant_id: tenant_id.to_string(),
        secret: secret.to_string(),
    })
}
