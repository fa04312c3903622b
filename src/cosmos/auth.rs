//! Request signing for the Cosmos DB REST APIs.
//!
//! Both APIs sign with HMAC-SHA256 keyed by the decoded account key:
//! - Documents API: master-key token over verb, resource type, resource link and date
//! - Table API: SharedKeyLite over date and canonicalized resource

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{Result, TableError};

type HmacSha256 = Hmac<Sha256>;

/// `x-ms-date` value, e.g. `Thu, 27 Apr 2017 00:51:12 GMT`.
pub fn rfc1123_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn sign(key: &[u8], payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| TableError::Config(format!("unusable account key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// URL-encoded `authorization` header value for the Documents API.
pub fn master_key_token(
    key: &[u8],
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );
    let signature = sign(key, &payload)?;
    let token = format!("type=master&ver=1.0&sig={}", signature);
    Ok(url::form_urlencoded::byte_serialize(token.as_bytes()).collect())
}

/// `Authorization` header value for the Table API.
///
/// `url_path` is the request path as sent, starting with `/`.
pub fn shared_key_lite(key: &[u8], account: &str, url_path: &str, date: &str) -> Result<String> {
    let payload = format!("{}\n/{}{}", date, account, url_path);
    let signature = sign(key, &payload)?;
    Ok(format!("SharedKeyLite {}:{}", account, signature))
}
