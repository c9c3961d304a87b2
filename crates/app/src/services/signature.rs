//! HMAC-SHA256 signature verification for Shopify requests.
//!
//! Shopify signs two kinds of inbound traffic with a shared secret:
//!
//! - OAuth callbacks: hex HMAC over the callback query string (minus the
//!   `hmac` and `signature` parameters), carried in the `hmac` parameter.
//! - Webhooks: base64 HMAC over the raw request body, carried in the
//!   `X-Shopify-Hmac-Sha256` header.
//!
//! Both go through [`verify`], which decodes the presented digest and compares
//! it with [`Mac::verify_slice`]. That comparison is constant-time, so a
//! forged digest cannot be recovered byte by byte through response timing.
//!
//! Webhook bodies must be verified exactly as received. Parsing and
//! re-serializing JSON is not byte-stable (key order, whitespace, number
//! formatting), so the raw bytes are the only valid input.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Query parameters that carry signatures and are excluded from the message.
const SIGNATURE_PARAMS: &[&str] = &["hmac", "signature"];

/// Text encoding of a presented digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestEncoding {
    /// Lowercase hex (OAuth callbacks).
    Hex,
    /// Standard base64 with padding (webhooks).
    Base64,
}

/// Parameter order used when rebuilding the signed callback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Keep parameters in the order they appeared in the request.
    #[default]
    Received,
    /// Sort parameters by key, as Shopify's published signing scheme does.
    Sorted,
}

impl FromStr for QueryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "received" => Ok(Self::Received),
            "sorted" => Ok(Self::Sorted),
            other => Err(format!("expected 'received' or 'sorted', got '{other}'")),
        }
    }
}

impl fmt::Display for QueryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Sorted => write!(f, "sorted"),
        }
    }
}

/// Compute the HMAC-SHA256 of `message` under `secret`, encoded as requested.
#[must_use]
pub fn compute_digest(secret: &[u8], message: &[u8], encoding: DigestEncoding) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        // HMAC accepts keys of any length
        return String::new();
    };
    mac.update(message);
    let digest = mac.finalize().into_bytes();

    match encoding {
        DigestEncoding::Hex => hex::encode(digest),
        DigestEncoding::Base64 => BASE64.encode(digest),
    }
}

/// Check that `presented` is the HMAC-SHA256 of `message` under `secret`.
///
/// Returns `false` for digests that do not decode in the given encoding.
/// The byte comparison itself never short-circuits.
#[must_use]
pub fn verify(secret: &[u8], message: &[u8], presented: &str, encoding: DigestEncoding) -> bool {
    let decoded = match encoding {
        DigestEncoding::Hex => hex::decode(presented.trim()).ok(),
        DigestEncoding::Base64 => BASE64.decode(presented.trim()).ok(),
    };
    let Some(presented_bytes) = decoded else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&presented_bytes).is_ok()
}

/// Compare two strings without short-circuiting on the first differing byte.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Rebuild the signed message from OAuth callback query parameters.
///
/// `hmac` and `signature` are dropped, the rest are percent-encoded (keeping
/// `!'()*` as-is) and joined
/// as `key=value` pairs with `&`, in the requested order.
#[must_use]
pub fn canonical_query(params: &[(String, String)], order: QueryOrder) -> String {
    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(key, _)| !SIGNATURE_PARAMS.contains(&key.as_str()))
        .collect();

    if order == QueryOrder::Sorted {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
    }

    pairs
        .iter()
        .map(|(key, value)| {
            format!("{}={}", escape_component(key), escape_component(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode a query component, leaving `!'()*` literal as Shopify's
/// signer does.
fn escape_component(raw: &str) -> String {
    let encoded = urlencoding::encode(raw);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }
    encoded
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Verify an OAuth callback's `hmac` parameter.
#[must_use]
pub fn verify_callback_query(
    secret: &[u8],
    params: &[(String, String)],
    presented_hex: &str,
    order: QueryOrder,
) -> bool {
    let message = canonical_query(params, order);
    verify(secret, message.as_bytes(), presented_hex, DigestEncoding::Hex)
}

/// Verify a webhook's `X-Shopify-Hmac-Sha256` header against the raw body.
#[must_use]
pub fn verify_webhook_body(secret: &[u8], raw_body: &[u8], presented_base64: &str) -> bool {
    verify(secret, raw_body, presented_base64, DigestEncoding::Base64)
}
