//! HMAC-SHA256 webhook signatures.

use crate::integration::domain::SecretValue;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the base64 encoded signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Outcome of checking a webhook signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVerdict {
    /// The body was signed with the channel secret.
    Valid,
    /// The header is missing, malformed or does not match.
    Invalid,
}

/// Verifies `header` as the base64 HMAC-SHA256 of `body` under `secret`.
///
/// The digest comparison is constant time.
///
/// # Examples
///
/// ```
/// use tasklink::integration::domain::SecretValue;
/// use tasklink::webhook::{SignatureVerdict, sign, verify_signature};
///
/// let secret = SecretValue::new("channel-secret");
/// let body = br#"{"events":[]}"#;
/// let header = sign(&secret, body);
/// assert_eq!(verify_signature(&secret, body, Some(&header)), SignatureVerdict::Valid);
/// assert_eq!(verify_signature(&secret, b"{}", Some(&header)), SignatureVerdict::Invalid);
/// ```
#[must_use]
pub fn verify_signature(secret: &SecretValue, body: &[u8], header: Option<&str>) -> SignatureVerdict {
    let Some(encoded) = header.map(str::trim).filter(|value| !value.is_empty()) else {
        return SignatureVerdict::Invalid;
    };
    let Ok(expected) = STANDARD.decode(encoded) else {
        return SignatureVerdict::Invalid;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return SignatureVerdict::Invalid;
    };
    mac.update(body);
    if mac.verify_slice(&expected).is_ok() {
        SignatureVerdict::Valid
    } else {
        SignatureVerdict::Invalid
    }
}

/// Signs `body` the way the platform does.
#[must_use]
pub fn sign(secret: &SecretValue, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}
