use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use jiff::{SignedDuration, Timestamp};

/// A guest bearer token and the expiry decoded from its `exp` claim.
///
/// Tokens are replaced wholesale on refresh, never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: Option<Timestamp>,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let expires_at = decode_expiry(&value);
        Self { value, expires_at }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// `None` when the payload segment or its `exp` claim cannot be read.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// True only when the expiry is known and lies more than `margin` after
    /// `now`. A token without a readable expiry is never trusted.
    pub fn is_valid_for(&self, now: Timestamp, margin: SignedDuration) -> bool {
        match self.expires_at {
            Some(exp) => exp.duration_since(now) > margin,
            None => false,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Reads the `exp` claim (Unix seconds) out of the second dot-separated
/// segment of a JWT.
pub fn decode_expiry(token: &str) -> Option<Timestamp> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64url_decode(payload)?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Timestamp::from_second(exp).ok()
}

/// base64url without padding, padded back to a multiple of 4.
fn base64url_decode(segment: &str) -> Option<Vec<u8>> {
    let remainder = segment.len() % 4;
    if remainder == 1 {
        return None;
    }
    let mut padded = segment.to_owned();
    if remainder != 0 {
        padded.push_str(&"=".repeat(4 - remainder));
    }
    URL_SAFE.decode(padded).ok()
}
