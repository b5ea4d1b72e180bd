//! Access-token payload inspection.
//!
//! Tokens are the provider's three-part signed JWTs. Signature verification
//! happens server side; the client only needs the payload claims to decide
//! whether a token is still worth sending. Anything that fails to parse is
//! treated as expired, so a corrupt token can never keep a request gated open.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use thiserror::Error;

/// Safety margin so a token about to expire is not used mid-flight.
pub const EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub exp: Option<i64>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
}

/// Decode the payload segment of a `header.payload.signature` token.
///
/// # Errors
///
/// Returns an error if the token does not have exactly three segments or the
/// payload is not base64url-encoded JSON.
pub fn decode(token: &str) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let _header = parts.next().ok_or(Error::TokenFormat)?;
    let payload = parts.next().ok_or(Error::TokenFormat)?;
    let _signature = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }

    // Provider tokens are unpadded; tolerate padded payloads from older keys.
    let bytes = Base64UrlUnpadded::decode_vec(payload)
        .or_else(|_| Base64UrlUnpadded::decode_vec(payload.trim_end_matches('=')))
        .map_err(|_| Error::Base64)?;

    Ok(serde_json::from_slice(&bytes)?)
}

impl Claims {
    /// A token is expired once `exp` is inside the skew window of `now`.
    /// Tokens without an `exp` claim never expire locally.
    #[must_use]
    pub fn is_expired(&self, now_unix_seconds: i64) -> bool {
        match self.exp {
            Some(exp) => exp < now_unix_seconds + EXPIRY_SKEW_SECS,
            None => false,
        }
    }
}

/// Expiry check used by the accessor: parse failure counts as expired.
#[must_use]
pub fn is_token_expired(token: &str, now_unix_seconds: i64) -> bool {
    match decode(token) {
        Ok(claims) => claims.is_expired(now_unix_seconds),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn mint_token(exp: i64) -> String {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = Base64UrlUnpadded::encode_string(
            json!({ "sub": "u1", "email": "user@x.com", "exp": exp })
                .to_string()
                .as_bytes(),
        );
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn decodes_subject_and_expiry() {
        let claims = decode(&mint_token(NOW + 3600)).expect("should decode");
        assert_eq!(claims.sub.as_deref(), Some("u1"));
        assert_eq!(claims.email.as_deref(), Some("user@x.com"));
        assert_eq!(claims.exp, Some(NOW + 3600));
    }

    #[test]
    fn expiry_is_checked_against_the_skew_window() {
        // Already expired and inside the 30s window are both expired.
        assert!(is_token_expired(&mint_token(NOW - 1), NOW));
        assert!(is_token_expired(&mint_token(NOW + 29), NOW));
        // Just past the window is valid.
        assert!(!is_token_expired(&mint_token(NOW + 31), NOW));
    }

    #[test]
    fn missing_exp_never_expires_locally() {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256"}"#);
        let payload = Base64UrlUnpadded::encode_string(br#"{"sub":"u1"}"#);
        let token = format!("{header}.{payload}.signature");
        assert!(!is_token_expired(&token, NOW));
    }

    #[test]
    fn unparseable_tokens_fail_closed() {
        assert!(is_token_expired("not-a-token", NOW));
        assert!(is_token_expired("a.b", NOW));
        assert!(is_token_expired("a.%%%.c", NOW));
        assert!(matches!(decode("a.b.c.d"), Err(Error::TokenFormat)));
    }

    #[test]
    fn padded_payloads_are_accepted() {
        let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256"}"#);
        let payload = base64ct::Base64Url::encode_string(
            json!({ "exp": NOW + 3600 }).to_string().as_bytes(),
        );
        let token = format!("{header}.{payload}.signature");
        assert!(!is_token_expired(&token, NOW));
    }
}
