//! Access-token claim decoding.
//!
//! The access token is a JWT whose payload carries the subject email, an
//! optional display name, the authorization role, and the standard
//! `exp`/`iat` timestamps. The client never verifies the signature (that is
//! the server's job on every request); it only reads claims to derive the
//! session view and to answer "is this token expired?".
//!
//! Every decode path is fail-closed: a token that cannot be decoded is
//! treated as expired and yields no profile.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use sweet_shop_core::{Email, Role, UserProfile};

/// Claims carried in a Sweet Shop access token.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject: the user's email address.
    pub sub: String,
    /// Display name, when the server embeds one.
    #[serde(default)]
    pub name: Option<String>,
    /// Authorization role.
    #[serde(default)]
    pub role: Role,
    /// Expiry as a Unix timestamp (seconds).
    pub exp: i64,
    /// Issued-at as a Unix timestamp (seconds).
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Claims {
    /// Build the denormalized profile view from the claims.
    ///
    /// Returns `None` when the subject is not a usable email address.
    #[must_use]
    pub fn to_profile(&self) -> Option<UserProfile> {
        let email = Email::parse(&self.sub).ok()?;
        Some(UserProfile {
            email,
            name: self.name.clone(),
            role: self.role,
        })
    }
}

/// Decode the claims from a JWT without verifying its signature.
///
/// Returns `None` for anything that is not three dot-separated segments with
/// a base64url JSON payload in the middle.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    // A JWT has exactly header.payload.signature
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether the token's `exp` claim is at or before `now` (Unix seconds).
///
/// Fail-closed: an undecodable token counts as expired.
#[must_use]
pub fn is_expired_at(token: &str, now: i64) -> bool {
    decode_claims(token).is_none_or(|claims| claims.exp <= now)
}

/// Whether the token is expired as of the current wall clock.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, chrono::Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.sig")
    }

    #[test]
    fn decodes_full_claim_set() {
        let token = make_token(&serde_json::json!({
            "sub": "admin@shop.test",
            "name": "Admin",
            "role": "ADMIN",
            "exp": 2_000_000_000_i64,
            "iat": 1_000_000_000_i64,
        }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "admin@shop.test");
        assert_eq!(claims.role, Role::Admin);

        let profile = claims.to_profile().unwrap();
        assert!(profile.role.is_admin());
        assert_eq!(profile.name.as_deref(), Some("Admin"));
    }

    #[test]
    fn past_exp_is_expired_future_is_not() {
        let past = make_token(&serde_json::json!({"sub": "a@b.c", "exp": 100}));
        let future = make_token(&serde_json::json!({"sub": "a@b.c", "exp": 10_000}));
        assert!(is_expired_at(&past, 5_000));
        assert!(!is_expired_at(&future, 5_000));
    }

    #[test]
    fn garbage_tokens_fail_closed() {
        assert!(is_expired_at("not-a-jwt", 0));
        assert!(is_expired_at("a.b", 0));
        assert!(is_expired_at("a.b.c.d", 0));
        assert!(is_expired_at("", 0));
        // Valid structure, non-JSON payload
        let bad = format!("h.{}.s", URL_SAFE_NO_PAD.encode(b"not json"));
        assert!(is_expired_at(&bad, 0));
        assert!(decode_claims(&bad).is_none());
    }

    #[test]
    fn exp_exactly_now_counts_as_expired() {
        let token = make_token(&serde_json::json!({"sub": "a@b.c", "exp": 500}));
        assert!(is_expired_at(&token, 500));
    }

    #[test]
    fn unparseable_subject_yields_no_profile() {
        let token = make_token(&serde_json::json!({"sub": "not-an-email", "exp": 100}));
        assert!(decode_claims(&token).unwrap().to_profile().is_none());
    }
}
