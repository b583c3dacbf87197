use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use time::{Duration as TimeDuration, OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use crate::auth::claims::Claims;
use crate::auth::repo_types::now_utc_seconds;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Signing and verification material for access tokens, plus the shared
/// TTL applied to both access tokens and refresh-token expiry rows.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig { secret, ttl_hours } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_hours as u64) * 3600),
        }
    }
}

impl JwtKeys {
    pub fn sign_access(&self, username: &str, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            username: username.to_string(),
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(username = %username, "access token signed");
        Ok(token)
    }

    /// Stateless check: signature and expiry only. Issued access tokens
    /// are not revocable before their natural expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_required_spec_claims(&["exp"]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(username = %data.claims.username, "access token verified");
        Ok(data.claims)
    }

    /// Expiry persisted next to a freshly minted refresh token, truncated
    /// to whole seconds to match the store's datetime resolution.
    pub fn refresh_expiry(&self) -> PrimitiveDateTime {
        now_utc_seconds() + TimeDuration::seconds(self.ttl.as_secs() as i64)
    }
}

/// Opaque refresh token: 64 random bytes, hex-encoded. Carries no claims;
/// validity lives entirely in the user row.
pub fn mint_refresh_token() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let token = keys.sign_access("abcdefgh", "a@b.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.username, "abcdefgh");
        assert_eq!(claims.email, "a@b.com");
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[tokio::test]
    async fn verify_rejects_expired_token() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            username: "abcdefgh".into(),
            email: "a@b.com".into(),
            iat: (now - TimeDuration::hours(3)).unix_timestamp() as usize,
            exp: (now - TimeDuration::hours(2)).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign_access("abcdefgh", "a@b.com").expect("sign");
        let mut tampered = token.clone();
        tampered.pop();
        assert!(keys.verify(&tampered).is_err());
        assert!(keys.verify("definitely-not-a-jwt").is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            ttl: keys.ttl,
        };
        let token = keys.sign_access("abcdefgh", "a@b.com").expect("sign");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn refresh_tokens_are_long_and_never_repeat() {
        let a = mint_refresh_token();
        let b = mint_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 128);
        assert_eq!(hex::decode(&a).expect("hex").len(), 64);
    }

    #[tokio::test]
    async fn refresh_expiry_is_ttl_ahead_at_second_granularity() {
        let keys = make_keys();
        let expected = now_utc_seconds() + TimeDuration::hours(12);
        let expiry = keys.refresh_expiry();
        let delta = (expiry - expected).whole_seconds().abs();
        assert!(delta <= 1, "expiry drifted by {delta}s");
        assert_eq!(expiry.nanosecond(), 0);
    }
}
