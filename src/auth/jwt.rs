use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// Short-lived token carried on every authenticated request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// Long-lived token; holds only the user id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        }
    }
}

/// Signs and verifies both token kinds. Access and refresh tokens use
/// separate secrets, so one can never be verified as the other.
#[derive(Clone)]
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            access_ttl: Duration::from_secs((cfg.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes as u64) * 60),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn sign_access(&self, id: Uuid, username: &str, email: &str) -> anyhow::Result<String> {
        let (iat, exp) = stamps(TimeDuration::seconds(self.access_ttl.as_secs() as i64));
        let claims = AccessClaims {
            sub: id,
            username: username.to_string(),
            email: email.to_string(),
            iat,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.access_encoding)?;
        debug!(user_id = %id, "access token signed");
        Ok(token)
    }

    pub fn sign_refresh(&self, id: Uuid) -> anyhow::Result<String> {
        self.sign_refresh_with_ttl(id, TimeDuration::seconds(self.refresh_ttl.as_secs() as i64))
    }

    fn sign_refresh_with_ttl(&self, id: Uuid, ttl: TimeDuration) -> anyhow::Result<String> {
        let (iat, exp) = stamps(ttl);
        let claims = RefreshClaims { sub: id, iat, exp };
        let token = encode(&Header::default(), &claims, &self.refresh_encoding)?;
        debug!(user_id = %id, "refresh token signed");
        Ok(token)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        Self::verify::<AccessClaims>(token, &self.access_decoding)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        Self::verify::<RefreshClaims>(token, &self.refresh_decoding)
    }

    fn verify<C: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<C, TokenError> {
        let mut validation = Validation::default();
        // exact expiry, no clock leeway
        validation.leeway = 0;
        let data = decode::<C>(token, key, &validation)?;
        Ok(data.claims)
    }
}

fn stamps(ttl: TimeDuration) -> (usize, usize) {
    let now = OffsetDateTime::now_utc();
    (
        now.unix_timestamp() as usize,
        (now + ttl).unix_timestamp() as usize,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&JwtConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[test]
    fn sign_and_verify_access_token_carries_identity() {
        let iss = issuer();
        let id = Uuid::new_v4();
        let token = iss.sign_access(id, "alice", "alice@x.com").expect("sign");
        let claims = iss.verify_access(&token).expect("verify");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@x.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn sign_and_verify_refresh_token() {
        let iss = issuer();
        let id = Uuid::new_v4();
        let token = iss.sign_refresh(id).expect("sign");
        let claims = iss.verify_refresh(&token).expect("verify");
        assert_eq!(claims.sub, id);
    }

    #[test]
    fn secrets_are_not_interchangeable() {
        let iss = issuer();
        let id = Uuid::new_v4();
        let access = iss.sign_access(id, "alice", "alice@x.com").unwrap();
        let refresh = iss.sign_refresh(id).unwrap();
        assert_eq!(iss.verify_refresh(&access), Err(TokenError::Invalid));
        assert_eq!(iss.verify_access(&refresh), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_refresh_token_is_reported_as_expired() {
        let iss = issuer();
        let token = iss
            .sign_refresh_with_ttl(Uuid::new_v4(), TimeDuration::seconds(-30))
            .expect("sign");
        assert_eq!(iss.verify_refresh(&token), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_invalid_not_expired() {
        let iss = issuer();
        assert_eq!(
            iss.verify_access("definitely.not.a-jwt"),
            Err(TokenError::Invalid)
        );
    }
}
