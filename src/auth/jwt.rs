use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

/// What a signed token may be used for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Reset,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub reset_ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs(cfg.ttl_minutes.max(0) as u64 * 60),
            reset_ttl: Duration::from_secs(cfg.reset_ttl_minutes.max(0) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    fn sign_at(&self, user_id: Uuid, kind: TokenKind, now: OffsetDateTime) -> anyhow::Result<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Reset => self.reset_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    /// Access tokens gate the admin routes; no endpoint hands them out yet.
    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_at(user_id, TokenKind::Access, OffsetDateTime::now_utc())
    }

    pub fn sign_reset(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_at(user_id, TokenKind::Reset, OffsetDateTime::now_utc())
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        // a reset link is dead the second its window closes
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    fn verify_kind(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            anyhow::bail!("expected a {kind:?} token");
        }
        Ok(claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify_kind(token, TokenKind::Access)
    }

    pub fn verify_reset(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify_kind(token, TokenKind::Reset)
    }
}
