use anyhow::Context;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::seconds(cfg.ttl_minutes.max(0).saturating_mul(60)),
        }
    }

    pub fn sign(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    /// Signs a token as if issued at `now`.
    pub fn sign_at(&self, user_id: i64, now: OffsetDateTime) -> anyhow::Result<String> {
        let expires = now
            .checked_add(self.ttl)
            .context("token expiry out of range")?;
        let claims = Claims {
            user_id,
            expiration_date: pack_instant(expires),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    /// Checks the signature only. Expiry is judged by the caller from
    /// `ExpirationDate`, which is not a registered claim.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }
}

/// Packs an instant as the integer `YYYYMMDDhhmmss` in UTC.
pub fn pack_instant(at: OffsetDateTime) -> i64 {
    let at = at.to_offset(UtcOffset::UTC);
    i64::from(at.year()) * 10_000_000_000
        + i64::from(u8::from(at.month())) * 100_000_000
        + i64::from(at.day()) * 1_000_000
        + i64::from(at.hour()) * 10_000
        + i64::from(at.minute()) * 100
        + i64::from(at.second())
}

/// Inverse of [`pack_instant`]; `None` when the digits are not a real instant.
pub fn unpack_instant(packed: i64) -> Option<OffsetDateTime> {
    if packed < 0 {
        return None;
    }
    let part = |div: i64| ((packed / div) % 100) as u8;
    let year = i32::try_from(packed / 10_000_000_000).ok()?;
    let month = Month::try_from(part(100_000_000)).ok()?;
    let date = Date::from_calendar_date(year, month, part(1_000_000)).ok()?;
    let time = Time::from_hms(part(10_000), part(100), part(1)).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}
