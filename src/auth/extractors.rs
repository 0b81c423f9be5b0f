use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::auth::{jwt::JwtKeys, repo_types::User, services};
use crate::error::{ApiError, ApiErrorKind, AuthError, Envelope};
use crate::state::AppState;

/// Picks the envelope an authentication failure is rendered under.
pub trait Scope: Send + Sync + 'static {
    const ENVELOPE: Envelope;
}

pub struct TestPlanScope;

impl Scope for TestPlanScope {
    const ENVELOPE: Envelope = Envelope::TestPlan;
}

pub struct UsersScope;

impl Scope for UsersScope {
    const ENVELOPE: Envelope = Envelope::Users;
}

/// Authenticated caller resolved from `Authorization: Bearer <token>`.
///
/// A missing or malformed header means an anonymous caller, which this
/// extractor rejects with 403.
pub struct AuthUser<S> {
    pub user: User,
    scope: PhantomData<S>,
}

#[async_trait]
impl<S: Scope> FromRequestParts<AppState> for AuthUser<S> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let reject = |kind: ApiErrorKind| ApiError::new(S::ENVELOPE, kind);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(services::parse_bearer)
            .ok_or_else(|| reject(AuthError::AuthenticationMissing.into()))?;

        let keys = JwtKeys::from_ref(state);
        let user = services::authenticate_token(state.users.as_ref(), &keys, token)
            .await
            .map_err(reject)?;

        Ok(Self {
            user,
            scope: PhantomData,
        })
    }
}
