use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, UserListItem},
        extractors::{AuthUser, UsersScope},
        jwt::JwtKeys,
        repo::UserStore,
        services::verify_credentials,
    },
    error::{ApiError, ApiErrorKind, Envelope, Within, Wrapped},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/login/", post(login))
        .route("/api/users/all/", get(list_users))
}

/// Maps a body that is not valid JSON (or not the expected shape) to 400.
pub(crate) fn body_or_400<T>(
    body: Result<Json<T>, JsonRejection>,
    envelope: Envelope,
) -> Result<T, ApiError> {
    body.map(|Json(b)| b).map_err(|rejection| {
        ApiError::new(
            envelope,
            ApiErrorKind::MalformedBody(format!("JSON parse error - {}", rejection.body_text())),
        )
    })
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Wrapped<LoginResponse>>, ApiError> {
    let payload = body_or_400(body, Envelope::User)?;
    let keys = JwtKeys::from_ref(&state);
    let response = verify_credentials(state.users.as_ref(), &keys, &payload.user)
        .await
        .within(Envelope::User)?;
    Ok(Envelope::User.wrap(response))
}

#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser<UsersScope>,
) -> Result<Json<Wrapped<Vec<UserListItem>>>, ApiError> {
    let users = state
        .users
        .list_active_staff()
        .await
        .within(Envelope::Users)?;
    Ok(Envelope::Users.wrap(users.into_iter().map(UserListItem::from).collect()))
}
