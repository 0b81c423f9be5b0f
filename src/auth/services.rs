use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::auth::{
    dto::{LoginInput, LoginResponse},
    jwt::{unpack_instant, JwtKeys},
    password::{hash_password, verify_password},
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::config::AdminSeed;
use crate::error::{ApiErrorKind, AuthError, FieldErrors, ValidationError};
use crate::fields;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases the domain part; the local part is case-sensitive.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Returns the token of an `Authorization` value shaped exactly
/// `Bearer <token>`; anything else is treated as anonymous.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

fn required_text(
    value: Option<&serde_json::Value>,
    field: &'static str,
    missing: &'static str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match fields::string(value) {
        Ok(Some(s)) if !s.trim().is_empty() => Some(s),
        Ok(_) => {
            errors.add(field, ValidationError::MissingField(missing));
            None
        }
        Err(e) => {
            errors.add(field, e);
            None
        }
    }
}

/// Checks an email/password pair and issues a token for the matching user.
pub async fn verify_credentials(
    users: &dyn UserStore,
    keys: &JwtKeys,
    input: &LoginInput,
) -> Result<LoginResponse, ApiErrorKind> {
    let mut errors = FieldErrors::new();
    let email = required_text(input.email.as_ref(), "email", "Enter your E-mail", &mut errors);
    let password = required_text(
        input.password.as_ref(),
        "password",
        "Enter your password",
        &mut errors,
    );
    let (Some(email), Some(password)) = (email, password) else {
        return Err(errors.into());
    };

    let email = normalize_email(&email);
    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(FieldErrors::rule(ValidationError::InvalidCredentials).into());
    };

    if !verify_password(&password, &user.password_hash) {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(FieldErrors::rule(ValidationError::InvalidCredentials).into());
    }

    if !user.is_active {
        warn!(user_id = user.id, "login by inactive user");
        return Err(FieldErrors::rule(ValidationError::InactiveUser).into());
    }

    let token = keys.sign(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse {
        email: user.email,
        username: user.username,
        token,
    })
}

pub async fn authenticate_token(
    users: &dyn UserStore,
    keys: &JwtKeys,
    token: &str,
) -> Result<User, ApiErrorKind> {
    authenticate_token_at(users, keys, token, OffsetDateTime::now_utc()).await
}

/// Resolves a bearer token to its user as seen at `now`.
pub async fn authenticate_token_at(
    users: &dyn UserStore,
    keys: &JwtKeys,
    token: &str,
    now: OffsetDateTime,
) -> Result<User, ApiErrorKind> {
    let claims = keys.verify(token).map_err(|e| {
        debug!(error = %e, "token rejected");
        AuthError::TokenDecodeError
    })?;

    let user = users
        .find_by_id(claims.user_id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let expires_at = unpack_instant(claims.expiration_date).ok_or(AuthError::TokenDecodeError)?;
    if (expires_at - now).whole_seconds() <= 0 {
        return Err(AuthError::TokenExpired.into());
    }

    if !user.is_active {
        return Err(AuthError::InactiveUser.into());
    }
    Ok(user)
}

pub async fn create_superuser(
    users: &dyn UserStore,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<User> {
    anyhow::ensure!(!password.is_empty(), "superusers must have a password");
    let username = username.trim();
    anyhow::ensure!(!username.is_empty(), "users must have a username");
    let email = normalize_email(email);
    anyhow::ensure!(is_valid_email(&email), "invalid email: {email}");

    let user = users
        .create_user(&NewUser {
            username: username.to_string(),
            email,
            password_hash: hash_password(password)?,
            is_staff: true,
        })
        .await?;
    info!(user_id = user.id, "staff user created");
    Ok(user)
}

/// Creates the configured staff account unless its email is taken.
pub async fn ensure_admin(users: &dyn UserStore, seed: &AdminSeed) -> anyhow::Result<()> {
    if users
        .find_by_email(&normalize_email(&seed.email))
        .await?
        .is_some()
    {
        debug!("admin account already present");
        return Ok(());
    }
    create_superuser(users, &seed.username, &seed.email, &seed.password).await?;
    Ok(())
}
