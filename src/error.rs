//! Error types shared by every handler and how they are rendered.

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use thiserror::Error;
use tracing::{error, warn};

/// Field key used for cross-field and business rule failures.
pub const NON_FIELD_ERRORS: &str = "error";

/// Top-level key every response payload is nested under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    User,
    Users,
    TestPlan,
}

impl Envelope {
    pub const fn key(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Users => "users",
            Self::TestPlan => "test_plan",
        }
    }

    pub fn wrap<T: Serialize>(self, payload: T) -> Json<Wrapped<T>> {
        Json(Wrapped {
            key: self.key(),
            payload,
        })
    }
}

/// `{"<key>": payload}`
#[derive(Debug)]
pub struct Wrapped<T> {
    key: &'static str,
    payload: T,
}

impl<T: Serialize> Serialize for Wrapped<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key, &self.payload)?;
        map.end()
    }
}

/// A single rejected input, rendered as its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}")]
    MissingField(&'static str),
    #[error("Invalid login or password")]
    InvalidCredentials,
    #[error("User is inactive")]
    InactiveUser,
    #[error("Title is required")]
    TitleRequired,
    #[error("Ensure this field has no more than 150 characters.")]
    TitleTooLong,
    #[error("Not a valid string.")]
    NotAString,
    #[error("Must be a valid boolean.")]
    InvalidBoolean,
    #[error(
        "Datetime has wrong format. Use one of these formats instead: \
         YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z]."
    )]
    InvalidDatetime,
    #[error("No such author")]
    NoSuchAuthor,
    #[error("Incorrect date")]
    IncorrectDate,
    #[error("ID is required")]
    IdRequired,
    #[error("A valid integer is required.")]
    InvalidInteger,
    #[error("No such test plan")]
    NoSuchTestPlan,
}

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<ValidationError>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, err: ValidationError) -> Self {
        let mut errors = Self::new();
        errors.add(field, err);
        errors
    }

    /// Shorthand for a business rule failure reported under `error`.
    pub fn rule(err: ValidationError) -> Self {
        Self::single(NON_FIELD_ERRORS, err)
    }

    pub fn add(&mut self, field: &'static str, err: ValidationError) {
        self.0.entry(field).or_default().push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[ValidationError] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, errs) in &self.0 {
            for err in errs {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {err}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, errs) in &self.0 {
            let messages: Vec<String> = errs.iter().map(ToString::to_string).collect();
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

/// Bearer token rejections. All of them map to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    AuthenticationMissing,
    #[error("Token decode error")]
    TokenDecodeError,
    #[error("User not found")]
    UserNotFound,
    #[error("Token has expired")]
    TokenExpired,
    #[error("The user is inactive")]
    InactiveUser,
}

#[derive(Debug, Error)]
pub enum ApiErrorKind {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FieldErrors> for ApiErrorKind {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Handler error: what went wrong plus the envelope to render it under.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ApiError {
    pub envelope: Envelope,
    pub kind: ApiErrorKind,
}

impl ApiError {
    pub fn new(envelope: Envelope, kind: impl Into<ApiErrorKind>) -> Self {
        Self {
            envelope,
            kind: kind.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::Validation(_) | ApiErrorKind::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorKind::Auth(_) => StatusCode::FORBIDDEN,
            ApiErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Attaches an envelope to any error convertible into [`ApiErrorKind`].
pub trait Within<T> {
    fn within(self, envelope: Envelope) -> Result<T, ApiError>;
}

impl<T, E: Into<ApiErrorKind>> Within<T> for Result<T, E> {
    fn within(self, envelope: Envelope) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(envelope, e))
    }
}

#[derive(Serialize)]
struct ErrorsBody<'a> {
    errors: &'a FieldErrors,
}

#[derive(Serialize)]
struct DetailBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope = self.envelope;
        match &self.kind {
            ApiErrorKind::Validation(errors) => {
                warn!(%errors, "validation failed");
                (status, envelope.wrap(ErrorsBody { errors })).into_response()
            }
            ApiErrorKind::Auth(err) => {
                warn!(reason = %err, "authentication failed");
                (
                    status,
                    envelope.wrap(DetailBody {
                        detail: err.to_string(),
                    }),
                )
                    .into_response()
            }
            ApiErrorKind::MalformedBody(detail) => (
                status,
                envelope.wrap(DetailBody {
                    detail: detail.clone(),
                }),
            )
                .into_response(),
            ApiErrorKind::Internal(err) => {
                error!(error = %err, "request failed");
                (
                    status,
                    envelope.wrap(DetailBody {
                        detail: "Internal server error".into(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
