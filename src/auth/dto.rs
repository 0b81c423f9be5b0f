use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repo_types::User;

/// Request body for login: `{"user": {...}}`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub user: LoginInput,
}

/// Raw login fields; type checks happen during verification.
#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

/// Returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub email: String,
    pub username: String,
    pub token: String,
}

/// Public projection of a staff user.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UserListItem {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<User> for UserListItem {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
        }
    }
}
