use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
///
/// `ExpirationDate` is an absolute UTC instant packed as `YYYYMMDDhhmmss`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "UserId")]
    pub user_id: i64,
    #[serde(rename = "ExpirationDate")]
    pub expiration_date: i64,
}
