use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Stable user identifier assigned by the identity system.
///
/// Accepted as either a JSON integer or a JSON string and serialized back in
/// the same form. `1` and `"1"` are distinct identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Str(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Int(id) => write!(f, "{id}"),
            UserId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Int(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Str(id.to_string())
    }
}

/// Role name granted administrative access to the REST surface.
pub const ADMIN_ROLE: &str = "admin";

/// A known user as listed by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// "student", "teacher" or "admin".
    pub role: String,
}

impl DirectoryUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}
