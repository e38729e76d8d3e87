use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::user::{DirectoryUser, UserId};

/// A user's last-reported availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Away,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Away => "away",
            PresenceStatus::Offline => "offline",
        }
    }

    /// Interpret a client-supplied status. Absent or unrecognized values
    /// (including non-string JSON) fall back to `online`.
    pub fn from_client(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("away") => PresenceStatus::Away,
            Some("offline") => PresenceStatus::Offline,
            _ => PresenceStatus::Online,
        }
    }
}

/// Last-known presence of one user.
///
/// `name`, `email` and `role` are copied from the directory at update time
/// and are not refreshed if the profile changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub last_activity: DateTime<Utc>,
    pub status: PresenceStatus,
}

impl PresenceRecord {
    /// Build a record from a directory entry.
    pub fn for_user(user: &DirectoryUser, status: PresenceStatus, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            last_activity: at,
            status,
        }
    }
}
