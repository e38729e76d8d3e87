//! Wire-format messages exchanged over the presence WebSocket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::presence::PresenceRecord;
use crate::models::user::UserId;

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

pub const KIND_ACTIVE_USERS: &str = "activeUsers";
pub const KIND_USER_ACTIVITY: &str = "userActivity";

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// Full presence snapshot, sent on connect and after every change.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveUsersEnvelope {
    pub kind: &'static str,
    pub data: Vec<PresenceRecord>,
}

impl ActiveUsersEnvelope {
    pub fn new(data: Vec<PresenceRecord>) -> Self {
        Self {
            kind: KIND_ACTIVE_USERS,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server messages
// ---------------------------------------------------------------------------

/// Inbound messages, one variant per recognized `kind`.
#[derive(Debug)]
pub enum ClientMessage {
    UserActivity(UserActivityPayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityPayload {
    pub user_id: UserId,
    /// Kept raw so unrecognized values can fall back to `online`.
    #[serde(default)]
    pub status: Option<Value>,
}
