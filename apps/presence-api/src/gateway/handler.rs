//! Inbound message validation and application.
//!
//! Every failure is terminal and local: the caller logs the `Dropped` reason
//! and nothing is sent back to the client.

use chrono::Utc;
use serde_json::Value;

use crate::models::presence::{PresenceRecord, PresenceStatus};
use crate::models::user::UserId;
use crate::AppState;

use super::events::{ClientMessage, UserActivityPayload, KIND_USER_ACTIVITY};
use super::fanout::FanoutReport;

/// A message that updated the store and triggered a broadcast.
#[derive(Debug)]
pub struct Applied {
    pub record: PresenceRecord,
    pub fanout: FanoutReport,
}

/// Why an inbound message was discarded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Dropped {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("message has no string `kind`")]
    MissingKind,
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: &'static str, reason: String },
    #[error("user {0} is not in the directory")]
    UnknownUser(UserId),
}

/// Decode raw text into a known message variant. No payload field is read
/// until the `kind` discriminant has matched.
pub fn decode(text: &str) -> Result<ClientMessage, Dropped> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Dropped::Malformed(e.to_string()))?;

    if !value.is_object() {
        return Err(Dropped::Malformed("expected a JSON object".to_string()));
    }

    let kind = match value.get("kind") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(Dropped::MissingKind),
    };

    match kind.as_str() {
        KIND_USER_ACTIVITY => serde_json::from_value::<UserActivityPayload>(value)
            .map(ClientMessage::UserActivity)
            .map_err(|e| Dropped::InvalidPayload {
                kind: KIND_USER_ACTIVITY,
                reason: e.to_string(),
            }),
        _ => Err(Dropped::UnknownKind(kind)),
    }
}

/// Validate one inbound text frame and apply it.
///
/// On success the store holds the new record and the snapshot has been
/// broadcast to all open connections.
pub fn apply_message(state: &AppState, text: &str) -> Result<Applied, Dropped> {
    match decode(text)? {
        ClientMessage::UserActivity(payload) => apply_user_activity(state, payload),
    }
}

fn apply_user_activity(
    state: &AppState,
    payload: UserActivityPayload,
) -> Result<Applied, Dropped> {
    let user = state
        .directory
        .find_user(&payload.user_id)
        .ok_or_else(|| Dropped::UnknownUser(payload.user_id.clone()))?;

    let status = PresenceStatus::from_client(payload.status.as_ref());
    let record = PresenceRecord::for_user(user, status, Utc::now());
    state.presence.upsert(record.clone());

    tracing::debug!(user_id = %record.user_id, status = record.status.as_str(), "presence updated");

    let fanout = state.broadcast.broadcast();
    Ok(Applied { record, fanout })
}
