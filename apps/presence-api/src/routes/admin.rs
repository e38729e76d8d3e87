//! Administrative REST fallback for clients without a WebSocket.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::middleware::AdminUser;
use crate::error::ApiErrorBody;
use crate::models::presence::PresenceRecord;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/active-users", get(list_active_users))
}

// ---------------------------------------------------------------------------
// GET /api/v1/admin/active-users
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/admin/active-users",
    tag = "Presence",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current presence snapshot", body = [PresenceRecord]),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Administrator role required", body = ApiErrorBody),
    )
)]
pub async fn list_active_users(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Json<Vec<PresenceRecord>> {
    let snapshot = state.presence.snapshot();
    tracing::debug!(admin_id = %admin.user_id, records = snapshot.len(), "active users listed");
    Json(snapshot)
}
