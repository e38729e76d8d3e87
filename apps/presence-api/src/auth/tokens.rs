//! Access token storage for the administrative REST surface.

use serde::{Deserialize, Serialize};

use crate::db::kv::KeyValueStore;
use crate::error::ApiError;
use crate::models::user::UserId;

/// Data stored alongside an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct PatData {
    pub user_id: UserId,
}

fn pat_key(token: &str) -> String {
    format!("presence:pat:{}", token)
}

pub async fn store_pat(
    kv: &dyn KeyValueStore,
    token: &str,
    data: &PatData,
) -> Result<(), ApiError> {
    let value = serde_json::to_string(data)?;
    kv.set(&pat_key(token), &value).await
}

pub async fn lookup_pat(
    kv: &dyn KeyValueStore,
    token: &str,
) -> Result<Option<PatData>, ApiError> {
    match kv.get(&pat_key(token)).await? {
        Some(v) => {
            let data: PatData =
                serde_json::from_str(&v).map_err(|_| ApiError::internal("corrupt token data"))?;
            Ok(Some(data))
        }
        None => Ok(None),
    }
}
