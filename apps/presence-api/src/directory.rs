//! Known-user directory and the fixtures file it is loaded from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::presence::PresenceStatus;
use crate::models::user::{DirectoryUser, UserId};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid fixtures: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("user {0} is listed more than once")]
    DuplicateUser(UserId),
    #[error("failed to provision access token for user {0}")]
    TokenProvision(UserId),
}

/// In-memory lookup of known users by id.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<UserId, DirectoryUser>,
}

impl UserDirectory {
    /// Build a directory, rejecting duplicate ids.
    pub fn new(users: impl IntoIterator<Item = DirectoryUser>) -> Result<Self, DirectoryError> {
        let mut map = HashMap::new();
        for user in users {
            if map.contains_key(&user.id) {
                return Err(DirectoryError::DuplicateUser(user.id));
            }
            map.insert(user.id.clone(), user);
        }
        Ok(Self { users: map })
    }

    pub fn find_user(&self, user_id: &UserId) -> Option<&DirectoryUser> {
        self.users.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// A bearer token pre-issued to a directory user.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenGrant {
    pub token: String,
    pub user_id: UserId,
}

/// A presence entry to load at process start.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedPresence {
    pub user_id: UserId,
    #[serde(default)]
    pub status: PresenceStatus,
}

/// Contents of the `DIRECTORY_PATH` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub users: Vec<DirectoryUser>,
    pub access_tokens: Vec<AccessTokenGrant>,
    pub seed_presence: Vec<SeedPresence>,
}

impl Fixtures {
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
