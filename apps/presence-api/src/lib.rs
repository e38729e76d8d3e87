pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;

use std::sync::Arc;

use chrono::Utc;

use auth::tokens::{self, PatData};
use config::Config;
use db::kv::{KeyValueStore, MemoryStore};
use directory::{DirectoryError, Fixtures, UserDirectory};
use gateway::fanout::Broadcaster;
use gateway::presence::PresenceStore;
use gateway::registry::ConnectionRegistry;
use models::presence::PresenceRecord;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<UserDirectory>,
    pub kv: Arc<dyn KeyValueStore>,
    pub presence: Arc<PresenceStore>,
    pub connections: Arc<ConnectionRegistry>,
    pub broadcast: Arc<Broadcaster>,
}

impl AppState {
    /// Wire an empty presence store and connection registry around a directory.
    pub fn new(config: Config, directory: UserDirectory) -> Self {
        let presence = Arc::new(PresenceStore::new());
        let connections = Arc::new(ConnectionRegistry::new());
        let broadcast = Arc::new(Broadcaster::new(
            presence.clone(),
            connections.clone(),
            config.queue_capacity,
        ));

        Self {
            config: Arc::new(config),
            directory: Arc::new(directory),
            kv: Arc::new(MemoryStore::new()),
            presence,
            connections,
            broadcast,
        }
    }

    /// Build state from a fixtures file: directory users, pre-issued access
    /// tokens and, when `seed_presence` is enabled, initial presence records.
    pub async fn from_fixtures(config: Config, fixtures: Fixtures) -> Result<Self, DirectoryError> {
        let seed = config.seed_presence;
        let directory = UserDirectory::new(fixtures.users)?;
        let state = Self::new(config, directory);

        for grant in &fixtures.access_tokens {
            if state.directory.find_user(&grant.user_id).is_none() {
                tracing::warn!(user_id = %grant.user_id, "access token for unknown user ignored");
                continue;
            }
            let data = PatData {
                user_id: grant.user_id.clone(),
            };
            tokens::store_pat(state.kv.as_ref(), &grant.token, &data)
                .await
                .map_err(|_| DirectoryError::TokenProvision(grant.user_id.clone()))?;
        }

        if seed {
            let now = Utc::now();
            for entry in &fixtures.seed_presence {
                match state.directory.find_user(&entry.user_id) {
                    Some(user) => state
                        .presence
                        .upsert(PresenceRecord::for_user(user, entry.status, now)),
                    None => {
                        tracing::warn!(user_id = %entry.user_id, "presence seed for unknown user ignored");
                    }
                }
            }
            tracing::info!(records = state.presence.len(), "presence store seeded");
        }

        Ok(state)
    }

    /// Close every connection and clear presence. Called on shutdown.
    pub fn teardown(&self) {
        let closed = self.connections.clear();
        self.presence.clear();
        tracing::info!(closed, "presence state torn down");
    }
}
