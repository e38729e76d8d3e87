//! Snapshot fan-out to every open connection, plus the bootstrap sent on
//! connect.
//!
//! Each connection owns a bounded queue drained by its writer task. The
//! snapshot is serialized once per broadcast and the same `Arc<str>` is
//! queued on every connection. A slow connection whose queue is full has its
//! newest pending snapshot replaced, so the last frame it receives always
//! matches the store. A fanout lock serializes broadcasts with
//! connection attachment, so a new connection's bootstrap is always the first
//! envelope on its queue and matches the store as of registration.

use std::sync::Arc;

use parking_lot::Mutex;

use super::events::ActiveUsersEnvelope;
use super::presence::PresenceStore;
use super::registry::{ConnectionHandle, ConnectionRegistry, Enqueued, Outbound, OutboundReceiver};

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    /// Deliveries that replaced a snapshot still pending on a full queue.
    pub superseded: usize,
    pub failed: usize,
}

/// Pushes presence snapshots to connections. Store in AppState.
pub struct Broadcaster {
    store: Arc<PresenceStore>,
    registry: Arc<ConnectionRegistry>,
    queue_capacity: usize,
    fanout: Mutex<()>,
}

impl Broadcaster {
    pub fn new(
        store: Arc<PresenceStore>,
        registry: Arc<ConnectionRegistry>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            store,
            registry,
            queue_capacity,
            fanout: Mutex::new(()),
        }
    }

    /// Register a new connection and queue its bootstrap snapshot.
    ///
    /// Returns the receiving half of the connection's outbound queue.
    pub fn attach(&self, connection_id: String) -> OutboundReceiver {
        let (handle, rx) = ConnectionHandle::new(connection_id, self.queue_capacity);

        let _guard = self.fanout.lock();
        match self.encode_snapshot() {
            Some(envelope) => {
                if let Err(e) = handle.send(envelope) {
                    tracing::warn!(connection_id = %handle.id, error = %e, "bootstrap snapshot not queued");
                }
            }
            None => {
                tracing::warn!(connection_id = %handle.id, "bootstrap snapshot skipped");
            }
        }
        self.registry.register(handle);

        rx
    }

    /// Remove a connection after its transport closed or errored.
    pub fn detach(&self, connection_id: &str) {
        if self.registry.unregister(connection_id).is_none() {
            tracing::debug!(%connection_id, "detach for unknown connection");
        }
    }

    /// Send the current snapshot to every open connection.
    ///
    /// A failed send to one connection is logged and does not affect the
    /// others or unregister it.
    pub fn broadcast(&self) -> FanoutReport {
        let _guard = self.fanout.lock();
        let Some(envelope) = self.encode_snapshot() else {
            return FanoutReport::default();
        };

        let mut report = FanoutReport::default();
        for conn in self.registry.open_connections() {
            match conn.send(envelope.clone()) {
                Ok(Enqueued::Appended) => report.delivered += 1,
                Ok(Enqueued::Superseded) => {
                    report.delivered += 1;
                    report.superseded += 1;
                    tracing::debug!(connection_id = %conn.id, "stale snapshot superseded on full queue");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(connection_id = %conn.id, error = %e, "presence broadcast dropped");
                }
            }
        }

        tracing::debug!(
            delivered = report.delivered,
            superseded = report.superseded,
            failed = report.failed,
            "presence snapshot broadcast"
        );
        report
    }

    fn encode_snapshot(&self) -> Option<Outbound> {
        let envelope = ActiveUsersEnvelope::new(self.store.snapshot());
        match serde_json::to_string(&envelope) {
            Ok(json) => Some(Arc::from(json)),
            Err(err) => {
                tracing::error!(?err, "failed to serialize presence snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::presence::{PresenceRecord, PresenceStatus};
    use crate::models::user::UserId;
    use chrono::Utc;
    use serde_json::Value;

    fn setup(capacity: usize) -> (Arc<PresenceStore>, Arc<ConnectionRegistry>, Broadcaster) {
        let store = Arc::new(PresenceStore::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(store.clone(), registry.clone(), capacity);
        (store, registry, broadcaster)
    }

    fn record(id: i64, name: &str) -> PresenceRecord {
        PresenceRecord {
            user_id: UserId::Int(id),
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            role: "student".to_string(),
            last_activity: Utc::now(),
            status: PresenceStatus::Online,
        }
    }

    fn decode(payload: &str) -> Value {
        serde_json::from_str(payload).unwrap()
    }

    #[test]
    fn attach_queues_bootstrap_and_registers() {
        let (store, registry, broadcaster) = setup(8);
        store.upsert(record(1, "Ravi"));

        let mut rx = broadcaster.attach("conn_a".to_string());
        assert_eq!(registry.len(), 1);

        let bootstrap = decode(&rx.try_recv().unwrap());
        assert_eq!(bootstrap["kind"], "activeUsers");
        assert_eq!(bootstrap["data"].as_array().unwrap().len(), 1);
        assert_eq!(bootstrap["data"][0]["userId"], 1);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn bootstrap_of_empty_store_is_empty_array() {
        let (_store, _registry, broadcaster) = setup(8);
        let mut rx = broadcaster.attach("conn_a".to_string());
        let bootstrap = decode(&rx.try_recv().unwrap());
        assert_eq!(bootstrap, serde_json::json!({ "kind": "activeUsers", "data": [] }));
    }

    #[test]
    fn broadcast_reaches_every_open_connection_with_same_payload() {
        let (store, _registry, broadcaster) = setup(8);
        let mut rx_a = broadcaster.attach("conn_a".to_string());
        let mut rx_b = broadcaster.attach("conn_b".to_string());
        rx_a.try_recv().unwrap();
        rx_b.try_recv().unwrap();

        store.upsert(record(1, "Ravi"));
        let report = broadcaster.broadcast();
        assert_eq!(report, FanoutReport { delivered: 2, superseded: 0, failed: 0 });

        let a = rx_a.try_recv().unwrap();
        let b = rx_b.try_recv().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(decode(&a)["data"][0]["name"], "Ravi");
    }

    #[test]
    fn closed_connection_does_not_block_others() {
        let (store, registry, broadcaster) = setup(8);
        // conn_a's writer is gone, so its queue is closed.
        let rx_a = broadcaster.attach("conn_a".to_string());
        let mut rx_b = broadcaster.attach("conn_b".to_string());
        rx_b.try_recv().unwrap();
        drop(rx_a);

        store.upsert(record(1, "Ravi"));
        let report = broadcaster.broadcast();
        assert_eq!(report.delivered, 1);
        assert_eq!(decode(&rx_b.try_recv().unwrap())["data"][0]["userId"], 1);

        // The closed connection stays registered until the transport detaches it.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn slow_connection_ends_on_latest_snapshot() {
        let (store, _registry, broadcaster) = setup(2);
        let mut rx = broadcaster.attach("conn_a".to_string());

        let mut ravi = record(1, "Ravi");
        store.upsert(ravi.clone());
        assert_eq!(broadcaster.broadcast().superseded, 0);

        ravi.status = PresenceStatus::Offline;
        store.upsert(ravi);
        let report = broadcaster.broadcast();
        assert_eq!(report, FanoutReport { delivered: 1, superseded: 1, failed: 0 });

        let bootstrap = decode(&rx.try_recv().unwrap());
        assert_eq!(bootstrap["data"], serde_json::json!([]));

        let mut last = None;
        while let Some(payload) = rx.try_recv() {
            last = Some(decode(&payload));
        }
        let expected = serde_json::to_value(store.snapshot()).unwrap();
        let last = last.unwrap();
        assert_eq!(last["data"], expected);
        assert_eq!(last["data"][0]["status"], "offline");
    }

    #[test]
    fn detached_connections_receive_nothing() {
        let (store, registry, broadcaster) = setup(8);
        let mut rx_a = broadcaster.attach("conn_a".to_string());
        rx_a.try_recv().unwrap();

        broadcaster.detach("conn_a");
        assert!(registry.is_empty());

        store.upsert(record(1, "Ravi"));
        assert_eq!(broadcaster.broadcast(), FanoutReport::default());
        assert!(rx_a.try_recv().is_none());
    }
}
