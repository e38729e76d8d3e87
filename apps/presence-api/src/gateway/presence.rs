//! Process-wide table of last-known presence, one record per user.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::presence::PresenceRecord;
use crate::models::user::UserId;

#[derive(Default)]
struct PresenceTable {
    /// user id → position in `records`.
    index: HashMap<UserId, usize>,
    /// Records in first-insertion order.
    records: Vec<PresenceRecord>,
}

/// Thread-safe presence store.
///
/// Updates overwrite the existing record in place, so a user keeps the
/// position they were first inserted at. Timestamps are applied as given,
/// even when older than the stored one.
#[derive(Default)]
pub struct PresenceStore {
    inner: RwLock<PresenceTable>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record for `record.user_id`, inserting it if absent.
    pub fn upsert(&self, record: PresenceRecord) {
        let mut table = self.inner.write();
        match table.index.get(&record.user_id).copied() {
            Some(pos) => table.records[pos] = record,
            None => {
                let pos = table.records.len();
                table.index.insert(record.user_id.clone(), pos);
                table.records.push(record);
            }
        }
    }

    /// Ordered copy of all current records.
    pub fn snapshot(&self) -> Vec<PresenceRecord> {
        self.inner.read().records.clone()
    }

    pub fn get(&self, user_id: &UserId) -> Option<PresenceRecord> {
        let table = self.inner.read();
        table.index.get(user_id).map(|&pos| table.records[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record. Used on shutdown.
    pub fn clear(&self) {
        let mut table = self.inner.write();
        table.index.clear();
        table.records.clear();
    }
}
