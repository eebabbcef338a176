// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed repositories over the file store.
//!
//! Each mutation helper reads the current record (synthesizing a zero-value
//! default when absent), applies one semantic change, and writes back under
//! the collection lock. A process restart mid-flow therefore loses at most
//! the current conversational step, never a committed usage count.

use std::path::Path;

use tracing::warn;
use uuid::Uuid;

use crate::models::{ReadingRecord, UserRecord};
use crate::store::FileStore;

/// Repository of [`UserRecord`]s keyed by stringified user id.
pub struct UserRepo {
    store: FileStore<UserRecord>,
}

impl UserRepo {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            store: FileStore::new(data_dir.join("users.json")),
        }
    }

    pub async fn fetch(&self, user_id: i64) -> Option<UserRecord> {
        self.store.get(&user_id.to_string()).await
    }

    /// Persist a record as-is (used when creating a user on first contact).
    pub async fn save(&self, record: &UserRecord) -> bool {
        self.store
            .put(&record.user_id.to_string(), record.clone())
            .await
    }

    pub async fn confirm_age(&self, user_id: i64) -> bool {
        self.mutate(user_id, |rec| rec.confirm_age()).await.is_some()
    }

    /// Returns the new test-reading count, or `None` on write failure.
    pub async fn record_test_reading(&self, user_id: i64) -> Option<u32> {
        self.mutate(user_id, |rec| rec.record_test_reading())
            .await
            .map(|rec| rec.test_reading_count)
    }

    /// Returns the new premium-reading count, or `None` on write failure.
    pub async fn record_premium_reading(&self, user_id: i64) -> Option<u32> {
        self.mutate(user_id, |rec| rec.record_premium_reading())
            .await
            .map(|rec| rec.premium_reading_count)
    }

    pub async fn set_last_reading(&self, user_id: i64, reading_id: &str) -> bool {
        self.mutate(user_id, |rec| rec.set_last_reading(reading_id))
            .await
            .is_some()
    }

    async fn mutate(
        &self,
        user_id: i64,
        f: impl FnOnce(&mut UserRecord) + Send,
    ) -> Option<UserRecord> {
        let result = self
            .store
            .update(&user_id.to_string(), |current| {
                let mut rec = current.unwrap_or_else(|| UserRecord::new(user_id));
                f(&mut rec);
                rec
            })
            .await;
        if result.is_none() {
            warn!(user_id, "user record mutation was not persisted");
        }
        result
    }
}

/// Repository of [`ReadingRecord`]s keyed by generated reading id.
pub struct ReadingRepo {
    store: FileStore<ReadingRecord>,
}

impl ReadingRepo {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            store: FileStore::new(data_dir.join("readings.json")),
        }
    }

    pub async fn fetch(&self, reading_id: &str) -> Option<ReadingRecord> {
        self.store.get(reading_id).await
    }

    /// Persist a new reading, assigning a fresh id when the record carries
    /// none. Returns the stored id, or `None` on write failure.
    pub async fn insert(&self, mut record: ReadingRecord) -> Option<String> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        if self.store.put(&id, record).await {
            Some(id)
        } else {
            warn!(reading_id = %id, "reading record was not persisted");
            None
        }
    }

    /// All readings owned by a user. Full-collection filter; not indexed.
    pub async fn readings_for_user(&self, user_id: i64) -> Vec<ReadingRecord> {
        self.store.scan(|rec| rec.user_id == user_id).await
    }
}
