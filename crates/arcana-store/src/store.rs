// SPDX-FileCopyrightText: 2026 Arcana Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generic file-backed key-value store with crash-safe writes.
//!
//! Each [`FileStore`] owns one collection persisted as a single file
//! mapping string keys to records. All operations are serialized through a
//! per-collection async lock, and every write goes to a temporary file that
//! is atomically renamed over the original, so readers observe either the
//! old complete state or the new complete state, never a torn file.
//!
//! The whole collection is loaded into memory per operation. That is a
//! deliberate scale tradeoff for a single small deployment (hundreds to low
//! thousands of records); callers must not assume streaming access.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Errors internal to the store. They never cross the repository boundary:
/// reads degrade to an empty collection and writes report `false`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Serialization strategy for a collection.
///
/// The atomic-rename write discipline in [`FileStore`] is independent of
/// the codec; swapping the on-disk format is a codec change only.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize>(map: &BTreeMap<String, T>) -> Result<Vec<u8>, StoreError>;
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<BTreeMap<String, T>, StoreError>;
}

/// Pretty-printed JSON object, keys sorted by the `BTreeMap`.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(map: &BTreeMap<String, T>) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(map).map_err(|e| StoreError::Codec(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<BTreeMap<String, T>, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Codec(Box::new(e)))
    }
}

/// A file-backed map of string keys to records of type `T`.
pub struct FileStore<T, C = JsonCodec> {
    path: PathBuf,
    lock: Mutex<()>,
    _record: PhantomData<T>,
    _codec: PhantomData<C>,
}

impl<T, C> FileStore<T, C>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
    C: Codec,
{
    /// Creates a store backed by `path`. The file is created lazily on the
    /// first successful write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            _record: PhantomData,
            _codec: PhantomData,
        }
    }

    /// Fetch a record by key. Read errors degrade to `None` after logging.
    pub async fn get(&self, key: &str) -> Option<T> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await;
        map.remove(key)
    }

    /// Insert or replace a record. Returns `false` on write failure; the
    /// on-disk state is then unchanged.
    pub async fn put(&self, key: &str, record: T) -> bool {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await;
        map.insert(key.to_string(), record);
        self.write_map(&map).await
    }

    /// Atomic read-modify-write: `f` receives the current record (if any)
    /// and returns the replacement. The collection lock is held for the
    /// whole cycle. Returns the stored record, or `None` on write failure.
    pub async fn update(&self, key: &str, f: impl FnOnce(Option<T>) -> T + Send) -> Option<T> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await;
        let updated = f(map.remove(key));
        map.insert(key.to_string(), updated.clone());
        if self.write_map(&map).await {
            Some(updated)
        } else {
            None
        }
    }

    /// Full-collection filter scan. Not indexed; see the module docs for
    /// the scale tradeoff.
    pub async fn scan(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        let _guard = self.lock.lock().await;
        let map = self.read_map().await;
        map.into_values().filter(|r| pred(r)).collect()
    }

    /// Number of records currently stored.
    pub async fn len(&self) -> usize {
        let _guard = self.lock.lock().await;
        self.read_map().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Read the backing file. A missing or malformed file is an empty
    /// collection; the malformed case is logged, not fatal.
    async fn read_map(&self) -> BTreeMap<String, T> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return BTreeMap::new();
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read collection file");
                return BTreeMap::new();
            }
        };

        match C::decode(&bytes) {
            Ok(map) => map,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "malformed collection file, treating as empty");
                BTreeMap::new()
            }
        }
    }

    /// Write the full collection to a temporary file, then atomically
    /// rename it over the original.
    async fn write_map(&self, map: &BTreeMap<String, T>) -> bool {
        match self.try_write_map(map).await {
            Ok(()) => true,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to write collection file");
                false
            }
        }
    }

    async fn try_write_map(&self, map: &BTreeMap<String, T>) -> Result<(), StoreError> {
        let bytes = C::encode(map)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), records = map.len(), "collection written");
        Ok(())
    }
}
