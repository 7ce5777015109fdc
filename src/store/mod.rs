//! Key-value persistence consumed by the analytics and migration layers.
//!
//! The store holds named JSON blobs. Callers inject an implementation:
//! [`SqliteStore`] on disk, [`MemoryStore`] in tests.

pub mod keys;
mod memory;
mod sqlite;

pub use keys::{LegacyCategory, LegacyRecordLocator, LocatedRecord};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Named JSON blob storage
pub trait KeyValueStore {
    /// Fetch the blob stored under `key`, `None` when absent
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous blob
    fn set(&mut self, key: &str, value: &Value) -> Result<()>;

    /// Fetch and deserialize the blob under `key`
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        (**self).set(key, value)
    }
}
