use super::KeyValueStore;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;

/// In-memory store that also keeps the order in which keys were written
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: HashMap<String, Value>,
    writes: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without recording the entries as writes
    pub fn with_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            data: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            writes: Vec::new(),
        }
    }

    /// Keys in the order `set` was called for them
    pub fn write_log(&self) -> &[String] {
        &self.writes
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        self.writes.push(key.to_string());
        self.data.insert(key.to_string(), value.clone());
        Ok(())
    }
}
