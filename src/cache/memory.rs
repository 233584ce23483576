//! In-process secondary cache store: a single record per key, mutated only
//! by refresh completion.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::model::CacheRecord;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, CacheRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<CacheRecord> {
        self.records.read().await.get(key).cloned()
    }

    pub async fn put(&self, key: &str, record: CacheRecord) {
        self.records.write().await.insert(key.to_string(), record);
    }
}
