//! In-memory metadata cache. Entries live until explicitly invalidated.

use crate::metadata::TableMetadata;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct CacheManager {
    tables: RwLock<Option<Arc<Vec<String>>>>,
    metadata: RwLock<HashMap<String, Arc<TableMetadata>>>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tables(&self) -> Option<Arc<Vec<String>>> {
        self.tables.read().await.clone()
    }

    pub async fn set_tables(&self, tables: Vec<String>) -> Arc<Vec<String>> {
        let tables = Arc::new(tables);
        *self.tables.write().await = Some(tables.clone());
        tables
    }

    pub async fn get(&self, table: &str) -> Option<Arc<TableMetadata>> {
        self.metadata.read().await.get(table).cloned()
    }

    pub async fn insert(&self, meta: TableMetadata) -> Arc<TableMetadata> {
        let meta = Arc::new(meta);
        self.metadata
            .write()
            .await
            .insert(meta.name.clone(), meta.clone());
        meta
    }

    /// Drop one table's metadata and the table list.
    pub async fn invalidate(&self, table: &str) {
        self.metadata.write().await.remove(table);
        *self.tables.write().await = None;
        tracing::debug!(target: "db", table = %table, "metadata cache invalidated");
    }

    pub async fn clear(&self) {
        self.metadata.write().await.clear();
        *self.tables.write().await = None;
    }

    pub async fn len(&self) -> usize {
        self.metadata.read().await.len()
    }
}
