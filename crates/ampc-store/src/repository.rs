//! Repository trait and the in-memory implementation

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Flat field map of one record
pub type Fields = HashMap<String, Value>;

/// CRUD over opaque records
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create(&self, fields: Fields) -> Result<Uuid>;
    async fn get(&self, id: Uuid) -> Result<Fields>;
    async fn update(&self, id: Uuid, fields: Fields) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// In-memory repository backing the worker and the test suites
#[derive(Default, Clone)]
pub struct MemoryRepository {
    records: Arc<RwLock<HashMap<Uuid, Fields>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create(&self, fields: Fields) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.records.write().await.insert(id, fields);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Fields> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: Uuid, fields: Fields) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.extend(fields);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_get_update_delete() {
        let repo = MemoryRepository::new();

        let mut fields = Fields::new();
        fields.insert("api_version".to_string(), json!("1.0"));
        let id = repo.create(fields).await.unwrap();

        let record = repo.get(id).await.unwrap();
        assert_eq!(record["api_version"], json!("1.0"));

        let mut update = Fields::new();
        update.insert("status".to_string(), json!("active"));
        repo.update(id, update).await.unwrap();
        let record = repo.get(id).await.unwrap();
        assert_eq!(record["status"], json!("active"));
        assert_eq!(record["api_version"], json!("1.0"));

        repo.delete(id).await.unwrap();
        assert!(matches!(
            repo.get(id).await,
            Err(StoreError::NotFound(missing)) if missing == id
        ));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let repo = MemoryRepository::new();
        let id = Uuid::new_v4();
        assert!(matches!(repo.get(id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            repo.update(id, Fields::new()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(repo.delete(id).await, Err(StoreError::NotFound(_))));
    }
}
