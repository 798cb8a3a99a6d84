use crate::document::DocumentStore;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 纯内存文档存储，进程退出即丢失 (测试与默认运行模式)
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 集合内的文档数量
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend_name(&self) -> &str {
        "MEMORY_STORE"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<()> {
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc.clone());
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_and_list() {
        let store = MemoryDocumentStore::new();
        store.set("tasks", "t1", &json!({"id": "t1"})).await.unwrap();
        store.set("tasks", "t1", &json!({"id": "t1", "v": 2})).await.unwrap();

        assert_eq!(store.get("tasks", "t1").await.unwrap().unwrap()["v"], 2);
        assert!(store.get("tasks", "missing").await.unwrap().is_none());
        assert_eq!(store.list("tasks").await.unwrap().len(), 1);
        assert!(store.list("projects").await.unwrap().is_empty());
        assert_eq!(store.count("tasks").await, 1);
    }
}
