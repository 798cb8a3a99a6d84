use crate::document::DocumentStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 本地文件存储: {root}/{collection}/{id}.json
pub struct LocalFileStore {
    root_dir: PathBuf,
}

impl LocalFileStore {
    /// 初始化存储，如果目录不存在则创建
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let root_dir = path.into();
        // 同步创建目录（仅在程序启动时执行一次，可接受同步）
        if !root_dir.exists() {
            std::fs::create_dir_all(&root_dir)
                .with_context(|| format!("Failed to create local store directory {:?}", root_dir))?;
        }
        Ok(Self { root_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root_dir.join(sanitize(collection))
    }

    fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{}.json", sanitize(id)))
    }
}

/// 文件名只保留安全字符，其余替换为 '_'
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl DocumentStore for LocalFileStore {
    fn backend_name(&self) -> &str {
        "LOCAL_STORE"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let file_path = self.doc_path(collection, id);
        if !file_path.exists() {
            return Ok(None);
        }

        // 异步读取
        let content = fs::read_to_string(&file_path).await?;
        let doc: Value = serde_json::from_str(&content)
            .with_context(|| format!("Malformed JSON in {:?}", file_path))?;
        Ok(Some(doc))
    }

    async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<()> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir).await?;

        // 序列化 (Pretty Print 方便人工调试)
        let content = serde_json::to_string_pretty(doc)?;
        fs::write(self.doc_path(collection, id), content).await?;
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut docs = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            match serde_json::from_str::<Value>(&content) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!("[LOCAL_STORE] Skipping unreadable {:?}: {}", path, e),
            }
        }
        Ok(docs)
    }
}
