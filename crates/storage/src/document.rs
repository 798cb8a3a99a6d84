use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// 固定的集合名
pub mod collections {
    pub const EMPLOYEES: &str = "employees";
    pub const PROJECTS: &str = "projects";
    pub const TASKS: &str = "tasks";
    pub const UPDATES: &str = "updates";
}

/// 文档存储接口
///
/// 按 (collection, id) 存取 JSON 文档的窄接口。
/// 任何实现该接口的结构体（如 MemoryDocumentStore, LocalFileStore, RedisDocumentStore）
/// 都可以被注入到 ProjectManager 中。写入是尽力而为的，调用方负责记录失败。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 后端名称，仅用于日志
    fn backend_name(&self) -> &str;

    /// 读取单个文档
    ///
    /// # 返回
    /// * `Ok(Some(doc))` - 找到记录
    /// * `Ok(None)` - 未找到记录 (不是错误)
    /// * `Err(e)` - 读取过程出错 (如文件权限、网络断连)
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// 保存/覆盖文档
    async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<()>;

    /// 列出集合中的全部文档 (顺序不保证)
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;
}

// =========================================================================
// 类型化辅助方法
// =========================================================================

impl dyn DocumentStore {
    /// 序列化后写入
    pub async fn put<T: Serialize + Sync>(&self, collection: &str, id: &str, doc: &T) -> Result<()> {
        let value = serde_json::to_value(doc).context("Failed to serialize document")?;
        self.set(collection, id, &value).await
    }

    /// 读取并反序列化单个文档
    pub async fn fetch<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>> {
        match self.get(collection, id).await? {
            Some(value) => Ok(Some(
                serde_json::from_value(value)
                    .with_context(|| format!("Malformed document {}/{}", collection, id))?,
            )),
            None => Ok(None),
        }
    }

    /// 读取整个集合，跳过无法反序列化的文档
    pub async fn load_all<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let docs = self.list(collection).await?;
        let total = docs.len();

        let parsed: Vec<T> = docs
            .into_iter()
            .filter_map(|doc| serde_json::from_value(doc).ok())
            .collect();

        if parsed.len() < total {
            tracing::warn!(
                "[{}] Skipped {} malformed documents in '{}'",
                self.backend_name(),
                total - parsed.len(),
                collection
            );
        }
        Ok(parsed)
    }
}
