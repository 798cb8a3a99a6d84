use crate::document::DocumentStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use dotenvy::dotenv;
use redis::AsyncCommands;
use serde_json::Value;

/// Redis 文档存储
///
/// 每个集合对应一个 Hash: `{prefix}:{collection}`，field 为文档 ID，value 为 JSON 字符串。
#[derive(Clone)]
pub struct RedisDocumentStore {
    pool: Pool,
    prefix: String,
}

impl RedisDocumentStore {
    /// 初始化 Redis 连接池 (连接是惰性建立的，这里不会访问网络)
    pub fn new(redis_url: &str, prefix: &str) -> Result<Self> {
        let cfg = Config::from_url(redis_url);
        // 使用 Tokio 运行时创建连接池
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .context("Failed to create Redis pool")?;

        Ok(Self {
            pool,
            prefix: prefix.to_string(),
        })
    }

    /// 从环境变量 REDIS_URL 初始化
    pub fn from_env(prefix: &str) -> Result<Self> {
        dotenv().ok();
        let redis_url = std::env::var("REDIS_URL").context("REDIS_URL missing")?;
        Self::new(&redis_url, prefix)
    }

    async fn get_connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .context("Failed to get redis connection")
    }

    fn hash_key(&self, collection: &str) -> String {
        format!("{}:{}", self.prefix, collection)
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    fn backend_name(&self) -> &str {
        "REDIS_STORE"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.hget(self.hash_key(collection), id).await?;

        match raw {
            Some(text) => Ok(Some(
                serde_json::from_str(&text).context("Malformed JSON document in Redis")?,
            )),
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &str, id: &str, doc: &Value) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let payload = serde_json::to_string(doc)?;
        let _: () = conn.hset(self.hash_key(collection), id, payload).await?;
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let mut conn = self.get_connection().await?;
        let raw: Vec<String> = conn.hvals(self.hash_key(collection)).await?;

        Ok(raw
            .iter()
            .filter_map(|text| match serde_json::from_str(text) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!("[REDIS_STORE] Skipping malformed document in '{}': {}", collection, e);
                    None
                }
            })
            .collect())
    }
}
