// 声明子模块
pub mod cache;
pub mod document;
pub mod local;
pub mod memory;
pub mod redis;

pub use cache::{CacheEntryStat, CacheStats, ResultCache, DEFAULT_TTL};
pub use document::{collections, DocumentStore};
pub use local::LocalFileStore;
pub use memory::MemoryDocumentStore;
pub use redis::RedisDocumentStore;
