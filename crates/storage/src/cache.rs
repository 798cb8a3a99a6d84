use checkin_core::SummaryType;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 默认过期时间: 5 分钟
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// TTL 上限: 30 天，更长的 TTL 会被截断
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// 默认清扫周期: 60 秒
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStat {
    pub key: String,
    /// 已存活时长 (毫秒)
    pub age_ms: u64,
    /// 剩余寿命 (毫秒)，已过期但尚未清理的条目为负数
    pub ttl_ms: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub entries: Vec<CacheEntryStat>,
}

/// 带 TTL 的结果缓存
///
/// 过期检查有两条路径：
/// 1. 读取 (`get` / `has`) 时惰性删除
/// 2. 后台清扫任务 (`spawn_sweeper`) 周期性删除
///
/// 所有操作都在一把短时 Mutex 内完成，清扫与读写不会交错。
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V> Default for ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 写入 (覆盖同名 key)，`ttl` 缺省时使用默认 TTL
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        let ttl = ttl.unwrap_or(self.default_ttl).min(MAX_TTL);
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: now.checked_add(ttl).unwrap_or(now),
        };
        self.entries.lock().await.insert(key.into(), entry);
    }

    /// 读取，过期条目在此处被删除
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.entries.lock().await;
        let now = Instant::now();

        match guard.get(key) {
            Some(entry) if entry.is_expired(now) => {
                guard.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        let mut guard = self.entries.lock().await;
        let now = Instant::now();

        match guard.get(key) {
            Some(entry) if entry.is_expired(now) => {
                guard.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// 删除所有 key 中包含 `pattern` 子串的条目，返回删除数量
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|key, _| !key.contains(pattern));
        before - guard.len()
    }

    /// 按谓词删除条目，返回删除数量
    pub async fn invalidate_where(&self, predicate: impl Fn(&str) -> bool) -> usize {
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|key, _| !predicate(key));
        before - guard.len()
    }

    /// 清理所有已过期条目，返回删除数量
    pub async fn sweep(&self) -> usize {
        let mut guard = self.entries.lock().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now));
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        let guard = self.entries.lock().await;
        let now = Instant::now();

        let mut entries: Vec<CacheEntryStat> = guard
            .iter()
            .map(|(key, entry)| {
                let ttl_ms = if entry.expires_at >= now {
                    (entry.expires_at - now).as_millis() as i64
                } else {
                    -((now - entry.expires_at).as_millis() as i64)
                };
                CacheEntryStat {
                    key: key.clone(),
                    age_ms: now.duration_since(entry.created_at).as_millis() as u64,
                    ttl_ms,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        CacheStats {
            size: guard.len(),
            entries,
        }
    }

    /// 启动后台清扫任务，收到取消信号后退出
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, token: CancellationToken) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // 第一次 tick 立即返回，跳过
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("[CACHE] Sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.sweep().await;
                        if removed > 0 {
                            tracing::debug!("[CACHE] Swept {} expired entries", removed);
                        }
                    }
                }
            }
        })
    }
}

// =========================================================================
// Key 生成
// =========================================================================

/// `summary:<type>[:scope]`
pub fn summary_key(summary_type: SummaryType, scope: Option<&str>) -> String {
    match scope {
        Some(scope) => format!("summary:{}:{}", summary_type, scope),
        None => format!("summary:{}", summary_type),
    }
}

/// `gaps[:scope]`
pub fn gaps_key(scope: Option<&str>) -> String {
    match scope {
        Some(scope) => format!("gaps:{}", scope),
        None => "gaps".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache: ResultCache<String> = ResultCache::default();
        cache.set("k", "v".to_string(), Some(Duration::from_millis(100))).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get("k").await.is_none());
        assert!(!cache.has("k").await);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn oversized_ttl_is_capped() {
        let cache: ResultCache<u32> = ResultCache::new(Duration::MAX);
        cache.set("default", 1, None).await;
        cache.set("explicit", 2, Some(Duration::MAX)).await;

        assert_eq!(cache.get("default").await, Some(1));
        assert_eq!(cache.get("explicit").await, Some(2));
        let stats = cache.stats().await;
        assert!(stats.entries.iter().all(|e| e.ttl_ms <= MAX_TTL.as_millis() as i64));
    }

    #[tokio::test]
    async fn has_removes_expired_entry() {
        let cache: ResultCache<u32> = ResultCache::default();
        cache.set("short", 1, Some(Duration::from_millis(20))).await;
        cache.set("long", 2, None).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!cache.has("short").await);
        assert!(cache.has("long").await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired() {
        let cache: ResultCache<u32> = ResultCache::default();
        cache.set("a", 1, Some(Duration::from_millis(10))).await;
        cache.set("b", 2, Some(Duration::from_millis(10))).await;
        cache.set("c", 3, None).await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.sweep().await, 2);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.sweep().await, 0);
    }

    #[tokio::test]
    async fn invalidate_pattern_matches_substring() {
        let cache: ResultCache<u32> = ResultCache::default();
        cache.set(summary_key(SummaryType::RiskAlerts, None), 1, None).await;
        cache.set(summary_key(SummaryType::ProjectStatus, Some("p1")), 2, None).await;
        cache.set(gaps_key(Some("p1")), 3, None).await;
        cache.set(gaps_key(None), 4, None).await;

        assert_eq!(cache.invalidate_pattern("p1").await, 2);
        assert_eq!(cache.invalidate_pattern("nothing").await, 0);
        assert!(cache.has("gaps").await);
        assert!(cache.delete("gaps").await);
        assert!(!cache.delete("gaps").await);
    }

    #[tokio::test]
    async fn stats_report_age_and_remaining_ttl() {
        let cache: ResultCache<u32> = ResultCache::default();
        cache.set("x", 1, Some(Duration::from_secs(10))).await;

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.entries[0].key, "x");
        assert!(stats.entries[0].ttl_ms > 9_000 && stats.entries[0].ttl_ms <= 10_000);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn sweeper_stops_on_cancel() {
        let cache: Arc<ResultCache<u32>> = Arc::new(ResultCache::default());
        cache.set("gone", 1, Some(Duration::from_millis(5))).await;

        let token = CancellationToken::new();
        let handle = cache.spawn_sweeper(Duration::from_millis(20), token.clone());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.stats().await.size, 0);

        token.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn key_helpers_namespace_by_scope() {
        assert_eq!(summary_key(SummaryType::ExecutiveBrief, None), "summary:executive_brief");
        assert_eq!(summary_key(SummaryType::ProjectStatus, Some("p9")), "summary:project_status:p9");
        assert_eq!(gaps_key(None), "gaps");
        assert_eq!(gaps_key(Some("p9")), "gaps:p9");
    }
}
