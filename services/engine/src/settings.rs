use anyhow::{Context, Result};
use checkin_agent::config::LlmSettings;
use checkin_core::Timeframe;
use checkin_storage::{DocumentStore, LocalFileStore, MemoryDocumentStore, RedisDocumentStore};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 未指定配置文件时尝试加载的默认文件 (可以不存在)
const DEFAULT_CONFIG: &str = "config/default";

/// 进程配置
///
/// 加载顺序 (后者覆盖前者):
/// 1. 内置默认值
/// 2. `config/default.toml` 或 `--config` 指定的文件
/// 3. `CHECKIN__*` 环境变量，例如 `CHECKIN__LLM__PROVIDER=disabled`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub storage: StorageSettings,
    pub cache: CacheSettings,
    pub ingest: IngestSettings,
    pub analysis: AnalysisSettings,
    pub log_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            storage: StorageSettings::default(),
            cache: CacheSettings::default(),
            ingest: IngestSettings::default(),
            analysis: AnalysisSettings::default(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("CHECKIN").separator("__").try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Local,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// local 后端的根目录
    pub path: String,
    pub redis_url: Option<String>,
    /// redis 后端的 key 前缀
    pub prefix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: "data".to_string(),
            redis_url: None,
            prefix: "checkin".to_string(),
        }
    }
}

impl StorageSettings {
    pub fn build(&self) -> Result<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = match self.backend {
            StorageBackend::Memory => Arc::new(MemoryDocumentStore::new()),
            StorageBackend::Local => Arc::new(LocalFileStore::new(&self.path)?),
            StorageBackend::Redis => match self.redis_url.as_deref() {
                Some(url) => Arc::new(RedisDocumentStore::new(url, &self.prefix)?),
                None => Arc::new(RedisDocumentStore::from_env(&self.prefix)?),
            },
        };
        Ok(store)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub queue_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            queue_capacity: checkin_agent::ingest::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// 周期性缺口扫描间隔，0 表示关闭
    pub gap_scan_interval_secs: u64,
    pub timeframe: Timeframe,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            gap_scan_interval_secs: 3600,
            timeframe: Timeframe::Week,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_agent::config::LlmProvider;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            r#"
log_dir = "/tmp/checkin-logs"

[llm]
provider = "disabled"

[storage]
backend = "local"
path = "/tmp/checkin-data"

[analysis]
gap_scan_interval_secs = 0
timeframe = "month"
"#
        )?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.llm.provider, LlmProvider::Disabled);
        assert_eq!(settings.storage.backend, StorageBackend::Local);
        assert_eq!(settings.storage.path, "/tmp/checkin-data");
        assert_eq!(settings.analysis.timeframe, Timeframe::Month);
        assert_eq!(settings.analysis.gap_scan_interval_secs, 0);
        // 未出现的段落保持默认
        assert_eq!(settings.cache.ttl_secs, 300);
        assert_eq!(settings.ingest.queue_capacity, 256);
        assert_eq!(settings.log_dir, "/tmp/checkin-logs");
        Ok(())
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
