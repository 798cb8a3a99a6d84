use crate::llm::gemini::{GeminiBackend, DEFAULT_GEMINI_MODEL};
use crate::llm::openai::OpenAiBackend;
use crate::llm::ModelBackend;
use anyhow::Result;
use checkin_core::CheckinError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// --- Prompt 配置中心 ---
/// 编译时加载 crates/agent/prompts/ 下的 Markdown 文件
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub task_extraction_prompt: String,
    pub sentiment_prompt: String,
    pub project_categorization_prompt: String,
    pub gap_analysis_prompt: String,
    pub question_generation_prompt: String,
    pub summary_prompt: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            // 路径是相对于当前 rust 源文件的
            task_extraction_prompt: include_str!("../prompts/task_extraction.md").trim().to_string(),
            sentiment_prompt: include_str!("../prompts/sentiment.md").trim().to_string(),
            project_categorization_prompt: include_str!("../prompts/project_categorization.md")
                .trim()
                .to_string(),
            gap_analysis_prompt: include_str!("../prompts/gap_analysis.md").trim().to_string(),
            question_generation_prompt: include_str!("../prompts/question_generation.md")
                .trim()
                .to_string(),
            summary_prompt: include_str!("../prompts/summary.md").trim().to_string(),
        }
    }
}

/// 模板替换: 把 `{{key}}` 替换为对应的值
///
/// 只扫描模板本身一遍，替换进来的值不会再被展开；未知占位符原样保留。
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// --- LLM 环境配置 ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenAi,
    /// 关闭语言分析能力，全部走确定性兜底逻辑
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            api_key: None,
            base_url: None,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    /// 根据配置构建模型后端
    ///
    /// # 返回
    /// * `Ok(Some(backend))` - 能力可用
    /// * `Ok(None)` - 显式关闭，或缺少 API Key (记录警告后降级)
    /// * `Err(e)` - 配置本身非法 (如 API Key 含非法字符)
    pub fn build_backend(&self) -> Result<Option<Arc<dyn ModelBackend>>> {
        let api_key = self.api_key.clone().filter(|k| !k.trim().is_empty());

        match self.provider {
            LlmProvider::Disabled => {
                tracing::info!("[LLM] Language capability disabled by configuration");
                Ok(None)
            }
            LlmProvider::Gemini => {
                let Some(api_key) = api_key.or_else(|| std::env::var("GEMINI_API_KEY").ok()) else {
                    tracing::warn!("[LLM] GEMINI_API_KEY not found - AI features will be disabled");
                    return Ok(None);
                };
                let model = self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
                let backend = GeminiBackend::new(&api_key, model, Duration::from_secs(self.timeout_secs))?;
                Ok(Some(Arc::new(backend)))
            }
            LlmProvider::OpenAi => {
                let model = self
                    .model
                    .as_deref()
                    .ok_or_else(|| CheckinError::ConfigError("llm.model is required for openai".to_string()))?;
                let backend = match (api_key, self.base_url.as_deref()) {
                    (Some(key), Some(base_url)) => OpenAiBackend::new_with_base_url(&key, base_url, model),
                    (Some(key), None) => {
                        OpenAiBackend::new_with_base_url(&key, "https://api.openai.com/v1", model)
                    }
                    (None, _) if std::env::var("OPENAI_API_KEY").is_ok() => OpenAiBackend::new(model),
                    (None, _) => {
                        tracing::warn!("[LLM] OPENAI_API_KEY not found - AI features will be disabled");
                        return Ok(None);
                    }
                };
                Ok(Some(Arc::new(backend)))
            }
        }
    }
}
