use anyhow::{Context, Result};
use checkin_core::Sentiment;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::config::{render, PromptConfig};
use crate::extractor::{self, TaskCandidate};
use crate::json::parse_json_values;
use crate::llm::ModelBackend;
use crate::schema::{schema_of, RawTask};

static NEW_PROJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)new project:\s*(.+)").expect("valid new project regex"));

/// 语言分析能力的统一入口
///
/// 模型存在时优先调用模型；模型缺失、调用失败或输出非法时，
/// 全部退回到确定性的关键词逻辑，调用方永远拿到一个结果。
pub struct LanguageAnalyzer {
    model: Option<Arc<dyn ModelBackend>>,
    prompts: PromptConfig,
}

impl LanguageAnalyzer {
    pub fn new(model: Option<Arc<dyn ModelBackend>>, prompts: PromptConfig) -> Self {
        Self { model, prompts }
    }

    /// 无模型：只走兜底逻辑
    pub fn disabled() -> Self {
        Self::new(None, PromptConfig::default())
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<Arc<dyn ModelBackend>> {
        self.model.clone()
    }

    pub fn prompts(&self) -> &PromptConfig {
        &self.prompts
    }

    // =====================================================================
    // 任务提取
    // =====================================================================

    /// 从签到文本中提取任务候选
    ///
    /// 模型返回合法的空数组时视为"确实没有任务"，不再走兜底。
    pub async fn extract_tasks(&self, text: &str) -> Vec<TaskCandidate> {
        let Some(model) = &self.model else {
            return extractor::extract_tasks(text);
        };

        match self.extract_with_model(model.as_ref(), text).await {
            Ok(tasks) => {
                tracing::debug!("[NLP] {} extracted {} tasks", model.model_name(), tasks.len());
                tasks
            }
            Err(e) => {
                tracing::warn!("[NLP] Task extraction failed, using keyword fallback: {:#}", e);
                extractor::extract_tasks(text)
            }
        }
    }

    async fn extract_with_model(&self, model: &dyn ModelBackend, text: &str) -> Result<Vec<TaskCandidate>> {
        let prompt = render(
            &self.prompts.task_extraction_prompt,
            &[("message", text), ("schema", &schema_of::<RawTask>())],
        );
        let raw = model.generate_text(&prompt).await.context("Task extraction call failed")?;
        let values = parse_json_values(&raw)?;

        // 逐个校验，非法元素直接丢弃
        Ok(values
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawTask>(v).ok())
            .filter_map(TaskCandidate::from_raw)
            .collect())
    }

    // =====================================================================
    // 情绪
    // =====================================================================

    pub async fn analyze_sentiment(&self, text: &str) -> Sentiment {
        let Some(model) = &self.model else {
            return extractor::analyze_sentiment(text);
        };

        let prompt = render(&self.prompts.sentiment_prompt, &[("message", text)]);
        match model.generate_text(&prompt).await {
            Ok(raw) => parse_sentiment_label(&raw),
            Err(e) => {
                tracing::warn!("[NLP] Sentiment call failed, using keyword fallback: {:#}", e);
                extractor::analyze_sentiment(text)
            }
        }
    }

    // =====================================================================
    // 项目归类
    // =====================================================================

    /// 让模型判断任务属于哪个已有项目，或建议一个新项目名
    ///
    /// # 返回
    /// * `Some(name)` - 已有项目名 (原样) 或新项目建议名
    /// * `None` - 模型不可用、调用失败或回答为 GENERAL
    pub async fn categorize_project(&self, task_text: &str, existing_names: &[String]) -> Option<String> {
        let model = self.model.as_ref()?;

        let projects = existing_names.join(", ");
        let prompt = render(
            &self.prompts.project_categorization_prompt,
            &[("task", task_text), ("projects", &projects)],
        );

        match model.generate_text(&prompt).await {
            Ok(raw) => parse_project_suggestion(&raw, existing_names),
            Err(e) => {
                tracing::warn!("[NLP] Project categorization failed: {:#}", e);
                None
            }
        }
    }
}

/// 情绪标签解析，blocked 最先判断
pub fn parse_sentiment_label(raw: &str) -> Sentiment {
    let lower = raw.to_lowercase();
    if lower.contains("blocked") || lower.contains("stuck") {
        Sentiment::Blocked
    } else if ["positive", "good", "great"].iter().any(|w| lower.contains(w)) {
        Sentiment::Positive
    } else if ["negative", "bad", "poor"].iter().any(|w| lower.contains(w)) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// 归类结果解析
///
/// 1. 回答中出现的第一个已有项目名
/// 2. `NEW PROJECT: xxx` 中的建议名 (去掉括号与引号)
pub fn parse_project_suggestion(raw: &str, existing_names: &[String]) -> Option<String> {
    let lower = raw.to_lowercase();
    if let Some(name) = existing_names.iter().find(|n| lower.contains(&n.to_lowercase())) {
        return Some(name.clone());
    }

    let caps = NEW_PROJECT.captures(raw)?;
    let name = caps
        .get(1)?
        .as_str()
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'' | '`' | '*'))
        .trim()
        .to_string();

    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_labels() {
        assert_eq!(parse_sentiment_label("BLOCKED"), Sentiment::Blocked);
        assert_eq!(parse_sentiment_label("Positive."), Sentiment::Positive);
        assert_eq!(parse_sentiment_label("NEGATIVE"), Sentiment::Negative);
        assert_eq!(parse_sentiment_label("NEUTRAL"), Sentiment::Neutral);
        assert_eq!(parse_sentiment_label("no idea"), Sentiment::Neutral);
    }

    #[test]
    fn project_suggestions() {
        let names = vec!["General Tasks".to_string(), "Mobile App".to_string()];
        assert_eq!(
            parse_project_suggestion("EXISTING: [mobile app]", &names).as_deref(),
            Some("Mobile App")
        );
        assert_eq!(
            parse_project_suggestion("NEW PROJECT: [Data Platform]", &names).as_deref(),
            Some("Data Platform")
        );
        assert_eq!(parse_project_suggestion("GENERAL", &names), None);
        assert_eq!(parse_project_suggestion("NEW PROJECT: \"\"", &names), None);
    }

    #[tokio::test]
    async fn disabled_analyzer_uses_keywords() {
        let analyzer = LanguageAnalyzer::disabled();
        assert!(!analyzer.is_available());
        assert_eq!(analyzer.analyze_sentiment("stuck on review").await, Sentiment::Blocked);
        assert!(analyzer.categorize_project("anything", &[]).await.is_none());
        assert!(!analyzer.extract_tasks("Finished the quarterly report.").await.is_empty());
    }
}
