//! 模型输出的原始结构 (解析后再校验)
//!
//! 这些结构只描述模型"应该"返回什么，字段尽量宽松 (枚举值用 String 承接)，
//! 由各调用方逐个校验后转换为领域类型。JSON Schema 同时嵌入 Prompt。

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    /// Brief task title (max 100 chars)
    pub title: String,
    /// Full task description
    #[serde(default)]
    pub description: Option<String>,
    /// completed | in-progress | blocked | not-started
    #[serde(default)]
    pub status: Option<String>,
    /// low | medium | high | critical
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub estimated_hours: Option<f32>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawGap {
    #[serde(rename = "type")]
    pub gap_type: String,
    pub severity: String,
    /// Specific description of what information is missing
    pub description: String,
    #[serde(default)]
    pub affected_projects: Option<Vec<String>>,
    #[serde(default)]
    pub affected_employees: Option<Vec<String>>,
    /// Quotes from updates showing the gap
    #[serde(default)]
    pub evidence: Option<Vec<String>>,
    /// How this gap could affect project outcomes
    #[serde(default)]
    pub impact: Option<String>,
    /// 0-100
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestion {
    /// Direct, specific question addressing the knowledge gap
    pub question: String,
    /// Brief explanation of why this information is needed
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub expected_answer_type: Option<String>,
    #[serde(default)]
    pub follow_up_questions: Option<Vec<String>>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawMetric {
    pub label: String,
    /// String or number
    pub value: Value,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawSummary {
    /// Concise, descriptive title
    pub title: String,
    /// 2-3 paragraph executive summary
    pub content: String,
    #[serde(default)]
    pub key_metrics: Option<Vec<RawMetric>>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    #[serde(default)]
    pub concerns: Option<Vec<String>>,
    #[serde(default)]
    pub recommendations: Option<Vec<String>>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// 生成类型的 JSON Schema 文本 (嵌入 Prompt)
pub fn schema_of<T: JsonSchema>() -> String {
    serde_json::to_string_pretty(&schemars::schema_for!(T)).unwrap_or_default()
}

/// 置信度钳制到 0-100，缺省时使用 `default`
pub fn clamp_confidence(raw: Option<f64>, default: u8) -> u8 {
    match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => default,
    }
}

/// 指标值统一为字符串
pub fn metric_value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(clamp_confidence(Some(140.0), 70), 100);
        assert_eq!(clamp_confidence(Some(-3.0), 70), 0);
        assert_eq!(clamp_confidence(Some(84.6), 70), 85);
        assert_eq!(clamp_confidence(None, 70), 70);
    }

    #[test]
    fn schema_mentions_wire_names() {
        let schema = schema_of::<RawGap>();
        assert!(schema.contains("affectedProjects"));
        assert!(schema.contains("\"type\""));
    }
}
