use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enums::{
    AnswerType, GapType, ProjectStatus, QuestionPriority, Sentiment, Severity, SummaryType, Timeframe, Trend,
};

// =========================================================================
// 知识缺口 (Knowledge Gap)
// =========================================================================

/// 一次分析中发现的信息缺口，不落库，每次请求重新计算
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGap {
    pub id: String,

    #[serde(rename = "type")]
    pub gap_type: GapType,

    pub severity: Severity,

    pub description: String,

    pub affected_projects: Vec<String>,

    pub affected_employees: Vec<String>,

    /// 支撑该缺口的原文片段
    pub evidence: Vec<String>,

    pub impact: String,

    /// 置信度 0-100
    pub confidence: u8,
}

impl KnowledgeGap {
    /// 去重键: type + 受影响项目 + 受影响员工
    pub fn dedup_key(&self) -> String {
        format!(
            "{}-{}-{}",
            self.gap_type,
            self.affected_projects.join(","),
            self.affected_employees.join(",")
        )
    }
}

/// 针对 (缺口, 员工) 生成的追问
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub id: String,
    pub target_employee_id: String,
    pub target_employee_name: String,
    pub gap_id: String,
    pub gap_type: GapType,
    pub question: String,
    pub context: String,
    pub priority: QuestionPriority,
    pub expected_answer_type: AnswerType,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysisRequest {
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    /// 缺省等价于 low
    #[serde(default)]
    pub min_severity: Option<Severity>,
}

impl GapAnalysisRequest {
    pub fn with_min_severity(severity: Severity) -> Self {
        Self {
            min_severity: Some(severity),
            ..Default::default()
        }
    }

    pub fn for_employee(employee_id: &str) -> Self {
        Self {
            employee_id: Some(employee_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_project(project_id: &str) -> Self {
        Self {
            project_id: Some(project_id.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GapSummary {
    pub total_gaps: usize,
    pub critical_gaps: usize,
    pub high_priority_gaps: usize,
    pub questions_generated: usize,
    pub urgent_questions: usize,
    pub analyzed_at: DateTime<Utc>,
}

impl GapSummary {
    pub fn tally(gaps: &[KnowledgeGap], questions: &[GeneratedQuestion], analyzed_at: DateTime<Utc>) -> Self {
        Self {
            total_gaps: gaps.len(),
            critical_gaps: gaps.iter().filter(|g| g.severity == Severity::Critical).count(),
            high_priority_gaps: gaps.iter().filter(|g| g.severity == Severity::High).count(),
            questions_generated: questions.len(),
            urgent_questions: questions
                .iter()
                .filter(|q| q.priority == QuestionPriority::Urgent)
                .count(),
            analyzed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysisResult {
    pub gaps: Vec<KnowledgeGap>,
    pub questions: Vec<GeneratedQuestion>,
    pub summary: GapSummary,
}

// =========================================================================
// 汇总报告 (Summary)
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

impl SummaryRequest {
    pub fn new(summary_type: SummaryType, timeframe: Timeframe) -> Self {
        Self {
            summary_type,
            timeframe,
            project_id: None,
            employee_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSummary {
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    pub title: String,
    pub content: String,
    pub key_metrics: Vec<KeyMetric>,
    pub highlights: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
    pub total: usize,
    pub completed: usize,
    pub blocked: usize,
    pub in_progress: usize,
    /// 完成率 (百分比 0-100)
    pub completion_rate: f64,
}

/// 窗口内的统计指标，既用于 Prompt 也用于兜底报告
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub total_updates: usize,
    pub unique_employees: usize,
    /// 窗口内被签到提及的项目数
    pub active_projects: usize,
    pub sentiment_counts: BTreeMap<Sentiment, usize>,
    pub task_metrics: TaskMetrics,
    pub project_status_counts: BTreeMap<ProjectStatus, usize>,
    pub average_update_length: f64,
}
