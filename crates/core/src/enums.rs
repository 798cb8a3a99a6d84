// crates/core/src/enums.rs
use chrono::Duration;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 任务状态：由文本推断出的分类标签，不做状态机校验
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

/// 优先级 (项目与任务共用)，声明顺序即排序顺序: low < medium < high < critical
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ProjectStatus {
    #[default]
    Active,
    OnHold,
    Completed,
    Cancelled,
}

/// 周报情绪：blocked 优先级最高
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
    Blocked,
}

/// 知识缺口类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GapType {
    MissingDependency,
    UnclearTimeline,
    ResourceConstraint,
    TechnicalRisk,
    CommunicationGap,
    ScopeAmbiguity,
}

/// 缺口严重程度，声明顺序即排序顺序
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QuestionPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl From<Severity> for QuestionPriority {
    /// 模板问题的优先级映射: critical→urgent, high→high, 其余→medium
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => QuestionPriority::Urgent,
            Severity::High => QuestionPriority::High,
            _ => QuestionPriority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AnswerType {
    Timeline,
    Resource,
    Technical,
    Dependency,
    Status,
    #[default]
    Clarification,
}

/// 分析回看窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Timeframe {
    Day,
    #[default]
    Week,
    Month,
}

impl Timeframe {
    /// day=24h, week=7d, month=30d
    pub fn lookback(&self) -> Duration {
        match self {
            Timeframe::Day => Duration::hours(24),
            Timeframe::Week => Duration::days(7),
            Timeframe::Month => Duration::days(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SummaryType {
    ProjectStatus,
    TeamPerformance,
    WeeklyHighlights,
    RiskAlerts,
    ExecutiveBrief,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Trend {
    Up,
    Down,
    Stable,
}
