use anyhow::{Context, Result};
use checkin_core::{
    CheckinError, Clock, GeneratedSummary, KeyMetric, Project, SummaryMetrics, SummaryRequest, SummaryType, Task,
    TaskMetrics, TaskStatus, Timeframe, Trend, WeeklyUpdate,
};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{render, PromptConfig};
use crate::json::parse_json_object;
use crate::llm::ModelBackend;
use crate::manager::ProjectManager;
use crate::schema::{clamp_confidence, metric_value_text, schema_of, RawSummary};
use crate::tokens::{fit_to_budget, truncate_chars};

const SAMPLE_UPDATES: usize = 10;
const SAMPLE_BUDGET: usize = 1_500;
const FALLBACK_CONFIDENCE: u8 = 30;

/// 各类型报告的关注点
fn focus_for(summary_type: SummaryType) -> &'static str {
    match summary_type {
        SummaryType::ProjectStatus => {
            "Generate a PROJECT STATUS summary focusing on:\n\
             - Overall project health and progress\n\
             - Key milestones achieved\n\
             - Potential risks and blockers\n\
             - Resource allocation effectiveness\n\
             - Next steps and upcoming deadlines"
        }
        SummaryType::TeamPerformance => {
            "Generate a TEAM PERFORMANCE summary focusing on:\n\
             - Individual contributor highlights\n\
             - Team collaboration patterns\n\
             - Productivity trends and insights\n\
             - Skill development and growth areas\n\
             - Communication effectiveness"
        }
        SummaryType::WeeklyHighlights => {
            "Generate a WEEKLY HIGHLIGHTS summary focusing on:\n\
             - Major accomplishments and wins\n\
             - Breakthrough moments and innovations\n\
             - Cross-team collaboration successes\n\
             - Problem-solving achievements\n\
             - Notable technical progress"
        }
        SummaryType::RiskAlerts => {
            "Generate a RISK ALERTS summary focusing on:\n\
             - Identified project risks and dependencies\n\
             - Resource constraints and bottlenecks\n\
             - Timeline concerns and delays\n\
             - Technical challenges requiring attention\n\
             - Communication gaps or unclear requirements"
        }
        SummaryType::ExecutiveBrief => {
            "Generate an EXECUTIVE BRIEF summary focusing on:\n\
             - High-level strategic progress\n\
             - Business impact and value delivery\n\
             - Key decisions needed from leadership\n\
             - Resource requirements and budget implications\n\
             - Competitive advantages and market positioning"
        }
    }
}

pub fn type_label(summary_type: SummaryType) -> &'static str {
    match summary_type {
        SummaryType::ProjectStatus => "Project Status",
        SummaryType::TeamPerformance => "Team Performance",
        SummaryType::WeeklyHighlights => "Weekly Highlights",
        SummaryType::RiskAlerts => "Risk Alerts",
        SummaryType::ExecutiveBrief => "Executive Brief",
    }
}

/// 窗口内的数据
struct SummaryData {
    updates: Vec<WeeklyUpdate>,
    metrics: SummaryMetrics,
}

/// **Summary Synthesizer**：面向管理层的周期性汇总
///
/// 模型不可用或输出非法时返回低置信度 (30) 的兜底报告，从不报错。
pub struct SummarySynthesizer {
    manager: Arc<ProjectManager>,
    model: Option<Arc<dyn ModelBackend>>,
    prompts: PromptConfig,
}

impl SummarySynthesizer {
    pub fn new(manager: Arc<ProjectManager>) -> Self {
        let analyzer = manager.analyzer();
        Self {
            model: analyzer.model(),
            prompts: analyzer.prompts().clone(),
            manager,
        }
    }

    pub fn with_model(mut self, model: Option<Arc<dyn ModelBackend>>) -> Self {
        self.model = model;
        self
    }

    /// **核心入口**
    pub async fn generate_summary(&self, request: &SummaryRequest) -> GeneratedSummary {
        tracing::info!(
            "[SUMMARY] Generating {} summary (timeframe: {})",
            request.summary_type,
            request.timeframe
        );

        // 1. 指标
        let data = self.gather(request).await;

        let Some(model) = &self.model else {
            return metrics_fallback(request.summary_type, &data.metrics, "Language analysis unavailable");
        };

        // 2. Prompt & 调用
        let prompt = self.build_prompt(request, &data);
        let raw = match model.generate_text(&prompt).await.context("Summary call failed") {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("[SUMMARY] {:#}", e);
                return metrics_fallback(request.summary_type, &data.metrics, "Language analysis request failed");
            }
        };

        // 3. 严格解析
        match parse_summary(&raw, request.summary_type) {
            Ok(summary) => {
                tracing::info!("[SUMMARY] Generated summary with {}% confidence", summary.confidence);
                summary
            }
            Err(e) => {
                tracing::warn!("[SUMMARY] Could not parse structured summary: {:#}", e);
                malformed_fallback(request.summary_type, &raw)
            }
        }
    }

    /// 只计算指标，不调用模型
    pub async fn compute_metrics(&self, request: &SummaryRequest) -> SummaryMetrics {
        self.gather(request).await.metrics
    }

    // --- 便捷封装 ---

    pub async fn project_status(&self, project_id: Option<&str>) -> GeneratedSummary {
        let mut request = SummaryRequest::new(SummaryType::ProjectStatus, Timeframe::Week);
        request.project_id = project_id.map(str::to_string);
        self.generate_summary(&request).await
    }

    pub async fn team_performance(&self, timeframe: Timeframe) -> GeneratedSummary {
        self.generate_summary(&SummaryRequest::new(SummaryType::TeamPerformance, timeframe))
            .await
    }

    pub async fn weekly_highlights(&self) -> GeneratedSummary {
        self.generate_summary(&SummaryRequest::new(SummaryType::WeeklyHighlights, Timeframe::Week))
            .await
    }

    pub async fn risk_alerts(&self) -> GeneratedSummary {
        self.generate_summary(&SummaryRequest::new(SummaryType::RiskAlerts, Timeframe::Week))
            .await
    }

    pub async fn executive_brief(&self) -> GeneratedSummary {
        self.generate_summary(&SummaryRequest::new(SummaryType::ExecutiveBrief, Timeframe::Month))
            .await
    }

    // =====================================================================
    // 内部实现
    // =====================================================================

    async fn gather(&self, request: &SummaryRequest) -> SummaryData {
        let snapshot = self.manager.snapshot().await;
        let cutoff = Clock::cutoff(request.timeframe.lookback());
        let project_id = request.project_id.as_deref();
        let employee_id = request.employee_id.as_deref();

        let mut updates: Vec<WeeklyUpdate> = snapshot
            .updates
            .into_iter()
            .filter(|u| u.created_at >= cutoff)
            .filter(|u| project_id.is_none_or(|pid| u.projects.iter().any(|p| p == pid)))
            .filter(|u| employee_id.is_none_or(|eid| u.employee_id == eid))
            .collect();
        updates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let tasks: Vec<Task> = snapshot
            .tasks
            .into_iter()
            .filter(|t| project_id.is_none_or(|pid| t.project_id.as_deref() == Some(pid)))
            .filter(|t| employee_id.is_none_or(|eid| t.employee_id == eid))
            .collect();
        let projects: Vec<Project> = snapshot
            .projects
            .into_iter()
            .filter(|p| project_id.is_none_or(|pid| p.id == pid))
            .collect();

        let metrics = compute_metrics(&updates, &projects, &tasks);
        SummaryData { updates, metrics }
    }

    fn build_prompt(&self, request: &SummaryRequest, data: &SummaryData) -> String {
        let metrics = &data.metrics;

        let sentiment_distribution = metrics
            .sentiment_counts
            .iter()
            .map(|(sentiment, count)| {
                format!(
                    "- {}: {} updates ({:.1}%)",
                    sentiment,
                    count,
                    percentage(*count, metrics.total_updates)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let project_status = metrics
            .project_status_counts
            .iter()
            .map(|(status, count)| format!("- {}: {} projects", status, count))
            .collect::<Vec<_>>()
            .join("\n");

        let sample_lines: Vec<String> = data
            .updates
            .iter()
            .take(SAMPLE_UPDATES)
            .enumerate()
            .map(|(i, u)| format!("{}. [{}] {}...", i + 1, u.employee_id, truncate_chars(&u.message_text, 150)))
            .collect();
        let update_sample = fit_to_budget(sample_lines, SAMPLE_BUDGET).join("\n");

        render(
            &self.prompts.summary_prompt,
            &[
                ("summary_type", type_label(request.summary_type)),
                ("timeframe", &request.timeframe.to_string()),
                ("total_updates", &metrics.total_updates.to_string()),
                ("unique_employees", &metrics.unique_employees.to_string()),
                ("active_projects", &metrics.active_projects.to_string()),
                ("completion_rate", &format!("{:.1}", metrics.task_metrics.completion_rate)),
                ("sentiment_distribution", &none_if_empty(sentiment_distribution)),
                ("project_status", &none_if_empty(project_status)),
                ("update_sample", &none_if_empty(update_sample)),
                ("focus", focus_for(request.summary_type)),
                ("schema", &schema_of::<RawSummary>()),
            ],
        )
    }
}

// =========================================================================
// 纯函数部分
// =========================================================================

/// 窗口指标
///
/// `tasks` 与 `projects` 由调用方按范围过滤后传入。
pub fn compute_metrics(updates: &[WeeklyUpdate], projects: &[Project], tasks: &[Task]) -> SummaryMetrics {
    let total_updates = updates.len();
    let unique_employees = updates.iter().map(|u| u.employee_id.as_str()).collect::<HashSet<_>>().len();
    let active_projects = updates
        .iter()
        .flat_map(|u| u.projects.iter().map(String::as_str))
        .collect::<HashSet<_>>()
        .len();

    let mut sentiment_counts = BTreeMap::new();
    for update in updates {
        *sentiment_counts.entry(update.sentiment).or_insert(0) += 1;
    }

    let mut project_status_counts = BTreeMap::new();
    for project in projects {
        *project_status_counts.entry(project.status).or_insert(0) += 1;
    }

    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    let completed = count(TaskStatus::Completed);
    let task_metrics = TaskMetrics {
        total: tasks.len(),
        completed,
        blocked: count(TaskStatus::Blocked),
        in_progress: count(TaskStatus::InProgress),
        completion_rate: percentage(completed, tasks.len()),
    };

    let average_update_length = if total_updates > 0 {
        updates.iter().map(|u| u.message_text.chars().count()).sum::<usize>() as f64 / total_updates as f64
    } else {
        0.0
    };

    SummaryMetrics {
        total_updates,
        unique_employees,
        active_projects,
        sentiment_counts,
        task_metrics,
        project_status_counts,
        average_update_length,
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn none_if_empty(text: String) -> String {
    if text.trim().is_empty() {
        "none".to_string()
    } else {
        text
    }
}

/// 严格解析：title 与 content 必须非空
fn parse_summary(raw: &str, summary_type: SummaryType) -> Result<GeneratedSummary> {
    let parsed: RawSummary = parse_json_object(raw)?;
    let title = parsed.title.trim().to_string();
    let content = parsed.content.trim().to_string();
    if title.is_empty() || content.is_empty() {
        return Err(CheckinError::MalformedResponse("Summary title or content is empty".to_string()).into());
    }

    let key_metrics = parsed
        .key_metrics
        .unwrap_or_default()
        .into_iter()
        .map(|m| KeyMetric {
            label: m.label,
            value: metric_value_text(&m.value),
            trend: m.trend.as_deref().and_then(|t| Trend::from_str(t.trim()).ok()),
            context: m.context,
        })
        .collect();

    Ok(GeneratedSummary {
        summary_type,
        title,
        content,
        key_metrics,
        highlights: parsed.highlights.unwrap_or_default(),
        concerns: parsed.concerns.unwrap_or_default(),
        recommendations: parsed.recommendations.unwrap_or_default(),
        confidence: clamp_confidence(parsed.confidence, 70),
        generated_at: Clock::now(),
    })
}

/// 模型输出无法解析：保留原文前 500 字符
fn malformed_fallback(summary_type: SummaryType, raw: &str) -> GeneratedSummary {
    GeneratedSummary {
        summary_type,
        title: format!("{} Summary", type_label(summary_type)),
        content: truncate_chars(raw, 500),
        key_metrics: Vec::new(),
        highlights: Vec::new(),
        concerns: vec!["Unable to parse structured summary".to_string()],
        recommendations: vec!["Review data quality and try again".to_string()],
        confidence: FALLBACK_CONFIDENCE,
        generated_at: Clock::now(),
    }
}

/// 模型缺失或调用失败：用本地指标生成摘要
fn metrics_fallback(summary_type: SummaryType, metrics: &SummaryMetrics, reason: &str) -> GeneratedSummary {
    let tm = &metrics.task_metrics;
    let content = format!(
        "{} updates from {} employees touched {} projects in this period. \
         {} of {} tracked tasks are completed ({:.1}%), {} in progress and {} blocked.",
        metrics.total_updates,
        metrics.unique_employees,
        metrics.active_projects,
        tm.completed,
        tm.total,
        tm.completion_rate,
        tm.in_progress,
        tm.blocked
    );

    let metric = |label: &str, value: String| KeyMetric {
        label: label.to_string(),
        value,
        trend: None,
        context: None,
    };
    let key_metrics = vec![
        metric("Total Updates", metrics.total_updates.to_string()),
        metric("Active Employees", metrics.unique_employees.to_string()),
        metric("Active Projects", metrics.active_projects.to_string()),
        metric("Task Completion Rate", format!("{:.1}%", tm.completion_rate)),
        metric("Blocked Tasks", tm.blocked.to_string()),
    ];

    let mut concerns = vec![format!("{}; summary built from metrics only", reason)];
    if tm.blocked > 0 {
        concerns.push(format!("{} blocked task(s) need attention", tm.blocked));
    }

    GeneratedSummary {
        summary_type,
        title: format!("{} Summary", type_label(summary_type)),
        content,
        key_metrics,
        highlights: Vec::new(),
        concerns,
        recommendations: vec!["Review data quality and try again".to_string()],
        confidence: FALLBACK_CONFIDENCE,
        generated_at: Clock::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::{Priority, Sentiment};

    fn update(employee: &str, projects: &[&str], sentiment: Sentiment, text: &str) -> WeeklyUpdate {
        let now = Clock::now();
        WeeklyUpdate {
            id: format!("u-{}", employee),
            employee_id: employee.to_string(),
            week_of: Clock::week_of(now),
            message_text: text.to_string(),
            extracted_tasks: vec![],
            projects: projects.iter().map(|p| p.to_string()).collect(),
            sentiment,
            has_images: false,
            image_count: 0,
            chat_metadata: Default::default(),
            created_at: now,
            processed_at: None,
        }
    }

    fn task(status: TaskStatus) -> Task {
        let now = Clock::now();
        Task {
            id: "t".to_string(),
            project_id: None,
            employee_id: "e1".to_string(),
            title: "task".to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            estimated_hours: None,
            due_date: None,
            tags: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn metrics_count_window_data() {
        let updates = vec![
            update("e1", &["p1", "p2"], Sentiment::Positive, "abcd"),
            update("e2", &["p2"], Sentiment::Blocked, "ab"),
            update("e1", &[], Sentiment::Positive, ""),
        ];
        let tasks = vec![
            task(TaskStatus::Completed),
            task(TaskStatus::Blocked),
            task(TaskStatus::InProgress),
            task(TaskStatus::Completed),
        ];
        let projects = Project::defaults(Clock::now());

        let m = compute_metrics(&updates, &projects, &tasks);
        assert_eq!(m.total_updates, 3);
        assert_eq!(m.unique_employees, 2);
        assert_eq!(m.active_projects, 2);
        assert_eq!(m.sentiment_counts[&Sentiment::Positive], 2);
        assert_eq!(m.task_metrics.completion_rate, 50.0);
        assert_eq!(m.average_update_length, 2.0);
        assert_eq!(m.project_status_counts.values().sum::<usize>(), 3);
    }

    #[test]
    fn empty_window_has_zero_rates() {
        let m = compute_metrics(&[], &[], &[]);
        assert_eq!(m.task_metrics.completion_rate, 0.0);
        assert_eq!(m.average_update_length, 0.0);
    }

    #[test]
    fn strict_parse_requires_title_and_content() {
        let ok = parse_summary(
            r#"```json
{"title": "Week 12", "content": "Solid week.", "keyMetrics": [{"label": "Done", "value": 7, "trend": "UP"}]}
```"#,
            SummaryType::WeeklyHighlights,
        )
        .unwrap();
        assert_eq!(ok.confidence, 70);
        assert_eq!(ok.key_metrics[0].value, "7");
        assert_eq!(ok.key_metrics[0].trend, Some(Trend::Up));
        assert!(ok.highlights.is_empty());

        assert!(parse_summary(r#"{"title": "", "content": "x"}"#, SummaryType::RiskAlerts).is_err());
        assert!(parse_summary("Here is my summary: things went well.", SummaryType::RiskAlerts).is_err());
    }

    #[test]
    fn malformed_fallback_keeps_500_chars() {
        let raw = "x".repeat(800);
        let s = malformed_fallback(SummaryType::ExecutiveBrief, &raw);
        assert_eq!(s.content.len(), 500);
        assert_eq!(s.confidence, 30);
        assert_eq!(s.title, "Executive Brief Summary");
        assert_eq!(s.concerns, vec!["Unable to parse structured summary".to_string()]);
    }
}
