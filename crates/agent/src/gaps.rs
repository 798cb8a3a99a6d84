use anyhow::{Context, Result};
use checkin_core::{
    AnswerType, Clock, Employee, GapAnalysisRequest, GapAnalysisResult, GapSummary, GapType, GeneratedQuestion,
    KnowledgeGap, Priority, Project, ProjectStatus, QuestionPriority, Severity, Task, TaskStats, TaskStatus,
    WeeklyUpdate,
};
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{render, PromptConfig};
use crate::json::{parse_json_object, parse_json_values};
use crate::llm::ModelBackend;
use crate::manager::ProjectManager;
use crate::schema::{clamp_confidence, schema_of, RawGap, RawQuestion};
use crate::tokens::{fit_to_budget, truncate_chars};

/// 更新样本的默认 Token 预算
pub const DEFAULT_SAMPLE_BUDGET: usize = 2_000;

/// 窗口内的分析数据
#[derive(Debug, Clone, Default)]
pub struct AnalysisData {
    pub updates: Vec<WeeklyUpdate>,
    pub projects: Vec<Project>,
    pub employees: Vec<Employee>,
    pub tasks: Vec<Task>,
    /// 项目 -> 在窗口内提到它的员工
    pub project_employees: BTreeMap<String, Vec<String>>,
    /// 员工 -> 在窗口内提到的项目
    pub employee_projects: BTreeMap<String, Vec<String>>,
    /// 同一条签到里一起出现的项目
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl AnalysisData {
    fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    fn updates_mentioning(&self, project_id: &str) -> usize {
        self.updates
            .iter()
            .filter(|u| u.projects.iter().any(|p| p == project_id))
            .count()
    }

    fn project_name(&self, id: &str) -> String {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

/// 规则检测的作用范围 (来自请求的 project / employee 过滤)
#[derive(Debug, Clone, Default)]
struct RuleScope {
    project_id: Option<String>,
    employee_id: Option<String>,
}

impl RuleScope {
    fn covers_project(&self, project: &Project) -> bool {
        match (&self.project_id, &self.employee_id) {
            (Some(pid), _) => &project.id == pid,
            (None, Some(eid)) => project.assigned_employees.iter().any(|e| e == eid),
            (None, None) => true,
        }
    }

    fn covers_employee(&self, employee: &Employee) -> bool {
        self.employee_id.as_ref().is_none_or(|eid| &employee.id == eid)
    }
}

/// **Knowledge Gap Analyzer**：找出可能伤害项目的信息缺失，并生成追问
///
/// 流程：
/// 1. Gather: 按时间窗口与过滤条件收集签到，构建项目/员工关系图
/// 2. Detect: 模型检测与规则检测并发执行，模型结果在前
/// 3. Filter & Dedup: 按最低严重度过滤，按 (类型, 项目, 员工) 去重
/// 4. Questions: 每个 (缺口, 员工) 生成一条追问，失败时使用模板
///
/// 任何错误都不会抛出，最差情况下返回规则缺口 + 模板问题。
pub struct KnowledgeGapAnalyzer {
    manager: Arc<ProjectManager>,
    model: Option<Arc<dyn ModelBackend>>,
    prompts: PromptConfig,
    sample_budget: usize,
}

impl KnowledgeGapAnalyzer {
    /// 与 ProjectManager 共用同一个模型后端与 Prompt
    pub fn new(manager: Arc<ProjectManager>) -> Self {
        let analyzer = manager.analyzer();
        Self {
            model: analyzer.model(),
            prompts: analyzer.prompts().clone(),
            manager,
            sample_budget: DEFAULT_SAMPLE_BUDGET,
        }
    }

    pub fn with_model(mut self, model: Option<Arc<dyn ModelBackend>>) -> Self {
        self.model = model;
        self
    }

    pub fn with_sample_budget(mut self, budget: usize) -> Self {
        self.sample_budget = budget;
        self
    }

    /// **核心入口**
    pub async fn analyze_knowledge_gaps(&self, request: &GapAnalysisRequest) -> GapAnalysisResult {
        tracing::info!(
            "[GAP_ANALYZER] Starting analysis (timeframe: {}, project: {:?}, employee: {:?})",
            request.timeframe,
            request.project_id,
            request.employee_id
        );

        // 1. Gather
        let data = self.gather(request).await;
        let scope = RuleScope {
            project_id: request.project_id.clone(),
            employee_id: request.employee_id.clone(),
        };

        // 2. Detect (AI 在前)
        let (ai_gaps, rule_gaps) = futures::join!(self.detect_ai_gaps(&data), async {
            detect_rule_gaps(&data, &scope)
        });
        tracing::info!(
            "[GAP_ANALYZER] Detected {} AI gaps, {} rule-based gaps",
            ai_gaps.len(),
            rule_gaps.len()
        );

        // 3. Filter & Dedup
        let min_severity = request.min_severity.unwrap_or(Severity::Low);
        let gaps = dedup_gaps(
            ai_gaps
                .into_iter()
                .chain(rule_gaps)
                .filter(|g| g.severity >= min_severity)
                .collect(),
        );

        // 4. Questions
        let questions = self.generate_questions(&gaps, &data).await;

        // 5. Summary
        let summary = GapSummary::tally(&gaps, &questions, Clock::now());
        tracing::info!(
            "[GAP_ANALYZER] Analysis complete: {} gaps ({} critical), {} questions",
            summary.total_gaps,
            summary.critical_gaps,
            summary.questions_generated
        );

        GapAnalysisResult {
            gaps,
            questions,
            summary,
        }
    }

    /// 只返回 high 及以上的缺口
    pub async fn find_critical_gaps(&self) -> Vec<KnowledgeGap> {
        self.analyze_knowledge_gaps(&GapAnalysisRequest::with_min_severity(Severity::High))
            .await
            .gaps
    }

    /// 针对某个员工的追问
    pub async fn generate_questions_for_employee(&self, employee_id: &str) -> Vec<GeneratedQuestion> {
        let result = self
            .analyze_knowledge_gaps(&GapAnalysisRequest::for_employee(employee_id))
            .await;
        questions_for_employee(&result, employee_id)
    }

    /// 影响某个项目的缺口所产生的追问
    pub async fn generate_questions_for_project(&self, project_id: &str) -> Vec<GeneratedQuestion> {
        let result = self
            .analyze_knowledge_gaps(&GapAnalysisRequest::for_project(project_id))
            .await;
        questions_for_project(&result, project_id)
    }

    // =====================================================================
    // 1. Gather
    // =====================================================================

    async fn gather(&self, request: &GapAnalysisRequest) -> AnalysisData {
        let snapshot = self.manager.snapshot().await;
        let cutoff = Clock::cutoff(request.timeframe.lookback());

        let mut updates: Vec<WeeklyUpdate> = snapshot
            .updates
            .into_iter()
            .filter(|u| u.created_at >= cutoff)
            .filter(|u| {
                request
                    .project_id
                    .as_ref()
                    .is_none_or(|pid| u.projects.iter().any(|p| p == pid))
            })
            .filter(|u| request.employee_id.as_ref().is_none_or(|eid| &u.employee_id == eid))
            .collect();
        // 最新的在前
        updates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut data = AnalysisData {
            updates,
            projects: snapshot.projects,
            employees: snapshot.employees,
            tasks: snapshot.tasks,
            ..Default::default()
        };
        build_relationship_maps(&mut data);
        data
    }

    // =====================================================================
    // 2. Detect (AI)
    // =====================================================================

    async fn detect_ai_gaps(&self, data: &AnalysisData) -> Vec<KnowledgeGap> {
        let Some(model) = &self.model else {
            return Vec::new();
        };

        match self.request_ai_gaps(model.as_ref(), data).await {
            Ok(gaps) => gaps,
            Err(e) => {
                tracing::warn!("[GAP_ANALYZER] AI gap detection failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn request_ai_gaps(&self, model: &dyn ModelBackend, data: &AnalysisData) -> Result<Vec<KnowledgeGap>> {
        let prompt = self.build_gap_prompt(data);
        let raw = model.generate_text(&prompt).await.context("Gap analysis call failed")?;
        let values = parse_json_values(&raw)?;
        let total = values.len();

        let gaps: Vec<KnowledgeGap> = values
            .into_iter()
            .filter_map(|v| serde_json::from_value::<RawGap>(v).ok())
            .filter_map(validate_gap)
            .collect();

        if gaps.len() < total {
            tracing::debug!("[GAP_ANALYZER] Rejected {} invalid AI gaps", total - gaps.len());
        }
        Ok(gaps)
    }

    fn build_gap_prompt(&self, data: &AnalysisData) -> String {
        let project_overview = data
            .projects
            .iter()
            .map(|p| {
                format!(
                    "- {} (id: {}): status {}, priority {}, {} assigned, {} updates in window",
                    p.name,
                    p.id,
                    p.status,
                    p.priority,
                    p.assigned_employees.len(),
                    data.updates_mentioning(&p.id)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let sample_lines: Vec<String> = data
            .updates
            .iter()
            .map(|u| {
                let author = data
                    .employee(&u.employee_id)
                    .map(|e| e.display_name.as_str())
                    .unwrap_or(u.employee_id.as_str());
                format!(
                    "- [{}] {} (id: {}, projects: {}): {}",
                    u.week_of,
                    author,
                    u.employee_id,
                    u.projects.join(", "),
                    truncate_chars(&u.message_text, 300)
                )
            })
            .collect();
        let update_sample = fit_to_budget(sample_lines, self.sample_budget).join("\n");

        let stats = TaskStats::from_tasks(&data.tasks);
        let task_distribution = format!(
            "completed: {}, in-progress: {}, blocked: {}, not-started: {}",
            stats.completed, stats.in_progress, stats.blocked, stats.not_started
        );

        let dependencies = if data.dependencies.is_empty() {
            "none observed".to_string()
        } else {
            data.dependencies
                .iter()
                .map(|(p, others)| format!("- {} <-> {}", p, others.join(", ")))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let assignment_count: usize = data.employee_projects.values().map(Vec::len).sum();

        render(
            &self.prompts.gap_analysis_prompt,
            &[
                ("update_count", &data.updates.len().to_string()),
                ("project_count", &data.projects.len().to_string()),
                ("task_count", &data.tasks.len().to_string()),
                ("assignment_count", &assignment_count.to_string()),
                ("project_overview", &project_overview),
                ("update_sample", &or_none(update_sample)),
                ("task_distribution", &task_distribution),
                ("dependencies", &dependencies),
                ("schema", &schema_of::<RawGap>()),
            ],
        )
    }

    // =====================================================================
    // 4. Questions
    // =====================================================================

    /// 并发生成，返回顺序与 (缺口, 员工) 的遍历顺序一致
    async fn generate_questions(&self, gaps: &[KnowledgeGap], data: &AnalysisData) -> Vec<GeneratedQuestion> {
        let mut futures = Vec::new();
        for gap in gaps {
            for employee_id in &gap.affected_employees {
                if let Some(employee) = data.employee(employee_id) {
                    futures.push(self.generate_question(gap, employee, data));
                }
            }
        }
        join_all(futures).await
    }

    async fn generate_question(
        &self,
        gap: &KnowledgeGap,
        employee: &Employee,
        data: &AnalysisData,
    ) -> GeneratedQuestion {
        let Some(model) = &self.model else {
            return template_question(gap, employee);
        };

        match self.request_ai_question(model.as_ref(), gap, employee, data).await {
            Ok(question) => question,
            Err(e) => {
                tracing::warn!(
                    "[GAP_ANALYZER] Question generation for {} failed, using template: {:#}",
                    employee.id,
                    e
                );
                template_question(gap, employee)
            }
        }
    }

    async fn request_ai_question(
        &self,
        model: &dyn ModelBackend,
        gap: &KnowledgeGap,
        employee: &Employee,
        data: &AnalysisData,
    ) -> Result<GeneratedQuestion> {
        let employee_updates: Vec<&WeeklyUpdate> =
            data.updates.iter().filter(|u| u.employee_id == employee.id).collect();
        let recent_work = employee_updates
            .iter()
            .take(2)
            .map(|u| truncate_chars(&u.message_text, 100))
            .collect::<Vec<_>>()
            .join("; ");
        let projects = gap
            .affected_projects
            .iter()
            .map(|p| data.project_name(p))
            .collect::<Vec<_>>()
            .join(", ");

        let prompt = render(
            &self.prompts.question_generation_prompt,
            &[
                ("employee_name", &employee.display_name),
                ("gap_type", &gap.gap_type.to_string()),
                ("severity", &gap.severity.to_string()),
                ("description", &gap.description),
                ("impact", &gap.impact),
                ("employee_email", &employee.email),
                ("update_count", &employee_updates.len().to_string()),
                ("recent_work", &or_none(recent_work)),
                ("projects", &or_none(projects)),
                ("schema", &schema_of::<RawQuestion>()),
            ],
        );

        let raw = model.generate_text(&prompt).await.context("Question generation call failed")?;
        let parsed: RawQuestion = parse_json_object(&raw)?;
        Ok(ai_question(parsed, gap, employee))
    }
}

// =========================================================================
// 纯函数部分
// =========================================================================

fn build_relationship_maps(data: &mut AnalysisData) {
    for update in &data.updates {
        for pid in &update.projects {
            push_unique(data.project_employees.entry(pid.clone()).or_default(), &update.employee_id);
            push_unique(data.employee_projects.entry(update.employee_id.clone()).or_default(), pid);

            for other in update.projects.iter().filter(|o| *o != pid) {
                push_unique(data.dependencies.entry(pid.clone()).or_default(), other);
            }
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn or_none(text: String) -> String {
    if text.trim().is_empty() {
        "none".to_string()
    } else {
        text
    }
}

/// 模型缺口校验：类型/严重度非法或描述为空的直接丢弃
fn validate_gap(raw: RawGap) -> Option<KnowledgeGap> {
    let gap_type = GapType::from_str(raw.gap_type.trim()).ok()?;
    let severity = Severity::from_str(raw.severity.trim()).ok()?;
    let description = raw.description.trim().to_string();
    if description.is_empty() {
        return None;
    }

    let mut gap = KnowledgeGap {
        id: String::new(),
        gap_type,
        severity,
        description,
        affected_projects: raw.affected_projects.unwrap_or_default(),
        affected_employees: raw.affected_employees.unwrap_or_default(),
        evidence: raw.evidence.unwrap_or_default(),
        impact: raw.impact.unwrap_or_default(),
        confidence: clamp_confidence(raw.confidence, 70),
    };
    gap.id = format!("ai-gap-{}", gap.dedup_key());
    Some(gap)
}

/// 规则检测 (总是执行)
///
/// 1. 活跃项目在窗口内零签到
/// 2. 员工有 blocked 任务，但窗口内的签到从未提到阻塞
/// 3. 高优先级项目的签到数 / 分配人数 < 1
fn detect_rule_gaps(data: &AnalysisData, scope: &RuleScope) -> Vec<KnowledgeGap> {
    let mut gaps = Vec::new();

    // 1. 沉默项目
    for project in data.projects.iter().filter(|p| scope.covers_project(p)) {
        if project.status == ProjectStatus::Active && data.updates_mentioning(&project.id) == 0 {
            gaps.push(KnowledgeGap {
                id: format!("silent-project-{}", project.id),
                gap_type: GapType::CommunicationGap,
                severity: Severity::Medium,
                description: format!("Project \"{}\" has no recent status updates from team members", project.name),
                affected_projects: vec![project.id.clone()],
                affected_employees: project.assigned_employees.clone(),
                evidence: vec!["No updates found in recent timeframe".to_string()],
                impact: "Project status and progress unclear to management".to_string(),
                confidence: 90,
            });
        }
    }

    // 2. 未上报的阻塞
    for employee in data.employees.iter().filter(|e| scope.covers_employee(e)) {
        let blocked: Vec<&Task> = data
            .tasks
            .iter()
            .filter(|t| t.employee_id == employee.id && t.status == TaskStatus::Blocked)
            .collect();
        if blocked.is_empty() {
            continue;
        }

        let reported = data.updates.iter().filter(|u| u.employee_id == employee.id).any(|u| {
            let text = u.message_text.to_lowercase();
            ["block", "stuck", "waiting"].iter().any(|w| text.contains(w))
        });
        if reported {
            continue;
        }

        let mut projects = Vec::new();
        for task in &blocked {
            if let Some(pid) = &task.project_id {
                push_unique(&mut projects, pid);
            }
        }
        gaps.push(KnowledgeGap {
            id: format!("blocked-silence-{}", employee.id),
            gap_type: GapType::CommunicationGap,
            severity: Severity::High,
            description: "Employee has blocked tasks but hasn't reported the blockers in recent updates".to_string(),
            affected_projects: projects,
            affected_employees: vec![employee.id.clone()],
            evidence: vec![format!("{} blocked tasks without status updates", blocked.len())],
            impact: "Blocked work may delay project timelines without management awareness".to_string(),
            confidence: 80,
        });
    }

    // 3. 高优先级项目沟通不足
    for project in data.projects.iter().filter(|p| scope.covers_project(p)) {
        let assigned = project.assigned_employees.len();
        if project.priority < Priority::High || assigned == 0 {
            continue;
        }
        let updates = data.updates_mentioning(&project.id);
        if (updates as f64) / (assigned as f64) < 1.0 {
            gaps.push(KnowledgeGap {
                id: format!("low-comms-{}", project.id),
                gap_type: GapType::CommunicationGap,
                severity: Severity::Medium,
                description: format!(
                    "High-priority project \"{}\" has low communication frequency relative to team size",
                    project.name
                ),
                affected_projects: vec![project.id.clone()],
                affected_employees: project.assigned_employees.clone(),
                evidence: vec![format!("{} updates from {} team members", updates, assigned)],
                impact: "High-priority project may have hidden risks or delays".to_string(),
                confidence: 75,
            });
        }
    }

    gaps
}

pub fn questions_for_employee(result: &GapAnalysisResult, employee_id: &str) -> Vec<GeneratedQuestion> {
    result
        .questions
        .iter()
        .filter(|q| q.target_employee_id == employee_id)
        .cloned()
        .collect()
}

pub fn questions_for_project(result: &GapAnalysisResult, project_id: &str) -> Vec<GeneratedQuestion> {
    let gap_ids: HashSet<&str> = result
        .gaps
        .iter()
        .filter(|g| g.affected_projects.iter().any(|p| p == project_id))
        .map(|g| g.id.as_str())
        .collect();

    result
        .questions
        .iter()
        .filter(|q| gap_ids.contains(q.gap_id.as_str()))
        .cloned()
        .collect()
}

/// 按 (类型, 项目, 员工) 去重，保留第一次出现
pub fn dedup_gaps(gaps: Vec<KnowledgeGap>) -> Vec<KnowledgeGap> {
    let mut seen = HashSet::new();
    gaps.into_iter().filter(|g| seen.insert(g.dedup_key())).collect()
}

fn ai_question(raw: RawQuestion, gap: &KnowledgeGap, employee: &Employee) -> GeneratedQuestion {
    let question = match raw.question.trim() {
        "" => "Could you provide more details about your current work status?".to_string(),
        text => text.to_string(),
    };

    GeneratedQuestion {
        id: format!("question-{}-{}", gap.id, employee.id),
        target_employee_id: employee.id.clone(),
        target_employee_name: employee.display_name.clone(),
        gap_id: gap.id.clone(),
        gap_type: gap.gap_type,
        question,
        context: raw
            .context
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "Additional information needed for project planning".to_string()),
        priority: raw
            .priority
            .as_deref()
            .and_then(|p| QuestionPriority::from_str(p.trim()).ok())
            .unwrap_or_else(|| QuestionPriority::from(gap.severity)),
        expected_answer_type: raw
            .expected_answer_type
            .as_deref()
            .and_then(|a| AnswerType::from_str(a.trim()).ok())
            .unwrap_or_default(),
        follow_up_questions: raw.follow_up_questions.unwrap_or_default(),
        confidence: clamp_confidence(raw.confidence, 70),
        generated_at: Clock::now(),
    }
}

/// 模板问题 (置信度 60)
pub fn template_question(gap: &KnowledgeGap, employee: &Employee) -> GeneratedQuestion {
    let name = &employee.display_name;
    let question = match gap.gap_type {
        GapType::MissingDependency => format!(
            "Hi {}, could you clarify any dependencies or blockers affecting your work on the projects you're involved in?",
            name
        ),
        GapType::UnclearTimeline => format!(
            "Hi {}, could you provide updated timelines for your current tasks and any potential delays you foresee?",
            name
        ),
        GapType::ResourceConstraint => format!(
            "Hi {}, do you have the resources and support needed to complete your current assignments effectively?",
            name
        ),
        GapType::TechnicalRisk => format!(
            "Hi {}, are there any technical challenges or risks in your current work that management should be aware of?",
            name
        ),
        GapType::CommunicationGap => format!(
            "Hi {}, could you provide a status update on your current projects and any coordination needs with other team members?",
            name
        ),
        GapType::ScopeAmbiguity => format!(
            "Hi {}, are there any unclear requirements or scope questions in your current projects that need clarification?",
            name
        ),
    };

    GeneratedQuestion {
        id: format!("fallback-{}-{}", gap.id, employee.id),
        target_employee_id: employee.id.clone(),
        target_employee_name: name.clone(),
        gap_id: gap.id.clone(),
        gap_type: gap.gap_type,
        question,
        context: format!("Following up on {} identified in recent project analysis", gap.gap_type),
        priority: QuestionPriority::from(gap.severity),
        expected_answer_type: AnswerType::Clarification,
        follow_up_questions: Vec::new(),
        confidence: 60,
        generated_at: Clock::now(),
    }
}
