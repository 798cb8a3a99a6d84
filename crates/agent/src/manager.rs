use crate::config::PromptConfig;
use crate::extractor::TaskCandidate;
use crate::llm::ModelBackend;
use crate::nlp::LanguageAnalyzer;
use anyhow::Result;
use checkin_core::{
    ensure_not_empty, Clock, Employee, ProcessUpdateRequest, ProcessUpdateResponse, Project, ProjectStatus, Sentiment,
    Task, TaskStats, WeeklyUpdate, GENERAL_PROJECT_ID,
};
use checkin_storage::{collections, DocumentStore};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

// --- Builder 实现 ---

/// `ProjectManager` 的构建器
/// 模型与持久化后端都是可选的：缺了任何一个，签到处理照常进行。
pub struct ProjectManagerBuilder {
    model: Option<Arc<dyn ModelBackend>>,
    store: Option<Arc<dyn DocumentStore>>,
    prompts: PromptConfig,
}

impl Default for ProjectManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectManagerBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            store: None,
            prompts: PromptConfig::default(),
        }
    }

    pub fn with_model(mut self, model: Option<Arc<dyn ModelBackend>>) -> Self {
        self.model = model;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 替换默认的 Prompt 配置
    pub fn with_prompts(mut self, prompts: PromptConfig) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn build(self) -> ProjectManager {
        let now = Clock::now();
        let mut state = ManagerState::default();
        for project in Project::defaults(now) {
            state.projects.insert(project.id.clone(), project);
        }

        let instance_id = format!("pm_{}", Uuid::new_v4().simple());
        tracing::info!(
            "[PROJECT_MANAGER] Instance {} ready (model: {}, store: {})",
            instance_id,
            self.model.as_ref().map(|m| m.model_name()).unwrap_or("none"),
            self.store.as_ref().map(|s| s.backend_name()).unwrap_or("none"),
        );

        ProjectManager {
            instance_id,
            analyzer: Arc::new(LanguageAnalyzer::new(self.model, self.prompts)),
            store: self.store,
            state: RwLock::new(state),
        }
    }
}

// --- 数据结构 ---

/// 内存状态，IndexMap 保证遍历顺序即插入顺序
#[derive(Debug, Default)]
struct ManagerState {
    employees: IndexMap<String, Employee>,
    projects: IndexMap<String, Project>,
    tasks: IndexMap<String, Task>,
    updates: IndexMap<String, WeeklyUpdate>,
}

/// 一致的全量快照 (分析流程使用)
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub employees: Vec<Employee>,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub updates: Vec<WeeklyUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    pub project_id: String,
    pub name: String,
    pub status: ProjectStatus,
    pub assigned_employees: usize,
    pub tasks: TaskStats,
    pub update_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub instance_id: String,
    pub employee_count: usize,
    pub project_count: usize,
    pub task_count: usize,
    pub update_count: usize,
    pub latest_update: Option<WeeklyUpdate>,
}

/// **Project Manager**：签到数据的唯一内存权威
///
/// 核心职责：
/// 1. 处理签到 (员工登记 -> 任务提取 -> 情绪 -> 项目归属 -> 持久化 -> 回执)
/// 2. 对外提供状态快照与统计
/// 3. 启动时从持久化后端恢复状态
///
/// 读写锁从不跨越模型调用或存储调用的 await 点。
pub struct ProjectManager {
    instance_id: String,
    analyzer: Arc<LanguageAnalyzer>,
    store: Option<Arc<dyn DocumentStore>>,
    state: RwLock<ManagerState>,
}

impl ProjectManager {
    /// 快捷构造函数：无模型、无持久化
    pub fn new() -> Self {
        ProjectManagerBuilder::new().build()
    }

    pub fn builder() -> ProjectManagerBuilder {
        ProjectManagerBuilder::new()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn analyzer(&self) -> Arc<LanguageAnalyzer> {
        self.analyzer.clone()
    }

    // =====================================================================
    // 签到处理
    // =====================================================================

    /// **核心入口**：处理一条签到消息
    ///
    /// 内部任何错误都会被记录并转换为统一的失败回执，已经生效的修改不回滚。
    pub async fn process_update(&self, request: ProcessUpdateRequest) -> ProcessUpdateResponse {
        match self.try_process_update(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("[PROJECT_MANAGER] Failed to process update: {:#}", e);
                ProcessUpdateResponse::failure()
            }
        }
    }

    async fn try_process_update(&self, request: ProcessUpdateRequest) -> Result<ProcessUpdateResponse> {
        ensure_not_empty!(request.employee_id.trim(), "employeeId");
        ensure_not_empty!(request.message_text.trim(), "messageText");

        let now = Clock::now();
        tracing::info!(
            "[PROJECT_MANAGER] Processing update from {} ({} chars)",
            request.employee_id,
            request.message_text.chars().count()
        );

        // 1. 员工登记
        if let Some(employee) = self.upsert_employee(&request, now).await {
            self.persist(collections::EMPLOYEES, &employee.id, &employee).await;
        }

        // 2. 任务提取 & 3. 情绪
        let candidates = self.analyzer.extract_tasks(&request.message_text).await;
        let sentiment = self.analyzer.analyze_sentiment(&request.message_text).await;

        // 4. 逐个归属项目
        let mut tasks = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            tasks.push(self.assign_candidate(candidate, &request.employee_id).await);
        }

        let mut project_ids: Vec<String> = Vec::new();
        for task in &tasks {
            if let Some(pid) = &task.project_id {
                if !project_ids.contains(pid) {
                    project_ids.push(pid.clone());
                }
            }
        }

        // 5. 写入状态并持久化
        let week_of = match request.week_of.trim() {
            "" => Clock::week_of(now),
            week => week.to_string(),
        };
        let update = WeeklyUpdate {
            id: format!("update_{}", Uuid::new_v4().simple()),
            employee_id: request.employee_id.clone(),
            week_of,
            message_text: request.message_text.clone(),
            extracted_tasks: tasks.clone(),
            projects: project_ids.clone(),
            sentiment,
            has_images: request.has_images,
            image_count: request.image_count,
            chat_metadata: request.chat_metadata.clone(),
            created_at: now,
            processed_at: Some(Clock::now()),
        };

        let (project_names, employee) = {
            let mut state = self.state.write().await;
            for task in &tasks {
                state.tasks.insert(task.id.clone(), task.clone());
            }
            state.updates.insert(update.id.clone(), update.clone());

            let employee = state.employees.get_mut(&request.employee_id).map(|e| {
                e.last_update_at = Some(now);
                e.clone()
            });
            let names: Vec<String> = project_ids
                .iter()
                .filter_map(|pid| state.projects.get(pid).map(|p| p.name.clone()))
                .collect();
            (names, employee)
        };

        for task in &tasks {
            self.persist(collections::TASKS, &task.id, task).await;
        }
        self.persist(collections::UPDATES, &update.id, &update).await;
        if let Some(employee) = employee {
            self.persist(collections::EMPLOYEES, &employee.id, &employee).await;
        }

        tracing::info!(
            "[PROJECT_MANAGER] Update {} stored: {} tasks, {} projects, sentiment {}",
            update.id,
            tasks.len(),
            project_ids.len(),
            sentiment
        );

        // 6. 回执
        let message = compose_acknowledgement(&tasks, &project_names, sentiment);
        Ok(ProcessUpdateResponse {
            success: true,
            update_id: update.id,
            extracted_tasks: tasks,
            assigned_projects: project_ids,
            message,
        })
    }

    /// 新员工创建；显示名变化时刷新
    /// 返回需要持久化的员工记录
    async fn upsert_employee(&self, request: &ProcessUpdateRequest, now: DateTime<Utc>) -> Option<Employee> {
        let display_name = match request.employee_display_name.trim() {
            "" if !request.employee_email.is_empty() => request.employee_email.clone(),
            "" => request.employee_id.clone(),
            name => name.to_string(),
        };

        let mut state = self.state.write().await;
        match state.employees.get_mut(&request.employee_id) {
            Some(existing) if existing.display_name != display_name => {
                tracing::info!(
                    "[PROJECT_MANAGER] Employee {} renamed: {} -> {}",
                    existing.id,
                    existing.display_name,
                    display_name
                );
                existing.display_name = display_name;
                Some(existing.clone())
            }
            Some(_) => None,
            None => {
                let employee = Employee {
                    id: request.employee_id.clone(),
                    email: request.employee_email.clone(),
                    display_name,
                    department: None,
                    is_active: true,
                    created_at: now,
                    last_update_at: None,
                };
                tracing::info!("[PROJECT_MANAGER] New employee registered: {}", employee.id);
                state.employees.insert(employee.id.clone(), employee.clone());
                Some(employee)
            }
        }
    }

    // =====================================================================
    // 项目归属
    // =====================================================================

    /// 把任务候选落成任务并归属项目 (不写入任务表)
    ///
    /// 候选中的项目提示先按 ID、再按名称 (忽略大小写) 匹配已有项目，
    /// 命中后作为显式项目 ID 进入归属链。
    pub async fn assign_candidate(&self, candidate: &TaskCandidate, employee_id: &str) -> Task {
        let now = Clock::now();
        let explicit = match candidate.project_hint.as_deref() {
            Some(hint) => self.find_project_id(hint).await,
            None => None,
        };

        let mut task = Task {
            id: format!("task_{}", Uuid::new_v4().simple()),
            project_id: explicit,
            employee_id: employee_id.to_string(),
            title: candidate.title.clone(),
            description: candidate.description.clone(),
            status: candidate.status,
            priority: candidate.priority,
            estimated_hours: candidate.estimated_hours,
            due_date: candidate.due_date,
            tags: candidate.tags.clone(),
            created_at: now,
            updated_at: now,
        };
        self.assign_task_to_project(&mut task).await;
        task
    }

    /// 项目归属链
    ///
    /// 1. 显式项目 ID 仍然有效 -> 保留
    /// 2. 模型给出已有项目名或新项目建议
    /// 3. 项目名/标签关键词匹配
    /// 4. 兜底 `general`
    ///
    /// 归属成功后员工会被登记到项目的 assigned_employees。
    pub async fn assign_task_to_project(&self, task: &mut Task) -> String {
        let project_id = match self.resolve_project(task).await {
            Some(pid) => pid,
            None => GENERAL_PROJECT_ID.to_string(),
        };

        task.project_id = Some(project_id.clone());
        if let Some(project) = self.attach_employee(&project_id, &task.employee_id).await {
            self.persist(collections::PROJECTS, &project.id, &project).await;
        }
        project_id
    }

    async fn resolve_project(&self, task: &Task) -> Option<String> {
        // (a) 显式 ID
        if let Some(pid) = &task.project_id {
            if self.state.read().await.projects.contains_key(pid) {
                return Some(pid.clone());
            }
            tracing::debug!("[PROJECT_MANAGER] Dropping stale project id {} on task {}", pid, task.id);
        }

        // (b) 模型建议
        if self.analyzer.is_available() {
            let names: Vec<String> = {
                let state = self.state.read().await;
                state.projects.values().map(|p| p.name.clone()).collect()
            };
            let task_text = format!("{} {}", task.title, task.description.as_deref().unwrap_or_default());
            if let Some(suggestion) = self.analyzer.categorize_project(task_text.trim(), &names).await {
                return Some(self.adopt_suggestion(&suggestion, task).await);
            }
        }

        // (c) 关键词
        let state = self.state.read().await;
        let text = task.search_text();
        state
            .projects
            .values()
            .find(|p| keyword_match(p, &text, &task.tags))
            .map(|p| p.id.clone())
    }

    /// 建议名命中已有项目 (忽略大小写) 则直接使用，否则新建 AI 项目
    async fn adopt_suggestion(&self, suggestion: &str, task: &Task) -> String {
        let created = {
            let mut state = self.state.write().await;
            // 插入前再检查一次，防止并发签到建出同名项目
            if let Some(existing) = state.projects.values().find(|p| p.name.eq_ignore_ascii_case(suggestion)) {
                return existing.id.clone();
            }

            let now = Clock::now();
            let mut id = format!("{}_{}", slugify(suggestion), Clock::now_ms());
            let mut n = 1;
            while state.projects.contains_key(&id) {
                n += 1;
                id = format!("{}_{}_{}", slugify(suggestion), Clock::now_ms(), n);
            }

            let mut tags = task.tags.clone();
            for tag in ["ai-created", "ai-suggested"] {
                if !tags.iter().any(|t| t == tag) {
                    tags.push(tag.to_string());
                }
            }

            let project = Project {
                id,
                name: suggestion.to_string(),
                description: Some(format!("AI-suggested project based on task analysis: {}", task.title)),
                status: ProjectStatus::Active,
                priority: task.priority,
                assigned_employees: vec![task.employee_id.clone()],
                tags,
                created_at: now,
                updated_at: now,
            };
            state.projects.insert(project.id.clone(), project.clone());
            project
        };

        tracing::info!("[PROJECT_MANAGER] Created AI-suggested project '{}' ({})", created.name, created.id);
        self.persist(collections::PROJECTS, &created.id, &created).await;
        created.id
    }

    /// 把员工登记到项目；返回发生变化的项目
    async fn attach_employee(&self, project_id: &str, employee_id: &str) -> Option<Project> {
        let mut state = self.state.write().await;
        let project = state.projects.get_mut(project_id)?;
        if project.assigned_employees.iter().any(|e| e == employee_id) {
            return None;
        }
        project.assigned_employees.push(employee_id.to_string());
        project.updated_at = Clock::now();
        Some(project.clone())
    }

    async fn find_project_id(&self, hint: &str) -> Option<String> {
        let state = self.state.read().await;
        if state.projects.contains_key(hint) {
            return Some(hint.to_string());
        }
        state
            .projects
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(hint))
            .map(|p| p.id.clone())
    }

    // =====================================================================
    // 管理与恢复
    // =====================================================================

    /// 管理端添加/覆盖项目
    pub async fn add_project(&self, project: Project) {
        {
            let mut state = self.state.write().await;
            state.projects.insert(project.id.clone(), project.clone());
        }
        self.persist(collections::PROJECTS, &project.id, &project).await;
    }

    /// 恢复一条历史签到 (连同其任务)，不触发持久化
    pub async fn restore_update(&self, update: WeeklyUpdate) {
        let mut state = self.state.write().await;
        for task in &update.extracted_tasks {
            state.tasks.insert(task.id.clone(), task.clone());
        }
        state.updates.insert(update.id.clone(), update);
    }

    /// 启动时从持久化后端恢复全部集合
    ///
    /// 默认项目不会被覆盖。读取失败只记录警告，状态保持纯内存。
    /// 返回恢复的文档数量。
    pub async fn load_from_store(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        match self.try_load(store).await {
            Ok(count) => {
                tracing::info!("[PROJECT_MANAGER] Restored {} documents from {}", count, store.backend_name());
                count
            }
            Err(e) => {
                tracing::warn!(
                    "[PROJECT_MANAGER] Could not load from {}, continuing memory-only: {:#}",
                    store.backend_name(),
                    e
                );
                0
            }
        }
    }

    async fn try_load(&self, store: &Arc<dyn DocumentStore>) -> Result<usize> {
        let employees: Vec<Employee> = store.load_all(collections::EMPLOYEES).await?;
        let projects: Vec<Project> = store.load_all(collections::PROJECTS).await?;
        let tasks: Vec<Task> = store.load_all(collections::TASKS).await?;
        let mut updates: Vec<WeeklyUpdate> = store.load_all(collections::UPDATES).await?;
        updates.sort_by_key(|u| u.created_at);

        let mut state = self.state.write().await;
        let mut count = 0;
        for employee in employees {
            state.employees.insert(employee.id.clone(), employee);
            count += 1;
        }
        for project in projects {
            if project.is_default() {
                continue;
            }
            state.projects.insert(project.id.clone(), project);
            count += 1;
        }
        for task in tasks {
            state.tasks.insert(task.id.clone(), task);
            count += 1;
        }
        for update in updates {
            state.updates.insert(update.id.clone(), update);
            count += 1;
        }
        Ok(count)
    }

    /// 尽力而为的持久化：失败只记录警告
    async fn persist<T: Serialize + Sync>(&self, collection: &str, id: &str, doc: &T) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.put(collection, id, doc).await {
            tracing::warn!(
                "[PROJECT_MANAGER] Failed to persist {}/{} to {}: {:#}",
                collection,
                id,
                store.backend_name(),
                e
            );
        }
    }

    // =====================================================================
    // 读取接口
    // =====================================================================

    pub async fn snapshot(&self) -> StateSnapshot {
        let state = self.state.read().await;
        StateSnapshot {
            employees: state.employees.values().cloned().collect(),
            projects: state.projects.values().cloned().collect(),
            tasks: state.tasks.values().cloned().collect(),
            updates: state.updates.values().cloned().collect(),
        }
    }

    pub async fn employees(&self) -> Vec<Employee> {
        self.state.read().await.employees.values().cloned().collect()
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.state.read().await.projects.values().cloned().collect()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.state.read().await.tasks.values().cloned().collect()
    }

    pub async fn updates(&self) -> Vec<WeeklyUpdate> {
        self.state.read().await.updates.values().cloned().collect()
    }

    pub async fn employee(&self, id: &str) -> Option<Employee> {
        self.state.read().await.employees.get(id).cloned()
    }

    pub async fn project(&self, id: &str) -> Option<Project> {
        self.state.read().await.projects.get(id).cloned()
    }

    pub async fn tasks_for_employee(&self, employee_id: &str) -> Vec<Task> {
        let state = self.state.read().await;
        state.tasks.values().filter(|t| t.employee_id == employee_id).cloned().collect()
    }

    pub async fn employee_stats(&self, employee_id: &str) -> TaskStats {
        let state = self.state.read().await;
        TaskStats::from_tasks(state.tasks.values().filter(|t| t.employee_id == employee_id))
    }

    pub async fn project_stats(&self, project_id: &str) -> Option<ProjectStats> {
        let state = self.state.read().await;
        let project = state.projects.get(project_id)?;
        Some(ProjectStats {
            project_id: project.id.clone(),
            name: project.name.clone(),
            status: project.status,
            assigned_employees: project.assigned_employees.len(),
            tasks: TaskStats::from_tasks(
                state
                    .tasks
                    .values()
                    .filter(|t| t.project_id.as_deref() == Some(project_id)),
            ),
            update_count: state
                .updates
                .values()
                .filter(|u| u.projects.iter().any(|p| p == project_id))
                .count(),
        })
    }

    pub async fn state_summary(&self) -> StateSummary {
        let state = self.state.read().await;
        StateSummary {
            instance_id: self.instance_id.clone(),
            employee_count: state.employees.len(),
            project_count: state.projects.len(),
            task_count: state.tasks.len(),
            update_count: state.updates.len(),
            latest_update: state.updates.values().max_by_key(|u| u.created_at).cloned(),
        }
    }
}

impl Default for ProjectManager {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// 辅助函数
// =========================================================================

/// 项目名或任一标签出现在任务文本中，或标签与任务标签相同
/// 空白的名称或标签不参与匹配
fn keyword_match(project: &Project, text: &str, task_tags: &[String]) -> bool {
    let name = project.name.trim().to_lowercase();
    if !name.is_empty() && text.contains(&name) {
        return true;
    }
    project.tags.iter().any(|tag| {
        let tag = tag.trim().to_lowercase();
        !tag.is_empty() && (text.contains(&tag) || task_tags.iter().any(|t| t.to_lowercase() == tag))
    })
}

/// 小写，非字母数字转 '-'，合并连续 '-'
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug.to_string()
    }
}

/// 签到回执
fn compose_acknowledgement(tasks: &[Task], project_names: &[String], sentiment: Sentiment) -> String {
    if tasks.is_empty() {
        return "Thanks for your update! I've logged your message. \
                For better tracking, try including specific tasks you're working on."
            .to_string();
    }

    let mut message = format!("Great! I've extracted {} task(s) from your update:\n\n", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} ({})\n",
            i + 1,
            task.title,
            task.status.to_string().replace('-', " ")
        ));
    }

    if !project_names.is_empty() {
        message.push_str(&format!("\nAssigned to project(s): {}", project_names.join(", ")));
    }

    match sentiment {
        Sentiment::Blocked => {
            message.push_str("\n\n⚠️ I noticed you mentioned some blockers. Your manager will be notified.")
        }
        Sentiment::Positive => message.push_str("\n\n🎉 Great progress! Keep up the excellent work!"),
        _ => {}
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::{Priority, TaskStatus};

    fn task(title: &str, status: TaskStatus) -> Task {
        let now = Clock::now();
        Task {
            id: "t1".to_string(),
            project_id: None,
            employee_id: "e1".to_string(),
            title: title.to_string(),
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

    fn bare_project(name: &str, tags: &[&str]) -> Project {
        let now = Clock::now();
        Project {
            id: "p1".to_string(),
            name: name.to_string(),
            description: None,
            status: ProjectStatus::Active,
            priority: Priority::Medium,
            assigned_employees: vec![],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn blank_names_and_tags_never_match() {
        let text = "working on the billing export";
        assert!(!keyword_match(&bare_project("", &[]), text, &[]));
        assert!(!keyword_match(&bare_project("  ", &["", " "]), text, &["".to_string()]));
        assert!(keyword_match(&bare_project("", &["", "Billing"]), text, &[]));
        assert!(keyword_match(&bare_project("Billing Export", &[]), text, &[]));
    }

    #[test]
    fn slugs_are_collapsed() {
        assert_eq!(slugify("  Data   Platform v2!"), "data-platform-v2");
        assert_eq!(slugify("???"), "project");
    }

    #[test]
    fn acknowledgement_lists_tasks_and_remarks() {
        let tasks = vec![task("API rate limiter", TaskStatus::InProgress)];
        let msg = compose_acknowledgement(&tasks, &["General Tasks".to_string()], Sentiment::Blocked);
        assert!(msg.starts_with("Great! I've extracted 1 task(s)"));
        assert!(msg.contains("1. API rate limiter (in progress)"));
        assert!(msg.contains("Assigned to project(s): General Tasks"));
        assert!(msg.contains("blockers"));

        let empty = compose_acknowledgement(&[], &[], Sentiment::Neutral);
        assert!(empty.contains("try including specific tasks"));
    }

    #[test]
    fn keyword_match_uses_names_and_tags() {
        let project = &Project::defaults(Clock::now())[1];
        assert!(keyword_match(project, "patched the maintenance window", &[]));
        assert!(keyword_match(project, "nothing here", &["bugs".to_string()]));
        assert!(!keyword_match(project, "wrote docs", &[]));
    }
}
