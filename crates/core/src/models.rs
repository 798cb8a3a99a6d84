use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Priority, ProjectStatus, Sentiment, TaskStatus};

/// 永久存在的兜底项目 ID
pub const GENERAL_PROJECT_ID: &str = "general";

/// 启动时内置、永不删除的项目 ID 列表
pub const DEFAULT_PROJECT_IDS: [&str; 3] = ["general", "maintenance", "development"];

/// 员工实体 (Employee)
///
/// 首次收到某个身份的签到时创建；之后只刷新显示名与最近签到时间，从不删除。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// 不透明的身份 ID (通常来自聊天平台的用户标识)
    pub id: String,

    pub email: String,

    /// 显示名，随最近一次签到刷新
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// 软生命周期标记
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    /// 最近一次成功处理签到的时间
    #[serde(default)]
    pub last_update_at: Option<DateTime<Utc>>,
}

/// 项目实体 (Project)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub status: ProjectStatus,

    pub priority: Priority,

    /// 分配到该项目的员工 ID
    #[serde(default)]
    pub assigned_employees: Vec<String>,

    /// 自由标签
    /// 作用: 关键词匹配时与项目名一起参与比较；也用来记录项目的来源 (如 "ai-suggested")
    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    fn seeded(id: &str, name: &str, description: &str, priority: Priority, tags: &[&str], now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            status: ProjectStatus::Active,
            priority,
            assigned_employees: Vec::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 内置默认项目 (general / maintenance / development)
    pub fn defaults(now: DateTime<Utc>) -> Vec<Project> {
        vec![
            Self::seeded(
                "general",
                "General Tasks",
                "Miscellaneous tasks not assigned to specific projects",
                Priority::Medium,
                &["general"],
                now,
            ),
            Self::seeded(
                "maintenance",
                "System Maintenance",
                "Bug fixes, updates, and system maintenance tasks",
                Priority::High,
                &["maintenance", "bugs"],
                now,
            ),
            Self::seeded(
                "development",
                "Feature Development",
                "New feature development and enhancements",
                Priority::High,
                &["development", "features"],
                now,
            ),
        ]
    }

    pub fn is_default(&self) -> bool {
        DEFAULT_PROJECT_IDS.contains(&self.id.as_str())
    }
}

/// 任务实体 (Task)
///
/// 只作为签到处理的副产品产生；status/priority 为推断值，不做状态机校验。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    /// 归属项目，一旦分配必须指向已存在的项目
    #[serde(default)]
    pub project_id: Option<String>,

    /// 唯一归属员工
    pub employee_id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f32>,

    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// 标题 + 描述的小写文本，用于关键词匹配
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or_default()).to_lowercase()
    }
}

/// 聊天传输层元数据 (原样透传，核心逻辑不解释)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    #[serde(default)]
    pub space_name: String,
    #[serde(default)]
    pub thread_name: String,
    #[serde(default)]
    pub message_name: String,
    #[serde(default)]
    pub space_type: String,
}

/// 周报记录 (WeeklyUpdate)
///
/// 创建后不可变，唯一例外是迟绑定的 `projects` 列表。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyUpdate {
    pub id: String,

    pub employee_id: String,

    /// 所属周 (当周周一 YYYY-MM-DD)
    pub week_of: String,

    /// 原始消息文本
    pub message_text: String,

    /// 从本条消息中提取出的任务 (创建时确定)
    #[serde(default)]
    pub extracted_tasks: Vec<Task>,

    /// 本条消息涉及的去重后项目 ID
    #[serde(default)]
    pub projects: Vec<String>,

    pub sentiment: Sentiment,

    #[serde(default)]
    pub has_images: bool,

    #[serde(default)]
    pub image_count: u32,

    #[serde(default)]
    pub chat_metadata: ChatMetadata,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

/// 签到处理请求 (由外部 HTTP 层构造)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessUpdateRequest {
    pub message_text: String,
    pub employee_id: String,
    #[serde(default)]
    pub employee_email: String,
    pub employee_display_name: String,
    /// 缺省时由处理流程按当前时间推算
    #[serde(default)]
    pub week_of: String,
    #[serde(default)]
    pub has_images: bool,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub chat_metadata: ChatMetadata,
}

/// 签到处理结果：即使内部失败也保持同样的结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessUpdateResponse {
    pub success: bool,
    pub update_id: String,
    pub extracted_tasks: Vec<Task>,
    pub assigned_projects: Vec<String>,
    pub message: String,
}

impl ProcessUpdateResponse {
    pub const APOLOGY: &'static str = "Sorry, there was an error processing your update. Please try again.";

    /// 统一的失败响应
    pub fn failure() -> Self {
        Self {
            success: false,
            update_id: String::new(),
            extracted_tasks: Vec::new(),
            assigned_projects: Vec::new(),
            message: Self::APOLOGY.to_string(),
        }
    }
}

/// 单个员工的任务统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub not_started: usize,
}

impl TaskStats {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut stats = TaskStats::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Blocked => stats.blocked += 1,
                TaskStatus::NotStarted => stats.not_started += 1,
                TaskStatus::Cancelled => {}
            }
        }
        stats
    }
}
