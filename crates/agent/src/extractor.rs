use checkin_core::{Priority, Sentiment, TaskStatus};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::schema::RawTask;

/// 提取出的任务候选 (尚未分配 ID、员工与项目)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCandidate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// 文本中显式提到的项目名 ("project Apollo")
    #[serde(default)]
    pub project_hint: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub estimated_hours: Option<f32>,
}

impl TaskCandidate {
    /// 校验模型返回的任务，标题过短的直接丢弃
    pub fn from_raw(raw: RawTask) -> Option<Self> {
        let title = raw.title.trim().to_string();
        if title.chars().count() <= 3 {
            return None;
        }

        let description = raw
            .description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| Some(title.clone()));

        Some(Self {
            status: raw
                .status
                .as_deref()
                .and_then(|s| TaskStatus::from_str(s.trim()).ok())
                .unwrap_or(TaskStatus::InProgress),
            priority: raw
                .priority
                .as_deref()
                .and_then(|p| Priority::from_str(p.trim()).ok())
                .unwrap_or(Priority::Medium),
            project_hint: None,
            tags: dedup_lowercase(raw.tags.unwrap_or_default()),
            due_date: raw
                .due_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            estimated_hours: raw.estimated_hours.filter(|h| h.is_finite() && *h > 0.0),
            title: truncate(&title, MAX_TITLE_CHARS),
            description,
        })
    }
}

// =========================================================================
// 词表与正则
// =========================================================================

const MIN_CLAUSE_CHARS: usize = 5;
const MAX_CLAUSE_CHARS: usize = 200;
const MAX_TITLE_CHARS: usize = 100;

/// 短语模式: (正则, 命中后的状态)
static TASK_PATTERNS: LazyLock<Vec<(Regex, TaskStatus)>> = LazyLock::new(|| {
    let clause = r"\s+(.+?)(?:\.|,|$)";
    let specs: [(&str, TaskStatus); 8] = [
        (r"(?i)\b(?:completed|finished|done|shipped|delivered|closed)", TaskStatus::Completed),
        (r"(?:✓|✔|☑)", TaskStatus::Completed),
        (r"(?i)\b(?:working on|currently|in progress|continuing)", TaskStatus::InProgress),
        (r"(?i)\b(?:started|began|beginning)", TaskStatus::InProgress),
        (r"(?i)\b(?:blocked on|waiting for|stuck on|can't proceed|can’t proceed)", TaskStatus::Blocked),
        (r"(?i)\b(?:need help with|need assistance)", TaskStatus::Blocked),
        (r"(?i)\b(?:will work on|planning to|next week|going to)", TaskStatus::NotStarted),
        (r"(?i)\b(?:scheduled|planning)", TaskStatus::NotStarted),
    ];

    specs
        .into_iter()
        .map(|(head, status)| {
            // 勾选符号后允许不带空格
            let tail = if head.starts_with("(?:✓") { r"\s*(.+?)(?:\.|,|$)" } else { clause };
            let re = Regex::new(&format!("{}{}", head, tail)).expect("valid task phrase regex");
            (re, status)
        })
        .collect()
});

static BULLET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"^\s*[-•*]\s*(.+?)\s*$", r"^\s*\d+\.\s*(.+?)\s*$"]
        .into_iter()
        .map(|p| Regex::new(p).expect("valid bullet regex"))
        .collect()
});

static TITLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:completed|finished|done|working on|currently|will work on)\s+")
        .expect("valid title prefix regex")
});

static PROJECT_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:project|proj)\s+([A-Za-z0-9_\-]+)").expect("valid project hint regex")
});

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w-]+)").expect("valid hashtag regex"));

static TECH_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(React|Vue|Angular|Node|Python|Java|TypeScript|JavaScript|SQL|AWS|GCP|Docker|Kubernetes|API|database|frontend|backend|mobile|web|testing|deployment)\b",
    )
    .expect("valid tech term regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const STATUS_KEYWORDS: [(TaskStatus, &[&str]); 4] = [
    (
        TaskStatus::Completed,
        &["completed", "finished", "done", "shipped", "delivered", "closed", "✓", "✔", "☑"],
    ),
    (
        TaskStatus::InProgress,
        &["working on", "currently", "in progress", "continuing", "started", "began"],
    ),
    (
        TaskStatus::Blocked,
        &["blocked", "waiting for", "stuck", "can't proceed", "need help", "need assistance"],
    ),
    (
        TaskStatus::NotStarted,
        &["will work on", "planning to", "next week", "going to", "scheduled", "planning"],
    ),
];

const PRIORITY_KEYWORDS: [(Priority, &[&str]); 4] = [
    (Priority::Critical, &["urgent", "critical", "asap", "emergency", "high priority"]),
    (Priority::High, &["important", "high", "priority", "soon"]),
    (Priority::Medium, &["medium", "normal", "regular"]),
    (Priority::Low, &["low", "later", "when time permits", "nice to have"]),
];

const BLOCKED_WORDS: [&str; 7] = ["blocked", "stuck", "waiting", "can't", "issue", "problem", "help needed"];
const POSITIVE_WORDS: [&str; 8] = ["completed", "finished", "done", "success", "great", "good", "progress", "achieved"];
const NEGATIVE_WORDS: [&str; 7] = ["delayed", "behind", "difficult", "challenging", "slow", "issues", "problems"];

// =========================================================================
// 公开入口
// =========================================================================

/// 规则提取任务 (无网络依赖，确定性输出)
///
/// 1. 先用短语模式在归一化文本上匹配，候选状态取自命中的模式
/// 2. 一条都没命中时，退回到原文的列表项 (`-` / `•` / `*` / `1.`)
/// 3. 按标准化标题去重，保留第一次出现
pub fn extract_tasks(text: &str) -> Vec<TaskCandidate> {
    let normalized = normalize(text);
    let mut candidates = Vec::new();

    for (pattern, status) in TASK_PATTERNS.iter() {
        for caps in pattern.captures_iter(&normalized) {
            if let Some(clause) = caps.get(1) {
                if let Some(candidate) = build_candidate(clause.as_str(), Some(*status), &normalized) {
                    candidates.push(candidate);
                }
            }
        }
    }

    if candidates.is_empty() {
        candidates = extract_from_list_items(text, &normalized);
    }

    dedup_by_title(candidates)
}

/// 关键词情绪判断: blocked 词优先，其余按正负命中数比较
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase().replace('’', "'");

    if BLOCKED_WORDS.iter().any(|w| lower.contains(w)) {
        return Sentiment::Blocked;
    }

    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}

/// 关键词状态判断，没有命中时返回 None
pub fn detect_status(text: &str) -> Option<TaskStatus> {
    let lower = text.to_lowercase().replace('’', "'");
    STATUS_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(status, _)| *status)
}

pub fn detect_priority(text: &str) -> Priority {
    let lower = text.to_lowercase();
    PRIORITY_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(priority, _)| *priority)
        .unwrap_or(Priority::Medium)
}

pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    tags.extend(HASHTAG.captures_iter(text).filter_map(|c| c.get(1)).map(|m| m.as_str().to_string()));
    tags.extend(TECH_TERMS.find_iter(text).map(|m| m.as_str().to_string()));
    dedup_lowercase(tags)
}

pub fn detect_project_hint(text: &str) -> Option<String> {
    PROJECT_HINT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

// =========================================================================
// 内部工具
// =========================================================================

/// 换行变成 ". "，空白折叠
fn normalize(text: &str) -> String {
    let joined = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(". ");
    collapse_whitespace(&joined)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn extract_from_list_items(raw: &str, normalized: &str) -> Vec<TaskCandidate> {
    let mut candidates = Vec::new();
    for pattern in BULLET_PATTERNS.iter() {
        for line in raw.lines() {
            if let Some(item) = pattern.captures(line).and_then(|c| c.get(1)) {
                if let Some(candidate) = build_candidate(item.as_str(), None, normalized) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

fn build_candidate(clause: &str, status: Option<TaskStatus>, full_text: &str) -> Option<TaskCandidate> {
    let clause = clause.trim();
    let len = clause.chars().count();
    if !(MIN_CLAUSE_CHARS..=MAX_CLAUSE_CHARS).contains(&len) {
        return None;
    }

    let title = clean_title(clause);
    if title.is_empty() {
        return None;
    }

    Some(TaskCandidate {
        title,
        description: Some(clause.to_string()),
        status: status
            .or_else(|| detect_status(clause))
            .unwrap_or(TaskStatus::InProgress),
        priority: detect_priority(clause),
        project_hint: detect_project_hint(clause).or_else(|| detect_project_hint(full_text)),
        tags: extract_tags(clause),
        due_date: None,
        estimated_hours: None,
    })
}

fn clean_title(clause: &str) -> String {
    let stripped = TITLE_PREFIX.replace(clause, "");
    truncate(&collapse_whitespace(&stripped), MAX_TITLE_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim().to_string()
}

fn dedup_by_title(candidates: Vec<TaskCandidate>) -> Vec<TaskCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            let key: String = c.title.to_lowercase().chars().filter(|ch| !ch.is_whitespace()).collect();
            seen.insert(key)
        })
        .collect()
}

fn dedup_lowercase(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_tables_compile() {
        assert_eq!(TASK_PATTERNS.len(), 8);
        assert_eq!(BULLET_PATTERNS.len(), 2);
        assert!(TITLE_PREFIX.is_match("Finished the audit"));
        assert!(PROJECT_HINT.is_match("on project Apollo"));
        assert!(HASHTAG.is_match("#infra"));
        assert!(TECH_TERMS.is_match("Docker"));
        assert!(WHITESPACE.is_match("a  b"));
    }

    #[test]
    fn phrase_bucket_sets_status() {
        let tasks = extract_tasks(
            "Finished the login page redesign. Working on the API rate limiter, \
             blocked on vendor credentials. Will work on onboarding emails next sprint.",
        );
        let find = |needle: &str| tasks.iter().find(|t| t.title.contains(needle)).unwrap();

        assert_eq!(find("login page").status, TaskStatus::Completed);
        assert_eq!(find("rate limiter").status, TaskStatus::InProgress);
        assert_eq!(find("vendor credentials").status, TaskStatus::Blocked);
        assert_eq!(find("onboarding").status, TaskStatus::NotStarted);
        assert!(find("rate limiter").tags.contains(&"api".to_string()));
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "Completed the #billing export for the Docker image.\nCurrently migrating the database schema.";
        assert_eq!(extract_tasks(text), extract_tasks(text));
        assert!(!extract_tasks(text).is_empty());
    }

    #[test]
    fn list_items_are_used_when_no_phrase_matches() {
        let text = "Status:\n- Quarterly report for finance\n- Vendor onboarding checklist (urgent)\n1. Team offsite agenda";
        let tasks = extract_tasks(text);
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::InProgress));
        assert_eq!(tasks[1].priority, Priority::Critical);
        assert_eq!(tasks[2].title, "Team offsite agenda");
    }

    #[test]
    fn short_and_duplicate_clauses_are_dropped() {
        let tasks = extract_tasks("Done it. Finished the Data Sync. finished the data  sync.");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "the Data Sync");
    }

    #[test]
    fn title_is_capped_at_100_chars() {
        let long = format!("Currently {}", "refactoring ".repeat(12));
        let tasks = extract_tasks(&long);
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].title.chars().count() <= 100);
    }

    #[test]
    fn project_hint_and_hashtags() {
        let tasks = extract_tasks("Working on project Apollo telemetry #Perf-Tuning.");
        assert_eq!(tasks[0].project_hint.as_deref(), Some("Apollo"));
        assert!(tasks[0].tags.contains(&"perf-tuning".to_string()));
    }

    #[test]
    fn sentiment_keywords() {
        assert_eq!(
            analyze_sentiment("Stuck waiting on the vendor for the sensor parts; can't proceed with calibration."),
            Sentiment::Blocked
        );
        assert_eq!(analyze_sentiment("I can’t reproduce it"), Sentiment::Blocked);
        assert_eq!(analyze_sentiment("Great week, finished the rollout"), Sentiment::Positive);
        assert_eq!(analyze_sentiment("Running behind, the migration is slow"), Sentiment::Negative);
        assert_eq!(analyze_sentiment("Met with design."), Sentiment::Neutral);
    }

    #[test]
    fn raw_task_validation() {
        let raw = RawTask {
            title: "  Ship v2 API  ".to_string(),
            description: None,
            status: Some("BLOCKED".to_string()),
            priority: Some("urgent-ish".to_string()),
            tags: Some(vec!["API".to_string(), "api".to_string()]),
            estimated_hours: Some(4.0),
            due_date: Some("2025-04-01".to_string()),
        };
        let task = TaskCandidate::from_raw(raw).unwrap();
        assert_eq!(task.status, TaskStatus::Blocked);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.tags, vec!["api".to_string()]);
        assert_eq!(task.description.as_deref(), Some("Ship v2 API"));
        assert!(task.due_date.is_some());

        let short = RawTask {
            title: "fix".to_string(),
            description: None,
            status: None,
            priority: None,
            tags: None,
            estimated_hours: None,
            due_date: None,
        };
        assert!(TaskCandidate::from_raw(short).is_none());
    }
}
