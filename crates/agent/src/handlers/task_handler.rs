use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::{AgentHandler, AgentInput};
use crate::extractor::TaskCandidate;
use crate::nlp::LanguageAnalyzer;
use crate::types::{AgentContext, AgentMessage, AgentRole, HandlerOutput, MessageKind, MessagePriority};

/// 需要向员工补问的信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarificationQuestion {
    pub id: String,
    pub text: String,
    pub field: String,
    pub required: bool,
}

/// 任务提取处理器
///
/// 从文本中提取任务后发给 `project` 处理器归属项目；
/// 缺少截止日期或工时估计的任务，按字段汇总成补问发给 `question`。
pub struct TaskExtractionHandler {
    analyzer: Arc<LanguageAnalyzer>,
}

impl TaskExtractionHandler {
    pub fn new(analyzer: Arc<LanguageAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl AgentHandler<AgentInput> for TaskExtractionHandler {
    fn role(&self) -> AgentRole {
        AgentRole::Task
    }

    fn can_handle(&self, input: &AgentInput, _ctx: &AgentContext) -> Result<bool> {
        Ok(input.text().is_some())
    }

    async fn handle(&self, input: &AgentInput, ctx: &AgentContext) -> Result<HandlerOutput> {
        let text = input.text().context("task handler requires non-blank text")?;
        let tasks = self.analyzer.extract_tasks(text).await;

        let mut output = HandlerOutput::default()
            .log("[task] extracting tasks")
            .log(format!("[task] extracted {} tasks", tasks.len()))
            .message(AgentMessage::new(
                AgentRole::Task,
                AgentRole::Project,
                MessageKind::Request,
                MessagePriority::Medium,
                json!({ "tasks": tasks }),
                ctx,
            ));

        let questions = clarification_questions(&tasks);
        if !questions.is_empty() {
            output = output.message(AgentMessage::new(
                AgentRole::Task,
                AgentRole::Question,
                MessageKind::Query,
                MessagePriority::Low,
                json!({ "questions": questions }),
                ctx,
            ));
        }
        Ok(output)
    }
}

/// 每个缺失字段一条问题，问题里列出全部缺该字段的任务
pub fn clarification_questions(tasks: &[TaskCandidate]) -> Vec<ClarificationQuestion> {
    let mut by_field: IndexMap<&str, Vec<String>> = IndexMap::new();
    for task in tasks {
        if task.due_date.is_none() {
            by_field
                .entry("dueDate")
                .or_default()
                .push(format!("Task '{}' missing due date", task.title));
        }
        if task.estimated_hours.is_none() {
            by_field
                .entry("estimatedHours")
                .or_default()
                .push(format!("Task '{}' missing estimate", task.title));
        }
    }

    by_field
        .into_iter()
        .enumerate()
        .map(|(i, (field, descriptions))| ClarificationQuestion {
            id: format!("{}-{}", field, i + 1),
            text: format!("Could you provide {} details? ({})", field, descriptions.join("; ")),
            field: field.to_string(),
            required: false,
        })
        .collect()
}
