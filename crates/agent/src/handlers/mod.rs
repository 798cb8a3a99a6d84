use anyhow::Result;
use async_trait::async_trait;

use crate::extractor::TaskCandidate;
use crate::types::{AgentContext, AgentRole, HandlerOutput};

pub mod project_handler;
pub mod sentiment_handler;
pub mod task_handler;

pub use project_handler::ProjectAssignmentHandler;
pub use sentiment_handler::SentimentHandler;
pub use task_handler::TaskExtractionHandler;

/// 分发器的输入
#[derive(Debug, Clone)]
pub enum AgentInput {
    /// 原始签到文本
    Text(String),
    /// 已经提取好的任务
    Tasks(Vec<TaskCandidate>),
}

impl AgentInput {
    pub fn text(&self) -> Option<&str> {
        match self {
            AgentInput::Text(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    pub fn tasks(&self) -> Option<&[TaskCandidate]> {
        match self {
            AgentInput::Tasks(tasks) if !tasks.is_empty() => Some(tasks),
            _ => None,
        }
    }
}

/// 处理器接口
///
/// 分发器先询问 `can_handle`，再并发执行所有接受输入的处理器。
/// `can_handle` 出错的处理器会被记录并跳过；`handle` 出错只影响自身。
#[async_trait]
pub trait AgentHandler<I>: Send + Sync
where
    I: Send + Sync,
{
    fn role(&self) -> AgentRole;

    fn can_handle(&self, input: &I, ctx: &AgentContext) -> Result<bool>;

    async fn handle(&self, input: &I, ctx: &AgentContext) -> Result<HandlerOutput>;
}
