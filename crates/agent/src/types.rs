use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::Display;
use uuid::Uuid;

/// 1. 处理器角色：消息的来源与去向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentRole {
    Orchestrator,
    Task,
    Project,
    Sentiment,
    Question,
    Reporting,
    Notification,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Request,
    Response,
    Notification,
    Query,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagePriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// 2. 执行上下文：贯穿一次分发的生命周期
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    /// 链路追踪 ID (用于日志串联)
    pub trace_id: Uuid,

    /// 发消息的员工
    pub user_id: String,

    pub conversation_id: String,

    #[serde(default)]
    pub week_of: Option<String>,

    /// 处理器之间共享的附加数据
    #[serde(default)]
    pub shared_data: HashMap<String, Value>,
}

impl AgentContext {
    pub fn new(user_id: &str, conversation_id: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            conversation_id: conversation_id.to_string(),
            week_of: None,
            shared_data: HashMap::new(),
        }
    }
}

/// 3. 处理器之间传递的消息
///
/// id 与 timestamp 由分发器补齐，处理器可以留空。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub from: AgentRole,
    pub to: AgentRole,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub payload: Value,
    pub priority: MessagePriority,
    pub context: AgentContext,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AgentMessage {
    pub fn new(
        from: AgentRole,
        to: AgentRole,
        kind: MessageKind,
        priority: MessagePriority,
        payload: Value,
        context: &AgentContext,
    ) -> Self {
        Self {
            id: None,
            from,
            to,
            kind,
            payload,
            priority,
            context: context.clone(),
            timestamp: None,
        }
    }
}

/// 4. 单个处理器的产出
#[derive(Debug, Clone, Default)]
pub struct HandlerOutput {
    pub outbound: Vec<AgentMessage>,
    pub logs: Vec<String>,
}

impl HandlerOutput {
    pub fn log(mut self, line: impl Into<String>) -> Self {
        self.logs.push(line.into());
        self
    }

    pub fn message(mut self, message: AgentMessage) -> Self {
        self.outbound.push(message);
        self
    }
}

/// 5. 一次分发的汇总结果
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    pub outbound: Vec<AgentMessage>,
    pub logs: Vec<String>,
}
