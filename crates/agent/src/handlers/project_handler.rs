use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{AgentHandler, AgentInput};
use crate::manager::ProjectManager;
use crate::types::{AgentContext, AgentMessage, AgentRole, HandlerOutput, MessageKind, MessagePriority};

/// 项目归属处理器：对每个任务走一遍 ProjectManager 的归属链
pub struct ProjectAssignmentHandler {
    manager: Arc<ProjectManager>,
}

impl ProjectAssignmentHandler {
    pub fn new(manager: Arc<ProjectManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl AgentHandler<AgentInput> for ProjectAssignmentHandler {
    fn role(&self) -> AgentRole {
        AgentRole::Project
    }

    fn can_handle(&self, input: &AgentInput, _ctx: &AgentContext) -> Result<bool> {
        Ok(input.tasks().is_some())
    }

    async fn handle(&self, input: &AgentInput, ctx: &AgentContext) -> Result<HandlerOutput> {
        let candidates = input.tasks().context("project handler requires a task list")?;

        let mut assignments = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let task = self.manager.assign_candidate(candidate, &ctx.user_id).await;
            assignments.push(json!({
                "title": task.title,
                "projectId": task.project_id,
            }));
        }

        Ok(HandlerOutput::default()
            .log(format!("[project] assigned {} tasks", assignments.len()))
            .message(AgentMessage::new(
                AgentRole::Project,
                AgentRole::Orchestrator,
                MessageKind::Response,
                MessagePriority::Medium,
                json!({ "assignments": assignments }),
                ctx,
            )))
    }
}
