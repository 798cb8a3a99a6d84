#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use checkin_agent::llm::ModelBackend;
use checkin_core::{Priority, Project, ProjectStatus, ProcessUpdateRequest, Clock};
use checkin_storage::DocumentStore;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 各 Prompt 中足以区分用途的片段
pub const TASK_PROMPT: &str = "extracts tasks from employee weekly update";
pub const SENTIMENT_PROMPT: &str = "Analyze the sentiment";
pub const CATEGORY_PROMPT: &str = "Determine if this task belongs";
pub const GAP_PROMPT: &str = "knowledge gaps and missing information";
pub const QUESTION_PROMPT: &str = "Generate a targeted question";
pub const SUMMARY_PROMPT: &str = "summary for executive review";

/// 按 Prompt 片段路由回答的 Mock 模型
///
/// 没有规则命中时返回错误，等价于模型调用失败。
#[derive(Default)]
pub struct ScriptedBackend {
    rules: Mutex<Vec<(String, String)>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, needle: &str, response: impl Into<String>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push((needle.to_string(), response.into()));
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, _system_prompt: &str, user_input: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rules = self.rules.lock().map_err(|_| anyhow!("rules poisoned"))?;
        rules
            .iter()
            .find(|(needle, _)| user_input.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| anyhow!("no scripted response for prompt"))
    }
}

/// 所有操作都失败的存储
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    fn backend_name(&self) -> &str {
        "FAILING_STORE"
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Value>> {
        Err(anyhow!("store offline"))
    }

    async fn set(&self, _collection: &str, _id: &str, _doc: &Value) -> Result<()> {
        Err(anyhow!("store offline"))
    }

    async fn list(&self, _collection: &str) -> Result<Vec<Value>> {
        Err(anyhow!("store offline"))
    }
}

pub fn update(employee_id: &str, name: &str, text: &str) -> ProcessUpdateRequest {
    ProcessUpdateRequest {
        message_text: text.to_string(),
        employee_id: employee_id.to_string(),
        employee_email: format!("{}@example.com", employee_id),
        employee_display_name: name.to_string(),
        ..Default::default()
    }
}

pub fn project(id: &str, name: &str, priority: Priority, assigned: &[&str]) -> Project {
    let now = Clock::now();
    Project {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        status: ProjectStatus::Active,
        priority,
        assigned_employees: assigned.iter().map(|e| e.to_string()).collect(),
        tags: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}
