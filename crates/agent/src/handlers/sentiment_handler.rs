use anyhow::{Context, Result};
use async_trait::async_trait;
use checkin_core::Sentiment;
use serde_json::json;
use std::sync::Arc;

use super::{AgentHandler, AgentInput};
use crate::nlp::LanguageAnalyzer;
use crate::tokens::truncate_chars;
use crate::types::{AgentContext, AgentMessage, AgentRole, HandlerOutput, MessageKind, MessagePriority};

/// 情绪处理器：发现阻塞时向 `notification` 发紧急通知
pub struct SentimentHandler {
    analyzer: Arc<LanguageAnalyzer>,
}

impl SentimentHandler {
    pub fn new(analyzer: Arc<LanguageAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl AgentHandler<AgentInput> for SentimentHandler {
    fn role(&self) -> AgentRole {
        AgentRole::Sentiment
    }

    fn can_handle(&self, input: &AgentInput, _ctx: &AgentContext) -> Result<bool> {
        Ok(input.text().is_some())
    }

    async fn handle(&self, input: &AgentInput, ctx: &AgentContext) -> Result<HandlerOutput> {
        let text = input.text().context("sentiment handler requires non-blank text")?;
        let sentiment = self.analyzer.analyze_sentiment(text).await;

        let output = HandlerOutput::default().log(format!("[sentiment] classified as {}", sentiment));
        if sentiment != Sentiment::Blocked {
            return Ok(output);
        }

        Ok(output.message(AgentMessage::new(
            AgentRole::Sentiment,
            AgentRole::Notification,
            MessageKind::Notification,
            MessagePriority::Urgent,
            json!({
                "sentiment": sentiment,
                "employeeId": ctx.user_id,
                "excerpt": truncate_chars(text, 200),
            }),
            ctx,
        )))
    }
}
