use super::ModelBackend;
use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use checkin_core::CheckinError;

/// OpenAI 兼容接口 (OpenAI / DeepSeek / OneAPI ...)
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    /// 从环境变量 OPENAI_API_KEY 初始化
    pub fn new(model: &str) -> Self {
        let config = OpenAIConfig::new(); // 自动读取 env: OPENAI_API_KEY
        let client = Client::with_config(config);
        Self {
            client,
            model: model.to_string(),
        }
    }

    /// 支持自定义 BaseUrl (例如对接 DeepSeek, OneAPI)
    pub fn new_with_base_url(api_key: &str, base_url: &str, model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        let client = Client::with_config(config);
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        // 1. System Message (可选)
        if !system_prompt.is_empty() {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()?
                    .into(),
            );
        }

        // 2. User Message
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()?
                .into(),
        );

        // 3. 构建请求，temperature=0 让 JSON 输出更稳定
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .build()?;

        // 4. 发送请求
        tracing::debug!("[OPENAI] Sending request to LLM model: {}", self.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .context("Failed to call OpenAI API")?;

        // 5. 提取内容
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| CheckinError::ModelError(format!("Empty response from {}", self.model)).into())
    }
}
