use crate::llm::ModelBackend;
use anyhow::{Context, Result};
use async_trait::async_trait;
use checkin_core::CheckinError;
use dotenvy::dotenv;
use reqwest::header;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    // 对应 JSON 中的 "candidates"
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    // 对应 JSON 中的 "finishReason" (可选，用于调试)
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

// ==========================================
// Gemini Backend
// ==========================================

pub struct GeminiBackend {
    model: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// 创建一个新的 Gemini 实例
    ///
    /// `model` 允许带 "models/" 前缀，会被去掉。
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        // 构建默认 Header，API Key 按 Header 方式传递
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            header::HeaderValue::from_str(api_key)
                .map_err(|e| CheckinError::ConfigError(format!("Invalid Gemini API key: {}", e)))?,
        );
        headers.insert(
            "Content-Type",
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build reqwest client")?;

        let model = model.trim().trim_start_matches("models/").to_string();
        tracing::info!("[GEMINI] Initialized ({})", model);

        Ok(Self { client, model })
    }

    /// 从环境变量 GEMINI_API_KEY / GEMINI_MODEL 初始化
    pub fn from_env(timeout: Duration) -> Result<Self> {
        dotenv().ok();
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| CheckinError::ConfigError("GEMINI_API_KEY not found".to_string()))?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        Self::new(&api_key, &model, timeout)
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String> {
        // 1. 构建 URL
        let url = format!("{}/{}:generateContent", GEMINI_ENDPOINT, self.model);

        // 2. 构建请求 Body，系统提示词为空时不发送 system_instruction
        let mut request_body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_input }]
            }]
        });
        if !system_prompt.is_empty() {
            request_body["system_instruction"] = json!({
                "parts": [{ "text": system_prompt }]
            });
        }

        tracing::debug!(
            "[GEMINI] generateContent model={} promptLen={}",
            self.model,
            system_prompt.len() + user_input.len()
        );

        // 3. 发送异步请求
        let res = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        // 4. 检查 HTTP 状态码
        if !res.status().is_success() {
            let status = res.status();
            let error_text = res.text().await.unwrap_or_default();
            return Err(CheckinError::ModelError(format!(
                "Gemini API Error: Status {}, Body: {}",
                status, error_text
            ))
            .into());
        }

        // 5. 解析 JSON 响应
        let response_data: GeminiResponse = res
            .json()
            .await
            .context("Failed to deserialize Gemini response JSON")?;

        // 6. 提取文本内容: candidates[0] -> content -> parts[*] -> text
        let candidate = response_data
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| CheckinError::ModelError("No candidates in Gemini response".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CheckinError::ModelError(format!(
                "Empty Gemini response (finishReason={:?})",
                candidate.finish_reason
            ))
            .into());
        }

        tracing::debug!("[GEMINI] responseLen={}", text.len());
        Ok(text)
    }
}
