use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod openai;

/// 模型后端抽象接口 (ModelBackend)
///
/// 该 Trait 定义了与大语言模型 (LLM) 进行交互的通用行为。
/// 所有语言分析能力 (任务提取、情绪、项目归类、缺口分析、追问、汇总) 都只依赖这一个接口，
/// 调用方以 `Option<Arc<dyn ModelBackend>>` 持有它，`None` 即表示能力不可用。
///
/// # 线程安全
/// 该 Trait 继承了 `Send + Sync`，实现对象可以通过 `Arc<dyn ModelBackend>` 在任务间共享。
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// 模型名称，仅用于日志
    fn model_name(&self) -> &str;

    /// 执行一次对话请求 (Chat Completion)
    ///
    /// # 参数 (Arguments)
    ///
    /// * `system_prompt` - 系统提示词，可以为空字符串。
    /// * `user_input` - 用户输入，实际的指令内容。
    ///
    /// # 返回值 (Returns)
    ///
    /// * `Ok(String)` - 模型生成的回复文本。
    /// * `Err(anyhow::Error)` - 网络连接失败、API 密钥无效、超出 Token 限制等。
    async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String>;

    /// 单段 Prompt 生成文本 (无系统提示词)
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.chat("", prompt).await
    }
}
