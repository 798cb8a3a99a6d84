use thiserror::Error;

/// 统一的签到系统错误定义
/// 使用 `thiserror` 宏自动生成 Display 和 Error trait
///
/// 注意：核心流程的公开入口不会把这些错误抛给调用方，
/// 而是在边界处记录日志并走确定性的兜底路径。
#[derive(Error, Debug)]
pub enum CheckinError {
    // =================================================================
    // 1. 系统与配置类 (System & Config)
    // =================================================================
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown internal error: {0}")]
    InternalError(String),

    // =================================================================
    // 2. 输入校验类 (Programmer Input)
    // =================================================================
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid data format: {0}")]
    InvalidData(String),

    // =================================================================
    // 3. 语言分析能力 (Capability)
    // =================================================================
    /// 模型调用失败 (网络、鉴权、限流等)
    #[error("Language model call failed: {0}")]
    ModelError(String),

    /// 模型返回了无法解析或不满足结构约束的内容
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    // =================================================================
    // 4. 基础设施类 (Infrastructure)
    // 注意：Core 不直接依赖 redis/reqwest，用 String 包装错误信息
    // =================================================================
    #[error("Document storage error: {0}")]
    StorageError(String),

    #[error("Failed to serialize/deserialize data: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<std::io::Error> for CheckinError {
    fn from(err: std::io::Error) -> Self {
        CheckinError::StorageError(err.to_string())
    }
}
