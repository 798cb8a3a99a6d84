//! 模型输出的 JSON 解析工具
//!
//! 模型经常在 JSON 外面包一层 ```json 代码块，或者在前面加几句说明文字。
//! 这里统一做：去代码块 -> 直接解析 -> 失败则截取第一个完整的数组/对象再解析。

use checkin_core::CheckinError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 清理 LLM 返回的 Markdown 代码块格式
pub fn clean_json_markdown(input: &str) -> String {
    let trimmed = input.trim();
    let without_open = match trimmed.strip_prefix("```") {
        // 去掉 ```json / ```JSON 之类的语言标记
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        None => trimmed,
    };
    without_open
        .trim()
        .strip_suffix("```")
        .unwrap_or(without_open.trim())
        .trim()
        .to_string()
}

/// 截取从第一个 `open` 开始、括号配平的片段 (忽略字符串内部的括号)
fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn extract_first_json_array(text: &str) -> Option<&str> {
    extract_balanced(text, '[', ']')
}

pub fn extract_first_json_object(text: &str) -> Option<&str> {
    extract_balanced(text, '{', '}')
}

/// 解析为 JSON 数组；单个对象视为只有一个元素的数组
///
/// 元素本身不做校验，由调用方逐个校验并丢弃非法元素。
pub fn parse_json_values(raw: &str) -> Result<Vec<Value>, CheckinError> {
    let cleaned = clean_json_markdown(raw);

    let value = match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => value,
        Err(_) => {
            let fragment = extract_first_json_array(&cleaned)
                .or_else(|| extract_first_json_object(&cleaned))
                .ok_or_else(|| CheckinError::MalformedResponse("No JSON array found in response".to_string()))?;
            serde_json::from_str::<Value>(fragment)
                .map_err(|e| CheckinError::MalformedResponse(format!("Invalid JSON fragment: {}", e)))?
        }
    };

    match value {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(CheckinError::MalformedResponse(format!(
            "Expected JSON array, got {}",
            type_name(&other)
        ))),
    }
}

/// 严格解析单个 JSON 对象
pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T, CheckinError> {
    let cleaned = clean_json_markdown(raw);

    if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
        return Ok(parsed);
    }

    let fragment = extract_first_json_object(&cleaned)
        .ok_or_else(|| CheckinError::MalformedResponse("No JSON object found in response".to_string()))?;
    serde_json::from_str::<T>(fragment).map_err(|e| CheckinError::MalformedResponse(e.to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
