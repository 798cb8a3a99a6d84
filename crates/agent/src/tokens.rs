use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

static BPE: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn bpe() -> Option<&'static CoreBPE> {
    BPE.get_or_init(|| match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            tracing::warn!("[TOKENS] cl100k_base unavailable, falling back to char estimate: {}", e);
            None
        }
    })
    .as_ref()
}

/// 估算文本的 Token 数量
pub fn count_tokens(text: &str) -> usize {
    match bpe() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        // 粗略估算: 4 个字符约 1 个 Token
        None => text.chars().count().div_ceil(4),
    }
}

/// 按顺序保留行，直到累计 Token 超出预算
///
/// 第一行总是保留，避免样本为空。
pub fn fit_to_budget(lines: Vec<String>, budget: usize) -> Vec<String> {
    let mut used = 0usize;
    let mut kept = Vec::with_capacity(lines.len());

    for line in lines {
        let cost = count_tokens(&line);
        if !kept.is_empty() && used + cost > budget {
            break;
        }
        used += cost;
        kept.push(line);
    }
    kept
}

/// 按字符截断 (不会切断 UTF-8 字符)
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
