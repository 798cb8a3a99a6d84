use anyhow::{Context, Result};
use checkin_core::{ChatMetadata, ProcessUpdateRequest};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 回放目录中的一条 Markdown 签到
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayItem {
    pub path: PathBuf,
    pub request: ProcessUpdateRequest,
}

/// 收集 `root` 下的全部 `.md` 文件 (按路径排序)
///
/// `pattern` 按完整路径做大小写不敏感的子串过滤，`limit` 限制返回数量。
pub fn collect_markdown(root: &Path, pattern: Option<&str>, limit: usize) -> Result<Vec<ReplayItem>> {
    let pattern = pattern.map(str::to_lowercase);
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        })
        .filter(|path| {
            pattern
                .as_deref()
                .is_none_or(|p| path.to_string_lossy().to_lowercase().contains(p))
        })
        .collect();
    paths.sort();
    paths.truncate(limit);

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let request = request_from_path(&path, text);
        items.push(ReplayItem { path, request });
    }
    Ok(items)
}

/// 目录约定: `.../Data/<员工名>/<会话目录>/<消息>.md`
fn request_from_path(path: &Path, text: String) -> ProcessUpdateRequest {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let person = parts
        .iter()
        .position(|p| p.eq_ignore_ascii_case("data"))
        .and_then(|idx| parts.get(idx + 1))
        .filter(|p| !p.ends_with(".md"))
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());
    let email = format!(
        "{}@example.local",
        person.split_whitespace().collect::<Vec<_>>().join(".").to_lowercase()
    );

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    ProcessUpdateRequest {
        message_text: text,
        employee_id: email.clone(),
        employee_email: email,
        employee_display_name: person,
        chat_metadata: ChatMetadata {
            space_name: parent,
            thread_name: stem.clone(),
            message_name: stem,
            space_type: "SPACE".to_string(),
        },
        ..Default::default()
    }
}
