use std::path::{Path, PathBuf};

use {serde_json::Map, thiserror::Error};

use skillink_common::fs::find_file_ignore_case;

/// Canonical descriptor file name. Lookup is case-insensitive.
pub const SKILL_FILE: &str = "SKILL.md";

/// Parsed metadata for a single skill.
#[derive(Debug, Clone)]
pub struct SkillMeta {
    pub name: String,
    pub description: String,
    /// Free-form `metadata` frontmatter block. Non-object values are
    /// discarded in favor of an empty map.
    pub metadata: Map<String, serde_json::Value>,
    pub dir: PathBuf,
}

/// Why a skill directory failed to read. A missing descriptor is a silent
/// skip for discovery; a present-but-malformed one is skip-and-warn.
#[derive(Debug, Error)]
pub enum SkillReadError {
    #[error("SKILL.md not found")]
    Missing,
    #[error("{0}")]
    Invalid(String),
}

impl SkillReadError {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Basic path-segment validation: non-empty after trim, no separators.
pub fn is_valid_skill_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains('/') && !name.contains('\\')
}

/// Read and validate the descriptor in `dir`.
pub async fn read_skill_dir(dir: &Path) -> Result<SkillMeta, SkillReadError> {
    let file = find_file_ignore_case(dir, SKILL_FILE)
        .await
        .map_err(|e| SkillReadError::Invalid(e.to_string()))?
        .ok_or(SkillReadError::Missing)?;

    let raw = tokio::fs::read_to_string(&file)
        .await
        .map_err(|e| SkillReadError::Invalid(e.to_string()))?;
    let frontmatter = split_frontmatter(&raw)?;
    let data: serde_yaml::Value = serde_yaml::from_str(&frontmatter)
        .map_err(|e| SkillReadError::Invalid(format!("invalid frontmatter: {e}")))?;

    let name = scalar_to_string(data.get("name")).trim().to_string();
    if name.is_empty() {
        return Err(SkillReadError::Invalid("name is required".to_string()));
    }

    // The key itself is required; an empty value is allowed.
    let description = match data.get("description") {
        Some(value) => scalar_to_string(Some(value)),
        None => return Err(SkillReadError::Invalid("description is required".to_string())),
    };

    let metadata = data
        .get("metadata")
        .and_then(|value| serde_json::to_value(value).ok())
        .and_then(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    Ok(SkillMeta {
        name,
        description,
        metadata,
        dir: dir.to_path_buf(),
    })
}

/// True when `dir` holds a readable, valid descriptor.
pub async fn check_skill_dir(dir: &Path) -> bool {
    read_skill_dir(dir).await.is_ok()
}

/// Extract the YAML between the `---` delimiters.
fn split_frontmatter(content: &str) -> Result<String, SkillReadError> {
    let trimmed = content.trim_start();
    let Some(after_open) = trimmed.strip_prefix("---") else {
        return Err(SkillReadError::Invalid(
            "missing frontmatter delimiter".to_string(),
        ));
    };
    let close = after_open
        .find("\n---")
        .ok_or_else(|| SkillReadError::Invalid("unterminated frontmatter".to_string()))?;
    Ok(after_open[..close].trim().to_string())
}

/// Render a YAML scalar as a string; null and absent both become empty.
fn scalar_to_string(value: Option<&serde_yaml::Value>) -> String {
    match value {
        Some(serde_yaml::Value::String(s)) => s.clone(),
        Some(serde_yaml::Value::Number(n)) => n.to_string(),
        Some(serde_yaml::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
