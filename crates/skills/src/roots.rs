use std::path::{Path, PathBuf};

use anyhow::Result;

use skillink_common::{
    debug::append_debug_log,
    fs::{is_symlink_like, list_dirs, path_exists},
};

use crate::{
    links::check_symlink,
    parse::{check_skill_dir, is_valid_skill_name, read_skill_dir},
};

/// Name of the canonical skills directory at the project root.
pub const SKILLS_DIR: &str = "skills";

pub fn root_skills_dir(root_dir: &Path) -> PathBuf {
    root_dir.join(SKILLS_DIR)
}

/// List valid skill entries in the root skills directory, sorted by name.
///
/// Links must resolve to a valid skill; real directories must carry a valid
/// descriptor. Everything else is logged and excluded.
pub async fn list_root_skills(root_dir: &Path) -> Result<Vec<String>> {
    let skills_dir = root_skills_dir(root_dir);
    let mut results = Vec::new();
    if !path_exists(&skills_dir).await {
        return Ok(results);
    }

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(&skills_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    for name in names {
        let entry_path = skills_dir.join(&name);
        if is_symlink_like(&entry_path).await {
            if check_symlink(&entry_path).await {
                results.push(name);
            } else {
                append_debug_log(
                    root_dir,
                    &format!("Invalid root skill link: {}", entry_path.display()),
                )
                .await?;
            }
            continue;
        }

        let Ok(meta) = tokio::fs::metadata(&entry_path).await else {
            continue;
        };
        if !meta.is_dir() {
            continue;
        }
        if check_skill_dir(&entry_path).await {
            results.push(name);
        } else {
            append_debug_log(
                root_dir,
                &format!("Invalid root skill dir: {}", entry_path.display()),
            )
            .await?;
        }
    }

    Ok(results)
}

/// A local skill is a real directory under root skills, not a symlink.
pub async fn is_local_skill_dir(root_dir: &Path, name: &str) -> bool {
    let dir = root_skills_dir(root_dir).join(name);
    match tokio::fs::symlink_metadata(&dir).await {
        Ok(meta) => meta.is_dir() && !meta.file_type().is_symlink(),
        Err(_) => false,
    }
}

/// Scan a package base directory for skills under its `skills/` child.
/// One level deep; the same validation rules as source discovery.
pub async fn scan_skills_from_base(
    base_dir: &Path,
    root_dir: &Path,
) -> Result<Vec<(String, PathBuf)>> {
    let skills_dir = base_dir.join(SKILLS_DIR);
    let mut results = Vec::new();
    if !path_exists(&skills_dir).await {
        return Ok(results);
    }

    for sub in list_dirs(&skills_dir).await? {
        if !is_valid_skill_name(&sub) {
            append_debug_log(
                root_dir,
                &format!("Invalid skill name: {sub} @ {}", skills_dir.display()),
            )
            .await?;
            continue;
        }
        let skill_dir = skills_dir.join(&sub);
        match read_skill_dir(&skill_dir).await {
            Ok(meta) if meta.name == sub => results.push((sub, skill_dir)),
            Ok(meta) => {
                append_debug_log(
                    root_dir,
                    &format!(
                        "Skill name mismatch: {}. folder={sub}, name={}",
                        skill_dir.display(),
                        meta.name
                    ),
                )
                .await?;
            },
            Err(err) => {
                append_debug_log(
                    root_dir,
                    &format!("Invalid SKILL.md: {}. {err}", skill_dir.display()),
                )
                .await?;
            },
        }
    }
    Ok(results)
}
