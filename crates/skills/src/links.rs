use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::parse::check_skill_dir;

/// Create a directory link. Unix uses a symlink; Windows uses a junction-style
/// directory symlink so no elevated privileges are required.
pub async fn create_symlink(source: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    tokio::fs::symlink(source, link)
        .await
        .with_context(|| format!("failed to link {}", link.display()))?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(source, link)
        .with_context(|| format!("failed to link {}", link.display()))?;
    Ok(())
}

/// Remove a link entry. Never used on real directories.
pub async fn delete_symlink(link: &Path) -> Result<()> {
    if tokio::fs::remove_file(link).await.is_ok() {
        return Ok(());
    }
    // Windows directory links remove as directories.
    tokio::fs::remove_dir(link)
        .await
        .with_context(|| format!("failed to remove link {}", link.display()))
}

/// Resolve a link's target to an absolute path (relative targets resolve
/// against the link's parent directory).
pub async fn resolve_link_target(link: &Path) -> Result<PathBuf> {
    let target = tokio::fs::read_link(link).await?;
    if target.is_absolute() {
        Ok(target)
    } else {
        Ok(link.parent().unwrap_or(Path::new(".")).join(target))
    }
}

/// A link is valid only when it is actually a link and its target holds a
/// parseable skill descriptor. A link to a deleted or corrupted skill is
/// invalid regardless of whether the target path exists.
pub async fn check_symlink(link: &Path) -> bool {
    let Ok(meta) = tokio::fs::symlink_metadata(link).await else {
        return false;
    };
    if !meta.file_type().is_symlink() {
        return false;
    }
    match resolve_link_target(link).await {
        Ok(target) => check_skill_dir(&target).await,
        Err(_) => false,
    }
}
