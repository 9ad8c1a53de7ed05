use std::path::{Path, PathBuf};

use anyhow::Result;

/// True when the path exists (any kind of entry, including broken-looking
/// directories; symlinks are followed).
pub async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

/// True when the path is a symlink, regardless of whether its target exists.
pub async fn is_symlink_like(path: &Path) -> bool {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta.file_type().is_symlink(),
        Err(_) => false,
    }
}

pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// List immediate subdirectory names, sorted for stable iteration order.
/// Missing directories yield an empty list.
pub async fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(_) => return Ok(names),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Find a file in `dir` whose name matches `filename` case-insensitively.
pub async fn find_file_ignore_case(dir: &Path, filename: &str) -> Result<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(_) => return Ok(None),
    };
    let wanted = filename.to_lowercase();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file()
            && let Some(name) = entry.file_name().to_str()
            && name.to_lowercase() == wanted
        {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}

/// Find a subdirectory of `dir` matching `name` case-insensitively, returning
/// its actual on-disk name.
pub async fn find_dir_ignore_case(dir: &Path, name: &str) -> Result<Option<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(_) => return Ok(None),
    };
    let wanted = name.to_lowercase();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir()
            && let Some(actual) = entry.file_name().to_str()
            && actual.to_lowercase() == wanted
        {
            return Ok(Some(actual.to_string()));
        }
    }
    Ok(None)
}

/// Recursively copy a directory tree. Symlinked entries are copied through
/// (their target contents, the platform default for `fs::copy`).
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let dest_path = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            std::fs::copy(entry.path(), dest_path)?;
        }
    }
    Ok(())
}
