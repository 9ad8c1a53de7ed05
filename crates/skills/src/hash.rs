use std::path::Path;

use {
    anyhow::Result,
    sha2::{Digest, Sha256},
};

/// Deterministic digest of a directory tree's structure and contents.
///
/// Entries are visited in lexicographic name order at every level,
/// independent of filesystem enumeration order. Each entry mixes a tag plus
/// its `/`-normalized relative path into the digest; files additionally mix
/// their full byte content. Symbolic links contribute only their path —
/// target contents are never followed, so broken or external links cannot
/// fail the hash. Used for change detection only, never integrity.
pub fn hash_dir(dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    walk(&mut hasher, dir, "", None)?;
    Ok(hex_digest(hasher))
}

/// Like [`hash_dir`], but only root-level entries whose names match the
/// allow-list (case-insensitive) are considered. Allowed subdirectories are
/// descended into normally. Used when comparing root-mode skills, where
/// unrelated sibling files must not affect the comparison.
pub fn hash_dir_filtered(dir: &Path, root_allow: &[&str]) -> Result<String> {
    let allow: Vec<String> = root_allow.iter().map(|name| name.to_lowercase()).collect();
    let mut hasher = Sha256::new();
    walk(&mut hasher, dir, "", Some(allow.as_slice()))?;
    Ok(hex_digest(hasher))
}

fn walk(
    hasher: &mut Sha256,
    dir: &Path,
    prefix: &str,
    root_allow: Option<&[String]>,
) -> Result<()> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    for name in names {
        if let Some(allow) = root_allow
            && !allow.contains(&name.to_lowercase())
        {
            continue;
        }

        let full = dir.join(&name);
        let rel = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        let meta = std::fs::symlink_metadata(&full)?;
        if meta.file_type().is_symlink() {
            hasher.update(format!("symlink:{rel}"));
        } else if meta.is_dir() {
            hasher.update(format!("dir:{rel}"));
            walk(hasher, &full, &rel, None)?;
        } else if meta.is_file() {
            hasher.update(format!("file:{rel}"));
            hasher.update(std::fs::read(&full)?);
        }
    }
    Ok(())
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
