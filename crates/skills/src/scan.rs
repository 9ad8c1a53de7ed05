use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use anyhow::Result;

use skillink_common::{
    debug::append_debug_log,
    fs::{ensure_dir, is_symlink_like, list_dirs, path_exists},
};

use skillink_config::Config;

use crate::{
    links::{check_symlink, create_symlink, delete_symlink},
    roots::{list_root_skills, root_skills_dir, scan_skills_from_base},
};

const NODE_MODULES_DIR: &str = "node_modules";
const PACKAGES_DIR: &str = "packages";

const DEFAULT_PREFIX_NPM: &str = "npm-";
const DEFAULT_PREFIX_PACKAGE: &str = "package-";

/// Result of a project scan.
pub struct ScanOutcome {
    /// Valid entries in the root skills directory after reconciliation.
    pub root_skills: Vec<String>,
}

/// Link name for a dependency-package skill: `<prefix><package>-<skill>`,
/// with the scope separator of scoped package names flattened.
fn npm_link_name(prefix: &str, package: &str, skill: &str) -> String {
    let safe_package = package.replacen('/', "-", 1);
    format!("{prefix}{safe_package}-{skill}")
}

/// Link name for a workspace-package skill: `<prefix><package>-<skill>`.
fn package_link_name(prefix: &str, package: &str, skill: &str) -> String {
    format!("{prefix}{package}-{skill}")
}

/// Discover skills embedded in dependency and workspace packages and
/// reconcile them into the root skills directory as symlinks.
///
/// Discovered skills stay owned by their origin package — they are linked,
/// never copied. Link-name collisions are first-seen-wins; a real directory
/// squatting on a computed link name is logged and left alone.
pub async fn scan_project(root_dir: &Path, config: &Config) -> Result<ScanOutcome> {
    let skills_dir = root_skills_dir(root_dir);
    ensure_dir(&skills_dir).await?;

    let prefix_npm = non_empty_or(&config.skill_link_prefix_npm, DEFAULT_PREFIX_NPM);
    let prefix_package = non_empty_or(&config.skill_link_prefix_package, DEFAULT_PREFIX_PACKAGE);

    // (link name, skill dir), in stable discovery order.
    let mut scanned: Vec<(String, PathBuf)> = Vec::new();

    if config.scan_npm {
        scan_node_modules(root_dir, prefix_npm, &mut scanned).await?;
    }
    if config.scan_packages {
        let packages_dir = root_dir.join(PACKAGES_DIR);
        for package in list_dirs(&packages_dir).await? {
            let base = packages_dir.join(&package);
            for (skill_name, skill_dir) in scan_skills_from_base(&base, root_dir).await? {
                scanned.push((
                    package_link_name(prefix_package, &package, &skill_name),
                    skill_dir,
                ));
            }
        }
    }

    let mut used_names: BTreeSet<String> = BTreeSet::new();
    for (link_name, skill_dir) in &scanned {
        if used_names.contains(link_name) {
            append_debug_log(root_dir, &format!("Duplicate skill link name: {link_name}")).await?;
            continue;
        }
        used_names.insert(link_name.clone());

        let link_path = skills_dir.join(link_name);
        if tokio::fs::symlink_metadata(&link_path).await.is_ok() {
            if !is_symlink_like(&link_path).await {
                append_debug_log(
                    root_dir,
                    &format!("Conflict: {} exists and is not a symlink.", link_path.display()),
                )
                .await?;
                continue;
            }
            if let Err(e) = delete_symlink(&link_path).await {
                append_debug_log(
                    root_dir,
                    &format!("Failed to update link: {} {e}", link_path.display()),
                )
                .await?;
                continue;
            }
        }

        if let Err(e) = create_symlink(skill_dir, &link_path).await {
            append_debug_log(
                root_dir,
                &format!("Failed to create link: {} {e}", link_path.display()),
            )
            .await?;
        }
    }

    if config.clean_links {
        clean_stale_links(
            root_dir,
            &skills_dir,
            config,
            prefix_npm,
            prefix_package,
            &used_names,
        )
        .await?;
    }

    Ok(ScanOutcome {
        root_skills: list_root_skills(root_dir).await?,
    })
}

async fn scan_node_modules(
    root_dir: &Path,
    prefix: &str,
    scanned: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    let node_modules = root_dir.join(NODE_MODULES_DIR);
    for module in list_dirs(&node_modules).await? {
        if module.starts_with('@') {
            let scope_dir = node_modules.join(&module);
            for scoped in list_dirs(&scope_dir).await? {
                let full_name = format!("{module}/{scoped}");
                let base = scope_dir.join(&scoped);
                for (skill_name, skill_dir) in scan_skills_from_base(&base, root_dir).await? {
                    scanned.push((npm_link_name(prefix, &full_name, &skill_name), skill_dir));
                }
            }
            continue;
        }
        let base = node_modules.join(&module);
        for (skill_name, skill_dir) in scan_skills_from_base(&base, root_dir).await? {
            scanned.push((npm_link_name(prefix, &module, &skill_name), skill_dir));
        }
    }
    Ok(())
}

/// Remove root-directory symlinks that no longer resolve, and namespaced
/// links whose origin package stopped exporting the skill. Only links whose
/// scan category is enabled are considered for the second rule.
async fn clean_stale_links(
    root_dir: &Path,
    skills_dir: &Path,
    config: &Config,
    prefix_npm: &str,
    prefix_package: &str,
    used_names: &BTreeSet<String>,
) -> Result<()> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(skills_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();

    for name in names {
        let link_path = skills_dir.join(&name);
        if !is_symlink_like(&link_path).await {
            continue;
        }

        let is_npm_link = name.starts_with(prefix_npm);
        let is_package_link = name.starts_with(prefix_package);
        let should_check = (is_npm_link && config.scan_npm)
            || (is_package_link && config.scan_packages)
            || (!is_npm_link && !is_package_link);
        if !should_check {
            continue;
        }

        if !check_symlink(&link_path).await {
            if let Err(e) = delete_symlink(&link_path).await {
                append_debug_log(
                    root_dir,
                    &format!("Failed to remove stale link: {} {e}", link_path.display()),
                )
                .await?;
            }
            continue;
        }

        if (is_npm_link || is_package_link) && !used_names.contains(&name) {
            if let Err(e) = delete_symlink(&link_path).await {
                append_debug_log(
                    root_dir,
                    &format!("Failed to remove stale link: {} {e}", link_path.display()),
                )
                .await?;
            }
        }
    }
    Ok(())
}

/// Gitignore patterns for generated links that the project is missing.
/// Scan-generated symlinks should never be committed.
pub async fn missing_gitignore_patterns(root_dir: &Path, config: &Config) -> Vec<String> {
    let mut patterns = Vec::new();
    if config.scan_npm {
        patterns.push(format!(
            "**/skills/{}*",
            non_empty_or(&config.skill_link_prefix_npm, DEFAULT_PREFIX_NPM)
        ));
    }
    if config.scan_packages {
        patterns.push(format!(
            "**/skills/{}*",
            non_empty_or(&config.skill_link_prefix_package, DEFAULT_PREFIX_PACKAGE)
        ));
    }

    let gitignore = root_dir.join(".gitignore");
    if !path_exists(&gitignore).await {
        return patterns;
    }
    let content = tokio::fs::read_to_string(&gitignore)
        .await
        .unwrap_or_default();
    patterns
        .into_iter()
        .filter(|pattern| !content.lines().any(|line| line.trim() == pattern))
        .collect()
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}
