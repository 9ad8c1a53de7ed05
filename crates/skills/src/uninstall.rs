use std::{collections::BTreeSet, path::Path};

use anyhow::{Result, bail};

use skillink_common::{
    debug::append_debug_log,
    fs::{is_symlink_like, path_exists},
    recycle::move_to_trash,
};

use skillink_config::{Config, ConfigStore, SelectionMode};

use crate::{
    pattern::{is_exact_pattern, matches_any_pattern, matches_pattern},
    roots::root_skills_dir,
    source::{SourceSpec, parse_source_input, parse_source_key},
    sync::resync_agents,
};

pub struct UninstallOptions<'a> {
    pub root_dir: &'a Path,
    pub source_input: &'a str,
    pub agents: &'a [String],
    /// Glob-style name patterns. Empty = uninstall the entire source.
    pub skill_patterns: &'a [String],
}

#[derive(Debug)]
pub struct UninstallOutcome {
    pub removed: Vec<String>,
    pub skipped: Vec<String>,
    /// Patterns that matched no installed skill.
    pub missing: Vec<String>,
    pub source_key: String,
    pub display: String,
}

/// Accept install-style inputs as well as persisted identity keys.
async fn resolve_uninstall_source(source_input: &str, root_dir: &Path) -> Result<SourceSpec> {
    match parse_source_input(source_input, root_dir).await {
        Ok(spec) => Ok(spec),
        Err(err) => {
            if source_input.starts_with("git:") || source_input.starts_with("local:") {
                parse_source_key(source_input)
            } else {
                Err(err)
            }
        },
    }
}

/// Remove installed skills of a tracked source.
///
/// Local copies go to the recycle bin, never a hard delete; symlinked copies
/// are assumed externally managed and skipped. Pattern-scoped uninstalls
/// keep the tracking record and extend its exclude list so a later full
/// update cannot resurrect the removed names.
pub async fn uninstall_from_source(
    options: UninstallOptions<'_>,
    config: &mut Config,
) -> Result<UninstallOutcome> {
    let UninstallOptions {
        root_dir,
        source_input,
        agents,
        skill_patterns,
    } = options;

    let source = resolve_uninstall_source(source_input, root_dir).await?;
    let Some(record) = config.install_sources.get(&source.key).cloned() else {
        bail!("source not installed: {}", source.display);
    };

    let patterns: Vec<String> = skill_patterns
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect();
    let targets: Vec<String> = if patterns.is_empty() {
        record.installed.clone()
    } else {
        record
            .installed
            .iter()
            .filter(|name| matches_any_pattern(name, &patterns))
            .cloned()
            .collect()
    };
    let missing: Vec<String> = patterns
        .iter()
        .filter(|pattern| {
            !record
                .installed
                .iter()
                .any(|name| matches_pattern(name, pattern))
        })
        .cloned()
        .collect();

    if targets.is_empty() {
        return Ok(UninstallOutcome {
            removed: Vec::new(),
            skipped: Vec::new(),
            missing,
            source_key: source.key,
            display: source.display,
        });
    }

    let mut removed = Vec::new();
    let mut skipped = Vec::new();

    for name in &targets {
        let target_dir = root_skills_dir(root_dir).join(name);
        if path_exists(&target_dir).await {
            if is_symlink_like(&target_dir).await {
                append_debug_log(
                    root_dir,
                    &format!("Uninstall skipped symlink: {}", target_dir.display()),
                )
                .await?;
                skipped.push(name.clone());
                continue;
            }
            move_to_trash(&target_dir)?;
        } else {
            append_debug_log(
                root_dir,
                &format!("Uninstall missing local dir: {}", target_dir.display()),
            )
            .await?;
        }
        removed.push(name.clone());
        config.skill_disabled.remove(name);
    }

    let removed_set: BTreeSet<&String> = removed.iter().collect();
    let next_installed: Vec<String> = record
        .installed
        .iter()
        .filter(|name| !removed_set.contains(name))
        .cloned()
        .collect();

    if patterns.is_empty() {
        config.install_sources.remove(&source.key);
    } else {
        let mut next = record;
        next.installed = next_installed;
        for name in &removed {
            if !next.exclude.contains(name) {
                next.exclude.push(name.clone());
            }
        }
        if next.mode == SelectionMode::Only {
            // Exact include entries for removed skills no longer select
            // anything; wildcard patterns stay.
            next.include
                .retain(|pattern| !(removed_set.contains(pattern) && is_exact_pattern(pattern)));
        }
        if next.installed.is_empty() {
            config.install_sources.remove(&source.key);
        } else {
            config.install_sources.insert(source.key.clone(), next);
        }
    }

    ConfigStore::new(root_dir).save(config).await?;
    resync_agents(root_dir, config, agents).await?;

    Ok(UninstallOutcome {
        removed,
        skipped,
        missing,
        source_key: source.key,
        display: source.display,
    })
}
