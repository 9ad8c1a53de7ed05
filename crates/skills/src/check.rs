use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use {anyhow::Result, tracing::warn};

use skillink_common::{debug::append_debug_log, fs::path_exists};

use skillink_config::Config;

use crate::{
    discover::{CopyMode, ROOT_SKILL_DIRS, SourceSkill, list_source_skills},
    hash::{hash_dir, hash_dir_filtered},
    parse::SKILL_FILE,
    roots::root_skills_dir,
    source::{SourceSpec, fetch_source, parse_source_input, parse_source_key},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillStatus {
    UpToDate,
    UpdateAvailable,
    MissingLocal,
    MissingRemote,
}

#[derive(Debug, Clone)]
pub struct SkillCheck {
    pub name: String,
    pub status: SkillStatus,
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source_key: String,
    pub display: String,
    pub skills: Vec<SkillCheck>,
    /// Set when the source could not be fetched or listed; the remaining
    /// sources still produce reports.
    pub error: Option<String>,
}

pub struct CheckOptions<'a> {
    pub root_dir: &'a Path,
    /// Restrict to these sources (user-form strings). Empty = all tracked.
    pub sources: &'a [String],
    /// Restrict to these skill names. Empty = no filter.
    pub skills: &'a [String],
}

/// Classify every tracked skill as up-to-date, update-available, or missing
/// on either side, by comparing content hashes of the local copy and a fresh
/// remote fetch. Read-only: neither the filesystem nor the configuration is
/// mutated.
pub async fn check_updates(options: CheckOptions<'_>, config: &Config) -> Result<Vec<SourceReport>> {
    let CheckOptions {
        root_dir,
        sources,
        skills,
    } = options;

    let skill_filter: Option<BTreeSet<&str>> = if skills.is_empty() {
        None
    } else {
        Some(skills.iter().map(String::as_str).collect())
    };

    let mut specs: Vec<SourceSpec> = Vec::new();
    if sources.is_empty() {
        for key in config.install_sources.keys() {
            specs.push(parse_source_key(key)?);
        }
    } else {
        for source in sources {
            specs.push(parse_source_input(source, root_dir).await?);
        }
    }

    let mut reports = Vec::new();
    for spec in specs {
        let Some(record) = config.install_sources.get(&spec.key) else {
            append_debug_log(root_dir, &format!("Source not installed: {}", spec.key)).await?;
            continue;
        };

        let targets: Vec<&String> = record
            .installed
            .iter()
            .filter(|name| {
                skill_filter
                    .as_ref()
                    .is_none_or(|filter| filter.contains(name.as_str()))
            })
            .collect();

        match check_one_source(root_dir, &spec, &targets).await {
            Ok(checks) => reports.push(SourceReport {
                source_key: spec.key.clone(),
                display: spec.display.clone(),
                skills: checks,
                error: None,
            }),
            Err(e) => {
                let message = format!("Check failed for {}: {e}", spec.display);
                append_debug_log(root_dir, &message).await?;
                warn!("{message}");
                reports.push(SourceReport {
                    source_key: spec.key.clone(),
                    display: spec.display.clone(),
                    skills: Vec::new(),
                    error: Some(e.to_string()),
                });
            },
        }
    }

    Ok(reports)
}

async fn check_one_source(
    root_dir: &Path,
    spec: &SourceSpec,
    targets: &[&String],
) -> Result<Vec<SkillCheck>> {
    let fetched = fetch_source(spec, root_dir).await?;
    let source_skills = list_source_skills(&fetched.dir, spec, root_dir).await?;
    let source_map: BTreeMap<&str, &SourceSkill> = source_skills
        .iter()
        .map(|skill| (skill.name.as_str(), skill))
        .collect();

    let mut checks = Vec::new();
    for name in targets {
        let local_dir = root_skills_dir(root_dir).join(name);
        if !path_exists(&local_dir).await {
            checks.push(SkillCheck {
                name: (*name).clone(),
                status: SkillStatus::MissingLocal,
            });
            continue;
        }
        let Some(remote) = source_map.get(name.as_str()) else {
            checks.push(SkillCheck {
                name: (*name).clone(),
                status: SkillStatus::MissingRemote,
            });
            continue;
        };

        // Root-mode skills live next to unrelated repository files; only
        // the materialized subset participates in the comparison.
        let (local_hash, remote_hash) = if remote.copy_mode == CopyMode::Root {
            let mut allow: Vec<&str> = vec![SKILL_FILE];
            allow.extend_from_slice(ROOT_SKILL_DIRS);
            (
                hash_dir_filtered(&local_dir, &allow)?,
                hash_dir_filtered(&remote.dir, &allow)?,
            )
        } else {
            (hash_dir(&local_dir)?, hash_dir(&remote.dir)?)
        };

        checks.push(SkillCheck {
            name: (*name).clone(),
            status: if local_hash == remote_hash {
                SkillStatus::UpToDate
            } else {
                SkillStatus::UpdateAvailable
            },
        });
    }
    Ok(checks)
}
