use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use {anyhow::Result, tracing::warn};

use skillink_common::{
    debug::append_debug_log,
    fs::{ensure_dir, is_symlink_like, path_exists},
    recycle::move_to_trash,
};

use skillink_config::{Config, ConfigStore, SelectionMode};

use crate::{
    discover::{SourceSkill, copy_skill, list_source_skills},
    install::apply_default_disabled,
    pattern::matches_any_pattern,
    roots::root_skills_dir,
    source::{SourceSpec, fetch_source, parse_source_input, parse_source_key},
    sync::resync_agents,
};

pub struct UpdateOptions<'a> {
    pub root_dir: &'a Path,
    pub agents: &'a [String],
    pub known_agents: &'a [String],
    pub apply_disabled: bool,
    /// Restrict to these sources (user-form strings). Empty = all tracked.
    pub sources: &'a [String],
    /// Restrict to these skill names. Empty = no filter.
    pub skills: &'a [String],
}

#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub updated: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<String>,
    /// Sources whose fetch or discovery failed; the rest proceeded.
    pub failed_sources: Vec<String>,
}

/// Refresh installed skills from their tracked sources.
///
/// A full update (no filters) prunes skills that vanished remotely and adds
/// newly available ones the source's selection state allows. Filtered runs
/// never prune and never add — they only refresh what they name. Symlinked
/// local copies are user-managed and are always skipped, never overwritten
/// or removed.
pub async fn update_installed(
    options: UpdateOptions<'_>,
    config: &mut Config,
) -> Result<UpdateOutcome> {
    let UpdateOptions {
        root_dir,
        agents,
        known_agents,
        apply_disabled,
        sources,
        skills,
    } = options;

    let skill_filter: Option<BTreeSet<&str>> = if skills.is_empty() {
        None
    } else {
        Some(skills.iter().map(String::as_str).collect())
    };
    let is_full_update = sources.is_empty() && skills.is_empty();

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

    let mut outcome = UpdateOutcome::default();
    ensure_dir(&root_skills_dir(root_dir)).await?;

    for spec in specs {
        if !config.install_sources.contains_key(&spec.key) {
            append_debug_log(root_dir, &format!("Source not installed: {}", spec.key)).await?;
            continue;
        }

        // One source failing must not abort its siblings.
        match update_one_source(
            root_dir,
            &spec,
            config,
            skill_filter.as_ref(),
            is_full_update,
            agents,
            known_agents,
            apply_disabled,
            &mut outcome,
        )
        .await
        {
            Ok(()) => {},
            Err(e) => {
                let message = format!("Update failed for {}: {e}", spec.display);
                append_debug_log(root_dir, &message).await?;
                warn!("{message}");
                outcome.failed_sources.push(spec.display.clone());
            },
        }
    }

    ConfigStore::new(root_dir).save(config).await?;
    resync_agents(root_dir, config, agents).await?;

    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
async fn update_one_source(
    root_dir: &Path,
    spec: &SourceSpec,
    config: &mut Config,
    skill_filter: Option<&BTreeSet<&str>>,
    is_full_update: bool,
    agents: &[String],
    known_agents: &[String],
    apply_disabled: bool,
    outcome: &mut UpdateOutcome,
) -> Result<()> {
    let fetched = fetch_source(spec, root_dir).await?;
    let source_skills = list_source_skills(&fetched.dir, spec, root_dir).await?;
    let source_map: BTreeMap<&str, &SourceSkill> = source_skills
        .iter()
        .map(|skill| (skill.name.as_str(), skill))
        .collect();

    let Some(record) = config.install_sources.get(&spec.key).cloned() else {
        return Ok(());
    };
    let mut installed = record.installed.clone();

    let targets: Vec<String> = installed
        .iter()
        .filter(|name| skill_filter.is_none_or(|filter| filter.contains(name.as_str())))
        .cloned()
        .collect();

    for name in targets {
        let target_dir = root_skills_dir(root_dir).join(&name);
        let Some(source_skill) = source_map.get(name.as_str()) else {
            if is_full_update {
                remove_vanished_skill(root_dir, &name, &target_dir, config, outcome).await?;
                installed.retain(|item| item != &name);
            } else {
                append_debug_log(
                    root_dir,
                    &format!("Missing remote skill: {name} @ {}", spec.key),
                )
                .await?;
                outcome.skipped.push(name.clone());
            }
            continue;
        };

        if path_exists(&target_dir).await {
            if is_symlink_like(&target_dir).await {
                append_debug_log(
                    root_dir,
                    &format!("Update conflict: {} is a symlink.", target_dir.display()),
                )
                .await?;
                outcome.skipped.push(name.clone());
                continue;
            }
            tokio::fs::remove_dir_all(&target_dir).await?;
        }

        copy_skill(source_skill, &target_dir).await?;
        outcome.updated.push(name.clone());
    }

    // Full-scope runs also pick up newly available remote skills, within
    // the bounds of the recorded selection.
    if skill_filter.is_none() {
        for (name, source_skill) in &source_map {
            if installed.iter().any(|item| item.as_str() == *name) {
                continue;
            }
            let allowed = match record.mode {
                SelectionMode::All => true,
                SelectionMode::Only => matches_any_pattern(name, &record.include),
            };
            if !allowed || matches_any_pattern(name, &record.exclude) {
                continue;
            }

            let target_dir = root_skills_dir(root_dir).join(name);
            if path_exists(&target_dir).await {
                append_debug_log(
                    root_dir,
                    &format!("Update conflict: {} already exists.", target_dir.display()),
                )
                .await?;
                outcome.skipped.push((*name).to_string());
                continue;
            }

            copy_skill(source_skill, &target_dir).await?;
            installed.push((*name).to_string());
            outcome.added.push((*name).to_string());
            apply_default_disabled(config, name, agents, known_agents, apply_disabled);
        }
    }

    if installed.is_empty() {
        config.install_sources.remove(&spec.key);
    } else if let Some(entry) = config.install_sources.get_mut(&spec.key) {
        entry.installed = installed;
    }

    Ok(())
}

/// A tracked skill no longer exists remotely: retire the local copy (to the
/// recycle bin) unless it is a user-managed symlink, and drop its state.
async fn remove_vanished_skill(
    root_dir: &Path,
    name: &str,
    target_dir: &PathBuf,
    config: &mut Config,
    outcome: &mut UpdateOutcome,
) -> Result<()> {
    if path_exists(target_dir).await {
        if is_symlink_like(target_dir).await {
            append_debug_log(
                root_dir,
                &format!("Skip removing symlink: {}", target_dir.display()),
            )
            .await?;
            outcome.skipped.push(name.to_string());
        } else {
            move_to_trash(target_dir)?;
            outcome.removed.push(name.to_string());
        }
    }
    config.skill_disabled.remove(name);
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
#[cfg(unix)]
mod tests {
    use {
        super::*,
        crate::install::{InstallOptions, install_from_source},
    };

    fn write_skill(dir: &Path, name: &str, description: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n"),
        )
        .unwrap();
    }

    async fn install(
        root: &Path,
        source: &Path,
        patterns: &[String],
        config: &mut Config,
    ) -> String {
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        install_from_source(
            InstallOptions {
                root_dir: root,
                source_input: &source_str,
                agents: &agents,
                known_agents: &agents,
                apply_disabled: true,
                skill_patterns: patterns,
            },
            config,
        )
        .await
        .unwrap()
        .source_key
    }

    fn update_options<'a>(root: &'a Path, agents: &'a [String]) -> UpdateOptions<'a> {
        UpdateOptions {
            root_dir: root,
            agents,
            known_agents: agents,
            apply_disabled: true,
            sources: &[],
            skills: &[],
        }
    }

    #[tokio::test]
    async fn test_update_refreshes_changed_skill() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        install(tmp.path(), &source, &[], &mut config).await;

        write_skill(&source.join("skills/alpha"), "alpha", "v2");
        let agents = vec!["cursor".to_string()];
        let outcome = update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert_eq!(outcome.updated, vec!["alpha"]);
        let descriptor =
            std::fs::read_to_string(tmp.path().join("skills/alpha/SKILL.md")).unwrap();
        assert!(descriptor.contains("v2"));
    }

    #[tokio::test]
    async fn test_full_update_adds_new_remote_skill_in_all_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        install(tmp.path(), &source, &[], &mut config).await;

        write_skill(&source.join("skills/beta"), "beta", "v1");
        let agents = vec!["cursor".to_string()];
        let outcome = update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert_eq!(outcome.added, vec!["beta"]);
        assert!(tmp.path().join("skills/beta").exists());
        assert!(tmp.path().join(".cursor/skills/beta").exists());
    }

    #[tokio::test]
    async fn test_only_mode_never_gains_unselected_skills() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");
        write_skill(&source.join("skills/beta"), "beta", "v1");

        let mut config = Config::default();
        let patterns = vec!["alpha".to_string()];
        install(tmp.path(), &source, &patterns, &mut config).await;

        write_skill(&source.join("skills/gamma"), "gamma", "v1");
        let agents = vec!["cursor".to_string()];
        let outcome = update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert!(outcome.added.is_empty());
        assert!(!tmp.path().join("skills/beta").exists());
        assert!(!tmp.path().join("skills/gamma").exists());
        assert!(tmp.path().join("skills/alpha").exists());
    }

    #[tokio::test]
    async fn test_excluded_skill_is_not_resurrected() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");
        write_skill(&source.join("skills/beta"), "beta", "v1");

        let mut config = Config::default();
        let key = install(tmp.path(), &source, &[], &mut config).await;

        // Simulate an uninstall of beta: removed locally, excluded in the
        // record.
        std::fs::remove_dir_all(tmp.path().join("skills/beta")).unwrap();
        let record = config.install_sources.get_mut(&key).unwrap();
        record.installed.retain(|name| name != "beta");
        record.exclude.push("beta".to_string());

        let agents = vec!["cursor".to_string()];
        let outcome = update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert!(outcome.added.is_empty());
        assert!(!tmp.path().join("skills/beta").exists());
    }

    #[tokio::test]
    async fn test_full_update_prunes_vanished_skill_state() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");
        write_skill(&source.join("skills/beta"), "beta", "v1");

        let mut config = Config::default();
        let key = install(tmp.path(), &source, &[], &mut config).await;

        std::fs::remove_dir_all(source.join("skills/beta")).unwrap();
        // The local copy may already be gone; pruning the record must not
        // depend on it. (Trashing real copies needs a recycle bin, which CI
        // may not have.)
        std::fs::remove_dir_all(tmp.path().join("skills/beta")).unwrap();

        let agents = vec!["cursor".to_string()];
        update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert_eq!(config.install_sources[&key].installed, vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_filtered_update_reports_missing_remote_without_pruning() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");
        write_skill(&source.join("skills/beta"), "beta", "v1");

        let mut config = Config::default();
        let key = install(tmp.path(), &source, &[], &mut config).await;

        std::fs::remove_dir_all(source.join("skills/beta")).unwrap();

        let agents = vec!["cursor".to_string()];
        let skills = vec!["beta".to_string()];
        let outcome = update_installed(
            UpdateOptions {
                root_dir: tmp.path(),
                agents: &agents,
                known_agents: &agents,
                apply_disabled: true,
                sources: &[],
                skills: &skills,
            },
            &mut config,
        )
        .await
        .unwrap();

        assert_eq!(outcome.skipped, vec!["beta"]);
        assert!(outcome.removed.is_empty());
        // Filtered runs never prune tracking state.
        assert!(config.install_sources[&key]
            .installed
            .contains(&"beta".to_string()));
        assert!(tmp.path().join("skills/beta").exists());
    }

    #[tokio::test]
    async fn test_symlinked_local_copy_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        install(tmp.path(), &source, &[], &mut config).await;

        // Replace the local copy with a user-managed symlink.
        let external = tmp.path().join("external-alpha");
        write_skill(&external, "alpha", "mine");
        std::fs::remove_dir_all(tmp.path().join("skills/alpha")).unwrap();
        std::os::unix::fs::symlink(&external, tmp.path().join("skills/alpha")).unwrap();

        write_skill(&source.join("skills/alpha"), "alpha", "v2");
        let agents = vec!["cursor".to_string()];
        let outcome = update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert_eq!(outcome.skipped, vec!["alpha"]);
        let descriptor = std::fs::read_to_string(external.join("SKILL.md")).unwrap();
        assert!(descriptor.contains("mine"));
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort_others() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        install(tmp.path(), &source, &[], &mut config).await;

        // A tracked git source whose repository cannot be cloned.
        config.install_sources.insert(
            "git:file:///nonexistent-skillink-repo".to_string(),
            skillink_config::InstallSourceRecord {
                mode: SelectionMode::All,
                include: vec![],
                exclude: vec![],
                installed: vec!["ghost".to_string()],
            },
        );

        write_skill(&source.join("skills/alpha"), "alpha", "v2");
        let agents = vec!["cursor".to_string()];
        let outcome = update_installed(update_options(tmp.path(), &agents), &mut config)
            .await
            .unwrap();

        assert_eq!(outcome.failed_sources.len(), 1);
        assert_eq!(outcome.updated, vec!["alpha"]);
        // The unreachable source keeps its tracking state.
        assert!(
            config
                .install_sources
                .contains_key("git:file:///nonexistent-skillink-repo")
        );
    }
}
