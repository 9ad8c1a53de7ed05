use std::path::Path;

use anyhow::{Result, bail};

use skillink_common::{
    debug::append_debug_log,
    fs::{ensure_dir, path_exists},
};

use skillink_config::{Config, ConfigStore, DisabledScope, InstallSourceRecord, SelectionMode};

use crate::{
    discover::{copy_skill, list_source_skills},
    pattern::matches_any_pattern,
    roots::root_skills_dir,
    source::{fetch_source, parse_source_input},
    sync::resync_agents,
};

pub struct InstallOptions<'a> {
    pub root_dir: &'a Path,
    pub source_input: &'a str,
    /// Agents to synchronize afterwards.
    pub agents: &'a [String],
    /// Agents known to be present in the project (guessed, not assumed).
    pub known_agents: &'a [String],
    /// True when the agent selection was explicit, enabling default-disabled
    /// bookkeeping for non-selected known agents.
    pub apply_disabled: bool,
    /// Glob-style name patterns narrowing the selection.
    pub skill_patterns: &'a [String],
}

#[derive(Debug)]
pub struct InstallOutcome {
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
    pub source_key: String,
    pub display: String,
}

/// Record a newly materialized skill as disabled for every known agent the
/// caller did not select. Skipped entirely when the selection was passive.
pub(crate) fn apply_default_disabled(
    config: &mut Config,
    name: &str,
    enabled_agents: &[String],
    known_agents: &[String],
    apply_disabled: bool,
) {
    if !apply_disabled {
        return;
    }
    let disabled: Vec<String> = known_agents
        .iter()
        .filter(|agent| !enabled_agents.contains(agent))
        .cloned()
        .collect();
    if !disabled.is_empty() {
        config
            .skill_disabled
            .insert(name.to_string(), DisabledScope::Agents(disabled));
    }
}

/// Install skills from a new source: fetch, discover, filter, materialize,
/// persist the tracking record, and re-synchronize the selected agents.
///
/// Per-skill conflicts (reserved prefix, existing target) are skipped and
/// logged; installing zero skills fails the command outright, leaving no
/// tracking state behind.
pub async fn install_from_source(
    options: InstallOptions<'_>,
    config: &mut Config,
) -> Result<InstallOutcome> {
    let InstallOptions {
        root_dir,
        source_input,
        agents,
        known_agents,
        apply_disabled,
        skill_patterns,
    } = options;

    let source = parse_source_input(source_input, root_dir).await?;
    if config.install_sources.contains_key(&source.key) {
        bail!("source already installed: {}", source.display);
    }

    let fetched = fetch_source(&source, root_dir).await?;
    let skills = list_source_skills(&fetched.dir, &source, root_dir).await?;
    if skills.is_empty() {
        bail!("no valid skills found in source");
    }

    let patterns: Vec<String> = skill_patterns
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect();
    let selected: Vec<_> = if patterns.is_empty() {
        skills
    } else {
        skills
            .into_iter()
            .filter(|skill| matches_any_pattern(&skill.name, &patterns))
            .collect()
    };
    if selected.is_empty() {
        bail!("no skills matched the provided patterns");
    }

    ensure_dir(&root_skills_dir(root_dir)).await?;

    let mut installed = Vec::new();
    let mut skipped = Vec::new();

    for skill in &selected {
        if config.has_reserved_prefix(&skill.name) {
            append_debug_log(
                root_dir,
                &format!("Install skipped invalid prefix: {}", skill.name),
            )
            .await?;
            skipped.push(skill.name.clone());
            continue;
        }

        let target_dir = root_skills_dir(root_dir).join(&skill.name);
        if path_exists(&target_dir).await {
            append_debug_log(
                root_dir,
                &format!("Install conflict: {} already exists.", target_dir.display()),
            )
            .await?;
            skipped.push(skill.name.clone());
            continue;
        }

        copy_skill(skill, &target_dir).await?;
        installed.push(skill.name.clone());
        apply_default_disabled(config, &skill.name, agents, known_agents, apply_disabled);
    }

    if installed.is_empty() {
        bail!("no skills installed due to conflicts or invalid names");
    }

    // A single-skill source is an implicit selection even without patterns.
    let selection_patterns: Vec<String> = if patterns.is_empty() {
        source.skill_name.clone().into_iter().collect()
    } else {
        patterns
    };
    config.install_sources.insert(
        source.key.clone(),
        InstallSourceRecord {
            mode: if selection_patterns.is_empty() {
                SelectionMode::All
            } else {
                SelectionMode::Only
            },
            include: selection_patterns,
            exclude: Vec::new(),
            installed: installed.clone(),
        },
    );

    ConfigStore::new(root_dir).save(config).await?;
    resync_agents(root_dir, config, agents).await?;

    Ok(InstallOutcome {
        installed,
        skipped,
        source_key: source.key,
        display: source.display,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, name: &str, description: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n"),
        )
        .unwrap();
    }

    fn options<'a>(
        root: &'a Path,
        source: &'a str,
        agents: &'a [String],
        known: &'a [String],
        patterns: &'a [String],
    ) -> InstallOptions<'a> {
        InstallOptions {
            root_dir: root,
            source_input: source,
            agents,
            known_agents: known,
            apply_disabled: true,
            skill_patterns: patterns,
        }
    }

    #[tokio::test]
    async fn test_install_from_local_source() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        let outcome = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &[]),
            &mut config,
        )
        .await
        .unwrap();

        assert_eq!(outcome.installed, vec!["alpha"]);
        assert!(tmp.path().join("skills/alpha/SKILL.md").exists());
        assert!(tmp.path().join(".cursor/skills/alpha").exists());

        let record = &config.install_sources[&outcome.source_key];
        assert_eq!(record.mode, SelectionMode::All);
        assert_eq!(record.installed, vec!["alpha"]);

        // Persisted once at the end of the command.
        let stored = ConfigStore::new(tmp.path()).load().await;
        assert_eq!(stored.install_sources, config.install_sources);
    }

    #[tokio::test]
    async fn test_reinstall_same_source_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &[]),
            &mut config,
        )
        .await
        .unwrap();

        // Remove the copy so only the tracking record blocks the reinstall.
        std::fs::remove_dir_all(tmp.path().join("skills/alpha")).unwrap();
        let err = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &[]),
            &mut config,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("already installed"));
    }

    #[tokio::test]
    async fn test_pattern_narrowing_sets_only_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");
        write_skill(&source.join("skills/beta"), "beta", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        let patterns = vec!["alpha".to_string()];
        let outcome = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &patterns),
            &mut config,
        )
        .await
        .unwrap();

        assert_eq!(outcome.installed, vec!["alpha"]);
        assert!(!tmp.path().join("skills/beta").exists());

        let record = &config.install_sources[&outcome.source_key];
        assert_eq!(record.mode, SelectionMode::Only);
        assert_eq!(record.include, vec!["alpha"]);
    }

    #[tokio::test]
    async fn test_wildcard_pattern_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");
        write_skill(&source.join("skills/axiom"), "axiom", "v1");
        write_skill(&source.join("skills/beta"), "beta", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        let patterns = vec!["a*".to_string()];
        let outcome = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &patterns),
            &mut config,
        )
        .await
        .unwrap();

        assert_eq!(outcome.installed, vec!["alpha", "axiom"]);
    }

    #[tokio::test]
    async fn test_no_pattern_match_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        let patterns = vec!["nope".to_string()];
        let err = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &patterns),
            &mut config,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("matched"));
        assert!(config.install_sources.is_empty());
    }

    #[tokio::test]
    async fn test_reserved_prefix_and_existing_target_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/npm-sneaky"), "npm-sneaky", "v1");
        write_skill(&source.join("skills/taken"), "taken", "v1");
        write_skill(&source.join("skills/fresh"), "fresh", "v1");
        write_skill(&tmp.path().join("skills/taken"), "taken", "existing");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        let outcome = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &[]),
            &mut config,
        )
        .await
        .unwrap();

        assert_eq!(outcome.installed, vec!["fresh"]);
        assert_eq!(outcome.skipped, vec!["npm-sneaky", "taken"]);
        // The pre-existing copy was not overwritten.
        let descriptor =
            std::fs::read_to_string(tmp.path().join("skills/taken/SKILL.md")).unwrap();
        assert!(descriptor.contains("existing"));
    }

    #[tokio::test]
    async fn test_all_conflicts_fails_without_record() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/taken"), "taken", "v1");
        write_skill(&tmp.path().join("skills/taken"), "taken", "existing");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        let result = install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &[]),
            &mut config,
        )
        .await;
        assert!(result.is_err());
        assert!(config.install_sources.is_empty());
    }

    #[tokio::test]
    async fn test_root_mode_source_installs_restricted_copy() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source, "root-skill", "v1");
        std::fs::write(source.join("extra.txt"), "ignore").unwrap();

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        install_from_source(
            options(tmp.path(), &source_str, &agents, &agents, &[]),
            &mut config,
        )
        .await
        .unwrap();

        let skill_dir = tmp.path().join("skills/root-skill");
        assert!(skill_dir.join("SKILL.md").exists());
        assert!(!skill_dir.join("extra.txt").exists());
    }

    #[tokio::test]
    async fn test_disabled_bookkeeping_for_unselected_known_agents() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let known = vec!["cursor".to_string(), "trae".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        install_from_source(
            options(tmp.path(), &source_str, &agents, &known, &[]),
            &mut config,
        )
        .await
        .unwrap();

        assert_eq!(
            config.skill_disabled.get("alpha"),
            Some(&DisabledScope::Agents(vec!["trae".to_string()]))
        );
    }

    #[tokio::test]
    async fn test_no_disabled_bookkeeping_when_no_known_agents() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source-repo");
        write_skill(&source.join("skills/alpha"), "alpha", "v1");

        let mut config = Config::default();
        let agents = vec!["cursor".to_string()];
        let source_str = source.to_str().unwrap().to_string();
        install_from_source(
            options(tmp.path(), &source_str, &agents, &[], &[]),
            &mut config,
        )
        .await
        .unwrap();

        assert!(!config.skill_disabled.contains_key("alpha"));
    }
}
