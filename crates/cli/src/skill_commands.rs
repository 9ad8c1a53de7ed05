use std::path::Path;

use anyhow::{Result, bail};

use {
    skillink_common::{
        debug::append_debug_log,
        fs::{ensure_dir, is_symlink_like, path_exists},
        recycle::move_to_trash,
    },
    skillink_config::{ConfigStore, DisabledScope},
    skillink_skills::{
        agents::{ROOT_AGENT, agent_config_dir, all_agent_ids},
        links::delete_symlink,
        roots::{is_local_skill_dir, list_root_skills, root_skills_dir},
        scan::{missing_gitignore_patterns, scan_project},
        sync::{resync_agents, sync_agent_skills},
    },
};

use crate::{prompts, report};

pub async fn scan(
    root_dir: &Path,
    cli_agents: Vec<String>,
    no_prompt: bool,
    no_npm: bool,
    no_packages: bool,
    no_clean: bool,
) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;
    // CLI flags override config for this run only; nothing is persisted.
    config.scan_npm = !no_npm;
    config.scan_packages = !no_packages;
    config.clean_links = !no_clean;

    let agents = prompts::resolve_agents(root_dir, &config, cli_agents, no_prompt).await?;

    report::info("Scanning skills...");
    let outcome = scan_project(root_dir, &config).await?;

    for agent in &agents {
        let disabled = config.disabled_set_for(agent);
        sync_agent_skills(
            root_dir,
            agent,
            &outcome.root_skills,
            &disabled,
            config.clean_links,
        )
        .await?;
    }

    for pattern in missing_gitignore_patterns(root_dir, &config).await {
        report::warn(&format!(
            "Add {pattern} to .gitignore to keep generated skill links out of version control."
        ));
    }

    report::success(&format!(
        "Scan complete. {} skills available.",
        outcome.root_skills.len()
    ));
    Ok(())
}

pub async fn init(
    root_dir: &Path,
    name: &str,
    cli_agents: Vec<String>,
    no_prompt: bool,
) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;
    let agents = prompts::resolve_agents(root_dir, &config, cli_agents, no_prompt).await?;

    // Names carrying a scan prefix would collide with generated links.
    if config.has_reserved_prefix(name) {
        bail!(
            "skill name cannot start with the {} or {} prefix",
            config.skill_link_prefix_npm,
            config.skill_link_prefix_package
        );
    }

    let skill_dir = root_skills_dir(root_dir).join(name);
    if path_exists(&skill_dir).await {
        bail!("skill already exists: {name}");
    }

    ensure_dir(&skill_dir).await?;
    let content = format!("---\nname: {name}\ndescription: ''\nmetadata:\n  author: ''\n---\n");
    tokio::fs::write(skill_dir.join("SKILL.md"), content).await?;

    // A fresh skill starts disabled for every agent the user did not select.
    let disabled: Vec<String> = all_agent_ids()
        .into_iter()
        .filter(|agent| !agents.contains(agent))
        .collect();
    if !disabled.is_empty() {
        config
            .skill_disabled
            .insert(name.to_string(), DisabledScope::Agents(disabled));
    }
    store.save(&config).await?;

    resync_agents(root_dir, &config, &agents).await?;
    report::success(&format!("Skill created: {name}"));
    Ok(())
}

pub async fn del(root_dir: &Path, name: &str, no_prompt: bool) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;

    if !path_exists(&root_skills_dir(root_dir).join(name)).await {
        bail!("skill not found: {name}");
    }
    if !is_local_skill_dir(root_dir, name).await {
        bail!("only local skills can be deleted. Use disable for external skills.");
    }
    let from_install_source = config
        .install_sources
        .values()
        .any(|record| record.installed.iter().any(|item| item == name));
    if from_install_source {
        bail!("skill comes from an install source and cannot be deleted directly. Use uninstall.");
    }

    if !no_prompt && !prompts::confirm(&format!("Delete skill {name}? This is irreversible."))? {
        return Ok(());
    }

    move_to_trash(&root_skills_dir(root_dir).join(name))?;

    // Retract the skill's links from every agent dir; real directories with
    // the same name are left alone.
    for agent in all_agent_ids() {
        if agent == ROOT_AGENT {
            continue;
        }
        let link_path = root_dir.join(agent_config_dir(&agent)?).join(name);
        if is_symlink_like(&link_path).await
            && let Err(e) = delete_symlink(&link_path).await
        {
            append_debug_log(
                root_dir,
                &format!("Failed to remove link: {} {e}", link_path.display()),
            )
            .await?;
        }
    }

    config.skill_disabled.remove(name);
    store.save(&config).await?;

    report::success(&format!("Skill deleted: {name}"));
    Ok(())
}

pub async fn disable(root_dir: &Path, name: &str, cli_agents: Vec<String>) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;

    let scope = if cli_agents.is_empty() {
        DisabledScope::AllAgents
    } else {
        DisabledScope::Agents(cli_agents.clone())
    };
    config.skill_disabled.insert(name.to_string(), scope);
    store.save(&config).await?;

    let agents = if cli_agents.is_empty() {
        all_agent_ids()
    } else {
        cli_agents
    };
    resync_agents(root_dir, &config, &agents).await?;

    report::success(&format!("Skill disabled: {name}"));
    Ok(())
}

pub async fn enable(root_dir: &Path, name: &str, cli_agents: Vec<String>) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;

    let Some(scope) = config.skill_disabled.get(name).cloned() else {
        report::warn("Skill is not disabled.");
        return Ok(());
    };

    if cli_agents.is_empty() {
        config.skill_disabled.remove(name);
    } else {
        let current: Vec<String> = match scope {
            DisabledScope::AllAgents => Vec::new(),
            DisabledScope::Agents(ids) => ids,
        };
        let next: Vec<String> = current
            .into_iter()
            .filter(|agent| !cli_agents.contains(agent))
            .collect();
        if next.is_empty() {
            config.skill_disabled.remove(name);
        } else {
            config
                .skill_disabled
                .insert(name.to_string(), DisabledScope::Agents(next));
        }
    }
    store.save(&config).await?;

    let agents = if cli_agents.is_empty() {
        all_agent_ids()
    } else {
        cli_agents
    };
    resync_agents(root_dir, &config, &agents).await?;

    report::success(&format!("Skill enabled: {name}"));
    Ok(())
}

pub async fn ls(root_dir: &Path, show_disabled: bool, cli_agents: Vec<String>) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let config = store.load().await;

    if cli_agents.is_empty() {
        let skills = list_root_skills(root_dir).await?;
        report::info(&format!("Skills in root: {}", skills.len()));
        for skill in skills {
            match config.skill_disabled.get(&skill) {
                Some(DisabledScope::AllAgents) if !show_disabled => continue,
                Some(scope) if show_disabled => {
                    let agents = match scope {
                        DisabledScope::AllAgents => "all".to_string(),
                        DisabledScope::Agents(ids) => ids.join(","),
                    };
                    report::tip(&format!("{skill} (disabled: {agents})"));
                },
                _ => report::tip(&skill),
            }
        }
        return Ok(());
    }

    for agent in cli_agents {
        let agent_dir = root_dir.join(agent_config_dir(&agent)?);
        if !path_exists(&agent_dir).await {
            report::warn(&format!("Agent dir missing: {agent}"));
            continue;
        }
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&agent_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(entry_name) = entry.file_name().to_str() {
                names.push(entry_name.to_string());
            }
        }
        names.sort();
        report::info(&format!("{agent} skills: {}", names.len()));
        for entry_name in names {
            report::tip(&entry_name);
        }
    }
    Ok(())
}
