use std::path::Path;

use anyhow::Result;

use {
    skillink_config::ConfigStore,
    skillink_skills::{
        agents::guess_agents,
        check::{CheckOptions, SkillStatus, check_updates},
        install::{InstallOptions, install_from_source},
        uninstall::{UninstallOptions, uninstall_from_source},
        update::{UpdateOptions, update_installed},
    },
};

use crate::{prompts, report};

pub async fn install(
    root_dir: &Path,
    source: &str,
    skill_patterns: Vec<String>,
    cli_agents: Vec<String>,
    no_prompt: bool,
) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;

    // Only an explicit agent selection drives default-disabled bookkeeping.
    let apply_disabled = !cli_agents.is_empty();
    let agents = prompts::resolve_agents(root_dir, &config, cli_agents, no_prompt).await?;
    let known_agents = guess_agents(root_dir).await;

    let outcome = install_from_source(
        InstallOptions {
            root_dir,
            source_input: source,
            agents: &agents,
            known_agents: &known_agents,
            apply_disabled,
            skill_patterns: &skill_patterns,
        },
        &mut config,
    )
    .await?;

    for name in &outcome.skipped {
        report::warn(&format!("Skipped {name} (conflict or reserved name)"));
    }
    report::success(&format!(
        "Installed {} skill(s) from {}",
        outcome.installed.len(),
        outcome.display
    ));
    for name in &outcome.installed {
        report::tip(name);
    }
    Ok(())
}

pub async fn update(
    root_dir: &Path,
    sources: Vec<String>,
    skills: Vec<String>,
    cli_agents: Vec<String>,
    no_prompt: bool,
) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;

    let apply_disabled = !cli_agents.is_empty();
    let agents = prompts::resolve_agents(root_dir, &config, cli_agents, no_prompt).await?;
    let known_agents = guess_agents(root_dir).await;

    let outcome = update_installed(
        UpdateOptions {
            root_dir,
            agents: &agents,
            known_agents: &known_agents,
            apply_disabled,
            sources: &sources,
            skills: &skills,
        },
        &mut config,
    )
    .await?;

    for source in &outcome.failed_sources {
        report::warn(&format!("Source failed: {source}"));
    }
    for name in &outcome.skipped {
        report::warn(&format!("Skipped {name}"));
    }
    report::success(&format!(
        "Update complete. {} updated, {} added, {} removed.",
        outcome.updated.len(),
        outcome.added.len(),
        outcome.removed.len()
    ));
    Ok(())
}

pub async fn uninstall(
    root_dir: &Path,
    source: &str,
    skill_patterns: Vec<String>,
    cli_agents: Vec<String>,
    no_prompt: bool,
) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let mut config = store.load().await;
    let agents = prompts::resolve_agents(root_dir, &config, cli_agents, no_prompt).await?;

    let outcome = uninstall_from_source(
        UninstallOptions {
            root_dir,
            source_input: source,
            agents: &agents,
            skill_patterns: &skill_patterns,
        },
        &mut config,
    )
    .await?;

    for pattern in &outcome.missing {
        report::warn(&format!("No installed skill matched: {pattern}"));
    }
    for name in &outcome.skipped {
        report::warn(&format!("Skipped {name} (symlink, externally managed)"));
    }
    report::success(&format!(
        "Uninstalled {} skill(s) from {}",
        outcome.removed.len(),
        outcome.display
    ));
    for name in &outcome.removed {
        report::tip(name);
    }
    Ok(())
}

pub async fn check(root_dir: &Path, sources: Vec<String>, skills: Vec<String>) -> Result<()> {
    let store = ConfigStore::new(root_dir);
    let config = store.load().await;

    let reports = check_updates(
        CheckOptions {
            root_dir,
            sources: &sources,
            skills: &skills,
        },
        &config,
    )
    .await?;

    if reports.is_empty() {
        report::info("No installed sources to check.");
        return Ok(());
    }

    for source_report in reports {
        report::info(&source_report.display);
        if let Some(error) = source_report.error {
            report::warn(&format!("Check failed: {error}"));
            continue;
        }
        for skill in source_report.skills {
            let status = match skill.status {
                SkillStatus::UpToDate => "up to date",
                SkillStatus::UpdateAvailable => "update available",
                SkillStatus::MissingLocal => "missing local copy",
                SkillStatus::MissingRemote => "missing in remote",
            };
            report::tip(&format!("{}: {status}", skill.name));
        }
    }
    Ok(())
}
