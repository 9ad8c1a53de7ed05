use std::{collections::BTreeSet, path::Path};

use anyhow::{Result, bail};

use skillink_common::{
    debug::append_debug_log,
    fs::{ensure_dir, is_symlink_like},
};

use skillink_config::Config;

use crate::{
    agents::{ROOT_AGENT, agent_info},
    links::{check_symlink, create_symlink, delete_symlink},
    roots::{list_root_skills, root_skills_dir},
};

/// Converge one agent's config directory to exactly the desired link set:
/// root skills minus the names disabled for this agent.
///
/// Only symlinks are ever created or removed. Real directories found where a
/// link is expected (or where a stale entry sits) are logged as conflicts
/// and left untouched. One broken entry never aborts the rest of the sync.
pub async fn sync_agent_skills(
    root_dir: &Path,
    agent: &str,
    root_skills: &[String],
    disabled: &BTreeSet<String>,
    clean_links: bool,
) -> Result<()> {
    let Some(info) = agent_info(agent) else {
        bail!("unknown agent: {agent}");
    };
    // The root agent consumes skills/ directly; linking it onto itself would
    // create a self-referential loop.
    if info.id == ROOT_AGENT {
        return Ok(());
    }

    let agent_dir = root_dir.join(info.config_dir);
    ensure_dir(&agent_dir).await?;

    let desired: BTreeSet<&String> = root_skills
        .iter()
        .filter(|name| !disabled.contains(*name))
        .collect();

    if clean_links {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&agent_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        for name in names {
            if desired.contains(&name) {
                continue;
            }
            let entry_path = agent_dir.join(&name);
            if is_symlink_like(&entry_path).await {
                if let Err(e) = delete_symlink(&entry_path).await {
                    append_debug_log(
                        root_dir,
                        &format!("Failed to remove stale link: {} {e}", entry_path.display()),
                    )
                    .await?;
                }
            } else if entry_path.is_dir() {
                append_debug_log(
                    root_dir,
                    &format!(
                        "Conflict in {}: {name} is a real directory.",
                        agent_dir.display()
                    ),
                )
                .await?;
            }
        }
    }

    for name in desired {
        let link_path = agent_dir.join(name);
        let source = root_skills_dir(root_dir).join(name);

        let entry_exists = tokio::fs::symlink_metadata(&link_path).await.is_ok();
        if entry_exists {
            if check_symlink(&link_path).await {
                continue;
            }
            if is_symlink_like(&link_path).await {
                // Broken or misdirected link: replace it.
                let refreshed = match delete_symlink(&link_path).await {
                    Ok(()) => create_symlink(&source, &link_path).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = refreshed {
                    append_debug_log(
                        root_dir,
                        &format!("Failed to refresh link: {} {e}", link_path.display()),
                    )
                    .await?;
                }
            } else {
                append_debug_log(
                    root_dir,
                    &format!(
                        "Conflict in {}: {name} is a real directory.",
                        agent_dir.display()
                    ),
                )
                .await?;
            }
            continue;
        }

        if let Err(e) = create_symlink(&source, &link_path).await {
            append_debug_log(
                root_dir,
                &format!("Failed to create link: {} {e}", link_path.display()),
            )
            .await?;
        }
    }

    Ok(())
}

/// Re-synchronize a set of agents against the current root skill list and
/// the config's disable rules. Used by every orchestrator after mutation.
pub async fn resync_agents(root_dir: &Path, config: &Config, agents: &[String]) -> Result<()> {
    let root_skills = list_root_skills(root_dir).await?;
    for agent in agents {
        let disabled = config.disabled_set_for(agent);
        sync_agent_skills(root_dir, agent, &root_skills, &disabled, true).await?;
    }
    Ok(())
}
