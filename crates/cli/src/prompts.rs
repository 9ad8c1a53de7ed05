//! Interactive prompts and the agent resolution chain.

use std::path::Path;

use {
    anyhow::{Context, Result, bail},
    dialoguer::{Confirm, MultiSelect},
};

use {
    skillink_config::Config,
    skillink_skills::agents::{AGENTS, ROOT_AGENT, guess_agents},
};

/// Multi-select over every syncable agent.
pub fn select_agents() -> Result<Vec<String>> {
    let agents: Vec<_> = AGENTS
        .iter()
        .filter(|agent| agent.id != ROOT_AGENT)
        .collect();
    let labels: Vec<String> = agents
        .iter()
        .map(|agent| format!("{} ({})", agent.name, agent.id))
        .collect();

    let picked = MultiSelect::new()
        .with_prompt("Select target agents/IDEs")
        .items(&labels)
        .interact()
        .context("agent selection aborted")?;

    Ok(picked
        .into_iter()
        .map(|index| agents[index].id.to_string())
        .collect())
}

/// Yes/no confirmation, defaulting to no.
pub fn confirm(message: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .context("confirmation aborted")
}

/// Resolve target agents by priority: CLI selection, configured defaults,
/// guessed from project signals, then an interactive prompt. With prompting
/// unavailable, resolution failure is a user error.
pub async fn resolve_agents(
    root_dir: &Path,
    config: &Config,
    cli_agents: Vec<String>,
    no_prompt: bool,
) -> Result<Vec<String>> {
    if !cli_agents.is_empty() {
        return Ok(cli_agents);
    }
    if !config.default_agents.is_empty() {
        return Ok(config.default_agents.clone());
    }
    let guessed = guess_agents(root_dir).await;
    if !guessed.is_empty() {
        return Ok(guessed);
    }
    if no_prompt || !config.show_prompt {
        bail!("no agent detected. Use --agent or set defaultAgents in config.");
    }
    select_agents()
}
