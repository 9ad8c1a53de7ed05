use std::path::Path;

use anyhow::{Result, bail};

use skillink_common::fs::path_exists;

/// A coding agent/IDE integration with a config directory skills are
/// projected into.
#[derive(Debug, Clone, Copy)]
pub struct AgentInfo {
    pub id: &'static str,
    pub name: &'static str,
    /// Config directory, relative to the project root.
    pub config_dir: &'static str,
    /// Presence of this directory implies the agent is in use.
    pub guess_dir: Option<&'static str>,
    /// Presence of this file implies the agent is in use.
    pub guess_file: Option<&'static str>,
}

/// The agent whose config directory *is* the root skills directory.
/// Synchronizing it would link the directory into itself.
pub const ROOT_AGENT: &str = "openclaw";

pub static AGENTS: &[AgentInfo] = &[
    AgentInfo {
        id: "cursor",
        name: "Cursor",
        config_dir: ".cursor/skills",
        guess_dir: Some(".cursor"),
        guess_file: None,
    },
    AgentInfo {
        id: "copilot",
        name: "GitHub Copilot",
        config_dir: ".github/skills",
        guess_dir: Some(".github/skills"),
        guess_file: Some(".github/copilot-instructions.md"),
    },
    AgentInfo {
        id: "windsurf",
        name: "Windsurf",
        config_dir: ".windsurf/skills",
        guess_dir: Some(".windsurf"),
        guess_file: None,
    },
    AgentInfo {
        id: "trae",
        name: "Trae",
        config_dir: ".trae/skills",
        guess_dir: Some(".trae"),
        guess_file: None,
    },
    AgentInfo {
        id: "claude",
        name: "Claude Code",
        config_dir: ".claude/skills",
        guess_dir: Some(".claude"),
        guess_file: None,
    },
    AgentInfo {
        id: "openclaw",
        name: "OpenClaw",
        config_dir: "skills",
        guess_dir: None,
        guess_file: None,
    },
    AgentInfo {
        id: "qoder",
        name: "Qoder",
        config_dir: ".qoder/skills",
        guess_dir: Some(".qoder"),
        guess_file: None,
    },
    AgentInfo {
        id: "qwen",
        name: "Qwen Code",
        config_dir: ".qwen/skills",
        guess_dir: Some(".qwen"),
        guess_file: None,
    },
    AgentInfo {
        id: "cline",
        name: "Cline",
        config_dir: ".cline/skills",
        guess_dir: Some(".cline"),
        guess_file: None,
    },
    AgentInfo {
        id: "codex",
        name: "Codex",
        config_dir: ".codex/skills",
        guess_dir: Some(".codex"),
        guess_file: None,
    },
    AgentInfo {
        id: "continue",
        name: "Continue",
        config_dir: ".continue/skills",
        guess_dir: Some(".continue"),
        guess_file: None,
    },
    AgentInfo {
        id: "gemini",
        name: "Gemini CLI",
        config_dir: ".gemini/skills",
        guess_dir: Some(".gemini"),
        guess_file: None,
    },
    AgentInfo {
        id: "kimi",
        name: "Kimi Code CLI",
        config_dir: ".agents/skills",
        guess_dir: Some(".agents"),
        guess_file: None,
    },
    AgentInfo {
        id: "roo",
        name: "Roo Code",
        config_dir: ".roo/skills",
        guess_dir: Some(".roo"),
        guess_file: None,
    },
    AgentInfo {
        id: "zencoder",
        name: "Zencoder",
        config_dir: ".zencoder/skills",
        guess_dir: Some(".zencoder"),
        guess_file: None,
    },
];

pub fn agent_info(id: &str) -> Option<&'static AgentInfo> {
    AGENTS.iter().find(|agent| agent.id == id)
}

pub fn agent_config_dir(id: &str) -> Result<&'static str> {
    match agent_info(id) {
        Some(info) => Ok(info.config_dir),
        None => bail!("unknown agent: {id}"),
    }
}

pub fn all_agent_ids() -> Vec<String> {
    AGENTS.iter().map(|agent| agent.id.to_string()).collect()
}

/// Guess which agents a project uses by probing their config signals.
/// The root agent is never guessed; it needs no sync.
pub async fn guess_agents(root_dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    for agent in AGENTS {
        if agent.id == ROOT_AGENT {
            continue;
        }
        if let Some(file) = agent.guess_file
            && path_exists(&root_dir.join(file)).await
        {
            found.push(agent.id.to_string());
            continue;
        }
        if let Some(dir) = agent.guess_dir
            && path_exists(&root_dir.join(dir)).await
        {
            found.push(agent.id.to_string());
        }
    }
    found
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        assert_eq!(agent_info("cursor").unwrap().config_dir, ".cursor/skills");
        assert!(agent_info("unknown").is_none());
        assert!(agent_config_dir("unknown").is_err());
    }

    #[test]
    fn test_root_agent_uses_root_skills_dir() {
        assert_eq!(agent_info(ROOT_AGENT).unwrap().config_dir, "skills");
    }

    #[tokio::test]
    async fn test_guess_by_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".cursor")).unwrap();
        std::fs::create_dir_all(tmp.path().join(".github")).unwrap();
        std::fs::write(
            tmp.path().join(".github/copilot-instructions.md"),
            "instructions",
        )
        .unwrap();

        let guessed = guess_agents(tmp.path()).await;
        assert!(guessed.contains(&"cursor".to_string()));
        assert!(guessed.contains(&"copilot".to_string()));
        assert!(!guessed.contains(&"trae".to_string()));
        assert!(!guessed.contains(&ROOT_AGENT.to_string()));
    }

    #[tokio::test]
    async fn test_guess_empty_project() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(guess_agents(tmp.path()).await.is_empty());
    }
}
