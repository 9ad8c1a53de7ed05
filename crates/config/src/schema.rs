use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// Agent identifiers are plain strings; the static registry that gives them
/// meaning lives in the skills crate.
pub type AgentId = String;

// ── Disabled-scope sentinel ──────────────────────────────────────────────────

/// Per-skill disable state.
///
/// Serialized as a JSON array of agent ids, where the empty array means
/// "disabled for every agent". A skill that is enabled everywhere simply has
/// no entry in the map — the presence/absence asymmetry is part of the
/// persisted format and must survive round-trips byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledScope {
    /// Disabled for all agents (the empty-array sentinel).
    AllAgents,
    /// Disabled only for the listed agents.
    Agents(Vec<AgentId>),
}

impl DisabledScope {
    pub fn applies_to(&self, agent: &str) -> bool {
        match self {
            Self::AllAgents => true,
            Self::Agents(ids) => ids.iter().any(|id| id == agent),
        }
    }
}

impl Serialize for DisabledScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::AllAgents => Vec::<AgentId>::new().serialize(serializer),
            Self::Agents(ids) => ids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DisabledScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = Vec::<AgentId>::deserialize(deserializer)?;
        if ids.is_empty() {
            Ok(Self::AllAgents)
        } else {
            Ok(Self::Agents(ids))
        }
    }
}

// ── Install source records ───────────────────────────────────────────────────

/// How an install source's skills were selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    All,
    Only,
}

impl<'de> Deserialize<'de> for SelectionMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Anything other than the literal "only" falls back to All, matching
        // the tolerance of earlier config versions.
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "only" { Self::Only } else { Self::All })
    }
}

/// Persisted tracking state for one install source, keyed by its identity key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallSourceRecord {
    pub mode: SelectionMode,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub installed: Vec<String>,
}

impl<'de> Deserialize<'de> for InstallSourceRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Early config versions stored a bare array of installed names.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Compat {
            Legacy(Vec<String>),
            Record {
                #[serde(default)]
                mode: SelectionMode,
                #[serde(default)]
                include: Vec<String>,
                #[serde(default)]
                exclude: Vec<String>,
                #[serde(default)]
                installed: Vec<String>,
            },
        }

        match Compat::deserialize(deserializer)
            .map_err(|e| D::Error::custom(format!("invalid install source record: {e}")))?
        {
            Compat::Legacy(installed) => Ok(Self {
                mode: SelectionMode::All,
                include: Vec::new(),
                exclude: Vec::new(),
                installed,
            }),
            Compat::Record {
                mode,
                include,
                exclude,
                installed,
            } => Ok(Self {
                mode,
                include,
                exclude,
                installed,
            }),
        }
    }
}

// ── Configuration document ───────────────────────────────────────────────────

/// All configuration persisted in `skillink-config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub show_prompt: bool,
    pub scan_npm: bool,
    pub scan_packages: bool,
    pub clean_links: bool,
    pub default_agents: Vec<AgentId>,
    pub skill_link_prefix_npm: String,
    pub skill_link_prefix_package: String,
    pub skill_disabled: BTreeMap<String, DisabledScope>,
    pub install_sources: BTreeMap<String, InstallSourceRecord>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_prompt: true,
            scan_npm: true,
            scan_packages: true,
            clean_links: true,
            default_agents: Vec::new(),
            skill_link_prefix_npm: "npm-".to_string(),
            skill_link_prefix_package: "package-".to_string(),
            skill_disabled: BTreeMap::new(),
            install_sources: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Names disabled for one agent (explicitly or via the all-agents
    /// sentinel).
    pub fn disabled_set_for(&self, agent: &str) -> std::collections::BTreeSet<String> {
        self.skill_disabled
            .iter()
            .filter(|(_, scope)| scope.applies_to(agent))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// A skill name starts with one of the reserved scan-link prefixes.
    pub fn has_reserved_prefix(&self, name: &str) -> bool {
        name.starts_with(&self.skill_link_prefix_npm)
            || name.starts_with(&self.skill_link_prefix_package)
    }
}
