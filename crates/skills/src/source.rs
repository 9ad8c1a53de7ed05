use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    tokio::process::Command,
    tracing::debug,
};

use skillink_common::fs::path_exists;

/// Subdirectory conventionally holding skills inside a source.
pub const SOURCE_SKILLS_DIR: &str = "skills";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    Git,
}

/// A normalized install source.
///
/// `key` is the stable identity used for persisted tracking: two input
/// strings resolving to the same location and branch produce the same key.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub input: String,
    pub key: String,
    pub kind: SourceKind,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub local_path: Option<PathBuf>,
    /// Path below the source root to scan for skills.
    pub sub_path: String,
    /// Narrow the source to exactly one skill.
    pub skill_name: Option<String>,
    pub display: String,
}

fn build_source_key(kind: SourceKind, location: &str, branch: Option<&str>) -> String {
    let prefix = match kind {
        SourceKind::Local => "local",
        SourceKind::Git => "git",
    };
    match branch {
        Some(branch) => format!("{prefix}:{location}#{branch}"),
        None => format!("{prefix}:{location}"),
    }
}

fn looks_like_git_url(value: &str) -> bool {
    value.starts_with("http://")
        || value.starts_with("https://")
        || value.starts_with("ssh://")
        || value.starts_with("git@")
        || value.ends_with(".git")
}

struct GitShorthand {
    repo_url: String,
    branch: Option<String>,
    skill_name: Option<String>,
    sub_path: String,
    display: String,
}

/// `<owner>/<repo>[/tree/<branch>[/skills/<name>]]`
fn parse_git_shorthand(value: &str) -> Option<GitShorthand> {
    let normalized = value.strip_suffix(".git").unwrap_or(value);
    let parts: Vec<&str> = normalized.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }

    let (owner, repo, branch, skill_name) = match parts.as_slice() {
        [owner, repo] => (*owner, *repo, None, None),
        [owner, repo, "tree", branch] => (*owner, *repo, Some(*branch), None),
        [owner, repo, "tree", branch, "skills", name] => {
            (*owner, *repo, Some(*branch), Some(*name))
        },
        _ => return None,
    };

    let sub_path = match skill_name {
        Some(name) => format!("{SOURCE_SKILLS_DIR}/{name}"),
        None => SOURCE_SKILLS_DIR.to_string(),
    };
    let display = match branch {
        Some(branch) => format!("{owner}/{repo}@{branch}"),
        None => format!("{owner}/{repo}"),
    };
    Some(GitShorthand {
        repo_url: format!("https://github.com/{owner}/{repo}.git"),
        branch: branch.map(str::to_string),
        skill_name: skill_name.map(str::to_string),
        sub_path,
        display,
    })
}

/// Resolve a user-supplied source string against a project root.
///
/// Resolution order: existing filesystem path, then repository shorthand,
/// then anything that looks like a git URL (with an optional `#branch`
/// suffix). Everything else is an unsupported format.
pub async fn parse_source_input(input: &str, root_dir: &Path) -> Result<SourceSpec> {
    let value = input.trim();

    let local_path = if Path::new(value).is_absolute() {
        PathBuf::from(value)
    } else {
        root_dir.join(value)
    };
    // Lexically normalized, so spelling variants of one path share a key.
    let local_path: PathBuf = local_path.components().collect();
    if path_exists(&local_path).await {
        let location = local_path.to_string_lossy().to_string();
        return Ok(SourceSpec {
            input: input.to_string(),
            key: build_source_key(SourceKind::Local, &location, None),
            kind: SourceKind::Local,
            repo_url: None,
            branch: None,
            local_path: Some(local_path),
            sub_path: SOURCE_SKILLS_DIR.to_string(),
            skill_name: None,
            display: location,
        });
    }

    if let Some(gh) = parse_git_shorthand(value) {
        return Ok(SourceSpec {
            input: input.to_string(),
            key: build_source_key(SourceKind::Git, &gh.repo_url, gh.branch.as_deref()),
            kind: SourceKind::Git,
            repo_url: Some(gh.repo_url),
            branch: gh.branch,
            local_path: None,
            sub_path: gh.sub_path,
            skill_name: gh.skill_name,
            display: gh.display,
        });
    }

    if looks_like_git_url(value) {
        let (repo_url, branch) = match value.split_once('#') {
            Some((url, branch)) => (url.to_string(), Some(branch.to_string())),
            None => (value.to_string(), None),
        };
        return Ok(SourceSpec {
            input: input.to_string(),
            key: build_source_key(SourceKind::Git, &repo_url, branch.as_deref()),
            kind: SourceKind::Git,
            display: repo_url.clone(),
            repo_url: Some(repo_url),
            branch,
            local_path: None,
            sub_path: SOURCE_SKILLS_DIR.to_string(),
            skill_name: None,
        });
    }

    bail!("unsupported source format: {input}")
}

/// Reconstruct a spec from a persisted identity key (`local:...` /
/// `git:...[#branch]`). Used by update/check, which operate over
/// already-tracked sources without re-parsing user input.
pub fn parse_source_key(key: &str) -> Result<SourceSpec> {
    if let Some(location) = key.strip_prefix("local:") {
        return Ok(SourceSpec {
            input: key.to_string(),
            key: key.to_string(),
            kind: SourceKind::Local,
            repo_url: None,
            branch: None,
            local_path: Some(PathBuf::from(location)),
            sub_path: SOURCE_SKILLS_DIR.to_string(),
            skill_name: None,
            display: location.to_string(),
        });
    }
    if let Some(rest) = key.strip_prefix("git:") {
        let (repo_url, branch) = match rest.split_once('#') {
            Some((url, branch)) => (url.to_string(), Some(branch.to_string())),
            None => (rest.to_string(), None),
        };
        return Ok(SourceSpec {
            input: key.to_string(),
            key: key.to_string(),
            kind: SourceKind::Git,
            display: repo_url.clone(),
            repo_url: Some(repo_url),
            branch,
            local_path: None,
            sub_path: SOURCE_SKILLS_DIR.to_string(),
            skill_name: None,
        });
    }
    bail!("unsupported source key: {key}")
}

/// A fetched source directory. Remote fetches hold their temp directory,
/// which is removed on drop — success or failure.
pub struct FetchedSource {
    pub dir: PathBuf,
    _temp: Option<tempfile::TempDir>,
}

/// Resolve a source into an inspectable directory.
///
/// Local sources resolve to themselves. Git sources are fetched with a
/// shallow, branch-scoped clone into a fresh temp directory via structured
/// subprocess arguments (no shell interpretation).
pub async fn fetch_source(spec: &SourceSpec, root_dir: &Path) -> Result<FetchedSource> {
    match spec.kind {
        SourceKind::Local => {
            let Some(path) = spec.local_path.clone() else {
                bail!("local source path missing");
            };
            Ok(FetchedSource {
                dir: path,
                _temp: None,
            })
        },
        SourceKind::Git => {
            let Some(repo_url) = spec.repo_url.as_deref() else {
                bail!("git source url missing");
            };

            let temp = tempfile::Builder::new()
                .prefix("skillink-")
                .tempdir()
                .context("failed to create temp directory")?;

            let mut command = Command::new("git");
            command.args(["clone", "--depth", "1"]);
            if let Some(branch) = spec.branch.as_deref() {
                command.args(["--branch", branch]);
            }
            command.arg(repo_url).arg(temp.path()).current_dir(root_dir);

            debug!(%repo_url, branch = ?spec.branch, "cloning source");
            let output = command.output().await.context("failed to run git clone")?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                // The TempDir drop removes the partial clone.
                bail!("failed to clone {repo_url}: {}", stderr.trim());
            }

            Ok(FetchedSource {
                dir: temp.path().to_path_buf(),
                _temp: Some(temp),
            })
        },
    }
}
