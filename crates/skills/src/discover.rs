use std::path::{Path, PathBuf};

use {anyhow::Result, tracing::warn};

use skillink_common::{
    debug::append_debug_log,
    fs::{
        copy_dir_recursive, ensure_dir, find_dir_ignore_case, find_file_ignore_case, list_dirs,
        path_exists,
    },
};

use crate::{
    parse::{SKILL_FILE, is_valid_skill_name, read_skill_dir},
    source::SourceSpec,
};

/// How a discovered skill materializes when copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Copy the skill directory wholesale.
    Full,
    /// The source root itself is the skill: copy only the descriptor plus
    /// the conventional subfolders.
    Root,
}

/// One discoverable skill inside a fetched source.
#[derive(Debug, Clone)]
pub struct SourceSkill {
    pub name: String,
    pub dir: PathBuf,
    pub copy_mode: CopyMode,
}

/// Conventional subfolders a root-mode skill carries along, matched
/// case-insensitively.
pub const ROOT_SKILL_DIRS: &[&str] = &["scripts", "references", "assets"];

/// Discover skills inside a resolved source directory.
///
/// A source narrowed to one skill is validated in isolation — no scan.
/// Otherwise the skills subdirectory is scanned one level deep; when that
/// yields nothing, the source root itself is tried as a single skill.
/// Invalid entries are logged and skipped, never fatal.
pub async fn list_source_skills(
    source_dir: &Path,
    spec: &SourceSpec,
    root_dir: &Path,
) -> Result<Vec<SourceSkill>> {
    if let Some(skill_name) = spec.skill_name.as_deref() {
        let skill_dir = source_dir.join(&spec.sub_path);
        if !path_exists(&skill_dir).await {
            append_debug_log(root_dir, &format!("Missing skill dir: {}", skill_dir.display()))
                .await?;
            return Ok(Vec::new());
        }
        let Some(skill) = validate_candidate(&skill_dir, skill_name, root_dir).await? else {
            return Ok(Vec::new());
        };
        return Ok(vec![skill]);
    }

    let skills_dir = source_dir.join(&spec.sub_path);
    let scanned = scan_skills_dir(&skills_dir, root_dir).await?;
    if !scanned.is_empty() {
        return Ok(scanned);
    }

    // Fall back to treating the source root itself as a single skill.
    match read_skill_dir(source_dir).await {
        Ok(meta) => {
            if !is_valid_skill_name(&meta.name) {
                let message =
                    format!("Invalid skill name: {} @ {}", meta.name, source_dir.display());
                append_debug_log(root_dir, &message).await?;
                warn!("{message}");
                return Ok(Vec::new());
            }
            Ok(vec![SourceSkill {
                name: meta.name,
                dir: source_dir.to_path_buf(),
                copy_mode: CopyMode::Root,
            }])
        },
        Err(err) if err.is_missing() => Ok(Vec::new()),
        Err(err) => {
            let message = format!("Invalid SKILL.md: {}. {err}", source_dir.display());
            append_debug_log(root_dir, &message).await?;
            warn!("{message}");
            Ok(Vec::new())
        },
    }
}

/// Scan a skills directory one level deep for valid skill subdirectories.
async fn scan_skills_dir(skills_dir: &Path, root_dir: &Path) -> Result<Vec<SourceSkill>> {
    let mut results = Vec::new();
    if !path_exists(skills_dir).await {
        return Ok(results);
    }

    for sub in list_dirs(skills_dir).await? {
        if !is_valid_skill_name(&sub) {
            append_debug_log(
                root_dir,
                &format!("Invalid skill name: {sub} @ {}", skills_dir.display()),
            )
            .await?;
            continue;
        }
        let skill_dir = skills_dir.join(&sub);
        if let Some(skill) = validate_candidate(&skill_dir, &sub, root_dir).await? {
            results.push(skill);
        }
    }
    Ok(results)
}

/// Parse one candidate directory and enforce folder-name consistency.
/// Returns `None` (after logging) for anything that doesn't qualify.
async fn validate_candidate(
    skill_dir: &Path,
    expected_name: &str,
    root_dir: &Path,
) -> Result<Option<SourceSkill>> {
    match read_skill_dir(skill_dir).await {
        Ok(meta) => {
            if meta.name != expected_name {
                let message = format!(
                    "Skill name mismatch: {}. folder={expected_name}, name={}",
                    skill_dir.display(),
                    meta.name
                );
                append_debug_log(root_dir, &message).await?;
                warn!("{message}");
                return Ok(None);
            }
            Ok(Some(SourceSkill {
                name: expected_name.to_string(),
                dir: skill_dir.to_path_buf(),
                copy_mode: CopyMode::Full,
            }))
        },
        Err(err) => {
            let message = format!("Invalid SKILL.md: {}. {err}", skill_dir.display());
            append_debug_log(root_dir, &message).await?;
            // A missing descriptor is a silent skip; malformed gets a warning.
            if !err.is_missing() {
                warn!("{message}");
            }
            Ok(None)
        },
    }
}

/// Materialize a skill according to its copy mode.
pub async fn copy_skill(skill: &SourceSkill, target_dir: &Path) -> Result<()> {
    match skill.copy_mode {
        CopyMode::Full => {
            copy_dir_recursive(&skill.dir, target_dir)?;
            Ok(())
        },
        CopyMode::Root => copy_root_skill(&skill.dir, target_dir).await,
    }
}

/// Restricted copy for root-mode skills: the descriptor file plus the
/// conventional subfolders, never arbitrary siblings.
pub async fn copy_root_skill(source_dir: &Path, target_dir: &Path) -> Result<()> {
    ensure_dir(target_dir).await?;

    if let Some(skill_file) = find_file_ignore_case(source_dir, SKILL_FILE).await? {
        tokio::fs::copy(&skill_file, target_dir.join(SKILL_FILE)).await?;
    }

    for dir_name in ROOT_SKILL_DIRS {
        let Some(matched) = find_dir_ignore_case(source_dir, dir_name).await? else {
            continue;
        };
        copy_dir_recursive(&source_dir.join(&matched), &target_dir.join(&matched))?;
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::source::parse_source_input};

    fn write_skill(dir: &Path, name: &str, description: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n"),
        )
        .unwrap();
    }

    async fn spec_for(source: &Path, root: &Path) -> SourceSpec {
        parse_source_input(source.to_str().unwrap(), root).await.unwrap()
    }

    #[tokio::test]
    async fn test_scan_finds_valid_skills() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_skill(&source.join("skills/alpha"), "alpha", "a");
        write_skill(&source.join("skills/beta"), "beta", "b");

        let spec = spec_for(&source, tmp.path()).await;
        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(skills.iter().all(|s| s.copy_mode == CopyMode::Full));
    }

    #[tokio::test]
    async fn test_scan_skips_name_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_skill(&source.join("skills/alpha"), "not-alpha", "a");
        write_skill(&source.join("skills/beta"), "beta", "b");

        let spec = spec_for(&source, tmp.path()).await;
        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "beta");
    }

    #[tokio::test]
    async fn test_scan_skips_missing_and_malformed_descriptors() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(source.join("skills/no-descriptor")).unwrap();
        std::fs::create_dir_all(source.join("skills/broken")).unwrap();
        std::fs::write(source.join("skills/broken/SKILL.md"), "no frontmatter").unwrap();
        write_skill(&source.join("skills/good"), "good", "g");

        let spec = spec_for(&source, tmp.path()).await;
        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "good");
    }

    #[tokio::test]
    async fn test_single_skill_source_validates_in_isolation() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_skill(&source.join("skills/demo"), "demo", "d");
        write_skill(&source.join("skills/other"), "other", "o");

        let mut spec = spec_for(&source, tmp.path()).await;
        spec.skill_name = Some("demo".into());
        spec.sub_path = "skills/demo".into();

        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "demo");
    }

    #[tokio::test]
    async fn test_single_skill_missing_dir_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();

        let mut spec = spec_for(&source, tmp.path()).await;
        spec.skill_name = Some("demo".into());
        spec.sub_path = "skills/demo".into();

        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        assert!(skills.is_empty());
    }

    #[tokio::test]
    async fn test_root_mode_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_skill(&source, "root-skill", "r");
        std::fs::write(source.join("extra.txt"), "ignore").unwrap();

        let spec = spec_for(&source, tmp.path()).await;
        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "root-skill");
        assert_eq!(skills[0].copy_mode, CopyMode::Root);
    }

    #[tokio::test]
    async fn test_empty_source_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();

        let spec = spec_for(&source, tmp.path()).await;
        let skills = list_source_skills(&source, &spec, tmp.path()).await.unwrap();
        assert!(skills.is_empty());
    }

    #[tokio::test]
    async fn test_copy_root_skill_restricts_to_allow_list() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        write_skill(&source, "root-skill", "r");
        std::fs::create_dir_all(source.join("Scripts")).unwrap();
        std::fs::write(source.join("Scripts/run.sh"), "echo").unwrap();
        std::fs::create_dir_all(source.join("references")).unwrap();
        std::fs::write(source.join("references/doc.md"), "ref").unwrap();
        std::fs::create_dir_all(source.join("unrelated")).unwrap();
        std::fs::write(source.join("extra.txt"), "nope").unwrap();

        let target = tmp.path().join("target");
        copy_root_skill(&source, &target).await.unwrap();

        assert!(target.join("SKILL.md").exists());
        assert!(target.join("Scripts/run.sh").exists());
        assert!(target.join("references/doc.md").exists());
        assert!(!target.join("unrelated").exists());
        assert!(!target.join("extra.txt").exists());
    }
}
