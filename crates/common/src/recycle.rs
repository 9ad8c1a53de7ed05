use std::path::Path;

use anyhow::{Context, Result};

/// Move a path to the platform recycle bin.
///
/// Deliberately distinct from permanent removal: everything the tool retires
/// on the user's behalf must stay recoverable.
pub fn move_to_trash(target: &Path) -> Result<()> {
    trash::delete(target).with_context(|| format!("failed to trash {}", target.display()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trash_missing_path_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(move_to_trash(&tmp.path().join("not-there")).is_err());
    }
}
