use std::path::Path;

use {anyhow::Result, tokio::io::AsyncWriteExt};

/// Debug log file name, relative to the project root.
pub const DEBUG_LOG_FILE: &str = "skillink-debug.log";

/// Append one diagnostic line to the project debug log.
///
/// The log is plain text, one event per line, each prefixed with a bracketed
/// RFC-3339 timestamp. Also mirrored to `tracing` so the operator sees it
/// with `--log-level debug`.
pub async fn append_debug_log(root_dir: &Path, message: &str) -> Result<()> {
    tracing::debug!(%message, "debug log");
    let path = root_dir.join(DEBUG_LOG_FILE);
    let line = format!("[{}] {}\n", chrono::Utc::now().to_rfc3339(), message);
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    Ok(())
}
