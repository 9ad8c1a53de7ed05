use std::path::Path;

use {anyhow::{Result, bail}, serde_json::Value};

use skillink_config::ConfigStore;

use crate::report;

/// Keys the tool maintains itself; hand-editing them through the generic
/// config path corrupts tracking state.
const MANAGED_KEYS: &[&str] = &["skillDisabled", "installSources"];

/// `true`/`false` parse as booleans, comma lists as string arrays,
/// everything else as a plain string.
fn parse_config_value(value: &str) -> Value {
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ if value.contains(',') => Value::Array(
            value
                .split(',')
                .map(|part| Value::String(part.trim().to_string()))
                .collect(),
        ),
        _ => Value::String(value.to_string()),
    }
}

pub async fn config(root_dir: &Path, key: Option<&str>, value: Option<&str>) -> Result<()> {
    let store = ConfigStore::new(root_dir);

    let Some(key) = key else {
        let config = store.load().await;
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    };

    let Some(value) = value else {
        let config = store.load().await;
        let document = serde_json::to_value(&config)?;
        let field = document.get(key).cloned().unwrap_or(Value::Null);
        println!("{}", serde_json::to_string_pretty(&field)?);
        return Ok(());
    };

    if MANAGED_KEYS.contains(&key) {
        bail!("{key} is managed by skillink and cannot be set directly");
    }

    store.set_value(key, parse_config_value(value)).await?;
    report::success(&format!("Config updated: {key}"));
    Ok(())
}
