use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    serde_json::Value,
    tracing::warn,
};

use crate::schema::Config;

/// Config file name, relative to the project root.
pub const CONFIG_FILE: &str = "skillink-config.json";

/// Loads and saves the configuration document for one project root.
///
/// Saving merges the typed config over the raw JSON document on disk, so
/// top-level keys this tool does not know about survive read-modify-write.
/// Writes go through a temp file + rename.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(root_dir: &Path) -> Self {
        Self {
            path: root_dir.join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config, merging defaults for absent fields. A missing or
    /// unreadable document yields the defaults.
    pub async fn load(&self) -> Config {
        match self.load_raw().await {
            Some(value) => match serde_json::from_value::<Config>(value) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "invalid config, using defaults");
                    Config::default()
                },
            },
            None => Config::default(),
        }
    }

    /// Persist the config, preserving unknown top-level keys.
    pub async fn save(&self, config: &Config) -> Result<()> {
        let mut document = self
            .load_raw()
            .await
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let typed = serde_json::to_value(config).context("failed to serialize config")?;

        if let (Value::Object(doc), Value::Object(fields)) = (&mut document, typed) {
            for (key, value) in fields {
                doc.insert(key, value);
            }
        } else {
            // The on-disk document was not an object; replace it outright.
            document = serde_json::to_value(config)?;
        }

        self.write_atomic(&document).await
    }

    /// Set one raw top-level value (the generic `config <key> <value>` path).
    pub async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut document = self
            .load_raw()
            .await
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(doc) = &mut document {
            doc.insert(key.to_string(), value);
        }
        self.write_atomic(&document).await
    }

    async fn load_raw(&self) -> Option<Value> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "config is not valid JSON");
                None
            },
        }
    }

    async fn write_atomic(&self, document: &Value) -> Result<()> {
        let data = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
