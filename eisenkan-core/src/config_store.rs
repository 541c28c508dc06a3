//! `ConfigStore` — board configuration plus generic typed configuration
//! blobs.

use crate::error::{BoardError, Result};
use crate::paths::{config_path, BOARD_FILE};
use crate::types::BoardConfiguration;
use eisenkan_git::Repository;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A generic, typed configuration blob stored under
/// `.eisenkan/config/<type>/<identifier>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationData {
    #[serde(rename = "type")]
    pub config_type: String,
    pub identifier: String,
    pub version: String,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ConfigurationData {
    fn default_skeleton(config_type: &str, identifier: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("default".to_string(), "true".to_string());
        Self {
            config_type: config_type.to_string(),
            identifier: identifier.to_string(),
            version: "1.0".to_string(),
            settings: BTreeMap::new(),
            schema: None,
            metadata,
        }
    }
}

/// Persists board configuration and generic configuration blobs. Every
/// write is atomic: write the file, stage it, commit.
pub struct ConfigStore {
    root: PathBuf,
    repository: Arc<dyn Repository>,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>, repository: Arc<dyn Repository>) -> Self {
        Self {
            root: root.into(),
            repository,
        }
    }

    /// Load a typed configuration blob, or a default skeleton if absent.
    pub async fn load(&self, config_type: &str, identifier: &str) -> Result<ConfigurationData> {
        let relative = config_path(config_type, identifier);
        let absolute = self.root.join(&relative);

        if !absolute.exists() {
            debug!(config_type, identifier, "configuration absent, returning default");
            return Ok(ConfigurationData::default_skeleton(config_type, identifier));
        }

        let content = tokio::fs::read_to_string(&absolute).await?;
        let data: ConfigurationData = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Store a typed configuration blob. `data.config_type`/`data.identifier`
    /// must match the path coordinates given.
    pub async fn store(
        &self,
        config_type: &str,
        identifier: &str,
        mut data: ConfigurationData,
    ) -> Result<()> {
        if data.config_type != config_type || data.identifier != identifier {
            return Err(BoardError::task_invalid(format!(
                "configuration data ({}, {}) does not match requested ({config_type}, {identifier})",
                data.config_type, data.identifier
            )));
        }

        data.metadata
            .insert("last_updated".to_string(), chrono::Utc::now().to_rfc3339());
        data.metadata
            .insert("storage_version".to_string(), "1".to_string());

        let relative = config_path(config_type, identifier);
        self.write_and_commit(&relative, &data, &format!("update {config_type}/{identifier} configuration"))
            .await?;

        info!(config_type, identifier, "stored configuration");
        Ok(())
    }

    /// Specialization of `load`/`store` over `type="boards", identifier="default"`,
    /// physically persisted as `board.json` at the repository root.
    pub async fn get_board_configuration(&self) -> Result<BoardConfiguration> {
        let absolute = self.root.join(BOARD_FILE);
        if !absolute.exists() {
            debug!("board configuration absent, returning default");
            return Ok(BoardConfiguration::default_board());
        }
        let content = tokio::fs::read_to_string(&absolute).await?;
        let config: BoardConfiguration = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub async fn update_board_configuration(&self, config: &BoardConfiguration) -> Result<()> {
        self.write_and_commit(&PathBuf::from(BOARD_FILE), config, "update board configuration")
            .await?;
        info!("updated board configuration");
        Ok(())
    }

    async fn write_and_commit<T: Serialize>(
        &self,
        relative: &std::path::Path,
        value: &T,
        message: &str,
    ) -> Result<()> {
        let absolute = self.root.join(relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&absolute, content).await?;

        self.repository
            .stage(&[relative.to_path_buf()])
            .await
            .map_err(|e| BoardError::repository("stage", e))?;
        self.repository
            .commit(message)
            .await
            .map_err(|e| BoardError::repository("commit", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eisenkan_git::{Author, GitRepository};
    use tempfile::TempDir;

    async fn store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let repo = GitRepository::initialize(dir.path(), &Author::default()).unwrap();
        let store = ConfigStore::new(dir.path(), Arc::new(repo));
        (dir, store)
    }

    #[tokio::test]
    async fn test_load_default_board_configuration() {
        let (_dir, store) = store().await;
        let config = store.get_board_configuration().await.unwrap();
        assert_eq!(config.columns, vec!["todo", "doing", "done"]);
    }

    #[tokio::test]
    async fn test_update_and_reload_board_configuration() {
        let (_dir, store) = store().await;
        let mut config = BoardConfiguration::default_board();
        config.name = "My Board".to_string();
        store.update_board_configuration(&config).await.unwrap();

        let loaded = store.get_board_configuration().await.unwrap();
        assert_eq!(loaded.name, "My Board");
    }

    #[tokio::test]
    async fn test_generic_config_default_skeleton() {
        let (_dir, store) = store().await;
        let data = store.load("widgets", "main").await.unwrap();
        assert_eq!(data.version, "1.0");
        assert!(data.settings.is_empty());
        assert_eq!(data.metadata.get("default"), Some(&"true".to_string()));
    }

    #[tokio::test]
    async fn test_generic_config_store_and_reload() {
        let (_dir, store) = store().await;
        let mut data = store.load("widgets", "main").await.unwrap();
        data.settings.insert("color".to_string(), serde_json::json!("blue"));
        store.store("widgets", "main", data).await.unwrap();

        let loaded = store.load("widgets", "main").await.unwrap();
        assert_eq!(loaded.settings.get("color"), Some(&serde_json::json!("blue")));
        assert!(loaded.metadata.contains_key("last_updated"));
    }

    #[tokio::test]
    async fn test_mismatched_coordinates_rejected() {
        let (_dir, store) = store().await;
        let data = store.load("widgets", "main").await.unwrap();
        let result = store.store("widgets", "other", data).await;
        assert!(result.is_err());
    }
}
