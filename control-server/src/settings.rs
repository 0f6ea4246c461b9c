//! User-editable settings persisted as JSON

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ServerError;

pub const DEFAULT_DEVICE_NAME: &str = "Audio-Pi";

/// Longest friendly name accepted; mDNS labels cap at 63 bytes
pub const MAX_DEVICE_NAME_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Keys written by other tools are kept as they are
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Settings file plus its cached contents
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Load `path`; a missing file yields defaults and is created on the
    /// first write.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ServerError> {
        let path = path.into();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                ServerError::SettingsFormat {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                Settings::default()
            }
            Err(source) => return Err(ServerError::SettingsIo { path, source }),
        };
        Ok(Self {
            path,
            current: RwLock::new(settings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Settings {
        self.current.read().await.clone()
    }

    pub async fn device_name(&self) -> String {
        self.current.read().await.device_name.clone()
    }

    /// Persist a new friendly name, returning it trimmed
    pub async fn set_device_name(&self, name: &str) -> Result<String, SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::Invalid("device name must not be empty".into()));
        }
        if name.len() > MAX_DEVICE_NAME_LEN {
            return Err(SettingsError::Invalid(format!(
                "device name must be at most {} bytes",
                MAX_DEVICE_NAME_LEN
            )));
        }

        let mut current = self.current.write().await;
        let mut updated = current.clone();
        updated.device_name = name.to_string();
        self.write(&updated).await?;
        *current = updated;
        tracing::info!(device_name = name, "device name saved");
        Ok(name.to_string())
    }

    /// Write through a sibling temp file so a crash never leaves half a file
    async fn write(&self, settings: &Settings) -> Result<(), ServerError> {
        let io_err = |source| ServerError::SettingsIo {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(settings).map_err(|source| {
            ServerError::SettingsFormat {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

/// Why a settings update was refused
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Storage(#[from] ServerError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).await.unwrap();
        assert_eq!(store.device_name().await, "Audio-Pi");
    }

    #[tokio::test]
    async fn test_device_name_persists_and_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"device_name": "Old", "theme": "dark"}"#)
            .await
            .unwrap();

        let store = SettingsStore::load(&path).await.unwrap();
        assert_eq!(store.set_device_name("  Kitchen Pi ").await.unwrap(), "Kitchen Pi");

        let reloaded = SettingsStore::load(&path).await.unwrap().get().await;
        assert_eq!(reloaded.device_name, "Kitchen Pi");
        assert_eq!(reloaded.extra["theme"], "dark");
    }

    #[tokio::test]
    async fn test_invalid_names_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::load(dir.path().join("nested/settings.json"))
            .await
            .unwrap();

        assert!(matches!(
            store.set_device_name("   ").await,
            Err(SettingsError::Invalid(_))
        ));
        assert!(store.set_device_name(&"x".repeat(64)).await.is_err());
        assert_eq!(store.device_name().await, "Audio-Pi");

        // Parent directories are created on first write
        store.set_device_name("Patio").await.unwrap();
        assert!(dir.path().join("nested/settings.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(matches!(
            SettingsStore::load(&path).await,
            Err(ServerError::SettingsFormat { .. })
        ));
    }
}
