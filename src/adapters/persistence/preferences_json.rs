//! Implements PreferencesPort using a JSON file.
//!
//! Remembers the last-used front-end defaults per owner.

use crate::domain::{DomainError, UserPreferences};
use crate::ports::PreferencesPort;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File layout: owner id -> preferences.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesData {
    owners: HashMap<i64, UserPreferences>,
}

pub struct PreferencesJson {
    path: PathBuf,
    cache: tokio::sync::RwLock<PreferencesData>,
}

impl PreferencesJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: tokio::sync::RwLock::new(PreferencesData::default()),
        }
    }

    /// Load from disk. A missing file is an empty store; a corrupt one is logged and ignored.
    pub async fn load(&self) -> Result<(), DomainError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "preferences file unreadable, starting fresh");
                PreferencesData::default()
            }),
            Err(_) => PreferencesData::default(),
        };
        *self.cache.write().await = data;
        Ok(())
    }

    /// Write-replace: temp file, fsync, rename.
    async fn save(&self) -> Result<(), DomainError> {
        let data = self.cache.read().await;
        let json =
            serde_json::to_string_pretty(&*data).map_err(|e| DomainError::State(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::State(format!("create preferences dir: {}", e)))?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::State(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::State(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::State(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::State(format!("atomic rename failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PreferencesPort for PreferencesJson {
    async fn get(&self, owner: i64) -> Result<UserPreferences, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache.owners.get(&owner).cloned().unwrap_or_default())
    }

    async fn set(&self, owner: i64, prefs: UserPreferences) -> Result<(), DomainError> {
        {
            let mut cache = self.cache.write().await;
            cache.owners.insert(owner, prefs);
        }
        self.save().await
    }
}
