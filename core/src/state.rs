//! App State Store
//! Small persisted JSON record: the schema gate and remembered UI
//! preferences such as the last window size.

use crate::error::StateError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub db_initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<WindowSize>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Owner of the state file; the only writer of it.
pub struct StateStore {
    path: PathBuf,
    state: RwLock<AppState>,
}

impl StateStore {
    /// Open the state file, falling back to an in-memory default (logged)
    /// when it cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match Self::load(&path) {
            Ok(state) => state,
            Err(e) => {
                log::error!("[StateStore] {}; using default state", e);
                AppState::default()
            }
        };
        Self {
            path,
            state: RwLock::new(state),
        }
    }

    /// Like [`StateStore::open`] but hands load failures to the caller.
    pub fn try_open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let state = Self::load(&path)?;
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Parse the state at `path`; a missing file is initialized to
    /// `{ "db_initialized": false }` and written out.
    pub fn load(path: &Path) -> Result<AppState, StateError> {
        if !path.exists() {
            let state = AppState::default();
            write_state_sync(path, &state)?;
            log::info!("[StateStore] Initialized state file {}", path.display());
            return Ok(state);
        }

        let raw = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| StateError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AppState {
        self.state.read().clone()
    }

    /// Shallow-merge a JSON object into the state and persist it.
    pub async fn update(&self, patch: serde_json::Value) -> Result<(), StateError> {
        let serde_json::Value::Object(patch) = patch else {
            return Err(StateError::InvalidUpdate);
        };

        let snapshot = {
            let mut state = self.state.write();
            let mut current = serde_json::to_value(&*state).map_err(StateError::Serialize)?;
            if let serde_json::Value::Object(map) = &mut current {
                for (key, value) in patch {
                    // The gate only ever moves forward.
                    if key == "db_initialized" && state.db_initialized {
                        continue;
                    }
                    map.insert(key, value);
                }
            }
            *state = serde_json::from_value(current).map_err(StateError::Invalid)?;
            state.clone()
        };

        self.persist(&snapshot).await
    }

    pub fn is_database_ready(&self) -> bool {
        self.state.read().db_initialized
    }

    /// Flip the schema gate to true and write it out before returning.
    pub fn set_database_ready(&self) -> Result<(), StateError> {
        let snapshot = {
            let mut state = self.state.write();
            if state.db_initialized {
                return Ok(());
            }
            state.db_initialized = true;
            state.clone()
        };
        write_state_sync(&self.path, &snapshot)?;
        log::info!("[StateStore] Database marked as initialized");
        Ok(())
    }

    pub fn window_size(&self) -> Option<WindowSize> {
        self.state.read().window_size
    }

    pub async fn set_window_size(&self, width: f64, height: f64) -> Result<(), StateError> {
        self.update(serde_json::json!({
            "window_size": { "width": width, "height": height }
        }))
        .await
    }

    async fn persist(&self, state: &AppState) -> Result<(), StateError> {
        let raw = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StateError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|source| StateError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

fn write_state_sync(path: &Path, state: &AppState) -> Result<(), StateError> {
    let raw = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, raw).map_err(|source| StateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_initialized() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app_state.dev.json");

        let store = StateStore::open(&path);
        assert!(!store.is_database_ready());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "db_initialized": false }));
    }

    #[test]
    fn database_ready_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app_state.json");

        let store = StateStore::open(&path);
        store.set_database_ready().unwrap();
        assert!(store.is_database_ready());

        let reopened = StateStore::open(&path);
        assert!(reopened.is_database_ready());
    }

    #[test]
    fn corrupt_file_falls_back_to_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app_state.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            StateStore::load(&path),
            Err(StateError::Parse { .. })
        ));
        assert!(StateStore::try_open(&path).is_err());

        let store = StateStore::open(&path);
        assert_eq!(store.state(), AppState::default());
    }

    #[tokio::test]
    async fn window_size_is_persisted() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app_state.json");

        let store = StateStore::open(&path);
        store.set_window_size(1280.0, 800.0).await.unwrap();

        let reopened = StateStore::open(&path);
        assert_eq!(
            reopened.window_size(),
            Some(WindowSize {
                width: 1280.0,
                height: 800.0
            })
        );
    }

    #[tokio::test]
    async fn update_keeps_unknown_keys_and_gate() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app_state.json");

        let store = StateStore::open(&path);
        store.set_database_ready().unwrap();
        store
            .update(serde_json::json!({ "last_view": "grid", "db_initialized": false }))
            .await
            .unwrap();

        let reopened = StateStore::open(&path);
        assert!(reopened.is_database_ready());
        assert_eq!(
            reopened.state().extra.get("last_view"),
            Some(&serde_json::json!("grid"))
        );
    }

    #[tokio::test]
    async fn update_rejects_non_object() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::open(temp.path().join("app_state.json"));
        let err = store.update(serde_json::json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, StateError::InvalidUpdate));
    }
}
