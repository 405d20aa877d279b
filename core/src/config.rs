//! App Config Store
//! Loads the YAML app config, creates it from the embedded default on first
//! run, and turns the knowledge-base path settings into absolute paths.

use crate::error::ConfigError;
use crate::paths::AppPaths;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default sub-path (under the base dir) of the file-store directory
pub const DEFAULT_FILE_STORE_SUB_PATH: &str = "knowledge_base/files";
/// Default sub-path (under the base dir) of the directory holding the database
pub const DEFAULT_DB_SUB_PATH: &str = "knowledge_base";

/// Written verbatim when no config file exists yet
pub const DEFAULT_CONFIG_YAML: &str = r#"# Knowledge base application settings
app:
  name: Knowledge Base
  knowledge_base:
    file_store_path: knowledge_base/files
    db_path: knowledge_base
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSection {
    pub name: String,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_store_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection {
                name: "Knowledge Base".to_string(),
                knowledge_base: KnowledgeBaseConfig {
                    file_store_path: Some(DEFAULT_FILE_STORE_SUB_PATH.to_string()),
                    db_path: Some(DEFAULT_DB_SUB_PATH.to_string()),
                    extra: BTreeMap::new(),
                },
                extra: BTreeMap::new(),
            },
            extra: BTreeMap::new(),
        }
    }
}

/// Owner of the config file; the only writer of it.
pub struct ConfigStore {
    paths: AppPaths,
    path: PathBuf,
    config: RwLock<AppConfig>,
}

impl ConfigStore {
    /// Open the config for the given paths. A file that fails to parse is
    /// logged and replaced by the default in memory only; the file itself is
    /// left as the user wrote it.
    pub fn open(paths: AppPaths) -> Self {
        let path = paths.config_file();
        let config = match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("[ConfigStore] {}; using default config", e);
                AppConfig::default()
            }
        };
        Self::with_config(paths, path, config)
    }

    /// Like [`ConfigStore::open`] but hands load failures to the caller.
    pub fn try_open(paths: AppPaths) -> Result<Self, ConfigError> {
        let path = paths.config_file();
        let config = Self::load(&path)?;
        Ok(Self::with_config(paths, path, config))
    }

    fn with_config(paths: AppPaths, path: PathBuf, config: AppConfig) -> Self {
        Self {
            paths,
            path,
            config: RwLock::new(config),
        }
    }

    /// Parse the config at `path`, writing out the default document first if
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        if !path.exists() {
            log::info!(
                "[ConfigStore] No config at {}, writing default",
                path.display()
            );
            write_file(path, DEFAULT_CONFIG_YAML)?;
            return serde_yaml::from_str(DEFAULT_CONFIG_YAML).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Snapshot of the current config
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    pub fn resolve_path(&self, configured: Option<&str>, default_sub_path: &str) -> PathBuf {
        self.paths.resolve_path(configured, default_sub_path)
    }

    /// Absolute directory ingested files are written to
    pub fn kb_file_store_dir(&self) -> PathBuf {
        let config = self.config.read();
        self.resolve_path(
            config.app.knowledge_base.file_store_path.as_deref(),
            DEFAULT_FILE_STORE_SUB_PATH,
        )
    }

    /// Absolute path of the catalog database file
    pub fn kb_database_path(&self) -> PathBuf {
        let config = self.config.read();
        self.resolve_path(
            config.app.knowledge_base.db_path.as_deref(),
            DEFAULT_DB_SUB_PATH,
        )
        .join(self.paths.mode().database_file_name())
    }

    /// Shallow-merge `patch` into the top level of the config and persist.
    pub fn update(&self, patch: serde_yaml::Value) -> Result<(), ConfigError> {
        let serde_yaml::Value::Mapping(patch) = patch else {
            return Err(ConfigError::InvalidUpdate);
        };

        {
            let mut config = self.config.write();
            let mut current = serde_yaml::to_value(&*config).map_err(ConfigError::Serialize)?;
            if let serde_yaml::Value::Mapping(map) = &mut current {
                for (key, value) in patch {
                    map.insert(key, value);
                }
            }
            *config = serde_yaml::from_value(current).map_err(ConfigError::Invalid)?;
        }

        self.save()
    }

    /// Serialize the in-memory config over the config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        let raw = serde_yaml::to_string(&*self.config.read()).map_err(ConfigError::Serialize)?;
        write_file(&self.path, &raw)?;
        log::debug!("[ConfigStore] Saved config to {}", self.path.display());
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
