//! Run-mode aware location of the app's backing files.
//!
//! In development everything lives next to the working directory; a packaged
//! build keeps its files in the platform user-data directory. Every file name
//! carries the mode so a dev run can never open the production database.

use std::path::{Path, PathBuf};

/// Directory name under the platform data dir for packaged builds
pub const APP_DIR_NAME: &str = "knowledge-base";

/// Environment variable that overrides the build-profile run mode
pub const RUN_MODE_ENV: &str = "KB_RUN_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Packaged,
}

impl RunMode {
    /// `KB_RUN_MODE` wins, otherwise debug builds run in development mode.
    pub fn detect() -> Self {
        match std::env::var(RUN_MODE_ENV) {
            Ok(value) => match Self::parse(&value) {
                Some(mode) => mode,
                None => {
                    log::warn!(
                        "[AppPaths] Ignoring unknown {} value '{}'",
                        RUN_MODE_ENV,
                        value
                    );
                    Self::from_build()
                }
            },
            Err(_) => Self::from_build(),
        }
    }

    fn from_build() -> Self {
        if cfg!(debug_assertions) {
            RunMode::Development
        } else {
            RunMode::Packaged
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(RunMode::Development),
            "packaged" | "production" | "prod" => Some(RunMode::Packaged),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, RunMode::Development)
    }

    pub fn config_file_name(&self) -> &'static str {
        match self {
            RunMode::Development => "app_config.dev.yaml",
            RunMode::Packaged => "app_config.yaml",
        }
    }

    pub fn state_file_name(&self) -> &'static str {
        match self {
            RunMode::Development => "app_state.dev.json",
            RunMode::Packaged => "app_state.json",
        }
    }

    pub fn database_file_name(&self) -> &'static str {
        match self {
            RunMode::Development => "app.dev.db",
            RunMode::Packaged => "app.db",
        }
    }
}

/// Base directory plus run mode; everything else is derived from these two.
#[derive(Debug, Clone)]
pub struct AppPaths {
    mode: RunMode,
    base_dir: PathBuf,
}

impl AppPaths {
    /// Base is the current working directory in development and
    /// `<data_dir>/knowledge-base` when packaged.
    pub fn new(mode: RunMode) -> Self {
        let base_dir = match mode {
            RunMode::Development => {
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
            RunMode::Packaged => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME),
        };
        Self { mode, base_dir }
    }

    pub fn with_base(mode: RunMode, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            base_dir: base_dir.into(),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(self.mode.config_file_name())
    }

    pub fn state_file(&self) -> PathBuf {
        self.base_dir.join(self.mode.state_file_name())
    }

    /// Resolve a configured path against the base directory.
    ///
    /// Missing or empty settings fall back to `<base>/<default_sub_path>`,
    /// absolute settings are returned unchanged and relative ones are joined
    /// onto the base.
    pub fn resolve_path(&self, configured: Option<&str>, default_sub_path: &str) -> PathBuf {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            None => self.base_dir.join(default_sub_path),
            Some(configured) => {
                let path = Path::new(configured);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.base_dir.join(path)
                }
            }
        }
    }
}
