//! Application-level configuration sourced from the environment.

use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::info;

/// Default location on disk for the persisted community artifacts.
const DEFAULT_DATA_DIR: &str = "data";
/// Environment variable that overrides [`DEFAULT_DATA_DIR`].
const DATA_DIR_ENV: &str = "GAME_NIGHT_BACK_DATA_DIR";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    data_dir: PathBuf,
}

impl AppConfig {
    /// Resolve the configuration, taking environment overrides into account.
    pub fn load() -> Self {
        let data_dir = env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        info!(path = %data_dir.display(), "using data directory");
        Self { data_dir }
    }

    /// Directory holding the settings, suggestions, and votes artifacts.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
