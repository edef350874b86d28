use std::path::PathBuf;
use std::sync::OnceLock;

const APP_DIR: &str = "v1-services";

static DATA_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Resolves where local state (settings, session) lives on disk.
pub struct PathManager;

impl PathManager {
    /// Pin every path under `path`. Only the first call wins.
    pub fn set_data_dir(path: PathBuf) {
        let _ = DATA_DIR_OVERRIDE.set(path);
    }

    pub fn data_dir() -> Option<PathBuf> {
        if let Some(d) = DATA_DIR_OVERRIDE.get() {
            return Some(d.clone());
        }
        dirs::data_dir().map(|d| d.join(APP_DIR))
    }

    pub fn config_dir() -> Option<PathBuf> {
        if let Some(d) = DATA_DIR_OVERRIDE.get() {
            return Some(d.clone());
        }
        dirs::config_dir().map(|d| d.join(APP_DIR))
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.toml"))
    }

    /// Key-value file holding the token and the signed-in user
    pub fn session_path() -> Option<PathBuf> {
        Self::data_dir().map(|d| d.join("session.json"))
    }

    pub fn ensure_dirs_exist() -> std::io::Result<()> {
        if let Some(d) = Self::data_dir() {
            std::fs::create_dir_all(&d)?;
        }
        if let Some(d) = Self::config_dir() {
            std::fs::create_dir_all(&d)?;
        }
        Ok(())
    }
}
