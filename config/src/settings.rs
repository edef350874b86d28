//! Repository settings stored in settings.toml

use crate::PathManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_REPO: &str = "v1books-backend";
pub const DEFAULT_USERS_PATH: &str = "database/users.json";
pub const DEFAULT_REQUESTS_PATH: &str = "database/requests.json";

/// Where the two collections live and how to reach them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account or organisation owning the backing repository
    pub owner: Option<String>,
    pub repo: String,
    /// Contents API root, e.g. "https://api.github.com"
    pub api_base_url: String,
    pub users_path: String,
    pub requests_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner: None,
            repo: DEFAULT_REPO.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            users_path: DEFAULT_USERS_PATH.to_string(),
            requests_path: DEFAULT_REQUESTS_PATH.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        match PathManager::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Save settings to the settings file
    pub fn save(&self) -> Result<(), String> {
        let path = PathManager::settings_path().ok_or("Could not determine settings path")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write settings: {}", e))?;
        Ok(())
    }

    /// The owner, or an error naming how to set it
    pub fn require_owner(&self) -> Result<&str, String> {
        self.owner
            .as_deref()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| "Repository owner is not configured (set V1_OWNER or run setup)".to_string())
    }
}
