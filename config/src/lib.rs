//! Configuration for the V1 Services record store
//!
//! - `.env` loading for repository credentials
//! - `PathManager` for the local data and config directories
//! - `Settings` for the remote repository and collection paths
//! - `crypto` for keeping the bearer token encrypted at rest

pub mod crypto;
pub mod paths;
pub mod settings;

pub use paths::PathManager;
pub use settings::Settings;

/// Load environment variables from .env files.
/// First loads from ~/.env (home directory), then from ./.env (project directory).
/// Project directory values take precedence over home directory values.
/// Call this before parsing CLI args so `env = ...` flags can see the values.
pub fn load_env_file() {
    if let Some(home) = dirs::home_dir() {
        dotenv::from_path(home.join(".env")).ok();
    }

    dotenv::dotenv().ok();
}
