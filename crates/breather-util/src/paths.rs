//! Default paths for breather components
//!
//! Every execution context must resolve the same shared store, so all
//! defaults are derived from the environment the same way:
//! - Config: `$XDG_CONFIG_HOME/breather/config.toml` or `~/.config/breather/config.toml`
//! - Data: `$BREATHER_DATA_DIR`, `$XDG_DATA_HOME/breather` or `~/.local/share/breather`

use std::path::{Path, PathBuf};

/// Environment variable for overriding the data directory
pub const BREATHER_DATA_DIR_ENV: &str = "BREATHER_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "breather";

/// Shared store filename within the data directory
const STORE_FILENAME: &str = "state.db";

/// Shield list filename within the data directory
const SHIELD_FILENAME: &str = "shield.json";

/// Schedule table filename within the data directory
const SCHEDULE_FILENAME: &str = "schedules.json";

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$BREATHER_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/breather` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/breather` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(BREATHER_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking BREATHER_DATA_DIR.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Path of the shared state database inside a data directory
pub fn store_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STORE_FILENAME)
}

/// Path of the shield list inside a data directory
pub fn shield_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SHIELD_FILENAME)
}

/// Path of the persisted schedule table inside a data directory
pub fn schedule_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SCHEDULE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_contains_breather() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("breather"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn data_dir_contains_breather() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("breather"));
    }

    #[test]
    fn data_files_live_in_data_dir() {
        let dir = PathBuf::from("/var/lib/breather");
        assert_eq!(store_path(&dir), dir.join("state.db"));
        assert_eq!(shield_path(&dir), dir.join("shield.json"));
        assert_eq!(schedule_path(&dir), dir.join("schedules.json"));
    }
}
