//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/quizsync/config.toml)
//! 3. Environment variables (QUIZSYNC_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "QUIZSYNC";

/// Default name of the remote question collection
pub const DEFAULT_COLLECTION: &str = "questions";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (SQLite cache)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Remote document store location (optional)
    ///
    /// `http://` / `https://` URLs select the HTTP store; `file://` URLs or
    /// bare paths select a JSON file store.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Name of the remote question collection
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Per-request timeout for the HTTP store
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            remote_url: None,
            collection: default_collection(),
            request_timeout_secs: default_request_timeout_secs(),
            log_file: None,
        }
    }
}

/// Where the remote collection lives, derived from `remote_url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLocation {
    /// REST document endpoint
    Http(String),
    /// Local JSON file standing in for the remote store
    File(PathBuf),
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (QUIZSYNC_DATA_DIR, QUIZSYNC_REMOTE_URL, QUIZSYNC_COLLECTION)
    /// 2. Config file (~/.config/quizsync/config.toml or QUIZSYNC_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // Empty string clears the remote
        if let Ok(val) = std::env::var(format!("{}_REMOTE_URL", ENV_PREFIX)) {
            self.remote_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_COLLECTION", ENV_PREFIX)) {
            if !val.is_empty() {
                self.collection = val;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with QUIZSYNC_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quizsync")
            .join("config.toml")
    }

    /// Get the path to the SQLite cache database
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("quizsync.db")
    }

    /// Request timeout for the HTTP store
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve `remote_url` into a concrete remote location
    pub fn remote_location(&self) -> Option<RemoteLocation> {
        let url = self.remote_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            Some(RemoteLocation::Http(url.trim_end_matches('/').to_string()))
        } else if let Some(path) = url.strip_prefix("file://") {
            Some(RemoteLocation::File(PathBuf::from(path)))
        } else {
            Some(RemoteLocation::File(PathBuf::from(url)))
        }
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quizsync")
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Serializes tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "QUIZSYNC_DATA_DIR",
        "QUIZSYNC_REMOTE_URL",
        "QUIZSYNC_COLLECTION",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.remote_url.is_none());
        assert_eq!(config.collection, "questions");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.data_dir.ends_with("quizsync"));
    }

    #[test]
    fn test_cache_path() {
        let config = Config::default();
        assert!(config.cache_path().ends_with("quizsync.db"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("QUIZSYNC_DATA_DIR", "/tmp/quizsync-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/quizsync-test"));
    }

    #[test]
    fn test_env_override_remote_url() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("QUIZSYNC_REMOTE_URL", "https://docs.example.com/v1");
        config.apply_env_overrides();
        assert_eq!(
            config.remote_url.as_deref(),
            Some("https://docs.example.com/v1")
        );

        env::set_var("QUIZSYNC_REMOTE_URL", "");
        config.apply_env_overrides();
        assert!(config.remote_url.is_none());
    }

    #[test]
    fn test_env_override_collection_ignores_empty() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("QUIZSYNC_COLLECTION", "");
        config.apply_env_overrides();
        assert_eq!(config.collection, "questions");

        env::set_var("QUIZSYNC_COLLECTION", "practice_questions");
        config.apply_env_overrides();
        assert_eq!(config.collection, "practice_questions");
    }

    #[test]
    fn test_remote_location() {
        let mut config = Config::default();
        assert_eq!(config.remote_location(), None);

        config.remote_url = Some("https://docs.example.com/v1/".to_string());
        assert_eq!(
            config.remote_location(),
            Some(RemoteLocation::Http("https://docs.example.com/v1".to_string()))
        );

        config.remote_url = Some("file:///srv/remote.json".to_string());
        assert_eq!(
            config.remote_location(),
            Some(RemoteLocation::File(PathBuf::from("/srv/remote.json")))
        );

        config.remote_url = Some("./remote.json".to_string());
        assert_eq!(
            config.remote_location(),
            Some(RemoteLocation::File(PathBuf::from("./remote.json")))
        );
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            remote_url = "https://example.com"
            collection = "bank"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.remote_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.collection, "bank");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            remote_url: Some("file:///tmp/remote.json".to_string()),
            collection: "questions".to_string(),
            request_timeout_secs: 5,
            log_file: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.remote_url, config.remote_url);
        assert_eq!(loaded.request_timeout_secs, 5);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("QUIZSYNC_DATA_DIR", temp_dir.path());

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert!(config.remote_url.is_none());
        assert_eq!(config.collection, "questions");
    }
}
