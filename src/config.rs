use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::transport::bitbucket::DEFAULT_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from `configuration.toml`.
/// All fields are optional; the tool works with zero config as long as
/// credentials come from the environment or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub pr: PrConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Bitbucket username. Overridden by BB_USERNAME.
    pub username: Option<String>,
    /// App password. Overridden by BB_PASSWORD.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// REST API root, e.g. https://api.bitbucket.org/2.0
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrConfig {
    /// Destination branch for `pr create` when --base is not given
    pub default_destination: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is None. A missing default file yields `Config::default()`;
    /// an explicitly named file must exist. Credentials set in the
    /// environment override the file.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Config::default(),
            },
        };

        // BB_USERNAME / BB_PASSWORD take precedence over the file.
        if let Ok(username) = std::env::var("BB_USERNAME") {
            config.auth.username = Some(username);
        }
        if let Ok(password) = std::env::var("BB_PASSWORD") {
            config.auth.password = Some(password);
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// `<config dir>/bb/configuration.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bb").join("configuration.toml"))
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn default_destination(&self) -> &str {
        self.pr.default_destination.as_deref().unwrap_or("master")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.auth.username.is_none());
        assert!(config.auth.password.is_none());
        assert_eq!(config.base_url(), "https://api.bitbucket.org/2.0");
        assert_eq!(config.default_destination(), "master");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[auth]
username = "alice"
password = "app-password"

[api]
base_url = "https://bitbucket.example.org/2.0"

[pr]
default_destination = "main"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.auth.username.as_deref(), Some("alice"));
        assert_eq!(config.base_url(), "https://bitbucket.example.org/2.0");
        assert_eq!(config.default_destination(), "main");
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = config_file("[auth]\nusername = \"carol\"\n");
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.auth.username.as_deref(), Some("carol"));
    }

    #[test]
    fn test_env_overrides_file_credentials() {
        let _guard = env_lock::lock_env([
            ("BB_USERNAME", Some("bob")),
            ("BB_PASSWORD", Some("env-secret")),
        ]);
        let file = config_file("[auth]\nusername = \"alice\"\npassword = \"file-secret\"\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.auth.username.as_deref(), Some("bob"));
        assert_eq!(config.auth.password.as_deref(), Some("env-secret"));
    }

    #[test]
    fn test_file_credentials_used_without_env() {
        let _guard = env_lock::lock_env([
            ("BB_USERNAME", None::<&str>),
            ("BB_PASSWORD", None::<&str>),
        ]);
        let file = config_file("[auth]\nusername = \"alice\"\n");
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.auth.username.as_deref(), Some("alice"));
        assert!(config.auth.password.is_none());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::FileRead(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(toml::from_str::<Config>("[auth\nusername = 1").is_err());
    }
}
