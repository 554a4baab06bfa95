use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resume points at or below this many seconds are treated as "start over".
pub const CONTINUE_WATCHING_BARRIER: i64 = 30;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub continuewatching: ContinueWatchingConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(skip)]
    pub debug_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContinueWatchingConfig {
    #[serde(default = "default_barrier")]
    pub barrier: i64,
}

impl Default for ContinueWatchingConfig {
    fn default() -> Self {
        Self {
            barrier: default_barrier(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagesConfig {
    #[serde(default = "default_cachedir")]
    pub cachedir: String,
    #[serde(default = "default_assetdir")]
    pub assetdir: String,
    /// Prefix for image paths that are not absolute URLs.
    #[serde(default)]
    pub baseurl: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cachedir: default_cachedir(),
            assetdir: default_assetdir(),
            baseurl: None,
            timeout: default_timeout(),
        }
    }
}

fn default_barrier() -> i64 {
    CONTINUE_WATCHING_BARRIER
}

fn default_cachedir() -> String {
    "./cache/images".to_string()
}

fn default_assetdir() -> String {
    "./assets".to_string()
}

fn default_timeout() -> u64 {
    20
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        Ok(config)
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("continue-watching.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.continuewatching.barrier, CONTINUE_WATCHING_BARRIER);
        assert_eq!(config.images.cachedir, "./cache/images");
        assert_eq!(config.images.timeout, 20);
        assert_eq!(config.get_database_path(), None);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vodclient.yaml");
        std::fs::write(
            &path,
            "dbdir: /var/lib/vod\ncontinuewatching:\n  barrier: 10\nimages:\n  baseurl: https://cdn.example.com\n",
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.continuewatching.barrier, 10);
        assert_eq!(config.images.baseurl.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.images.assetdir, "./assets");
        assert_eq!(
            config.get_database_path().as_deref(),
            Some("/var/lib/vod/continue-watching.db")
        );
    }

    #[test]
    fn test_sqlite_filename_wins() {
        let config: Config =
            serde_yaml::from_str("dbdir: /tmp\ndatabase:\n  sqlite:\n    filename: resume.db\n").unwrap();
        assert_eq!(config.get_database_path().as_deref(), Some("resume.db"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/vodclient.yaml"),
            Err(ConfigError::ReadError(_, _))
        ));
    }
}
