use std::path::{Path, PathBuf};

use anyhow::Context;
use directories_next::ProjectDirs;
use serde::Deserialize;

use crate::models::Expiry;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub port: u16,
    pub database: Database,
    pub storage: Storage,
    pub limits: Limits,
    pub highlighter: Highlighter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub kind: StorageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Database,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_size: usize,
    /// Maximum title length in characters.
    pub max_title_length: usize,
    pub id_length: usize,
    /// Used when a paste is submitted without a (valid) expiry.
    pub default_expiry: Expiry,
    /// Purge expired pastes in the background this often, if set.
    pub reap_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Highlighter {
    pub kind: HighlighterKind,
    pub default_style: Option<String>,
    pub timeout_secs: u64,
    /// Wrapper program, required for [`HighlighterKind::Command`].
    pub program: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlighterKind {
    Builtin,
    Command,
    None,
}

impl Config {
    /// Load the config from `path`, or from the user config directory if it
    /// has one, falling back to defaults.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_owned(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Config::default()),
            },
        };

        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.limits.id_length > 0,
            "limits.id_length must be at least 1"
        );
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nopaste").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:9900".to_owned(),
            port: 9900,
            database: Database::default(),
            storage: Storage::default(),
            limits: Limits::default(),
            highlighter: Highlighter::default(),
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Database {
            url: "sqlite://nopaste.db?mode=rwc".to_owned(),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Storage {
            kind: StorageKind::Database,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_upload_size: 1024 * 1024,
            max_title_length: 50,
            id_length: 6,
            default_expiry: Expiry::Forever,
            reap_interval_secs: None,
        }
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Highlighter {
            kind: HighlighterKind::Builtin,
            default_style: None,
            timeout_secs: 10,
            program: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.port, 9900);
        assert_eq!(config.storage.kind, StorageKind::Database);
        assert_eq!(config.limits.max_title_length, 50);
        assert_eq!(config.limits.default_expiry, Expiry::Forever);
        assert_eq!(config.highlighter.kind, HighlighterKind::Builtin);
    }

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(
            r#"
            base_url = "https://paste.example.org"
            port = 8080

            [database]
            url = "postgres://localhost/paste"

            [storage]
            kind = "memory"

            [limits]
            id_length = 8
            default_expiry = "1 week"
            reap_interval_secs = 60

            [highlighter]
            kind = "command"
            program = "/usr/local/bin/highlighter-wrapper"
            default_style = "monokai"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://paste.example.org");
        assert_eq!(config.storage.kind, StorageKind::Memory);
        assert_eq!(config.limits.id_length, 8);
        assert_eq!(config.limits.max_title_length, 50);
        assert_eq!(config.limits.default_expiry, Expiry::OneWeek);
        assert_eq!(config.limits.reap_interval_secs, Some(60));
        assert_eq!(config.highlighter.kind, HighlighterKind::Command);
        assert_eq!(config.highlighter.timeout_secs, 10);
    }

    #[test]
    fn rejects_unknown_expiry() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [limits]
            default_expiry = "1 fortnight"
            "#,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn zero_id_length_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[limits]\nid_length = 0\n").unwrap();

        let err = Config::load(Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("id_length"), "got {err:#}");

        std::fs::write(&path, "[limits]\nid_length = 4\n").unwrap();
        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.limits.id_length, 4);
    }

    #[tokio::test]
    async fn missing_explicit_config_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/nopaste.toml"))).await;
        assert!(result.is_err());
    }
}
