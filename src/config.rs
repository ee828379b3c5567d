use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Layout, Result,
    store::{AUTO_CONFIG_URL, DEFAULT_CONNECTION_SETTINGS, SAVED_LEGACY_SETTINGS},
};

const APP_DIR: &str = "pacswitch";
const FILENAME: &str = "config.toml";

/// Settings for a [`PacSwitcher`](crate::PacSwitcher), read from TOML.
///
/// ```toml
/// layout = "padded"
/// backup_dir = 'C:\Users\me\AppData\Local\pacswitch\backup'
///
/// [records]
/// mirrors = ["SavedLegacySettings"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Binary record layout deployed on this host. Never guessed.
    #[serde(default)]
    pub layout: Option<Layout>,

    /// Directory receiving one snapshot file per binary record.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Append-only operation history.
    #[serde(default = "default_history_log")]
    pub history_log: PathBuf,

    #[serde(default)]
    pub records: RecordNames,
}

/// Names of the records the switcher reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordNames {
    pub auto_config_url: String,
    pub primary: String,
    /// Written after `primary`, in order, with identical bytes.
    pub mirrors: Vec<String>,
}

impl Default for RecordNames {
    fn default() -> Self {
        Self {
            auto_config_url: AUTO_CONFIG_URL.into(),
            primary: DEFAULT_CONNECTION_SETTINGS.into(),
            mirrors: vec![SAVED_LEGACY_SETTINGS.into()],
        }
    }
}

impl RecordNames {
    /// Primary record followed by its mirrors.
    pub fn binary(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.mirrors.iter().cloned())
            .collect()
    }
}

fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn default_backup_dir() -> PathBuf {
    data_dir().join("backup")
}

fn default_history_log() -> PathBuf {
    data_dir().join("history.log")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: None,
            backup_dir: default_backup_dir(),
            history_log: default_history_log(),
            records: RecordNames::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(FILENAME);
        path
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                log::debug!("loading config from {}", path.display());
                Self::from_toml(&content)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The configured layout, or [`Error::MissingLayout`].
    pub fn layout(&self) -> Result<Layout> {
        self.layout.ok_or(Error::MissingLayout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(matches!(config.layout(), Err(Error::MissingLayout)));
        assert_eq!(
            config.records.binary(),
            vec!["DefaultConnectionSettings", "SavedLegacySettings"]
        );
    }

    #[test]
    fn parses_layout_and_records() {
        let config = Config::from_toml(
            r#"
layout = "fixed"
backup_dir = "/tmp/pac-backup"

[records]
mirrors = []
"#,
        )
        .unwrap();
        assert_eq!(config.layout().unwrap(), Layout::Fixed);
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/pac-backup"));
        assert_eq!(config.records.auto_config_url, "AutoConfigURL");
        assert_eq!(config.records.binary(), vec!["DefaultConnectionSettings"]);
    }

    #[test]
    fn unknown_layout_is_rejected() {
        assert!(matches!(
            Config::from_toml("layout = \"sniffed\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "layout = \"padded\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().layout, Some(Layout::Padded));
    }
}
