//! Toggle the Windows automatic proxy configuration between "disabled" and
//! "use this PAC url".
//!
//! The OS keeps the state in three records: the textual `AutoConfigURL` value
//! and two binary connection settings records (`DefaultConnectionSettings` and
//! its legacy mirror `SavedLegacySettings`). The binary records are edited in
//! place by [`codec::mutate`]; [`PacSwitcher`] sequences backup, text write and
//! binary writes against any [`ConfigStore`].

pub mod backup;
pub mod blob;
pub mod codec;
pub mod config;
pub mod history;
pub mod store;
pub mod switcher;
pub mod utils;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "windows")]
pub use self::windows::RegistryStore;

// napi bindings only compiled when building cdylib (not during cargo test)
#[cfg(all(feature = "napi-binding", not(test)))]
mod napi;

pub use backup::{BackupSink, BackupSnapshot, FileBackupSink, MemoryBackupSink};
pub use blob::{ConnectionFlags, ConnectionSettingsBlob, Layout};
pub use config::Config;
pub use history::{EventLog, FileEventLog, MemoryEventLog};
pub use store::{ConfigStore, MemoryStore};
pub use switcher::PacSwitcher;

/// Logical proxy state, derived from the records on every read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum ProxyState {
    #[default]
    Disabled,
    EnabledWithUrl(String),
}

impl ProxyState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, ProxyState::EnabledWithUrl(_))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid connection settings record: {0}")]
    Format(String),

    #[error("failed to access record `{name}`: {source}")]
    StoreAccess {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up `{name}`: {source}")]
    BackupIo {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid PAC file URL")]
    Validation(String),

    #[error("failed to update `{failed}` after writing {written:?}: {source}")]
    PartialWrite {
        written: Vec<String>,
        failed: String,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("no connection settings layout configured")]
    MissingLayout,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to set proxy for this environment")]
    NotSupport,

    #[cfg(target_os = "windows")]
    #[error("system call failed")]
    SystemCall(#[from] windows::Win32Error),
}

impl Error {
    pub(crate) fn store(name: &str, source: std::io::Error) -> Self {
        Error::StoreAccess {
            name: name.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Whether this platform exposes the records [`PacSwitcher`] edits.
pub const fn is_support() -> bool {
    cfg!(target_os = "windows")
}

/// Opens the current user's record store.
pub fn system_store() -> Result<impl ConfigStore> {
    #[cfg(target_os = "windows")]
    {
        RegistryStore::open()
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err::<MemoryStore, _>(Error::NotSupport)
    }
}
