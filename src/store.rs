//! Access to the named records holding the proxy configuration.

use std::{collections::HashMap, io};

use crate::{Error, Result};

/// Text value holding the PAC url.
pub const AUTO_CONFIG_URL: &str = "AutoConfigURL";
/// Primary binary connection settings record.
pub const DEFAULT_CONNECTION_SETTINGS: &str = "DefaultConnectionSettings";
/// Legacy mirror of [`DEFAULT_CONNECTION_SETTINGS`].
pub const SAVED_LEGACY_SETTINGS: &str = "SavedLegacySettings";

/// Named text and binary records in the per-user network settings.
///
/// Failures surface as [`Error::StoreAccess`] naming the record.
pub trait ConfigStore {
    fn read_text(&self, name: &str) -> Result<String>;

    fn write_text(&mut self, name: &str, value: &str) -> Result<()>;

    fn read_binary(&self, name: &str) -> Result<Vec<u8>>;

    fn write_binary(&mut self, name: &str, value: &[u8]) -> Result<()>;

    /// Tells the OS the settings changed so running clients reload them.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for &mut S {
    fn read_text(&self, name: &str) -> Result<String> {
        (**self).read_text(name)
    }

    fn write_text(&mut self, name: &str, value: &str) -> Result<()> {
        (**self).write_text(name, value)
    }

    fn read_binary(&self, name: &str) -> Result<Vec<u8>> {
        (**self).read_binary(name)
    }

    fn write_binary(&mut self, name: &str, value: &[u8]) -> Result<()> {
        (**self).write_binary(name, value)
    }

    fn refresh(&self) -> Result<()> {
        (**self).refresh()
    }
}

/// Store kept entirely in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    text: HashMap<String, String>,
    binary: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.text.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_binary(mut self, name: &str, value: &[u8]) -> Self {
        self.binary.insert(name.to_string(), value.to_vec());
        self
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    pub fn binary(&self, name: &str) -> Option<&[u8]> {
        self.binary.get(name).map(Vec::as_slice)
    }
}

fn not_found(name: &str) -> Error {
    Error::store(
        name,
        io::Error::new(io::ErrorKind::NotFound, "record does not exist"),
    )
}

impl ConfigStore for MemoryStore {
    fn read_text(&self, name: &str) -> Result<String> {
        self.text.get(name).cloned().ok_or_else(|| not_found(name))
    }

    fn write_text(&mut self, name: &str, value: &str) -> Result<()> {
        self.text.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn read_binary(&self, name: &str) -> Result<Vec<u8>> {
        self.binary.get(name).cloned().ok_or_else(|| not_found(name))
    }

    fn write_binary(&mut self, name: &str, value: &[u8]) -> Result<()> {
        self.binary.insert(name.to_string(), value.to_vec());
        Ok(())
    }
}
