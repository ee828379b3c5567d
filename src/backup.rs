//! Pre-mutation snapshots of the binary records.
//!
//! Snapshots are written out for manual recovery and never read back.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{ConfigStore, Error, Result};

/// Destination for raw record bytes. Each write replaces what was stored
/// under `name` before.
pub trait BackupSink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Human readable location, shown in status messages.
    fn location(&self) -> String;
}

impl<B: BackupSink + ?Sized> BackupSink for &mut B {
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        (**self).write(name, bytes)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// Ordered `(record name, raw bytes)` pairs captured before a write.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    entries: Vec<(String, Vec<u8>)>,
}

impl BackupSnapshot {
    /// Reads every record in `names`, in order. Any read failure aborts.
    pub fn capture<S, N>(store: &S, names: &[N]) -> Result<Self>
    where
        S: ConfigStore + ?Sized,
        N: AsRef<str>,
    {
        let entries = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                store.read_binary(name).map(|bytes| (name.to_string(), bytes))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    /// Writes each entry to `sink`, stopping at the first failure.
    pub fn persist<B: BackupSink + ?Sized>(&self, sink: &mut B) -> Result<()> {
        for (name, bytes) in &self.entries {
            sink.write(name, bytes).map_err(|source| Error::BackupIo {
                name: name.clone(),
                source,
            })?;
            debug!("backed up {name} ({} bytes) to {}", bytes.len(), sink.location());
        }
        Ok(())
    }
}

/// Writes one `<name>.bin` file per record into a directory.
#[derive(Debug, Clone)]
pub struct FileBackupSink {
    dir: PathBuf,
}

impl FileBackupSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.bin"))
    }
}

impl BackupSink for FileBackupSink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(name), bytes)
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Keeps the last snapshot of each record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackupSink {
    records: Vec<(String, Vec<u8>)>,
}

impl MemoryBackupSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.records
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl BackupSink for MemoryBackupSink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        match self.records.iter_mut().find(|(n, _)| n == name) {
            Some((_, stored)) => *stored = bytes.to_vec(),
            None => self.records.push((name.to_string(), bytes.to_vec())),
        }
        Ok(())
    }

    fn location(&self) -> String {
        "memory".into()
    }
}
