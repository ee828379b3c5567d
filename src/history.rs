//! Append-only log of operation outcomes.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

pub trait EventLog {
    fn append(&mut self, event: &str) -> io::Result<()>;
}

impl<L: EventLog + ?Sized> EventLog for &mut L {
    fn append(&mut self, event: &str) -> io::Result<()> {
        (**self).append(event)
    }
}

/// Text file with one line per event.
#[derive(Debug, Clone)]
pub struct FileEventLog {
    path: PathBuf,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole log, for preloading a display at start-up. A log that was never
    /// written reads as empty.
    pub fn read_all(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

impl EventLog for FileEventLog {
    fn append(&mut self, event: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", event.trim_end())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryEventLog {
    events: Vec<String>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }
}

impl EventLog for MemoryEventLog {
    fn append(&mut self, event: &str) -> io::Result<()> {
        self.events.push(event.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileEventLog::new(dir.path().join("history.log"));
        assert_eq!(log.read_all().unwrap(), "");
    }

    #[test]
    fn appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = FileEventLog::new(dir.path().join("nested").join("history.log"));
        log.append("Proxy configuration disabled!").unwrap();
        log.append("Created backup at C:\\backup\n").unwrap();
        assert_eq!(
            log.read_all().unwrap(),
            "Proxy configuration disabled!\nCreated backup at C:\\backup\n"
        );
    }
}
