//! Sequencing of backup, text record and binary record writes.
//!
//! Every operation reads the live records, there is no caching between
//! calls. Writes are not transactional: a failure leaves earlier writes in
//! place and the backup snapshot is the only way back.

use std::io;

use log::{debug, error, info, warn};

use crate::{
    BackupSink, BackupSnapshot, ConfigStore, Error, EventLog, FileBackupSink, FileEventLog,
    Layout, ProxyState, Result,
    blob::ConnectionSettingsBlob,
    codec,
    config::{Config, RecordNames},
    utils::validate_pac_url,
};

pub const STATUS_ENABLED: &str = "Proxy configuration enabled on your system!";
pub const STATUS_DISABLED: &str = "Proxy configuration disabled!";

/// Switches the host between "no automatic proxy" and "use this PAC url".
///
/// The outcome of the latest operation is returned from each call and also
/// kept in [`last_status`](Self::last_status) / [`last_error`](Self::last_error)
/// for callers that poll.
pub struct PacSwitcher<S, B, L> {
    store: S,
    backup: B,
    history: L,
    layout: Layout,
    records: RecordNames,
    last_status: String,
    last_error: String,
}

impl<S: ConfigStore> PacSwitcher<S, FileBackupSink, FileEventLog> {
    /// Switcher backed by the backup directory and history log in `config`.
    pub fn from_config(store: S, config: &Config) -> Result<Self> {
        let switcher = PacSwitcher::new(
            store,
            FileBackupSink::new(&config.backup_dir),
            FileEventLog::new(&config.history_log),
            config.layout()?,
        );
        Ok(switcher.with_records(config.records.clone()))
    }
}

impl<S, B, L> PacSwitcher<S, B, L>
where
    S: ConfigStore,
    B: BackupSink,
    L: EventLog,
{
    pub fn new(store: S, backup: B, history: L, layout: Layout) -> Self {
        debug!("Create PacSwitcher with layout: {layout}");
        Self {
            store,
            backup,
            history,
            layout,
            records: RecordNames::default(),
            last_status: String::new(),
            last_error: String::new(),
        }
    }

    pub fn with_records(mut self, records: RecordNames) -> Self {
        debug!("Setting records: {records:?}");
        self.records = records;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backup_sink(&self) -> &B {
        &self.backup
    }

    pub fn history(&self) -> &L {
        &self.history
    }

    pub fn last_status(&self) -> &str {
        &self.last_status
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// PAC url currently in the text record, empty if unset or unreadable.
    pub fn current_url(&self) -> String {
        match self.store.read_text(&self.records.auto_config_url) {
            Ok(url) => url,
            Err(e) => {
                debug!("no current PAC url: {e}");
                String::new()
            }
        }
    }

    /// State derived from the text record, cross-checked against the flags
    /// of the primary binary record.
    pub fn state(&self) -> Result<ProxyState> {
        let url = match self.store.read_text(&self.records.auto_config_url) {
            Ok(url) => url.trim().to_string(),
            Err(Error::StoreAccess { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                String::new()
            }
            Err(e) => return Err(e),
        };
        let blob = ConnectionSettingsBlob::new(
            self.store.read_binary(&self.records.primary)?,
            self.layout,
        )?;

        let flags = blob.flags();
        if url.is_empty() == flags.uses_pac() {
            warn!(
                "{} is {:?} but {} flags are {:#04x}",
                self.records.auto_config_url,
                url,
                self.records.primary,
                flags.bits()
            );
        }

        if url.is_empty() {
            Ok(ProxyState::Disabled)
        } else {
            Ok(ProxyState::EnabledWithUrl(url))
        }
    }

    /// Snapshots every binary record through the backup sink. Nothing should
    /// be mutated when this fails.
    pub fn backup(&mut self) -> Result<()> {
        let result = BackupSnapshot::capture(&self.store, &self.records.binary())
            .and_then(|snapshot| snapshot.persist(&mut self.backup));
        let location = self.backup.location();
        self.finish(
            result,
            || format!("Created backup at {location}"),
            |e| format!("Backup failed: {e}"),
        )
    }

    /// Points the host at `url`: text record first, then the binary records
    /// with the config script bit set and the url embedded.
    ///
    /// `url` is not validated here, see [`enable`](Self::enable).
    pub fn install_pac_file(&mut self, url: &str) -> Result<()> {
        let result = self.apply(true, url);
        self.finish(result, || STATUS_ENABLED.to_string(), Error::to_string)
    }

    /// Clears the text record and strips the url from the binary records,
    /// leaving auto detect on.
    pub fn restore_defaults(&mut self) -> Result<()> {
        let result = self.apply(false, "");
        self.finish(result, || STATUS_DISABLED.to_string(), Error::to_string)
    }

    /// Validates `url`, backs up, then installs it.
    pub fn enable(&mut self, url: &str) -> Result<()> {
        if !validate_pac_url(url) {
            let result = Err(Error::Validation(url.to_string()));
            return self.finish(result, String::new, Error::to_string);
        }
        self.backup()?;
        self.install_pac_file(url)
    }

    /// Backs up, then restores defaults.
    pub fn disable(&mut self) -> Result<()> {
        self.backup()?;
        self.restore_defaults()
    }

    fn apply(&mut self, enable: bool, url: &str) -> Result<()> {
        let url = if enable { url.trim() } else { "" };
        self.store.write_text(&self.records.auto_config_url, url)?;
        debug!("wrote {} = {url:?}", self.records.auto_config_url);

        let input = self.store.read_binary(&self.records.primary)?;
        let output = codec::mutate(self.layout, &input, enable, url)?;
        self.write_binary_records(&output)?;

        if let Err(e) = self.store.refresh() {
            warn!("failed to propagate settings change: {e}");
        }
        Ok(())
    }

    /// Writes `bytes` to the primary record and then each mirror. A failure
    /// after the first write names the records already updated.
    fn write_binary_records(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = Vec::new();
        for name in self.records.binary() {
            if let Err(source) = self.store.write_binary(&name, bytes) {
                if written.is_empty() {
                    return Err(source);
                }
                return Err(Error::PartialWrite {
                    written,
                    failed: name,
                    source: Box::new(source),
                });
            }
            debug!("wrote {name} ({} bytes)", bytes.len());
            written.push(name);
        }
        Ok(())
    }

    /// Updates the status/error slots and appends the outcome to the history.
    fn finish(
        &mut self,
        result: Result<()>,
        status: impl FnOnce() -> String,
        describe: impl FnOnce(&Error) -> String,
    ) -> Result<()> {
        match &result {
            Ok(()) => {
                self.last_status = status();
                self.last_error.clear();
                info!("{}", self.last_status);
            }
            Err(e) => {
                self.last_status.clear();
                self.last_error = describe(e);
                error!("{}", self.last_error);
            }
        }

        let event = if result.is_ok() {
            &self.last_status
        } else {
            &self.last_error
        };
        if let Err(e) = self.history.append(event) {
            warn!("failed to append to history log: {e}");
        }
        result
    }
}
