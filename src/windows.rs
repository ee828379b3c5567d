use crate::{ConfigStore, Error, Result};
use std::io;
use windows::Win32::Networking::WinInet::{
    INTERNET_OPTION_REFRESH, INTERNET_OPTION_SETTINGS_CHANGED, InternetSetOptionW,
};
use winreg::{RegKey, RegValue, enums};

pub use windows::core::Error as Win32Error;

const SUB_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\Internet Settings";
const CONNECTIONS: &str = "Connections";

fn connections_key() -> String {
    format!("{SUB_KEY}\\{CONNECTIONS}")
}

/// Registry backed store under `HKCU\...\Internet Settings`.
///
/// Text values live on the `Internet Settings` key itself, binary connection
/// settings records on its `Connections` subkey.
pub struct RegistryStore {
    settings: RegKey,
    connections: RegKey,
}

impl RegistryStore {
    pub fn open() -> Result<Self> {
        let hkcu = RegKey::predef(enums::HKEY_CURRENT_USER);
        let settings = hkcu
            .open_subkey_with_flags(SUB_KEY, enums::KEY_READ | enums::KEY_WRITE)
            .map_err(|e| Error::store(SUB_KEY, e))?;
        let connections = settings
            .open_subkey_with_flags(CONNECTIONS, enums::KEY_READ | enums::KEY_WRITE)
            .map_err(|e| Error::store(&connections_key(), e))?;
        log::debug!("opened registry keys {SUB_KEY} and its {CONNECTIONS} subkey");
        Ok(Self {
            settings,
            connections,
        })
    }
}

impl ConfigStore for RegistryStore {
    fn read_text(&self, name: &str) -> Result<String> {
        self.settings
            .get_value::<String, _>(name)
            .map_err(|e| Error::store(name, e))
    }

    fn write_text(&mut self, name: &str, value: &str) -> Result<()> {
        self.settings
            .set_value(name, &value)
            .map_err(|e| Error::store(name, e))
    }

    fn read_binary(&self, name: &str) -> Result<Vec<u8>> {
        let value = self
            .connections
            .get_raw_value(name)
            .map_err(|e| Error::store(name, e))?;
        if !matches!(value.vtype, enums::REG_BINARY) {
            return Err(Error::store(
                name,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected REG_BINARY, found {:?}", value.vtype),
                ),
            ));
        }
        Ok(value.bytes.to_vec())
    }

    fn write_binary(&mut self, name: &str, value: &[u8]) -> Result<()> {
        let value = RegValue {
            bytes: value.to_vec().into(),
            vtype: enums::REG_BINARY,
        };
        self.connections
            .set_raw_value(name, &value)
            .map_err(|e| Error::store(name, e))
    }

    #[inline]
    fn refresh(&self) -> Result<()> {
        unsafe {
            // propagating changes
            InternetSetOptionW(None, INTERNET_OPTION_SETTINGS_CHANGED, None, 0)?;
            // refreshing
            InternetSetOptionW(None, INTERNET_OPTION_REFRESH, None, 0)?;
        }
        log::debug!("notified WinInet of changed settings");
        Ok(())
    }
}
