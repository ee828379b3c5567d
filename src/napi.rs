use napi::bindgen_prelude::*;
use napi_derive::napi;

use crate::{Config, ConfigStore, FileBackupSink, FileEventLog, PacSwitcher, ProxyState};

#[napi(object)]
pub struct JsPacState {
    pub url: String,
    pub enable: bool,
}

impl From<ProxyState> for JsPacState {
    fn from(state: ProxyState) -> Self {
        let enable = state.is_enabled();
        let url = match state {
            ProxyState::Disabled => String::new(),
            ProxyState::EnabledWithUrl(url) => url,
        };
        Self { url, enable }
    }
}

fn switcher() -> crate::Result<PacSwitcher<impl ConfigStore, FileBackupSink, FileEventLog>> {
    let config = Config::load(&Config::default_path())?;
    PacSwitcher::from_config(crate::system_store()?, &config)
}

fn to_js(e: crate::Error) -> Error {
    Error::from_reason(e.to_string())
}

#[napi]
pub fn get_pac_state() -> Result<JsPacState> {
    switcher()
        .and_then(|s| s.state())
        .map(JsPacState::from)
        .map_err(to_js)
}

/// Validates, backs up and installs `url`; resolves to the status message.
#[napi]
pub fn enable_pac(url: String) -> Result<String> {
    let mut s = switcher().map_err(to_js)?;
    s.enable(&url).map_err(to_js)?;
    Ok(s.last_status().to_string())
}

#[napi]
pub fn disable_pac() -> Result<String> {
    let mut s = switcher().map_err(to_js)?;
    s.disable().map_err(to_js)?;
    Ok(s.last_status().to_string())
}

#[napi]
pub fn get_history() -> Result<String> {
    let config = Config::load(&Config::default_path()).map_err(to_js)?;
    FileEventLog::new(&config.history_log)
        .read_all()
        .map_err(|e| Error::from_reason(e.to_string()))
}
