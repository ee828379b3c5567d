//! Enable/disable transition for a binary connection settings record.

use log::debug;

use crate::{
    Error, Result,
    blob::{ConnectionFlags, ConnectionSettingsBlob, Layout},
    utils::hex_dump,
};

/// Produces the record for an enable (inject `url`) or disable (strip the url)
/// transition.
///
/// The flag field becomes auto detect, plus the config script bit when
/// `enable` is set. The embedded url is replaced by the trimmed `url`
/// (always empty when disabling) and its length prefix rewritten. Bytes
/// outside those fields are kept, the trailer only moves.
///
/// Fails with [`Error::Format`] before touching anything when the record is
/// too short or inconsistent for `layout`, or when `url` is not ASCII.
pub fn mutate(layout: Layout, input: &[u8], enable: bool, url: &str) -> Result<Vec<u8>> {
    let url = if enable { url.trim() } else { "" };
    if !url.is_ascii() {
        return Err(Error::Format(format!("embedded url `{url}` is not ASCII")));
    }

    let mut blob = ConnectionSettingsBlob::new(input.to_vec(), layout)?;
    debug!(
        "mutating {layout} record: flags {:#04x} ({} byte field), url {} bytes at {}",
        blob.flags().bits(),
        layout.flags_width(),
        blob.embedded_len(),
        blob.string_offset()
    );

    blob.set_flags(ConnectionFlags::for_transition(enable));
    blob.set_embedded(url.as_bytes())?;

    if log::log_enabled!(log::Level::Trace) {
        log::trace!("mutated record: {:?}", hex_dump(blob.as_bytes()));
    }
    Ok(blob.into_bytes())
}
