//! In-memory view of one binary connection settings record.
//!
//! The record layout is undocumented. Only the fields below are interpreted;
//! everything after the embedded url is an opaque trailer kept byte for byte.
//!
//! ```text
//! Padded:  0..8 header | 8..12 flags (u32) | 12..16 ? | 16..20 pad len p | pad | len (u32) | url | trailer
//! Fixed:   0..8 header | 8 flags (u8) | 9..12 ? | 12..16 len (u32) | url | trailer
//! ```
//!
//! All lengths are little-endian u32.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const FLAGS_OFFSET: usize = 8;
const INT32: usize = size_of::<u32>();

bitflags! {
    /// Connection capability bits stored in the flag field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConnectionFlags: u32 {
        /// Direct connection, always set.
        const DIRECT = 0x01;
        /// "Use a proxy server for your LAN".
        const MANUAL_PROXY = 0x02;
        /// "Use automatic configuration script".
        const AUTO_CONFIG_SCRIPT = 0x04;
        /// "Automatically detect settings".
        const AUTO_DETECT = 0x08;
    }
}

impl ConnectionFlags {
    /// Flags written for a transition: auto detect, plus the config script
    /// bit when a PAC url is being installed.
    pub const fn for_transition(enable: bool) -> Self {
        let base = Self::DIRECT.union(Self::AUTO_DETECT);
        if enable {
            base.union(Self::AUTO_CONFIG_SCRIPT)
        } else {
            base
        }
    }

    pub const fn uses_pac(&self) -> bool {
        self.contains(Self::AUTO_DETECT.union(Self::AUTO_CONFIG_SCRIPT))
    }
}

/// Field arrangement of the binary record deployed on the target host.
///
/// There is no reliable signature telling the two apart, so this is always
/// supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// 4-byte flags; the url length follows a separately length-prefixed
    /// padding field at offset 16.
    Padded,
    /// 1-byte flags; the url length sits at the fixed offset 12.
    Fixed,
}

impl Layout {
    const PADDING_LEN_OFFSET: usize = 16;
    const FIXED_LEN_OFFSET: usize = 12;

    /// Width in bytes of the flag field.
    pub const fn flags_width(self) -> usize {
        match self {
            Layout::Padded => INT32,
            Layout::Fixed => 1,
        }
    }

    /// Smallest record this layout can read flags and url length from.
    pub const fn min_len(self) -> usize {
        match self {
            Layout::Padded => Self::PADDING_LEN_OFFSET + 2 * INT32,
            Layout::Fixed => Self::FIXED_LEN_OFFSET + INT32,
        }
    }

    /// Offset of the url length field inside `bytes`.
    fn length_offset(self, bytes: &[u8]) -> Result<usize> {
        match self {
            Layout::Fixed => Ok(Self::FIXED_LEN_OFFSET),
            Layout::Padded => {
                let padding = read_u32(bytes, Self::PADDING_LEN_OFFSET)? as usize;
                checked_offset(Self::PADDING_LEN_OFFSET + INT32, padding)
            }
        }
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Padded => write!(f, "padded"),
            Layout::Fixed => write!(f, "fixed"),
        }
    }
}

/// `base + len`, with overflow reported as a malformed record.
#[inline]
fn checked_offset(base: usize, len: usize) -> Result<usize> {
    base.checked_add(len)
        .ok_or_else(|| Error::Format(format!("field of {len} bytes at {base} overflows")))
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    let end = checked_offset(offset, INT32)?;
    bytes
        .get(offset..end)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| {
            Error::Format(format!(
                "need {end} bytes to read field at {offset}, record has {}",
                bytes.len()
            ))
        })
}

/// Located fields of a record, checked against its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fields {
    length_offset: usize,
    string_offset: usize,
    string_len: usize,
}

/// Owned binary connection settings record.
///
/// Construction validates that flags, the url length and the url itself all
/// fit inside the buffer, so every accessor afterwards is infallible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettingsBlob {
    bytes: Vec<u8>,
    layout: Layout,
    fields: Fields,
}

impl ConnectionSettingsBlob {
    pub fn new(bytes: Vec<u8>, layout: Layout) -> Result<Self> {
        if bytes.len() < layout.min_len() {
            return Err(Error::Format(format!(
                "record is {} bytes, {layout} layout needs at least {}",
                bytes.len(),
                layout.min_len()
            )));
        }
        let length_offset = layout.length_offset(&bytes)?;
        let string_len = read_u32(&bytes, length_offset)? as usize;
        let string_offset = checked_offset(length_offset, INT32)?;
        if checked_offset(string_offset, string_len)? > bytes.len() {
            return Err(Error::Format(format!(
                "embedded url of {string_len} bytes at {string_offset} overruns record of {} bytes",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            layout,
            fields: Fields {
                length_offset,
                string_offset,
                string_len,
            },
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn flags(&self) -> ConnectionFlags {
        let raw = match self.layout {
            Layout::Fixed => u32::from(self.bytes[FLAGS_OFFSET]),
            Layout::Padded => {
                let mut word = [0u8; INT32];
                word.copy_from_slice(&self.bytes[FLAGS_OFFSET..FLAGS_OFFSET + INT32]);
                u32::from_le_bytes(word)
            }
        };
        ConnectionFlags::from_bits_retain(raw)
    }

    /// Overwrites the flag field in place; never changes the record length.
    pub fn set_flags(&mut self, flags: ConnectionFlags) {
        match self.layout {
            Layout::Fixed => self.bytes[FLAGS_OFFSET] = flags.bits() as u8,
            Layout::Padded => self.bytes[FLAGS_OFFSET..FLAGS_OFFSET + INT32]
                .copy_from_slice(&flags.bits().to_le_bytes()),
        }
    }

    pub fn string_offset(&self) -> usize {
        self.fields.string_offset
    }

    pub fn embedded_len(&self) -> usize {
        self.fields.string_len
    }

    pub fn embedded_bytes(&self) -> &[u8] {
        let start = self.fields.string_offset;
        &self.bytes[start..start + self.fields.string_len]
    }

    /// Embedded url, lossily decoded.
    pub fn embedded_url(&self) -> String {
        String::from_utf8_lossy(self.embedded_bytes()).into_owned()
    }

    pub fn trailer(&self) -> &[u8] {
        &self.bytes[self.fields.string_offset + self.fields.string_len..]
    }

    /// Replaces the embedded url and rewrites its length prefix. The trailer
    /// shifts by the length difference but keeps its content.
    pub fn set_embedded(&mut self, value: &[u8]) -> Result<()> {
        let new_len = u32::try_from(value.len())
            .map_err(|_| Error::Format(format!("url of {} bytes is too long", value.len())))?;
        let Fields {
            length_offset,
            string_offset,
            string_len,
        } = self.fields;

        self.bytes
            .splice(string_offset..string_offset + string_len, value.iter().copied());
        self.bytes[length_offset..length_offset + INT32].copy_from_slice(&new_len.to_le_bytes());
        self.fields.string_len = value.len();
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_record(url: &[u8], trailer: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x46, 0, 0, 0, 0x02, 0, 0, 0, 0x09, 0, 0, 0];
        bytes.extend_from_slice(&(url.len() as u32).to_le_bytes());
        bytes.extend_from_slice(url);
        bytes.extend_from_slice(trailer);
        bytes
    }

    fn padded_record(padding: &[u8], url: &[u8], trailer: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x46, 0, 0, 0, 0x02, 0, 0, 0, 0x01, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&(padding.len() as u32).to_le_bytes());
        bytes.extend_from_slice(padding);
        bytes.extend_from_slice(&(url.len() as u32).to_le_bytes());
        bytes.extend_from_slice(url);
        bytes.extend_from_slice(trailer);
        bytes
    }

    #[test]
    fn fixed_fields_are_located() {
        let blob = ConnectionSettingsBlob::new(fixed_record(b"abc", &[0xAA]), Layout::Fixed).unwrap();
        assert_eq!(blob.string_offset(), 16);
        assert_eq!(blob.embedded_len(), 3);
        assert_eq!(blob.embedded_url(), "abc");
        assert_eq!(blob.trailer(), &[0xAA]);
        assert_eq!(blob.flags(), ConnectionFlags::DIRECT | ConnectionFlags::AUTO_DETECT);
    }

    #[test]
    fn padded_fields_skip_padding() {
        let bytes = padded_record(b"proxy:80", b"http://a/b.pac", &[1, 2, 3]);
        let blob = ConnectionSettingsBlob::new(bytes, Layout::Padded).unwrap();
        assert_eq!(blob.string_offset(), 16 + 4 + 8 + 4);
        assert_eq!(blob.embedded_url(), "http://a/b.pac");
        assert_eq!(blob.trailer(), &[1, 2, 3]);
        assert_eq!(blob.flags(), ConnectionFlags::DIRECT);
    }

    #[test]
    fn too_short_record_is_rejected() {
        let err = ConnectionSettingsBlob::new(vec![0; 15], Layout::Fixed).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        let err = ConnectionSettingsBlob::new(vec![0; 23], Layout::Padded).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn padding_past_end_is_rejected() {
        let mut bytes = padded_record(b"", b"", &[]);
        bytes[16] = 0x40;
        let err = ConnectionSettingsBlob::new(bytes, Layout::Padded).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn huge_padding_length_is_rejected() {
        let mut bytes = padded_record(b"", b"", &[0xAA; 8]);
        bytes[16..20].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        let err = ConnectionSettingsBlob::new(bytes, Layout::Padded).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn huge_url_length_is_rejected() {
        let mut bytes = fixed_record(b"", &[0xAA; 8]);
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = ConnectionSettingsBlob::new(bytes, Layout::Fixed).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn checked_offset_reports_overflow() {
        assert_eq!(checked_offset(20, 4).unwrap(), 24);
        assert!(matches!(checked_offset(usize::MAX - 3, 4), Err(Error::Format(_))));
    }

    #[test]
    fn overrunning_url_length_is_rejected() {
        let mut bytes = fixed_record(b"abc", &[]);
        bytes[12] = 4;
        let err = ConnectionSettingsBlob::new(bytes, Layout::Fixed).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn fixed_flags_touch_one_byte() {
        let mut bytes = fixed_record(b"", &[]);
        bytes[9] = 0x77;
        let mut blob = ConnectionSettingsBlob::new(bytes, Layout::Fixed).unwrap();
        blob.set_flags(ConnectionFlags::for_transition(true));
        assert_eq!(blob.as_bytes()[8], 0x0D);
        assert_eq!(blob.as_bytes()[9], 0x77);
    }

    #[test]
    fn padded_flags_write_full_word() {
        let mut bytes = padded_record(b"", b"", &[]);
        bytes[9] = 0x77;
        let mut blob = ConnectionSettingsBlob::new(bytes, Layout::Padded).unwrap();
        blob.set_flags(ConnectionFlags::for_transition(false));
        assert_eq!(&blob.as_bytes()[8..12], &[0x09, 0, 0, 0]);
    }

    #[test]
    fn set_embedded_shifts_trailer() {
        let mut blob =
            ConnectionSettingsBlob::new(fixed_record(b"ab", &[0xAA, 0xBB]), Layout::Fixed).unwrap();
        blob.set_embedded(b"abcdef").unwrap();
        assert_eq!(blob.embedded_len(), 6);
        assert_eq!(&blob.as_bytes()[12..16], &[6, 0, 0, 0]);
        assert_eq!(blob.trailer(), &[0xAA, 0xBB]);
        assert_eq!(blob.as_bytes().len(), 16 + 6 + 2);
    }

    #[test]
    fn uses_pac_needs_both_bits() {
        assert!(ConnectionFlags::for_transition(true).uses_pac());
        assert!(!ConnectionFlags::for_transition(false).uses_pac());
        assert!(!(ConnectionFlags::DIRECT | ConnectionFlags::AUTO_CONFIG_SCRIPT).uses_pac());
    }
}
