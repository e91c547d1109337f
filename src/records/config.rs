//! Device configuration record.
//!
//! The only record this client both encodes and decodes. The layout is
//! positional, not self-describing: numeric fields are 4-byte big-endian,
//! strings are u16-big-endian-length-prefixed UTF-8 with no terminator, and
//! the field order below must match the device exactly.

use serde::{Deserialize, Serialize};

use super::cursor::{put_string, Cursor};
use crate::error::DecodeError;

/// The device's persisted configuration.
///
/// A plain value: populated either by decoding a ConfigRead response or by
/// caller assignment before a ConfigWrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigData {
    pub max_notes: u32,
    pub ftp_username: String,
    pub ftp_password: String,
    pub ftp_server: String,
    pub enable_ftp: bool,
    pub ext_address: String,
    pub ext_netmask: String,
    pub folder: String,
    pub folder2: String,
    pub upd_folder: String,
    pub tid: u32,
    pub ccm_status_check_period: u32,
    pub ext_mac: String,
}

impl ConfigData {
    /// Decode the configuration from a ConfigRead response payload.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(payload);
        Ok(ConfigData {
            max_notes: cur.u32_be("max_notes")?,
            ftp_username: cur.string("ftp_username")?,
            ftp_password: cur.string("ftp_password")?,
            ftp_server: cur.string("ftp_server")?,
            enable_ftp: cur.flag("enable_ftp")?,
            ext_address: cur.string("ext_address")?,
            ext_netmask: cur.string("ext_netmask")?,
            folder: cur.string("folder")?,
            folder2: cur.string("folder2")?,
            upd_folder: cur.string("upd_folder")?,
            tid: cur.u32_be("tid")?,
            ccm_status_check_period: cur.u32_be("ccm_status_check_period")?,
            ext_mac: cur.string("ext_mac")?,
        })
    }

    /// Encode the configuration for a ConfigWrite payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.max_notes.to_be_bytes());
        put_string(&mut buf, &self.ftp_username);
        put_string(&mut buf, &self.ftp_password);
        put_string(&mut buf, &self.ftp_server);
        buf.push(self.enable_ftp as u8);
        put_string(&mut buf, &self.ext_address);
        put_string(&mut buf, &self.ext_netmask);
        put_string(&mut buf, &self.folder);
        put_string(&mut buf, &self.folder2);
        put_string(&mut buf, &self.upd_folder);
        buf.extend_from_slice(&self.tid.to_be_bytes());
        buf.extend_from_slice(&self.ccm_status_check_period.to_be_bytes());
        put_string(&mut buf, &self.ext_mac);
        buf
    }
}
