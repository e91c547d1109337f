//! Machine status report.
//!
//! Decode-only view of the fixed-width status layout the device sends in
//! response to AskStatus. Text fields are UTF-8 with trailing NUL padding.

use serde::{Deserialize, Serialize};

use super::cursor::Cursor;
use crate::error::DecodeError;

/// Overall machine state byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    Ok,
    Warning,
    Error,
    Unknown(u8),
}

impl MachineState {
    fn from_wire(byte: u8) -> Self {
        match byte {
            0 => MachineState::Ok,
            1 => MachineState::Warning,
            2 => MachineState::Error,
            other => MachineState::Unknown(other),
        }
    }
}

/// Firmware version for one nation template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationVersion {
    pub nation: String,
    pub version: String,
}

/// Decoded machine status record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub serial_number: String,
    pub time: String,
    pub settings_hash: String,
    pub tid: u32,
    pub audit_mode: bool,
    pub state: MachineState,
    pub status_code: u32,
    pub model: String,
    pub dsp_version: String,
    pub fpga_version: String,
    pub gui_version: String,
    pub nation_versions: Vec<NationVersion>,
}

impl MachineStatus {
    /// Decode a status record from an AskStatus response payload.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(payload);

        let serial_number = cur.text("serial_number", 10)?;
        let time = cur.text("time", 20)?;
        let settings_hash = cur.text("settings_hash", 8)?;
        let tid = cur.u32_be("tid")?;
        let audit_mode = cur.flag("audit_mode")?;
        let state = MachineState::from_wire(cur.u8("state")?);
        let status_code = cur.u32_be("status_code")?;
        let model = cur.text("model", 20)?;
        let dsp_version = cur.text("dsp_version", 10)?;
        let fpga_version = cur.text("fpga_version", 10)?;
        let gui_version = cur.text("gui_version", 10)?;

        let nation_count = cur.u8("nation_count")? as usize;
        let mut nation_versions = Vec::with_capacity(nation_count);
        for _ in 0..nation_count {
            nation_versions.push(NationVersion {
                nation: cur.text("nation", 3)?,
                version: cur.text("nation_version", 10)?,
            });
        }

        Ok(MachineStatus {
            serial_number,
            time,
            settings_hash,
            tid,
            audit_mode,
            state,
            status_code,
            model,
            dsp_version,
            fpga_version,
            gui_version,
            nation_versions,
        })
    }
}
