//! Detection-mode and machine-parameter query responses.

use serde::{Deserialize, Serialize};

use super::cursor::Cursor;
use crate::error::DecodeError;

/// Response to GetDetectionMode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionMode {
    pub count_level: u8,
    pub sort_on: bool,
    pub face_on: bool,
    pub orientation_on: bool,
    pub emission_on: bool,
    /// 0=off, 1=ATM, 2=fit, 3=unfit, 4=tape.
    pub fit_mode: u8,
    /// 0=off, 1=on, 2=compare, 3=TITO, 4=check.
    pub serial_mode: u8,
}

impl DetectionMode {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(payload);
        Ok(DetectionMode {
            count_level: cur.u8("count_level")?,
            sort_on: cur.flag("sort_on")?,
            face_on: cur.flag("face_on")?,
            orientation_on: cur.flag("orientation_on")?,
            emission_on: cur.flag("emission_on")?,
            fit_mode: cur.u8("fit_mode")?,
            serial_mode: cur.u8("serial_mode")?,
        })
    }
}

/// Response to GetVariousParameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariousParameters {
    /// 0=low, 1=medium, 2=high, 3=ultra.
    pub motor_speed: u8,
    pub at_mode: bool,
    pub sound_on: bool,
    pub add_on: bool,
    pub auto_print_on: bool,
}

impl VariousParameters {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(payload);
        Ok(VariousParameters {
            motor_speed: cur.u8("motor_speed")?,
            at_mode: cur.flag("at_mode")?,
            sound_on: cur.flag("sound_on")?,
            add_on: cur.flag("add_on")?,
            auto_print_on: cur.flag("auto_print_on")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_mode_decodes() {
        let mode = DetectionMode::decode(&[2, 1, 0, 1, 1, 3, 4]).unwrap();
        assert_eq!(mode.count_level, 2);
        assert!(mode.sort_on);
        assert!(!mode.face_on);
        assert_eq!(mode.fit_mode, 3);
        assert_eq!(mode.serial_mode, 4);
    }

    #[test]
    fn detection_mode_short_payload_fails() {
        assert!(matches!(
            DetectionMode::decode(&[0; 6]),
            Err(DecodeError::Truncated { field: "serial_mode", .. })
        ));
    }

    #[test]
    fn various_parameters_decode() {
        let params = VariousParameters::decode(&[1, 1, 0, 1, 0]).unwrap();
        assert_eq!(params.motor_speed, 1);
        assert!(params.at_mode);
        assert!(!params.sound_on);
        assert!(params.add_on);
        assert!(!params.auto_print_on);
    }

    #[test]
    fn various_parameters_short_payload_fails() {
        assert!(matches!(
            VariousParameters::decode(&[0; 4]),
            Err(DecodeError::Truncated { field: "auto_print_on", .. })
        ));
    }
}
