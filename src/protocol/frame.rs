//! Validated inbound frame.
//!
//! [`Frame::decode`] takes the exact byte region the reassembler delimited,
//! re-verifies every applicable checksum and the length-field consistency, and
//! produces a typed frame. An ill-formed region is rejected whole — nothing is
//! ever partially processed.

use bytes::Bytes;

use super::wire_format::{
    bcc, Command, FrameFormat, ACTION_FRAME_LEN, END, MULTI_HEADER_LEN, MULTI_OVERHEAD,
    SETUP_OVERHEAD, SYNC,
};
use crate::error::FrameError;

/// A complete, checksum-validated protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame format tag.
    pub format: FrameFormat,
    /// Device-defined command opcode.
    pub command: Command,
    /// Payload bytes (zero-copy via `bytes::Bytes`; empty for Action frames).
    pub payload: Bytes,
}

impl Frame {
    /// Decode and validate one complete frame.
    ///
    /// `bytes` must span exactly one frame as delimited by the reassembler.
    /// Both checksums are recomputed independently; the declared length field
    /// must agree with the actual region length.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let len = bytes.len();
        if len < ACTION_FRAME_LEN {
            return Err(FrameError::TooShort { len });
        }
        if bytes[0] != SYNC {
            return Err(FrameError::BadSync { found: bytes[0] });
        }

        let format =
            FrameFormat::from_wire(bytes[3]).ok_or(FrameError::UnknownFormat { found: bytes[3] })?;
        let command =
            Command::from_wire(bytes[2]).ok_or(FrameError::UnknownCommand { found: bytes[2] })?;

        // BCC2 is present on every format: everything after SYNC, before the
        // checksum byte itself.
        let computed = bcc(bytes, len - 1);
        let found = bytes[len - 1];
        if computed != found {
            return Err(FrameError::Bcc2Mismatch { computed, found });
        }

        let payload = match format {
            FrameFormat::Action => {
                if len != ACTION_FRAME_LEN {
                    return Err(FrameError::LengthMismatch {
                        declared: ACTION_FRAME_LEN,
                        actual: len,
                    });
                }
                if bytes[4] != END {
                    return Err(FrameError::MissingEnd { found: bytes[4] });
                }
                Bytes::new()
            }

            FrameFormat::Setup => {
                let declared = bytes[4] as usize;
                if len != SETUP_OVERHEAD + declared {
                    return Err(FrameError::LengthMismatch {
                        declared: SETUP_OVERHEAD + declared,
                        actual: len,
                    });
                }
                if bytes[len - 2] != END {
                    return Err(FrameError::MissingEnd {
                        found: bytes[len - 2],
                    });
                }
                Bytes::copy_from_slice(&bytes[5..5 + declared])
            }

            FrameFormat::MultiPurpose | FrameFormat::Response => {
                if len < MULTI_HEADER_LEN + MULTI_OVERHEAD {
                    return Err(FrameError::TooShort { len });
                }
                let declared =
                    u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
                if len != MULTI_HEADER_LEN + declared + MULTI_OVERHEAD {
                    return Err(FrameError::LengthMismatch {
                        declared: MULTI_HEADER_LEN + declared + MULTI_OVERHEAD,
                        actual: len,
                    });
                }

                // BCC1 covers the 7 header bytes after SYNC.
                let computed = bcc(bytes, MULTI_HEADER_LEN);
                let found = bytes[MULTI_HEADER_LEN];
                if computed != found {
                    return Err(FrameError::Bcc1Mismatch { computed, found });
                }
                if bytes[len - 2] != END {
                    return Err(FrameError::MissingEnd {
                        found: bytes[len - 2],
                    });
                }
                Bytes::copy_from_slice(&bytes[MULTI_HEADER_LEN + 1..len - 2])
            }

            // Device-side format: validated for BCC2 only, never dispatched.
            FrameFormat::Machine => {
                if bytes[len - 2] != END {
                    return Err(FrameError::MissingEnd {
                        found: bytes[len - 2],
                    });
                }
                Bytes::new()
            }
        };

        Ok(Frame {
            format,
            command,
            payload,
        })
    }

    /// Payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether this frame is a device response.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.format == FrameFormat::Response
    }
}
