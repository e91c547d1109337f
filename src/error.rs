//! Error types for nclink.

use thiserror::Error;

/// Main error type for all nclink operations.
#[derive(Debug, Error)]
pub enum NclinkError {
    /// I/O error on the socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame (bad sync, checksum mismatch, inconsistent length).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Record codec failure on a response payload.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No ACK arrived within the acknowledgement window.
    #[error("timed out waiting for ACK")]
    AckTimeout,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Payload exceeds the maximum length its frame format can carry.
    #[error("payload of {len} bytes exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Result type alias using NclinkError.
pub type Result<T> = std::result::Result<T, NclinkError>;

impl NclinkError {
    /// Whether this error ends the session, as opposed to a single operation.
    ///
    /// A lone command timeout is non-fatal and the caller may retry; I/O
    /// failures and connection loss are surfaced as session end.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, NclinkError::Io(_) | NclinkError::ConnectionClosed)
    }
}

/// Why an inbound frame was rejected.
///
/// A frame failing any of these checks is discarded whole; it is never
/// partially processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer bytes than the smallest valid frame.
    #[error("frame too short: {len} bytes")]
    TooShort { len: usize },

    /// Leading byte is not the sync byte.
    #[error("bad sync byte 0x{found:02X}")]
    BadSync { found: u8 },

    /// Format byte is outside the enumerated table.
    #[error("unknown format byte 0x{found:02X}")]
    UnknownFormat { found: u8 },

    /// Command opcode is outside the enumerated table.
    #[error("unknown command opcode 0x{found:02X}")]
    UnknownCommand { found: u8 },

    /// Declared length field disagrees with the actual frame length.
    #[error("declared length {declared} inconsistent with frame of {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    /// END marker missing where the layout requires it.
    #[error("missing END byte, found 0x{found:02X}")]
    MissingEnd { found: u8 },

    /// Header checksum (BCC1) mismatch.
    #[error("BCC1 mismatch: computed 0x{computed:02X}, frame carries 0x{found:02X}")]
    Bcc1Mismatch { computed: u8, found: u8 },

    /// Frame checksum (BCC2) mismatch.
    #[error("BCC2 mismatch: computed 0x{computed:02X}, frame carries 0x{found:02X}")]
    Bcc2Mismatch { computed: u8, found: u8 },
}

/// Structured failure from a record codec.
///
/// Decoding never reads past the provided buffer: every fixed-width field is
/// length-checked first and a shortfall surfaces here instead of panicking.
/// A decode failure affects only the record in question, never the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not enough bytes left for the named field.
    #[error("truncated payload at {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A text field is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidText { field: &'static str },
}
