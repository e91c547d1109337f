//! Wire format constants, checksums, and frame builders.
//!
//! Every frame starts with the sync byte and ends with one or two BCC
//! (block check character) checksums:
//!
//! ```text
//! Action:       [SYNC STATION CMD 0x02 END BCC2]                            6 bytes
//! Setup:        [SYNC STATION CMD 0x03 LEN_u8][params][END BCC2]            7 + L
//! MultiPurpose: [SYNC STATION CMD 0x04 LEN_u32le][BCC1][payload][END BCC2]  8 + L + 3
//! Response:     same shape as MultiPurpose, format byte 0x00, device → client only
//! ```
//!
//! Header integers are little-endian. Integers inside record payloads are
//! big-endian — see [`crate::records`]; the two domains never mix.
//!
//! BCC2 covers everything after SYNC up to (not including) the checksum byte
//! itself and is present on every format. BCC1 covers the 7 header bytes after
//! SYNC and is present only on MultiPurpose/Response frames.

use crate::error::{NclinkError, Result};

/// Leading sync byte of every frame.
pub const SYNC: u8 = 0x02;
/// Fixed logical device address field.
pub const STATION: u8 = 0x31;
/// End-of-frame marker.
pub const END: u8 = 0x03;
/// Single-byte acknowledgement sentinel.
pub const ACK: u8 = 0x06;

/// Fixed chunk size for segmented uploads (1 MiB).
pub const SEGMENT_SIZE: usize = 1024 * 1024;

/// Total length of an Action frame.
pub const ACTION_FRAME_LEN: usize = 6;
/// Setup frame overhead beyond the params (5-byte header + END + BCC2).
pub const SETUP_OVERHEAD: usize = 7;
/// MultiPurpose/Response header length (SYNC through the 4-byte length field).
pub const MULTI_HEADER_LEN: usize = 8;
/// MultiPurpose/Response bytes beyond header + payload (BCC1 + END + BCC2).
pub const MULTI_OVERHEAD: usize = 3;
/// Byte length of the segment header inside an upload payload.
pub const SEGMENT_HEADER_LEN: usize = 8;

/// Default cap on the declared payload length of inbound frames (4 MiB).
///
/// Large enough for a full upload segment plus its segment header and for any
/// counting-result batch the device produces.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 4 * 1024 * 1024;

/// Frame format tag at byte offset 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameFormat {
    /// Device-originated response; same layout as MultiPurpose.
    Response = 0x00,
    /// Fixed-size control frame, no payload.
    Action = 0x02,
    /// Short parameterized control frame, 1-byte length.
    Setup = 0x03,
    /// Length-prefixed, double-checksummed, segmentable frame.
    MultiPurpose = 0x04,
    /// Device-side format; recognized on the wire, never built or dispatched
    /// by this client.
    Machine = 0x05,
}

impl FrameFormat {
    /// Map a wire byte to a format tag.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(FrameFormat::Response),
            0x02 => Some(FrameFormat::Action),
            0x03 => Some(FrameFormat::Setup),
            0x04 => Some(FrameFormat::MultiPurpose),
            0x05 => Some(FrameFormat::Machine),
            _ => None,
        }
    }

    /// Wire byte for this format.
    #[inline]
    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

/// Device-defined command opcode at byte offset 2.
///
/// The table must match the device firmware exactly. Opcodes shared between a
/// request and its response (e.g. `AskStatus`) appear once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    StartKey = 0x04,
    ClearKey = 0x05,
    SelectCurrency = 0x0A,
    SetCurrencyMode = 0x0E,
    SetDetectionMode = 0x0F,
    SetVariousParameters = 0x13,
    GetVariousParameters = 0x14,
    GetDetectionMode = 0x15,
    SetAtMtMode = 0x16,
    SetAddMode = 0x17,
    ConfigWrite = 0x97,
    UpgradeSdc = 0x98,
    UpgradeApk = 0x99,
    Heartbeat = 0x9A,
    AskStatus = 0x9B,
    ConfigRead = 0x9C,
    AuditMode = 0x9D,
    AskDateTime = 0x9E,
    SetDateTime = 0x9F,
    BanknoteData = 0xAA,
}

impl Command {
    /// Map a wire opcode to a command.
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x04 => Some(Command::StartKey),
            0x05 => Some(Command::ClearKey),
            0x0A => Some(Command::SelectCurrency),
            0x0E => Some(Command::SetCurrencyMode),
            0x0F => Some(Command::SetDetectionMode),
            0x13 => Some(Command::SetVariousParameters),
            0x14 => Some(Command::GetVariousParameters),
            0x15 => Some(Command::GetDetectionMode),
            0x16 => Some(Command::SetAtMtMode),
            0x17 => Some(Command::SetAddMode),
            0x97 => Some(Command::ConfigWrite),
            0x98 => Some(Command::UpgradeSdc),
            0x99 => Some(Command::UpgradeApk),
            0x9A => Some(Command::Heartbeat),
            0x9B => Some(Command::AskStatus),
            0x9C => Some(Command::ConfigRead),
            0x9D => Some(Command::AuditMode),
            0x9E => Some(Command::AskDateTime),
            0x9F => Some(Command::SetDateTime),
            0xAA => Some(Command::BanknoteData),
            _ => None,
        }
    }

    /// Wire opcode for this command.
    #[inline]
    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

/// BCC checksum: `sum(bytes[1..upto]) mod 0x80`.
///
/// The sum always starts after the sync byte; `upto` is the exclusive end of
/// the scope (the index of the checksum byte being computed or verified).
pub fn bcc(bytes: &[u8], upto: usize) -> u8 {
    (bytes[1..upto].iter().map(|&b| b as u64).sum::<u64>() % 0x80) as u8
}

/// Build an Action frame. Fixed 6 bytes, BCC2 only.
pub fn build_action(command: Command) -> Vec<u8> {
    let mut frame = vec![
        SYNC,
        STATION,
        command.as_wire(),
        FrameFormat::Action.as_wire(),
        END,
    ];
    frame.push(bcc(&frame, frame.len()));
    frame
}

/// Build a Setup frame carrying up to 255 parameter bytes.
pub fn build_setup(command: Command, params: &[u8]) -> Result<Vec<u8>> {
    if params.len() > u8::MAX as usize {
        return Err(NclinkError::PayloadTooLarge {
            len: params.len(),
            max: u8::MAX as usize,
        });
    }

    let mut frame = Vec::with_capacity(SETUP_OVERHEAD + params.len());
    frame.extend_from_slice(&[
        SYNC,
        STATION,
        command.as_wire(),
        FrameFormat::Setup.as_wire(),
        params.len() as u8,
    ]);
    frame.extend_from_slice(params);
    frame.push(END);
    frame.push(bcc(&frame, frame.len()));
    Ok(frame)
}

/// Build a MultiPurpose frame with a bare payload (config write, date/time set).
pub fn build_multi(command: Command, payload: &[u8]) -> Result<Vec<u8>> {
    build_multi_inner(command, &[], payload)
}

/// Build a MultiPurpose frame carrying one upload segment.
///
/// The 8-byte little-endian segment header (`segment_id`, `total_segments`)
/// travels inside the payload and is covered by the declared length.
pub fn build_segment(
    command: Command,
    segment_id: u32,
    total_segments: u32,
    chunk: &[u8],
) -> Result<Vec<u8>> {
    let mut header = [0u8; SEGMENT_HEADER_LEN];
    header[..4].copy_from_slice(&segment_id.to_le_bytes());
    header[4..].copy_from_slice(&total_segments.to_le_bytes());
    build_multi_inner(command, &header, chunk)
}

fn build_multi_inner(command: Command, prefix: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let len = prefix.len() + payload.len();
    if len > u32::MAX as usize {
        return Err(NclinkError::PayloadTooLarge {
            len,
            max: u32::MAX as usize,
        });
    }

    let mut frame = Vec::with_capacity(MULTI_HEADER_LEN + len + MULTI_OVERHEAD);
    frame.extend_from_slice(&[
        SYNC,
        STATION,
        command.as_wire(),
        FrameFormat::MultiPurpose.as_wire(),
    ]);
    frame.extend_from_slice(&(len as u32).to_le_bytes());
    frame.push(bcc(&frame, MULTI_HEADER_LEN));
    frame.extend_from_slice(prefix);
    frame.extend_from_slice(payload);
    frame.push(END);
    frame.push(bcc(&frame, frame.len()));
    Ok(frame)
}
