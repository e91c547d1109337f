//! Stream reassembler for accumulating partial reads.
//!
//! TCP delivers an unstructured byte stream: one `read` may contain a frame
//! fragment, several concatenated frames, or both. [`FrameBuffer`] owns the
//! unconsumed bytes in a `bytes::BytesMut`, appends each read, and extracts
//! every complete frame it can delimit. Repeated pushes with a growing buffer
//! are idempotent until enough bytes arrive.
//!
//! Bytes are never discarded before a complete, validated frame boundary is
//! identified. On a malformed prefix (sync mismatch, unknown format byte)
//! extraction stalls and the buffer is retained; the owning listener drops it
//! only at end-of-stream via [`FrameBuffer::clear`].

use bytes::BytesMut;

use super::frame::Frame;
use super::wire_format::{
    FrameFormat, ACK, ACTION_FRAME_LEN, DEFAULT_MAX_PAYLOAD_SIZE, MULTI_HEADER_LEN,
    MULTI_OVERHEAD, SETUP_OVERHEAD, SYNC,
};
use crate::error::FrameError;

/// One unit extracted from the stream.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// The 1-byte acknowledgement sentinel.
    Ack,
    /// A complete frame that passed every checksum.
    Frame(Frame),
    /// A complete region whose validation failed; the bytes were consumed and
    /// the connection continues.
    Invalid(FrameError),
}

/// Boundary decision for the bytes available at the current offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// A complete frame of exactly this many bytes is (or will be) present.
    Complete(usize),
    /// More bytes are required before the length can be determined.
    NeedMore,
    /// The prefix cannot start a frame; recovery policy belongs to the caller.
    Malformed,
}

/// Decide the length of the frame starting at the front of `buf`.
///
/// A single available byte equal to the ACK sentinel is a complete 1-byte
/// frame. Otherwise at least 5 bytes are required, the leading byte must be
/// the sync byte, and the format byte at offset 3 selects the length rule.
/// The decision is resumable: called again with more bytes and the same
/// offset it either repeats or refines its answer, never contradicts it.
pub fn frame_length(buf: &[u8]) -> Boundary {
    if buf.len() == 1 && buf[0] == ACK {
        return Boundary::Complete(1);
    }
    if buf.len() < 5 {
        return Boundary::NeedMore;
    }
    if buf[0] != SYNC {
        return Boundary::Malformed;
    }

    match FrameFormat::from_wire(buf[3]) {
        Some(FrameFormat::Action) => Boundary::Complete(ACTION_FRAME_LEN),

        Some(FrameFormat::Setup) => {
            if buf.len() < 6 {
                Boundary::NeedMore
            } else {
                Boundary::Complete(SETUP_OVERHEAD + buf[4] as usize)
            }
        }

        Some(FrameFormat::MultiPurpose) | Some(FrameFormat::Response) => {
            if buf.len() < MULTI_HEADER_LEN {
                Boundary::NeedMore
            } else {
                let declared =
                    u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
                Boundary::Complete(MULTI_HEADER_LEN + declared + MULTI_OVERHEAD)
            }
        }

        // Machine frames are device-side; their length rule is not part of
        // this client's detector.
        Some(FrameFormat::Machine) | None => Boundary::Malformed,
    }
}

/// Buffer accumulating inbound bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Unconsumed received bytes, append-only from the network.
    buffer: BytesMut,
    /// Cap on the declared payload length of a single frame.
    max_payload_size: usize,
    /// Set when a malformed prefix was seen; extraction stops until `clear`.
    stalled: bool,
}

impl FrameBuffer {
    /// Create a buffer with the default payload cap.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a buffer with a custom payload cap.
    pub fn with_max_payload(max_payload_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_payload_size,
            stalled: false,
        }
    }

    /// Append received bytes and extract every complete frame.
    ///
    /// Regions that delimit correctly but fail validation come back as
    /// [`Inbound::Invalid`]; a trailing partial frame stays buffered for the
    /// next push.
    pub fn push(&mut self, data: &[u8]) -> Vec<Inbound> {
        self.buffer.extend_from_slice(data);

        let mut items = Vec::new();
        while let Some(item) = self.try_extract_one() {
            items.push(item);
        }
        items
    }

    fn try_extract_one(&mut self) -> Option<Inbound> {
        if self.stalled {
            return None;
        }

        let total = match frame_length(&self.buffer) {
            Boundary::NeedMore => return None,
            Boundary::Malformed => {
                tracing::warn!(
                    buffered = self.buffer.len(),
                    first = format_args!("0x{:02X}", self.buffer[0]),
                    "malformed frame prefix, holding buffer until end of stream"
                );
                self.stalled = true;
                return None;
            }
            Boundary::Complete(total) => total,
        };

        // Oversized declared lengths stall rather than allocate.
        if total > MULTI_HEADER_LEN + self.max_payload_size + MULTI_OVERHEAD {
            tracing::warn!(total, max = self.max_payload_size, "frame exceeds payload cap");
            self.stalled = true;
            return None;
        }

        if self.buffer.len() < total {
            return None;
        }

        let region = self.buffer.split_to(total);
        if region.len() == 1 && region[0] == ACK {
            return Some(Inbound::Ack);
        }
        match Frame::decode(&region) {
            Ok(frame) => Some(Inbound::Frame(frame)),
            Err(err) => Some(Inbound::Invalid(err)),
        }
    }

    /// Number of unconsumed buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds no unconsumed bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes and reset the stall flag.
    ///
    /// Called at end-of-stream, the only point where this client discards
    /// unconsumed bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.stalled = false;
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::{build_action, build_multi, build_setup, Command};

    fn single_frame(items: &[Inbound]) -> &Frame {
        assert_eq!(items.len(), 1);
        match &items[0] {
            Inbound::Frame(f) => f,
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn lone_ack_byte_is_complete() {
        assert_eq!(frame_length(&[ACK]), Boundary::Complete(1));

        let mut buffer = FrameBuffer::new();
        let items = buffer.push(&[ACK]);
        assert!(matches!(items[..], [Inbound::Ack]));
        assert!(buffer.is_empty());
    }

    #[test]
    fn detector_needs_five_bytes() {
        assert_eq!(frame_length(&[SYNC, 0x31]), Boundary::NeedMore);
        assert_eq!(frame_length(&[SYNC, 0x31, 0x9A, 0x02]), Boundary::NeedMore);
    }

    #[test]
    fn detector_action_fixed_length() {
        let frame = build_action(Command::Heartbeat);
        assert_eq!(frame_length(&frame[..5]), Boundary::Complete(6));
        assert_eq!(frame_length(&frame), Boundary::Complete(6));
    }

    #[test]
    fn detector_setup_waits_for_length_byte() {
        let frame = build_setup(Command::AuditMode, &[0x01]).unwrap();
        assert_eq!(frame_length(&frame[..5]), Boundary::NeedMore);
        assert_eq!(frame_length(&frame[..6]), Boundary::Complete(8));
    }

    #[test]
    fn detector_multi_waits_for_length_field() {
        let frame = build_multi(Command::ConfigWrite, b"abc").unwrap();
        assert_eq!(frame_length(&frame[..7]), Boundary::NeedMore);
        assert_eq!(frame_length(&frame[..8]), Boundary::Complete(frame.len()));
    }

    #[test]
    fn detector_bad_sync_is_malformed() {
        assert_eq!(frame_length(&[0x55, 0, 0, 0, 0]), Boundary::Malformed);
    }

    #[test]
    fn detector_unknown_format_is_malformed() {
        assert_eq!(frame_length(&[SYNC, 0x31, 0x9A, 0x07, 0x00]), Boundary::Malformed);
    }

    #[test]
    fn two_concatenated_frames_extract_individually() {
        let first = build_action(Command::AskStatus);
        let second = build_setup(Command::AuditMode, &[0x01]).unwrap();
        let mut combined = first.clone();
        combined.extend_from_slice(&second);

        // The detector reports the first frame's exact length, not the
        // combined length.
        assert_eq!(frame_length(&combined), Boundary::Complete(first.len()));

        let mut buffer = FrameBuffer::new();
        let items = buffer.push(&combined);
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Inbound::Frame(f) if f.command == Command::AskStatus));
        assert!(matches!(&items[1], Inbound::Frame(f) if f.command == Command::AuditMode));
        assert!(buffer.is_empty());
    }

    #[test]
    fn split_at_every_boundary_recovers_both_frames() {
        let first = build_multi(Command::ConfigWrite, b"first-payload").unwrap();
        let second = build_action(Command::ClearKey);
        let mut combined = first.clone();
        combined.extend_from_slice(&second);

        for split in 0..=combined.len() {
            let mut buffer = FrameBuffer::new();
            let mut items = buffer.push(&combined[..split]);
            items.extend(buffer.push(&combined[split..]));

            assert_eq!(items.len(), 2, "split at {}", split);
            let f0 = match &items[0] {
                Inbound::Frame(f) => f,
                other => panic!("split {}: {:?}", split, other),
            };
            assert_eq!(f0.command, Command::ConfigWrite);
            assert_eq!(f0.payload(), b"first-payload");
            assert!(matches!(&items[1], Inbound::Frame(f) if f.command == Command::ClearKey));
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn byte_at_a_time_delivery() {
        let frame = build_setup(Command::SelectCurrency, &[0x00]).unwrap();
        let mut buffer = FrameBuffer::new();
        let mut items = Vec::new();
        for byte in &frame {
            items.extend(buffer.push(&[*byte]));
        }
        let f = single_frame(&items);
        assert_eq!(f.command, Command::SelectCurrency);
        assert_eq!(f.payload(), &[0x00]);
    }

    #[test]
    fn repeated_push_with_no_new_data_is_idempotent() {
        let frame = build_multi(Command::ConfigWrite, b"abc").unwrap();
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(&frame[..9]).is_empty());
        assert!(buffer.push(&[]).is_empty());
        assert!(buffer.push(&[]).is_empty());
        let items = buffer.push(&frame[9..]);
        assert_eq!(single_frame(&items).payload(), b"abc");
    }

    #[test]
    fn corrupted_frame_reported_and_consumed() {
        let mut corrupt = build_action(Command::StartKey);
        corrupt[2] = Command::ClearKey.as_wire(); // BCC2 now stale
        let good = build_action(Command::AskStatus);

        let mut combined = corrupt;
        combined.extend_from_slice(&good);

        let mut buffer = FrameBuffer::new();
        let items = buffer.push(&combined);
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Inbound::Invalid(FrameError::Bcc2Mismatch { .. })));
        assert!(matches!(&items[1], Inbound::Frame(f) if f.command == Command::AskStatus));
    }

    #[test]
    fn malformed_prefix_stalls_and_retains_buffer() {
        let mut buffer = FrameBuffer::new();
        let items = buffer.push(&[0x55, 0x01, 0x02, 0x03, 0x04]);
        assert!(items.is_empty());
        assert_eq!(buffer.len(), 5);

        // More data does not unstick the buffer; only clear() does.
        assert!(buffer.push(&build_action(Command::Heartbeat)).is_empty());
        buffer.clear();
        assert!(buffer.is_empty());

        let items = buffer.push(&build_action(Command::Heartbeat));
        assert!(matches!(&items[0], Inbound::Frame(f) if f.command == Command::Heartbeat));
    }

    #[test]
    fn oversized_declared_length_stalls() {
        let mut buffer = FrameBuffer::with_max_payload(16);
        let frame = build_multi(Command::ConfigWrite, &[0u8; 64]).unwrap();
        let items = buffer.push(&frame);
        assert!(items.is_empty());
        assert_eq!(buffer.len(), frame.len());
    }
}
