//! Protocol module - wire format, framing, and stream reassembly.
//!
//! - Frame builders and BCC checksums for the four client-built formats
//! - [`Frame`] with full checksum/length validation on decode
//! - [`FrameBuffer`] for extracting complete frames from partial reads

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::Frame;
pub use frame_buffer::{frame_length, Boundary, FrameBuffer, Inbound};
pub use wire_format::{
    bcc, build_action, build_multi, build_segment, build_setup, Command, FrameFormat, ACK,
    ACTION_FRAME_LEN, DEFAULT_MAX_PAYLOAD_SIZE, END, MULTI_HEADER_LEN, MULTI_OVERHEAD,
    SEGMENT_HEADER_LEN, SEGMENT_SIZE, SETUP_OVERHEAD, STATION, SYNC,
};
