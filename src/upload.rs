//! Segmented bulk upload.
//!
//! Large files (firmware, currency templates) go to the device as a sequence
//! of MultiPurpose frames, each carrying an 8-byte segment header (segment id
//! and total count, both u32 little-endian) ahead of the chunk. Segments are
//! sent strictly in order and each one must be acknowledged before the next
//! is read from disk; the first failure aborts the transfer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info};

use crate::error::Result;
use crate::link::FrameSender;
use crate::protocol::{build_segment, Command};

/// Outcome of a completed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReport {
    pub total_segments: u32,
    pub segments_sent: u32,
    pub bytes_sent: u64,
}

/// Stream `total_len` bytes from `source` as acknowledged segments.
///
/// `total_len` must match what `source` yields; a short read surfaces as an
/// I/O error from `read_exact`.
pub(crate) async fn run<R, W>(
    sender: &FrameSender<W>,
    command: Command,
    source: &mut R,
    total_len: u64,
    segment_size: usize,
) -> Result<UploadReport>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let total_segments = total_len.div_ceil(segment_size as u64) as u32;
    info!(?command, total_len, total_segments, "starting upload");

    let mut chunk = vec![0u8; segment_size];
    let mut remaining = total_len;
    let mut bytes_sent = 0u64;

    for segment_id in 0..total_segments {
        let take = remaining.min(segment_size as u64) as usize;
        source.read_exact(&mut chunk[..take]).await?;

        let frame = build_segment(command, segment_id, total_segments, &chunk[..take])?;
        sender.send_and_wait(&frame).await?;

        remaining -= take as u64;
        bytes_sent += take as u64;
        debug!(segment_id, total_segments, bytes_sent, "segment acknowledged");
    }

    info!(?command, bytes_sent, "upload complete");
    Ok(UploadReport {
        total_segments,
        segments_sent: total_segments,
        bytes_sent,
    })
}
