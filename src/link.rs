//! Acknowledgement gate and single-writer send path.
//!
//! The protocol carries no per-frame sequence numbers, so pipelining
//! unacknowledged sends is unsafe. Two primitives enforce the discipline:
//!
//! - a send token ([`tokio::sync::Mutex`]) held from before the write until
//!   the ACK arrives or the wait times out — at most one unacknowledged frame
//!   outstanding at any instant;
//! - the [`AckGate`], a single oneshot slot the listener fires on the 1-byte
//!   ACK sentinel. Arming the gate before writing clears any stale state.
//!
//! A separate, short-lived writer lock serializes raw byte writes so the
//! listener can acknowledge device frames without queueing behind a command
//! that is still waiting for its own ACK.
//!
//! Known protocol-level race: an ACK delayed past its timeout may arrive when
//! no waiter is armed, or be attributed to a later send. Without a wire-format
//! change this cannot be fixed client-side; stray ACKs are counted and logged
//! instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

use crate::error::{NclinkError, Result};
use crate::protocol::ACK;

/// Single shared acknowledgement signal.
#[derive(Debug, Default)]
pub(crate) struct AckGate {
    slot: StdMutex<Option<oneshot::Sender<()>>>,
    stray_acks: AtomicU64,
}

impl AckGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Clear the gate and arm a fresh waiter.
    ///
    /// Any previously armed waiter is invalidated; callers serialize arming
    /// through the send token, so that only happens on a timed-out send.
    pub(crate) fn arm(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(tx);
        rx
    }

    /// Set the gate. Returns false when no waiter was armed (stray ACK).
    pub(crate) fn signal(&self) -> bool {
        let armed = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        match armed {
            Some(tx) => tx.send(()).is_ok(),
            None => {
                self.stray_acks.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// ACKs observed with no armed waiter since the session started.
    pub(crate) fn stray_acks(&self) -> u64 {
        self.stray_acks.load(Ordering::Relaxed)
    }
}

/// Owns the write half and drives the send/ACK protocol.
pub(crate) struct FrameSender<W> {
    writer: Mutex<W>,
    send_token: Mutex<()>,
    gate: AckGate,
    ack_timeout: Duration,
}

impl<W: AsyncWrite + Unpin> FrameSender<W> {
    pub(crate) fn new(writer: W, ack_timeout: Duration) -> Self {
        Self {
            writer: Mutex::new(writer),
            send_token: Mutex::new(()),
            gate: AckGate::new(),
            ack_timeout,
        }
    }

    pub(crate) fn gate(&self) -> &AckGate {
        &self.gate
    }

    /// Write one frame and block until it is acknowledged or the window
    /// elapses.
    ///
    /// The send token is held across the wait, so a second unacknowledged
    /// frame can never be in flight.
    pub(crate) async fn send_and_wait(&self, frame: &[u8]) -> Result<()> {
        let _token = self.send_token.lock().await;
        let ack = self.gate.arm();

        {
            let mut writer = self.writer.lock().await;
            writer.write_all(frame).await?;
            writer.flush().await?;
        }

        match timeout(self.ack_timeout, ack).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(NclinkError::ConnectionClosed),
            Err(_) => Err(NclinkError::AckTimeout),
        }
    }

    /// Write the bare ACK sentinel acknowledging a received device frame.
    ///
    /// Goes through the writer lock only; it neither takes the send token nor
    /// touches the gate.
    pub(crate) async fn send_raw_ack(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&[ACK]).await?;
        writer.flush().await?;
        Ok(())
    }
}
