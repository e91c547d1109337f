//! Connection coordinator.
//!
//! [`DeviceClient`] owns one device session: a listener task that reassembles
//! and dispatches inbound frames, a heartbeat task that keeps the link
//! provably alive, and the caller-facing command surface. Every outbound
//! frame goes through the ACK gate in [`crate::link`], so callers observe the
//! device's one-command-at-a-time discipline without doing anything special.
//!
//! Device-initiated traffic (status pushes, counting batches) arrives on the
//! event channel returned from [`DeviceClient::connect`]; the listener
//! acknowledges each valid inbound frame with the raw ACK byte before
//! dispatching it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{DecodeError, FrameError, NclinkError, Result};
use crate::link::FrameSender;
use crate::protocol::{
    build_action, build_multi, build_setup, Command, Frame, FrameBuffer, Inbound,
    DEFAULT_MAX_PAYLOAD_SIZE, SEGMENT_SIZE,
};
use crate::records::{
    ConfigData, CountReport, DetectionMode, MachineStatus, VariousParameters,
};
use crate::upload::{self, UploadReport};

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long to wait for the device to connect.
    pub connect_timeout: Duration,
    /// Acknowledgement window for every sent frame.
    pub ack_timeout: Duration,
    /// Interval between heartbeat frames.
    pub heartbeat_interval: Duration,
    /// Size of the listener's socket read buffer.
    pub read_buffer_size: usize,
    /// Cap on the declared payload length of inbound frames.
    pub max_payload_size: usize,
    /// Chunk size for segmented uploads.
    pub segment_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            read_buffer_size: 64 * 1024,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            segment_size: SEGMENT_SIZE,
        }
    }
}

/// Something the device told us, or a session-level condition.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// Decoded AskStatus response.
    Status(MachineStatus),
    /// Decoded counting-result batch.
    CountReport(CountReport),
    /// Decoded ConfigRead response.
    Config(ConfigData),
    /// Device clock as reported by AskDateTime.
    DateTime(String),
    /// Decoded GetDetectionMode response.
    DetectionMode(DetectionMode),
    /// Decoded GetVariousParameters response.
    VariousParameters(VariousParameters),
    /// Result byte of a settings command (0 is success).
    SetupResult { command: Command, ok: bool },
    /// The device answered a heartbeat with a full response frame.
    HeartbeatEcho,
    /// A delimited region failed frame validation; the session continues.
    InvalidFrame(FrameError),
    /// A valid frame carried a payload its record codec rejected.
    DecodeFailure { command: Command, error: DecodeError },
    /// The heartbeat went unacknowledged; the link is considered dead.
    LinkDead,
    /// The device closed the connection.
    Disconnected,
}

type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle to one device session.
///
/// Cheap to share behind an `Arc` if multiple tasks issue commands; the ACK
/// gate serializes them. Dropping the client stops the heartbeat; the
/// listener ends when the stream does.
pub struct DeviceClient {
    sender: Arc<FrameSender<BoxWriter>>,
    config: LinkConfig,
    shutdown_rx: watch::Receiver<bool>,
    heartbeat: JoinHandle<()>,
}

impl DeviceClient {
    /// Connect over TCP and start the session tasks.
    pub async fn connect(
        host: &str,
        port: u16,
        config: LinkConfig,
    ) -> Result<(Self, mpsc::Receiver<DeviceEvent>)> {
        let stream = crate::transport::connect(host, port, config.connect_timeout).await?;
        info!(host, port, "session established");
        Ok(Self::from_stream(stream, config))
    }

    /// Start a session over an already-established stream.
    pub fn from_stream<S>(stream: S, config: LinkConfig) -> (Self, mpsc::Receiver<DeviceEvent>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let sender: Arc<FrameSender<BoxWriter>> =
            Arc::new(FrameSender::new(Box::new(writer), config.ack_timeout));

        let (events_tx, events_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(read_loop(
            reader,
            sender.clone(),
            events_tx.clone(),
            shutdown_tx.clone(),
            config.clone(),
        ));
        let heartbeat = tokio::spawn(heartbeat_loop(
            sender.clone(),
            events_tx,
            shutdown_tx,
            config.heartbeat_interval,
        ));

        let client = Self {
            sender,
            config,
            shutdown_rx,
            heartbeat,
        };
        (client, events_rx)
    }

    /// Send an Action frame and wait for its ACK.
    pub async fn send_action(&self, command: Command) -> Result<()> {
        self.sender.send_and_wait(&build_action(command)).await
    }

    /// Send a Setup frame and wait for its ACK.
    pub async fn send_setup(&self, command: Command, params: &[u8]) -> Result<()> {
        self.sender
            .send_and_wait(&build_setup(command, params)?)
            .await
    }

    /// Send a MultiPurpose frame and wait for its ACK.
    pub async fn send_multi(&self, command: Command, payload: &[u8]) -> Result<()> {
        self.sender
            .send_and_wait(&build_multi(command, payload)?)
            .await
    }

    /// Ask for a status report; the decoded record arrives as
    /// [`DeviceEvent::Status`].
    pub async fn ask_status(&self) -> Result<()> {
        self.send_action(Command::AskStatus).await
    }

    /// Ask for the stored configuration; arrives as [`DeviceEvent::Config`].
    pub async fn read_config(&self) -> Result<()> {
        self.send_action(Command::ConfigRead).await
    }

    /// Write a full configuration record to the device.
    pub async fn write_config(&self, config: &ConfigData) -> Result<()> {
        self.send_multi(Command::ConfigWrite, &config.encode()).await
    }

    /// Enable counting (start key).
    pub async fn start_key(&self) -> Result<()> {
        self.send_action(Command::StartKey).await
    }

    /// Reset counters (clear key).
    pub async fn clear_key(&self) -> Result<()> {
        self.send_action(Command::ClearKey).await
    }

    /// Ask for the device clock; arrives as [`DeviceEvent::DateTime`].
    pub async fn ask_date_time(&self) -> Result<()> {
        self.send_action(Command::AskDateTime).await
    }

    /// Set the device clock from a preformatted timestamp string.
    pub async fn set_date_time(&self, timestamp: &str) -> Result<()> {
        self.send_multi(Command::SetDateTime, timestamp.as_bytes())
            .await
    }

    /// Switch audit mode on or off.
    pub async fn set_audit_mode(&self, enabled: bool) -> Result<()> {
        self.send_setup(Command::AuditMode, &[enabled as u8]).await
    }

    /// Stream `total_len` bytes from `source` as acknowledged upload
    /// segments under the given command.
    pub async fn upload_segmented<R>(
        &self,
        command: Command,
        source: &mut R,
        total_len: u64,
    ) -> Result<UploadReport>
    where
        R: AsyncRead + Unpin,
    {
        upload::run(
            &self.sender,
            command,
            source,
            total_len,
            self.config.segment_size,
        )
        .await
    }

    /// Upload an application package from disk.
    pub async fn upgrade_apk(&self, path: impl AsRef<Path>) -> Result<UploadReport> {
        self.upload_file(Command::UpgradeApk, path.as_ref()).await
    }

    /// Upload a currency-template archive from disk.
    pub async fn upgrade_sdc(&self, path: impl AsRef<Path>) -> Result<UploadReport> {
        self.upload_file(Command::UpgradeSdc, path.as_ref()).await
    }

    async fn upload_file(&self, command: Command, path: &Path) -> Result<UploadReport> {
        let mut file = tokio::fs::File::open(path).await?;
        let total_len = file.metadata().await?.len();
        info!(?command, path = %path.display(), total_len, "uploading file");
        self.upload_segmented(command, &mut file, total_len).await
    }

    /// ACKs observed with no command waiting for one.
    pub fn stray_acks(&self) -> u64 {
        self.sender.gate().stray_acks()
    }

    /// Session configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Wait until the session ends (peer close or dead link).
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        // An error means the sender side is gone, which is shutdown too.
        let _ = rx.wait_for(|&done| done).await;
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}

/// Listener: reassemble the inbound stream, acknowledge valid frames, and
/// dispatch them.
async fn read_loop<R>(
    mut reader: R,
    sender: Arc<FrameSender<BoxWriter>>,
    events: mpsc::Sender<DeviceEvent>,
    shutdown: watch::Sender<bool>,
    config: LinkConfig,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut buffer = FrameBuffer::with_max_payload(config.max_payload_size);
    let mut chunk = vec![0u8; config.read_buffer_size];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => {
                info!(discarded = buffer.len(), "peer closed the connection");
                buffer.clear();
                let _ = events.send(DeviceEvent::Disconnected).await;
                let _ = shutdown.send(true);
                return;
            }
            Ok(n) => n,
            Err(err) => {
                warn!(%err, "socket read failed");
                buffer.clear();
                let _ = events.send(DeviceEvent::Disconnected).await;
                let _ = shutdown.send(true);
                return;
            }
        };

        for item in buffer.push(&chunk[..n]) {
            match item {
                Inbound::Ack => {
                    if !sender.gate().signal() {
                        warn!("ACK with no command waiting");
                    }
                }
                Inbound::Invalid(err) => {
                    warn!(%err, "discarding invalid frame");
                    let _ = events.send(DeviceEvent::InvalidFrame(err)).await;
                }
                Inbound::Frame(frame) => {
                    // Acknowledge before dispatching; the device blocks on it.
                    if let Err(err) = sender.send_raw_ack().await {
                        warn!(%err, "failed to acknowledge inbound frame");
                        let _ = shutdown.send(true);
                        return;
                    }
                    dispatch_frame(&events, frame).await;
                }
            }
        }
    }
}

/// Heartbeat: prove the link alive on a fixed cadence. An unacknowledged
/// heartbeat is fatal for the session.
async fn heartbeat_loop(
    sender: Arc<FrameSender<BoxWriter>>,
    events: mpsc::Sender<DeviceEvent>,
    shutdown: watch::Sender<bool>,
    interval: Duration,
) {
    let frame = build_action(Command::Heartbeat);
    loop {
        tokio::time::sleep(interval).await;
        match sender.send_and_wait(&frame).await {
            Ok(()) => debug!("heartbeat acknowledged"),
            Err(NclinkError::AckTimeout) => {
                warn!("heartbeat unacknowledged, declaring link dead");
                let _ = events.send(DeviceEvent::LinkDead).await;
                let _ = shutdown.send(true);
                return;
            }
            Err(err) => {
                debug!(%err, "heartbeat send failed, stopping");
                let _ = shutdown.send(true);
                return;
            }
        }
    }
}

/// Route one validated response frame to its record codec.
async fn dispatch_frame(events: &mpsc::Sender<DeviceEvent>, frame: Frame) {
    if !frame.is_response() {
        debug!(format = ?frame.format, command = ?frame.command, "ignoring non-response frame");
        return;
    }

    let command = frame.command;
    let event = match command {
        Command::AskStatus => match MachineStatus::decode(frame.payload()) {
            Ok(status) => DeviceEvent::Status(status),
            Err(error) => DeviceEvent::DecodeFailure { command, error },
        },
        Command::BanknoteData => match CountReport::decode(frame.payload()) {
            Ok(report) => DeviceEvent::CountReport(report),
            Err(error) => DeviceEvent::DecodeFailure { command, error },
        },
        Command::ConfigRead => match ConfigData::decode(frame.payload()) {
            Ok(config) => DeviceEvent::Config(config),
            Err(error) => DeviceEvent::DecodeFailure { command, error },
        },
        Command::AskDateTime => match std::str::from_utf8(frame.payload()) {
            Ok(text) => DeviceEvent::DateTime(text.to_owned()),
            Err(_) => DeviceEvent::DecodeFailure {
                command,
                error: DecodeError::InvalidText { field: "date_time" },
            },
        },
        Command::GetDetectionMode => match DetectionMode::decode(frame.payload()) {
            Ok(mode) => DeviceEvent::DetectionMode(mode),
            Err(error) => DeviceEvent::DecodeFailure { command, error },
        },
        Command::GetVariousParameters => match VariousParameters::decode(frame.payload()) {
            Ok(params) => DeviceEvent::VariousParameters(params),
            Err(error) => DeviceEvent::DecodeFailure { command, error },
        },
        Command::Heartbeat => DeviceEvent::HeartbeatEcho,

        Command::SelectCurrency
        | Command::SetCurrencyMode
        | Command::SetDetectionMode
        | Command::SetVariousParameters
        | Command::SetAtMtMode
        | Command::SetAddMode
        | Command::AuditMode => DeviceEvent::SetupResult {
            command,
            ok: frame.payload().first().map_or(true, |&b| b == 0),
        },

        // These commands are acknowledged with the bare ACK byte; a full
        // response frame for them carries nothing to decode.
        Command::StartKey
        | Command::ClearKey
        | Command::ConfigWrite
        | Command::SetDateTime
        | Command::UpgradeApk
        | Command::UpgradeSdc => {
            debug!(?command, "unexpected response frame with no record codec");
            return;
        }
    };

    let _ = events.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{bcc, FrameFormat, MULTI_HEADER_LEN};
    use bytes::Bytes;

    fn response_frame(command: Command, payload: &[u8]) -> Frame {
        Frame {
            format: FrameFormat::Response,
            command,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    #[tokio::test]
    async fn heartbeat_response_dispatches_echo() {
        let (tx, mut rx) = mpsc::channel(4);
        dispatch_frame(&tx, response_frame(Command::Heartbeat, &[])).await;
        assert!(matches!(rx.recv().await, Some(DeviceEvent::HeartbeatEcho)));
    }

    #[tokio::test]
    async fn setup_result_maps_zero_to_ok() {
        let (tx, mut rx) = mpsc::channel(4);
        dispatch_frame(&tx, response_frame(Command::AuditMode, &[0])).await;
        dispatch_frame(&tx, response_frame(Command::SetDetectionMode, &[1])).await;

        assert!(matches!(
            rx.recv().await,
            Some(DeviceEvent::SetupResult { command: Command::AuditMode, ok: true })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(DeviceEvent::SetupResult { command: Command::SetDetectionMode, ok: false })
        ));
    }

    #[tokio::test]
    async fn truncated_status_payload_reports_decode_failure() {
        let (tx, mut rx) = mpsc::channel(4);
        dispatch_frame(&tx, response_frame(Command::AskStatus, &[0u8; 4])).await;
        assert!(matches!(
            rx.recv().await,
            Some(DeviceEvent::DecodeFailure { command: Command::AskStatus, .. })
        ));
    }

    #[tokio::test]
    async fn non_response_frames_are_not_dispatched() {
        let (tx, mut rx) = mpsc::channel(4);
        dispatch_frame(
            &tx,
            Frame {
                format: FrameFormat::MultiPurpose,
                command: Command::Heartbeat,
                payload: Bytes::new(),
            },
        )
        .await;
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn default_config_values() {
        let config = LinkConfig::default();
        assert_eq!(config.ack_timeout, Duration::from_secs(30));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.segment_size, SEGMENT_SIZE);
    }

    // Exercised further in the integration tests; this covers the helper the
    // device simulations there rely on.
    #[test]
    fn response_builder_shape() {
        let mut frame = build_multi(Command::AskDateTime, b"2026-08-30 12:00:00").unwrap();
        frame[3] = FrameFormat::Response.as_wire();
        frame[MULTI_HEADER_LEN] = bcc(&frame, MULTI_HEADER_LEN);
        let last = frame.len() - 1;
        frame[last] = bcc(&frame, last);
        let decoded = Frame::decode(&frame).unwrap();
        assert!(decoded.is_response());
        assert_eq!(decoded.payload(), b"2026-08-30 12:00:00");
    }
}
