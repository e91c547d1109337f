//! Async client for NC-series banknote-processing devices.
//!
//! Implements the device's binary framing protocol over TCP: dual-checksum
//! frames, a byte-stream reassembler, an ACK-gated command surface with a
//! keepalive heartbeat, segmented bulk upload for firmware and currency
//! templates, and fixed-layout codecs for the records the device exchanges.
//!
//! ```no_run
//! use nclink::{DeviceClient, DeviceEvent, LinkConfig};
//!
//! #[tokio::main]
//! async fn main() -> nclink::Result<()> {
//!     let (client, mut events) =
//!         DeviceClient::connect("192.168.1.100", 9025, LinkConfig::default()).await?;
//!
//!     client.ask_status().await?;
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             DeviceEvent::Status(status) => println!("{:?}", status.state),
//!             DeviceEvent::Disconnected | DeviceEvent::LinkDead => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
mod link;
pub mod protocol;
pub mod records;
pub mod transport;
pub mod upload;

pub use client::{DeviceClient, DeviceEvent, LinkConfig};
pub use error::{DecodeError, FrameError, NclinkError, Result};
pub use protocol::{Command, Frame, FrameFormat};
pub use records::{ConfigData, CountReport, MachineStatus};
pub use upload::UploadReport;
