//! Fixed-layout binary codecs for device records.
//!
//! All integers inside record payloads are big-endian (unlike the
//! little-endian frame header fields). Every decoder is built on the
//! length-checked [`Cursor`] so a short payload is a structured
//! [`crate::error::DecodeError`], never an out-of-bounds access.

mod banknote;
mod config;
mod cursor;
mod settings;
mod status;

pub use banknote::{CountReport, CurrencyAmount, NoteRecord};
pub use config::ConfigData;
pub use cursor::Cursor;
pub use settings::{DetectionMode, VariousParameters};
pub use status::{MachineState, MachineStatus, NationVersion};
