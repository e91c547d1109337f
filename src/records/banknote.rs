//! Counting-result batch with per-note detail records.
//!
//! Decode-only. The batch header is fixed-width, followed by `note_count`
//! records of exactly 60 bytes each (18 trailing bytes reserved). Totals are
//! aggregated per currency over accepted notes.

use serde::{Deserialize, Serialize};

use super::cursor::Cursor;
use crate::error::DecodeError;

/// Byte width of one note record on the wire.
const NOTE_RECORD_LEN: usize = 60;

/// One counted banknote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub currency: String,
    pub nominal: u32,
    pub issue: String,
    pub serial_number: String,
    pub note_error: u32,
    pub rejected: bool,
}

/// Per-currency sum over accepted notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub currency: String,
    pub amount: u64,
}

/// A complete counting-result batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    pub cashier_id: String,
    pub count_speed: String,
    pub count_mode: String,
    pub settings_hash: String,
    pub number_count_file: u64,
    pub guid: String,
    pub machine_serial_number: String,
    pub start_time: String,
    pub end_time: String,
    pub notes: Vec<NoteRecord>,
}

impl CountReport {
    /// Decode a batch from a BanknoteData response payload.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut cur = Cursor::new(payload);

        let cashier_id = cur.text("cashier_id", 20)?;
        let count_speed = cur.text("count_speed", 5)?;
        let count_mode = cur.text("count_mode", 16)?;
        let settings_hash = cur.text("settings_hash", 4)?;
        let number_count_file = cur.u64_be("number_count_file")?;
        let guid = cur.text("guid", 38)?;
        let machine_serial_number = cur.text("machine_serial_number", 10)?;
        let start_time = cur.text("start_time", 20)?;
        let end_time = cur.text("end_time", 20)?;

        let note_count = cur.u32_be("note_count")? as usize;
        let mut notes = Vec::with_capacity(note_count.min(4096));
        for _ in 0..note_count {
            let currency = cur.text("note_currency", 3)?;
            let nominal = cur.u32_be("note_nominal")?;
            let issue = cur.text("note_issue", 10)?;
            let serial_number = cur.text("note_serial", 20)?;
            let note_error = cur.u32_be("note_error")?;
            let rejected = cur.flag("note_rejected")?;
            cur.skip("note_reserved", NOTE_RECORD_LEN - 42)?;
            notes.push(NoteRecord {
                currency,
                nominal,
                issue,
                serial_number,
                note_error,
                rejected,
            });
        }

        Ok(CountReport {
            cashier_id,
            count_speed,
            count_mode,
            settings_hash,
            number_count_file,
            guid,
            machine_serial_number,
            start_time,
            end_time,
            notes,
        })
    }

    /// Total number of notes in the batch, rejected included.
    pub fn total_notes(&self) -> usize {
        self.notes.len()
    }

    /// Number of rejected notes.
    pub fn reject_count(&self) -> usize {
        self.notes.iter().filter(|n| n.rejected).count()
    }

    /// Per-currency amounts over accepted notes with a non-empty currency,
    /// ordered by first appearance.
    pub fn totals(&self) -> Vec<CurrencyAmount> {
        let mut totals: Vec<CurrencyAmount> = Vec::new();
        for note in &self.notes {
            if note.rejected || note.currency.is_empty() {
                continue;
            }
            match totals.iter_mut().find(|t| t.currency == note.currency) {
                Some(entry) => entry.amount += note.nominal as u64,
                None => totals.push(CurrencyAmount {
                    currency: note.currency.clone(),
                    amount: note.nominal as u64,
                }),
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(text: &str, width: usize) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(width, 0);
        bytes
    }

    fn header(note_count: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend(pad("cashier-7", 20));
        p.extend(pad("1000", 5));
        p.extend(pad("MIX", 16));
        p.extend(pad("9f3a", 4));
        p.extend(42u64.to_be_bytes());
        p.extend(pad("9bb3c2de-0000-4e11-8c43-000000000001", 38));
        p.extend(pad("NC0012345", 10));
        p.extend(pad("2026-08-30 11:00:00", 20));
        p.extend(pad("2026-08-30 11:03:12", 20));
        p.extend(note_count.to_be_bytes());
        p
    }

    fn note(currency: &str, nominal: u32, rejected: bool) -> Vec<u8> {
        let mut n = Vec::new();
        n.extend(pad(currency, 3));
        n.extend(nominal.to_be_bytes());
        n.extend(pad("2019", 10));
        n.extend(pad("AB1234567", 20));
        n.extend(0u32.to_be_bytes());
        n.push(rejected as u8);
        n.extend([0u8; 18]);
        assert_eq!(n.len(), NOTE_RECORD_LEN);
        n
    }

    #[test]
    fn empty_batch_decodes_with_zero_totals() {
        let report = CountReport::decode(&header(0)).unwrap();
        assert!(report.notes.is_empty());
        assert_eq!(report.total_notes(), 0);
        assert_eq!(report.reject_count(), 0);
        assert!(report.totals().is_empty());
    }

    #[test]
    fn batch_header_fields() {
        let report = CountReport::decode(&header(0)).unwrap();
        assert_eq!(report.cashier_id, "cashier-7");
        assert_eq!(report.count_speed, "1000");
        assert_eq!(report.count_mode, "MIX");
        assert_eq!(report.number_count_file, 42);
        assert_eq!(report.machine_serial_number, "NC0012345");
        assert_eq!(report.start_time, "2026-08-30 11:00:00");
    }

    #[test]
    fn totals_aggregate_by_currency_skipping_rejects() {
        let mut p = header(4);
        p.extend(note("RUB", 100, false));
        p.extend(note("RUB", 500, false));
        p.extend(note("USD", 20, false));
        p.extend(note("RUB", 1000, true)); // rejected, excluded from totals

        let report = CountReport::decode(&p).unwrap();
        assert_eq!(report.total_notes(), 4);
        assert_eq!(report.reject_count(), 1);

        let totals = report.totals();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0], CurrencyAmount { currency: "RUB".into(), amount: 600 });
        assert_eq!(totals[1], CurrencyAmount { currency: "USD".into(), amount: 20 });
    }

    #[test]
    fn empty_currency_excluded_from_totals() {
        let mut p = header(1);
        p.extend(note("", 50, false));
        let report = CountReport::decode(&p).unwrap();
        assert_eq!(report.total_notes(), 1);
        assert!(report.totals().is_empty());
    }

    #[test]
    fn declared_count_beyond_payload_fails_structurally() {
        let mut p = header(3);
        p.extend(note("RUB", 100, false)); // only one of three records present
        let err = CountReport::decode(&p).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn short_header_fails_structurally() {
        let err = CountReport::decode(&[0u8; 30]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }
}
