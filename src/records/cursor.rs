//! Length-checked reader over a record payload.
//!
//! Every field read checks the remaining byte count before slicing, turning a
//! short payload into a structured [`DecodeError::Truncated`] instead of an
//! out-of-bounds access. Record-payload integers are big-endian throughout.

use crate::error::DecodeError;

/// Sequential reader positioned inside a payload slice.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start reading at the front of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Skip `n` bytes (reserved regions).
    pub fn skip(&mut self, field: &'static str, n: usize) -> Result<(), DecodeError> {
        self.take(field, n).map(|_| ())
    }

    pub fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(field, 1)?[0])
    }

    /// One byte interpreted as a boolean: exactly 1 is true.
    pub fn flag(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        Ok(self.u8(field)? == 1)
    }

    pub fn u16_be(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        let b = self.take(field, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32_be(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let b = self.take(field, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64_be(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        let b = self.take(field, 8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Fixed-width UTF-8 text with trailing NUL padding stripped.
    pub fn text(&mut self, field: &'static str, width: usize) -> Result<String, DecodeError> {
        let raw = self.take(field, width)?;
        let end = raw
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        std::str::from_utf8(&raw[..end])
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidText { field })
    }

    /// Length-prefixed UTF-8 string: u16 big-endian byte count, no terminator.
    pub fn string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.u16_be(field)? as usize;
        let raw = self.take(field, len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidText { field })
    }
}

/// Append a u16-big-endian-length-prefixed UTF-8 string.
pub fn put_string(buf: &mut Vec<u8>, value: &str) {
    debug_assert!(value.len() <= u16::MAX as usize);
    buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_past_end_is_structured_failure() {
        let mut cur = Cursor::new(&[1, 2, 3]);
        let err = cur.u32_be("tid").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "tid",
                needed: 4,
                remaining: 3
            }
        );
    }

    #[test]
    fn integers_are_big_endian() {
        let mut cur = Cursor::new(&[0x00, 0x00, 0x01, 0x02, 0x01, 0x00]);
        assert_eq!(cur.u32_be("a").unwrap(), 0x0102);
        assert_eq!(cur.u16_be("b").unwrap(), 0x0100);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn text_strips_trailing_nuls_only() {
        let mut cur = Cursor::new(b"NC\x007500\x00\x00\x00\x00");
        assert_eq!(cur.text("model", 10).unwrap(), "NC\x007500");
    }

    #[test]
    fn text_all_nuls_is_empty() {
        let mut cur = Cursor::new(&[0u8; 5]);
        assert_eq!(cur.text("field", 5).unwrap(), "");
    }

    #[test]
    fn string_round_trip() {
        let mut buf = Vec::new();
        put_string(&mut buf, "user");
        put_string(&mut buf, "");
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.string("a").unwrap(), "user");
        assert_eq!(cur.string("b").unwrap(), "");
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn empty_string_is_two_zero_bytes() {
        let mut buf = Vec::new();
        put_string(&mut buf, "");
        assert_eq!(buf, vec![0, 0]);
    }

    #[test]
    fn string_with_short_body_is_truncated_error() {
        // Declared length 5, only 2 bytes follow.
        let mut cur = Cursor::new(&[0x00, 0x05, b'a', b'b']);
        assert!(matches!(
            cur.string("name"),
            Err(DecodeError::Truncated { needed: 5, remaining: 2, .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut cur = Cursor::new(&[0xFF, 0xFE, 0xFD]);
        assert!(matches!(
            cur.text("field", 3),
            Err(DecodeError::InvalidText { field: "field" })
        ));
    }
}
