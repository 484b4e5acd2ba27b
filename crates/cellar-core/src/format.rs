//! Canonical binary format: VLQ integers and the byte reader.
//!
//! Every value has exactly one valid encoding:
//! - One leading tag byte selects the decoder (see [`crate::tag`])
//! - Integers use the smallest VLQ encoding; longer forms are rejected
//! - The length of a VLQ is recoverable from its own bytes (the high bit of
//!   each byte marks continuation), so decoding never looks ahead
//!
//! The canonical encoding is critical: it ensures that the same logical value
//! produces identical bytes (and thus identical hashes) on every node.

use bytes::Bytes;

use crate::cell::Cell;
use crate::error::{CellError, Result};
use crate::hash::{Hash, HASH_LENGTH};

/// Maximum encoded length of a signed VLQ for an `i64`.
pub const MAX_VLQ_LONG_LENGTH: usize = 10;

/// Maximum encoded length of a VLQ count for a `u64`.
pub const MAX_VLQ_COUNT_LENGTH: usize = 10;

/// Encode a cell to its canonical bytes.
pub fn encode(cell: &Cell) -> Bytes {
    cell.encoding().clone()
}

/// Decode a cell from a buffer that must contain exactly one encoding.
pub fn decode(bytes: &[u8]) -> Result<Cell> {
    let (cell, consumed) = read(bytes, 0)?;
    if consumed != bytes.len() {
        return Err(CellError::bad_format(format!(
            "{} trailing bytes after encoding",
            bytes.len() - consumed
        )));
    }
    Ok(cell)
}

/// Decode one cell starting at `offset`, returning it with the number of bytes
/// consumed. Bytes after the encoding are left untouched.
pub fn read(bytes: &[u8], offset: usize) -> Result<(Cell, usize)> {
    if offset > bytes.len() {
        return Err(CellError::bad_format("offset beyond end of buffer"));
    }
    let mut reader = Reader::new(bytes, offset);
    let cell = Cell::read_from(&mut reader)?;
    Ok((cell, reader.position() - offset))
}

/// Number of bytes in the signed VLQ encoding of `n`.
pub fn vlq_long_length(n: i64) -> usize {
    let mut len = 1;
    // Each group holds 7 bits; the first also carries the sign in bit 6.
    while len < MAX_VLQ_LONG_LENGTH {
        let bits = 7 * len as u32;
        let limit = 1i128 << (bits - 1);
        if (n as i128) >= -limit && (n as i128) < limit {
            break;
        }
        len += 1;
    }
    len
}

/// Number of bytes in the VLQ count encoding of `n`.
pub fn vlq_count_length(n: u64) -> usize {
    let mut len = 1;
    let mut rest = n >> 7;
    while rest != 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Write a signed VLQ: big-endian 7-bit groups, high bit set on all but the
/// last byte, bit 6 of the first byte is the sign.
pub fn write_vlq_long(buf: &mut Vec<u8>, n: i64) {
    let len = vlq_long_length(n);
    for i in (0..len).rev() {
        let shift = (7 * i) as u32;
        // Arithmetic shift keeps the sign in the leading group.
        let group = ((n >> shift.min(63)) & 0x7f) as u8;
        if i > 0 {
            buf.push(group | 0x80);
        } else {
            buf.push(group);
        }
    }
}

/// Write an unsigned VLQ count.
pub fn write_vlq_count(buf: &mut Vec<u8>, n: u64) {
    let len = vlq_count_length(n);
    for i in (0..len).rev() {
        let group = ((n >> (7 * i)) & 0x7f) as u8;
        if i > 0 {
            buf.push(group | 0x80);
        } else {
            buf.push(group);
        }
    }
}

/// Cursor over an encoding. All reads fail with `BadFormat` on truncation.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at `pos`.
    pub fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    /// Current position in the underlying buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes remaining after the current position.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Bytes between `start` and the current position.
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        &self.buf[start..self.pos]
    }

    /// Look at the next byte without consuming it.
    pub fn peek_byte(&self) -> Result<u8> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or_else(|| CellError::bad_format("unexpected end of encoding"))
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let b = self.peek_byte()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CellError::bad_format(format!(
                "need {} bytes, {} remaining",
                len,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_hash(&mut self) -> Result<Hash> {
        let bytes = self.read_slice(HASH_LENGTH)?;
        let mut arr = [0u8; HASH_LENGTH];
        arr.copy_from_slice(bytes);
        Ok(Hash(arr))
    }

    /// Read a signed VLQ, rejecting non-minimal and overflowing encodings.
    pub fn read_vlq_long(&mut self) -> Result<i64> {
        let first = self.read_byte()?;
        // Sign-extend the 7 payload bits of the first group.
        let mut value = (((first & 0x7f) as i64) << 57) >> 57;
        let mut prev = first;
        let mut len = 1;

        while prev & 0x80 != 0 {
            let b = self.read_byte()?;
            if len == 1 {
                let redundant_zero = first == 0x80 && b & 0x40 == 0;
                let redundant_ones = first == 0xff && b & 0x40 != 0;
                if redundant_zero || redundant_ones {
                    return Err(CellError::bad_format("non-minimal VLQ integer"));
                }
            }
            len += 1;
            let top = value >> 56;
            if len > MAX_VLQ_LONG_LENGTH || (top != 0 && top != -1) {
                return Err(CellError::bad_format("VLQ integer overflow"));
            }
            value = (value << 7) | (b & 0x7f) as i64;
            prev = b;
        }

        Ok(value)
    }

    /// Read an unsigned VLQ count, rejecting non-minimal and overflowing
    /// encodings.
    pub fn read_vlq_count(&mut self) -> Result<u64> {
        let first = self.read_byte()?;
        if first == 0x80 {
            return Err(CellError::bad_format("non-minimal VLQ count"));
        }
        let mut value = (first & 0x7f) as u64;
        let mut prev = first;
        let mut len = 1;

        while prev & 0x80 != 0 {
            let b = self.read_byte()?;
            len += 1;
            if len > MAX_VLQ_COUNT_LENGTH || value >> 57 != 0 {
                return Err(CellError::bad_format("VLQ count overflow"));
            }
            value = (value << 7) | (b & 0x7f) as u64;
            prev = b;
        }

        Ok(value)
    }

    /// Read a VLQ count used as a length or element count. It must not exceed
    /// the number of `min_item_size` items that fit in the rest of the buffer.
    pub fn read_length(&mut self, min_item_size: usize) -> Result<usize> {
        let n = self.read_vlq_count()?;
        let max = (self.remaining() / min_item_size.max(1)) as u64;
        if n > max {
            return Err(CellError::bad_format(format!(
                "length {} exceeds remaining input",
                n
            )));
        }
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_bytes(n: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vlq_long(&mut buf, n);
        buf
    }

    fn count_bytes(n: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_vlq_count(&mut buf, n);
        buf
    }

    fn read_long(bytes: &[u8]) -> Result<i64> {
        Reader::new(bytes, 0).read_vlq_long()
    }

    fn read_count(bytes: &[u8]) -> Result<u64> {
        Reader::new(bytes, 0).read_vlq_count()
    }

    #[test]
    fn test_vlq_long_encoding() {
        // -64..=63: single byte
        assert_eq!(long_bytes(0), vec![0x00]);
        assert_eq!(long_bytes(1), vec![0x01]);
        assert_eq!(long_bytes(63), vec![0x3f]);
        assert_eq!(long_bytes(-1), vec![0x7f]);
        assert_eq!(long_bytes(-64), vec![0x40]);

        // Two bytes
        assert_eq!(long_bytes(64), vec![0x80, 0x40]);
        assert_eq!(long_bytes(100), vec![0x80, 0x64]);
        assert_eq!(long_bytes(-65), vec![0xff, 0x3f]);
        assert_eq!(long_bytes(8191), vec![0xbf, 0x7f]);

        // Three bytes
        assert_eq!(long_bytes(8192), vec![0x80, 0xc0, 0x00]);
    }

    #[test]
    fn test_vlq_long_extremes() {
        assert_eq!(long_bytes(i64::MAX).len(), MAX_VLQ_LONG_LENGTH);
        assert_eq!(long_bytes(i64::MIN).len(), MAX_VLQ_LONG_LENGTH);
        assert_eq!(read_long(&long_bytes(i64::MAX)).unwrap(), i64::MAX);
        assert_eq!(read_long(&long_bytes(i64::MIN)).unwrap(), i64::MIN);
    }

    #[test]
    fn test_vlq_long_length_matches_encoding() {
        for n in [0, 1, -1, 63, 64, -64, -65, 8191, 8192, 1 << 40, -(1 << 40), i64::MAX, i64::MIN] {
            assert_eq!(vlq_long_length(n), long_bytes(n).len(), "n = {}", n);
            assert_eq!(read_long(&long_bytes(n)).unwrap(), n);
        }
    }

    #[test]
    fn test_vlq_long_rejects_non_minimal() {
        // 1 padded with a redundant zero group
        assert!(read_long(&[0x80, 0x01]).is_err());
        // -1 padded with a redundant sign group
        assert!(read_long(&[0xff, 0x7f]).is_err());
        // 64 genuinely needs the leading zero group
        assert_eq!(read_long(&[0x80, 0x40]).unwrap(), 64);
    }

    #[test]
    fn test_vlq_long_rejects_overflow() {
        let mut bytes = vec![0x81];
        bytes.extend(std::iter::repeat(0xff).take(8));
        bytes.push(0x7f);
        assert!(read_long(&bytes).is_err());
    }

    #[test]
    fn test_vlq_long_rejects_truncation() {
        assert!(read_long(&[]).is_err());
        assert!(read_long(&[0x80]).is_err());
        assert!(read_long(&[0x81, 0x80]).is_err());
    }

    #[test]
    fn test_vlq_count_encoding() {
        assert_eq!(count_bytes(0), vec![0x00]);
        assert_eq!(count_bytes(127), vec![0x7f]);
        assert_eq!(count_bytes(128), vec![0x81, 0x00]);
        assert_eq!(count_bytes(300), vec![0x82, 0x2c]);
        assert_eq!(count_bytes(u64::MAX).len(), MAX_VLQ_COUNT_LENGTH);
        assert_eq!(read_count(&count_bytes(u64::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_vlq_count_rejects_non_minimal() {
        assert!(read_count(&[0x80, 0x05]).is_err());
    }

    #[test]
    fn test_vlq_count_rejects_overflow() {
        let mut bytes = vec![0x82];
        bytes.extend(std::iter::repeat(0x80).take(8));
        bytes.push(0x00);
        assert!(read_count(&bytes).is_err());
    }

    #[test]
    fn test_length_bounded_by_remaining() {
        // Claims 100 items with only 2 bytes left
        let mut reader = Reader::new(&[0x64, 0x01, 0x02], 0);
        assert!(reader.read_length(1).is_err());
    }

    #[test]
    fn test_vlq_stops_at_own_terminator() {
        // Trailing bytes after the VLQ are not consumed
        let mut reader = Reader::new(&[0x80, 0x64, 0xaa, 0xbb], 0);
        assert_eq!(reader.read_vlq_long().unwrap(), 100);
        assert_eq!(reader.position(), 2);
    }

    proptest::proptest! {
        #[test]
        fn prop_vlq_long_roundtrip(n in proptest::prelude::any::<i64>()) {
            let bytes = long_bytes(n);
            proptest::prop_assert_eq!(bytes.len(), vlq_long_length(n));
            proptest::prop_assert_eq!(read_long(&bytes).unwrap(), n);
        }

        #[test]
        fn prop_vlq_count_roundtrip(n in proptest::prelude::any::<u64>()) {
            let bytes = count_bytes(n);
            proptest::prop_assert_eq!(bytes.len(), vlq_count_length(n));
            proptest::prop_assert_eq!(read_count(&bytes).unwrap(), n);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64)) {
            let _ = decode(&bytes);
        }
    }
}
