//! Tag bytes: the first byte of every encoding selects the decoder.

/// The absence token. Encodes a missing optional value.
pub const NULL: u8 = 0x00;

/// Signed integer, followed by a signed VLQ.
pub const INTEGER: u8 = 0x10;

/// Reference to a non-embedded child, followed by its 32-byte hash.
pub const REF: u8 = 0x20;

/// UTF-8 string, followed by a VLQ count length and the bytes.
pub const STRING: u8 = 0x30;

/// Raw bytes, followed by a VLQ count length and the bytes.
pub const BLOB: u8 = 0x31;

/// Keyword, followed by a single length byte and UTF-8 bytes.
pub const KEYWORD: u8 = 0x33;

/// Vector of children, followed by a VLQ count.
pub const VECTOR: u8 = 0x80;

/// Map of key/value children, followed by a VLQ count of entries.
pub const MAP: u8 = 0x82;

/// Peer stake-accounting record.
pub const PEER_STATUS: u8 = 0xD1;

/// Account address, followed by a VLQ count.
pub const ADDRESS: u8 = 0xEA;

/// Children whose encoding is at most this many bytes are embedded inline in
/// their parent. Larger children are written as [`REF`] plus hash.
///
/// Every implementation must use the same threshold, or hashes diverge.
pub const MAX_EMBEDDED_LENGTH: usize = 140;

/// Encoded length of a hash reference: tag byte plus 32 hash bytes.
pub const REF_LENGTH: usize = 33;

/// Maximum length of a keyword name in bytes.
pub const MAX_KEYWORD_LENGTH: usize = 64;

/// Get a human-readable name for a tag, for diagnostics.
pub fn name(tag: u8) -> &'static str {
    match tag {
        NULL => "null",
        INTEGER => "integer",
        REF => "ref",
        STRING => "string",
        BLOB => "blob",
        KEYWORD => "keyword",
        VECTOR => "vector",
        MAP => "map",
        PEER_STATUS => "peer-status",
        ADDRESS => "address",
        _ => "unknown",
    }
}
