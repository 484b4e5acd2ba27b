//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding and the hash of fixed values, so
//! any implementation of the format can check itself byte for byte.

use cellar_core::{Address, Cell, Hash, PeerStatus, Result};
use serde::{Deserialize, Serialize};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Short identifier for the vector.
    pub name: &'static str,
    /// Human-readable description of the value.
    pub description: &'static str,
    /// Builds the value.
    pub build: fn() -> Result<Cell>,
    /// Expected canonical encoding (hex).
    pub expected_encoding: &'static str,
    /// Expected Blake3 hash of the encoding (hex).
    pub expected_hash: &'static str,
}

/// A computed vector, as exported for other implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub name: String,
    pub description: String,
    pub encoding: String,
    pub hash: String,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "integer_zero",
            description: "integer 0",
            build: || Ok(Cell::integer(0)),
            expected_encoding: "1000",
            expected_hash: "c7c646ace30f97d0f7fa790efbd7a59720b25fd9e4255233e1b41dc627e04c10",
        },
        GoldenVector {
            name: "integer_100",
            description: "integer 100, two-byte VLQ",
            build: || Ok(Cell::integer(100)),
            expected_encoding: "108064",
            expected_hash: "151c7b83c9548f792f1a517ff5c8e85a5ffd12095db645550773109e3110a714",
        },
        GoldenVector {
            name: "integer_minus_one",
            description: "integer -1",
            build: || Ok(Cell::integer(-1)),
            expected_encoding: "107f",
            expected_hash: "f8c153764ac37ea66b31edbaee85d9c7716f37df661db1755cd209ac0a204844",
        },
        GoldenVector {
            name: "integer_min",
            description: "integer i64::MIN, ten-byte VLQ",
            build: || Ok(Cell::integer(i64::MIN)),
            expected_encoding: "10ff808080808080808000",
            expected_hash: "ab690d03b8db219c0bf3ee5cb5a0544fd9110325024f6f697ffebe4de31de870",
        },
        GoldenVector {
            name: "string_hello",
            description: "string \"hello\"",
            build: || Ok(Cell::string("hello")),
            expected_encoding: "300568656c6c6f",
            expected_hash: "ea57b49196130c02772fabfcd3fe0d303e72c0df192341e1849a345f2ba21e7e",
        },
        GoldenVector {
            name: "keyword_url",
            description: "keyword :url",
            build: || Cell::keyword("url"),
            expected_encoding: "330375726c",
            expected_hash: "80d7e4f443c0998a6547a1f0ca5c9a981c13093b287425b5d9280ed30944544c",
        },
        GoldenVector {
            name: "address_1",
            description: "address #1",
            build: || Ok(Cell::address(Address(1))),
            expected_encoding: "ea01",
            expected_hash: "aa45da7e802ff6ddd55a9e8cb60a9c998262d0837f03618fb150c1c82d9ab627",
        },
        GoldenVector {
            name: "vector_small",
            description: "vector [1 \"two\"], children embedded",
            build: || Ok(Cell::vector([Cell::integer(1), Cell::string("two")])),
            expected_encoding: "80021001300374776f",
            expected_hash: "f89f81b90072b3b230d6c24980baad46942991e8c001d82c70f1b1a5f9eff10f",
        },
        GoldenVector {
            name: "vector_with_ref",
            description: "vector holding a 200-byte string, child written by hash",
            build: || Ok(Cell::vector([Cell::string("x".repeat(200))])),
            expected_encoding: "80012005e5e4a1a0961e4c5527a8a70769d60c49d6aa99dca0d291696ca418536b1e14",
            expected_hash: "8f41b11fa8cd63e082aea9fbc1358888f857c5ba57cc9f12b4e598abdf4faddb",
        },
        GoldenVector {
            name: "map_single",
            description: "map {:a 1}",
            build: || Ok(Cell::map([(Cell::keyword("a")?, Cell::integer(1))])),
            expected_encoding: "82013301611001",
            expected_hash: "5c6d16594c0972daf9e20ef59f9a7c4178de893ddfabaebd3c0ac197d2f7a241",
        },
        GoldenVector {
            name: "peer_fresh",
            description: "PeerStatus created for #1 with stake 100",
            build: || Ok(Cell::from(PeerStatus::create(Address(1), 100)?)),
            expected_encoding: "d1ea0180640000007f64",
            expected_hash: "0f293e9333b2982537bcd23c23ecc36c620158ad61c9dac0dc04d4df9c4ba1b0",
        },
        GoldenVector {
            name: "peer_delegated",
            description: "PeerStatus for #1 with stake 100 and 25 shares delegated by #2",
            build: || {
                let ps = PeerStatus::create(Address(1), 100)?.with_delegated_stake(Address(2), 25)?;
                Ok(Cell::from(ps))
            },
            expected_encoding: "d1ea0180648201ea02101919007f7d",
            expected_hash: "8dd9341ed0600ee12b4ed2b42028d731c5de4c9aa1feefb07ffe58eb3424ee91",
        },
    ]
}

/// Hash of the absence token, used for absent values.
pub const NULL_HASH: &str = "2d3adedff11b61f14c886e35afa036736dcd87a74d27b5c1510225d0f592e213";

/// Build a vector's value and compute its encoding and hash.
pub fn compute(vector: &GoldenVector) -> Result<VectorRecord> {
    let cell = (vector.build)()?;
    Ok(VectorRecord {
        name: vector.name.to_string(),
        description: vector.description.to_string(),
        encoding: hex::encode(cell.encoding()),
        hash: cell.hash().to_hex(),
    })
}

/// Verify all golden vectors against this implementation.
///
/// Returns `(name, matches, computed hash)` for each vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match compute(v) {
            Ok(record) => {
                let matches =
                    record.encoding == v.expected_encoding && record.hash == v.expected_hash;
                (v.name.to_string(), matches, record.hash)
            }
            Err(e) => (v.name.to_string(), false, e.to_string()),
        })
        .collect()
}

/// Export all computed vectors as pretty-printed JSON.
pub fn export_json() -> serde_json::Result<String> {
    let records: Vec<VectorRecord> = all_vectors()
        .iter()
        .filter_map(|v| compute(v).ok())
        .collect();
    serde_json::to_string_pretty(&records)
}

/// Parse the expected hash of a vector.
pub fn expected_hash(vector: &GoldenVector) -> Option<Hash> {
    Hash::from_hex(vector.expected_hash).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, hash) in verify_all_vectors() {
            assert!(matches, "vector '{}' computed hash {}", name, hash);
        }
    }

    #[test]
    fn test_vectors_decode_to_same_value() {
        for vector in all_vectors() {
            let cell = (vector.build)().unwrap();
            let bytes = hex::decode(vector.expected_encoding).unwrap();
            let decoded = cellar_core::decode(&bytes).unwrap();

            assert_eq!(decoded, cell, "vector '{}'", vector.name);
            assert_eq!(Some(decoded.hash()), expected_hash(&vector));
        }
    }

    #[test]
    fn test_null_hash() {
        assert_eq!(Hash::null().to_hex(), NULL_HASH);
    }

    #[test]
    fn test_export_json() {
        let json = export_json().unwrap();
        let records: Vec<VectorRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records.len(), all_vectors().len());
        assert_eq!(records[0].encoding, "1000");
    }
}
