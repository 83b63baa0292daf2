//! Canonical serialization for deterministic hashing.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable Vec order: vectors serialize in index order
//! - No HashMap in hashed data: maps are `BTreeMap`
//! - Floats that must compare across platforms are quantized first
//!   ([`quantize_float`])

use serde::Serialize;
use sha2::{Digest, Sha256};
use xxhash_rust::xxh64::xxh64;

/// Quantization factor: six decimal places survive.
pub const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Serialize a value to canonical JSON bytes.
///
/// Only crate-owned types with string-keyed maps are passed here, for which
/// `serde_json` serialization cannot fail.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("Canonical serialization failed")
}

/// xxh64 of the canonical bytes, as 16 hex chars.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", xxh64(&to_canonical_bytes(value), 0))
}

/// SHA-256 of the canonical bytes, as 64 hex chars.
pub fn canonical_digest_hex<T: Serialize>(value: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(to_canonical_bytes(value));
    hex::encode(hasher.finalize())
}

/// Quantize a float to an i64 for deterministic hashing.
pub fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}
