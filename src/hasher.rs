//! Feature content hashing.
//!
//! ```text
//! hash_feature(f) = hex(SHA256(canonical_json({ version, feature: f })))
//! ```
//!
//! The digest covers the feature's id, explicit deps, tags and normalized
//! payload. It does not depend on the feature's position in the part, so an
//! unchanged feature keeps its hash when unrelated features are added.

use serde::Serialize;

use crate::canonical::canonical_digest_hex;
use crate::types::Feature;

/// Version of the feature hash input. Changing it invalidates every hash.
pub const FEATURE_HASH_VERSION: &str = "feature_hash_v1";

#[derive(Serialize)]
struct FeatureHashInput<'a> {
    version: &'static str,
    feature: &'a Feature,
}

/// Stable content digest of one normalized feature (64 hex chars).
pub fn hash_feature(feature: &Feature) -> String {
    canonical_digest_hex(&FeatureHashInput {
        version: FEATURE_HASH_VERSION,
        feature,
    })
}
