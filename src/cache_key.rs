//! Composite build cache key.
//!
//! A build is reusable when the part compiled to the same order of the same
//! feature contents, on the same backend, with the same overrides:
//!
//! ```text
//! key = xxh64(canonical_json({
//!     version, part_id,
//!     features: [(id, hash_feature(f)) in build order],
//!     backend_fingerprint,
//!     overrides: { id: quantize(value) },
//! }))
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::{canonical_hash_hex, quantize_float};
use crate::params::ParamOverrides;
use crate::types::FeatureId;

/// Version of the cache key input. Changing it invalidates every key.
pub const CACHE_KEY_VERSION: &str = "build_cache_v1";

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    version: &'static str,
    part_id: &'a str,
    features: Vec<(&'a str, &'a str)>,
    backend_fingerprint: &'a str,
    overrides: BTreeMap<&'a str, i64>,
}

/// Opaque build cache key (16 hex chars).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildCacheKey(String);

impl BuildCacheKey {
    /// Derive a key from a compiled part's order and hashes.
    ///
    /// Returns `None` when a feature in `feature_order` has no entry in
    /// `feature_hashes`.
    pub fn derive(
        part_id: &str,
        feature_order: &[FeatureId],
        feature_hashes: &BTreeMap<FeatureId, String>,
        backend_fingerprint: &str,
        overrides: &ParamOverrides,
    ) -> Option<Self> {
        let features = feature_order
            .iter()
            .map(|id| feature_hashes.get(id).map(|hash| (id.as_str(), hash.as_str())))
            .collect::<Option<Vec<_>>>()?;

        let input = CacheKeyInput {
            version: CACHE_KEY_VERSION,
            part_id,
            features,
            backend_fingerprint,
            overrides: overrides
                .iter()
                .map(|(k, v)| (k.as_str(), quantize_float(*v)))
                .collect(),
        };
        Some(Self(canonical_hash_hex(&input)))
    }

    /// Hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
