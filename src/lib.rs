//! # part-graph-kernel
//!
//! Feature dependency graph builder and selector resolution engine for
//! parametric CAD parts.
//!
//! The kernel answers two questions:
//!
//! > In which order must a part's features be built?
//!
//! > Which concrete face, edge or solid does this selector mean, given the
//! > geometry built so far?
//!
//! ## Architecture
//!
//! ```text
//! Part → normalize_part → build_graph → topo_sort → CompileResult
//!                              ↑                          │
//!                      anchor analysis                    ▼
//!                       (selector)              executor, per feature:
//!                                        resolve_selector(ctx) → backend
//!                                        ctx.absorb(BackendOutput)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same part + same overrides → identical `feature_order` and hashes
//! - Ties in the build order break by declaration order
//! - Rank ties are kept, never broken arbitrarily; resolution fails instead
//!   of guessing among ambiguous candidates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache_key;
pub mod canonical;
pub mod compile;
pub mod graph;
pub mod hasher;
pub mod normalize;
pub mod params;
pub mod selector;
pub mod types;

// Re-exports
pub use types::{
    AxisDirection, BackendOutput, Diagnostic, ErrorReport, Feature, FeatureId, FeatureKind,
    Part, Predicate, RankRule, ResolutionContext, Selection, SelectionKind, Selector,
};
pub use params::{Dimension, ParamContext, ParamDef, ParamOverrides, UnitSystem};
pub use normalize::{normalize_part, NormalizedPart, ValidationError};
pub use graph::{build_graph, topo_sort, Graph, GraphEdge, GraphError};
pub use selector::{
    normalize_selector, resolve_feature_selectors, resolve_selector, resolve_selector_set,
    SelectorError,
};
pub use compile::{compile_part, CompileError, CompileOptions, CompileResult, PartCompiler};
pub use hasher::{hash_feature, FEATURE_HASH_VERSION};
pub use cache_key::{BuildCacheKey, CACHE_KEY_VERSION};
pub use canonical::{canonical_digest_hex, canonical_hash_hex, to_canonical_bytes};
