//! Selector resolution engine.
//!
//! Selectors are evaluated in two modes that share the same semantics:
//!
//! - **Anchor analysis** ([`anchor`]) at compile time: which producing
//!   features does a selector statically pin to? Used for dependency
//!   inference, before any geometry exists.
//! - **Resolution** ([`resolve`]) at run time: filter the live selections of a
//!   [`ResolutionContext`](crate::types::ResolutionContext) by predicates, then
//!   narrow by rank rules.
//!
//! Both are pure functions of their inputs.

pub mod anchor;
pub mod canonical;
pub mod rank;
pub mod resolve;

use crate::types::{ErrorReport, FeatureId, MetaMissing, SelectionKind};

pub use anchor::{analyze_selector, AnchorError, AnchorScope, SelectorAnchors};
pub use canonical::normalize_selector;
pub use rank::apply_rank;
pub use resolve::{
    resolve_feature_selectors, resolve_selector, resolve_selector_set, ResolvedSelectors,
};

/// Error type for run-time selector resolution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectorError {
    /// `selector.named` references an output that was not produced.
    #[error("Named output not found: {name}")]
    NamedMissing {
        /// Output name.
        name: String,
    },
    /// No candidate of the right kind passed the predicates.
    #[error("Selector {selector} matched 0 {kind} candidates")]
    Empty {
        /// Selector description.
        selector: String,
        /// Kind filtered to.
        kind: SelectionKind,
    },
    /// Ranking removed every candidate.
    #[error("Selector {selector} has no candidates left after ranking")]
    EmptyAfterRank {
        /// Selector description.
        selector: String,
    },
    /// More than one candidate remains where exactly one is required.
    #[error("Selector {selector} is ambiguous: {} candidates remain ({})", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        /// Selector description.
        selector: String,
        /// Ids of the remaining candidates.
        candidates: Vec<String>,
    },
    /// A predicate or rank rule needed metadata the candidate lacks.
    #[error(transparent)]
    MetaMissing(#[from] MetaMissing),
    /// Resolution of a specific feature field failed.
    #[error("{feature}.{field}: {source}")]
    InField {
        /// Feature being resolved.
        feature: FeatureId,
        /// Selector field name.
        field: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<SelectorError>,
    },
}

impl SelectorError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NamedMissing { .. } => "selector_named_missing",
            Self::Empty { .. } => "selector_empty",
            Self::EmptyAfterRank { .. } => "selector_empty_after_rank",
            Self::Ambiguous { .. } => "selector_ambiguous",
            Self::MetaMissing(_) => "selector_meta_missing",
            Self::InField { source, .. } => source.code(),
        }
    }

    /// `{code, message}` report.
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.code(), self.to_string())
    }
}
