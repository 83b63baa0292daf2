//! Core types for the part kernel.

pub mod feature;
pub mod selector;
pub mod selection;
pub mod part;
pub mod report;

pub use feature::{
    AxisDefinition, AxisDirection, AxisSpec, BinaryOp, BooleanOp, Cardinality, Depth, Expr,
    Feature, FeatureId, FeatureKind, PatternRef, ProfileSpec, Scalar, SelectorField,
    SketchProfile, SweepAngle,
};
pub use selector::{Predicate, QueryView, RankRule, Selector};
pub use selection::{
    meta_keys, BackendOutput, MetaMissing, MetaType, MetaValue, ResolutionContext, Selection,
    SelectionKind,
};
pub use part::Part;
pub use report::{Diagnostic, ErrorReport, Severity};
