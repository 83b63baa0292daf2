//! Feature dependency graph.
//!
//! [`build_graph`] walks a normalized feature list, validates its namespaces
//! and merges explicit `deps` with dependencies inferred from selector,
//! profile and pattern references. [`topo_sort`] turns the result into a
//! deterministic build order.

pub mod builder;
pub mod namespace;
pub mod topo;

use serde::{Deserialize, Serialize};

use crate::types::{ErrorReport, FeatureId};

pub use builder::{build_graph, feature_dependencies};
pub use namespace::Namespace;
pub use topo::topo_sort;

/// Directed edge: `from` must be built before `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Dependency.
    pub from: FeatureId,
    /// Dependent feature.
    pub to: FeatureId,
}

impl GraphEdge {
    /// Create an edge.
    pub fn new(from: impl Into<FeatureId>, to: impl Into<FeatureId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Feature dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    /// Feature ids in declaration order.
    pub nodes: Vec<FeatureId>,
    /// Edges, grouped by dependent feature in declaration order.
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    /// Whether `id` is a node.
    pub fn contains_node(&self, id: &FeatureId) -> bool {
        self.nodes.contains(id)
    }

    /// Direct dependencies of `id`.
    pub fn dependencies_of<'a>(&'a self, id: &'a FeatureId) -> impl Iterator<Item = &'a FeatureId> {
        self.edges.iter().filter(move |e| &e.to == id).map(|e| &e.from)
    }

    /// Direct dependents of `id`.
    pub fn dependents_of<'a>(&'a self, id: &'a FeatureId) -> impl Iterator<Item = &'a FeatureId> {
        self.edges.iter().filter(move |e| &e.from == id).map(|e| &e.to)
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Error type for graph construction and ordering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Feature with an empty id.
    #[error("Feature at index {index} has an empty id")]
    FeatureIdRequired {
        /// Position in the feature list.
        index: usize,
    },
    /// Two features share an id.
    #[error("Duplicate feature id: {id}")]
    FeatureDuplicate {
        /// Feature id.
        id: FeatureId,
    },
    /// Two sketches declare the same profile name.
    #[error("Profile {name} declared by both {first} and {second}")]
    ProfileDuplicate {
        /// Profile name.
        name: String,
        /// First declaring sketch.
        first: FeatureId,
        /// Second declaring sketch.
        second: FeatureId,
    },
    /// Two features produce the same output name.
    #[error("Output {name} produced by both {first} and {second}")]
    OutputDuplicate {
        /// Output name.
        name: String,
        /// First producer.
        first: FeatureId,
        /// Second producer.
        second: FeatureId,
    },
    /// Explicit dependency on an unknown feature.
    #[error("Feature {feature} depends on unknown feature {dep}")]
    DepMissing {
        /// Dependent feature.
        feature: FeatureId,
        /// Unknown id.
        dep: FeatureId,
    },
    /// `profile.ref` to a profile no sketch declares.
    #[error("Feature {feature} references unknown profile {name}")]
    ProfileMissing {
        /// Referencing feature.
        feature: FeatureId,
        /// Profile name.
        name: String,
    },
    /// `selector.named` to an output no feature produces.
    #[error("Feature {feature}.{field} references unknown output {name}")]
    SelectorNamedMissing {
        /// Referencing feature.
        feature: FeatureId,
        /// Selector field.
        field: &'static str,
        /// Output name.
        name: String,
    },
    /// `pred.createdBy` with an unknown feature id.
    #[error("Feature {feature}.{field} has createdBy({target}) but no such feature exists")]
    PredCreatedByMissing {
        /// Referencing feature.
        feature: FeatureId,
        /// Selector field.
        field: &'static str,
        /// Unknown id.
        target: FeatureId,
    },
    /// `pattern.ref` to something that is not a pattern feature.
    #[error("Feature {feature} references {name}, which is not a pattern feature")]
    PatternMissing {
        /// Referencing feature.
        feature: FeatureId,
        /// Referenced id.
        name: FeatureId,
    },
    /// Unanchored selector on a feature without explicit deps.
    #[error("Feature {feature}.{field}: {selector} has no createdBy or named anchor and the feature declares no deps")]
    SelectorAnchorMissing {
        /// Feature.
        feature: FeatureId,
        /// Selector field.
        field: &'static str,
        /// Unanchored query.
        selector: String,
    },
    /// Dependency cycle.
    #[error("Dependency cycle: {}", format_cycle(.nodes))]
    Cycle {
        /// Nodes of one cycle, each depending on the previous.
        nodes: Vec<FeatureId>,
    },
    /// Edge endpoint that is not a node.
    #[error("Edge {from} -> {to} references an unknown node")]
    EdgeUnknown {
        /// Edge source.
        from: FeatureId,
        /// Edge target.
        to: FeatureId,
    },
}

fn format_cycle(nodes: &[FeatureId]) -> String {
    let mut path: Vec<&str> = nodes.iter().map(FeatureId::as_str).collect();
    if let Some(first) = nodes.first() {
        path.push(first.as_str());
    }
    path.join(" -> ")
}

impl GraphError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FeatureIdRequired { .. } => "validation_feature_id_required",
            Self::FeatureDuplicate { .. } => "validation_feature_duplicate",
            Self::ProfileDuplicate { .. } => "profile_duplicate",
            Self::OutputDuplicate { .. } => "output_duplicate",
            Self::DepMissing { .. } => "dep_missing",
            Self::ProfileMissing { .. } => "profile_missing",
            Self::SelectorNamedMissing { .. } => "selector_named_missing",
            Self::PredCreatedByMissing { .. } => "pred_created_by_missing",
            Self::PatternMissing { .. } => "pattern_missing",
            Self::SelectorAnchorMissing { .. } => "selector_anchor_missing",
            Self::Cycle { .. } => "graph_cycle",
            Self::EdgeUnknown { .. } => "graph_edge_unknown",
        }
    }

    /// `{code, message}` report.
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_loop() {
        let err = GraphError::Cycle {
            nodes: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle: a -> b -> a");
        assert_eq!(err.report().code, "graph_cycle");
    }

    #[test]
    fn test_adjacency_queries() {
        let graph = Graph {
            nodes: vec!["a".into(), "b".into(), "c".into()],
            edges: vec![GraphEdge::new("a", "c"), GraphEdge::new("b", "c")],
        };
        let c = FeatureId::from("c");
        let a = FeatureId::from("a");
        assert_eq!(graph.dependencies_of(&c).count(), 2);
        assert_eq!(graph.dependents_of(&a).collect::<Vec<_>>(), vec![&c]);
        assert!(graph.contains_node(&a));
        assert_eq!(graph.edge_count(), 2);
    }
}
