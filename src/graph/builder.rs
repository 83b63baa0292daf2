//! Dependency inference and graph construction.

use std::collections::BTreeSet;

use super::namespace::Namespace;
use super::{Graph, GraphEdge, GraphError};
use crate::selector::{analyze_selector, AnchorError};
use crate::types::{Feature, FeatureId};

/// Build the dependency graph of a normalized feature list.
///
/// Nodes keep declaration order. Edges are emitted per dependent feature in
/// declaration order, dependencies sorted by id within each feature.
pub fn build_graph(features: &[Feature]) -> Result<Graph, GraphError> {
    let ns = Namespace::collect(features)?;

    let mut edges = Vec::new();
    for feature in features {
        let deps = feature_dependencies(feature, &ns)?;
        tracing::trace!(feature_id = %feature.id, deps = deps.len(), "inferred dependencies");
        edges.extend(deps.into_iter().map(|dep| GraphEdge {
            from: dep,
            to: feature.id.clone(),
        }));
    }

    let graph = Graph {
        nodes: features.iter().map(|f| f.id.clone()).collect(),
        edges,
    };
    tracing::debug!(
        feature_count = graph.nodes.len(),
        edge_count = graph.edge_count(),
        profiles = ns.profiles.len(),
        outputs = ns.outputs.len(),
        "built dependency graph"
    );
    Ok(graph)
}

/// Union of a feature's explicit and inferred dependencies.
pub fn feature_dependencies(
    feature: &Feature,
    ns: &Namespace,
) -> Result<BTreeSet<FeatureId>, GraphError> {
    let mut deps = BTreeSet::new();

    for dep in &feature.deps {
        if !ns.ids.contains(dep) {
            return Err(GraphError::DepMissing {
                feature: feature.id.clone(),
                dep: dep.clone(),
            });
        }
        deps.insert(dep.clone());
    }

    for name in feature.profile_refs() {
        let sketch = ns.profile_owner(name).ok_or_else(|| GraphError::ProfileMissing {
            feature: feature.id.clone(),
            name: name.to_string(),
        })?;
        deps.insert(sketch.clone());
    }

    if let Some(pattern) = feature.pattern_ref() {
        if !ns.is_pattern(&pattern.name) {
            return Err(GraphError::PatternMissing {
                feature: feature.id.clone(),
                name: pattern.name.clone(),
            });
        }
        deps.insert(pattern.name.clone());
    }

    for field in feature.selector_fields() {
        let anchors = analyze_selector(field.selector, ns).map_err(|e| match e {
            AnchorError::NamedMissing(name) => GraphError::SelectorNamedMissing {
                feature: feature.id.clone(),
                field: field.name,
                name,
            },
            AnchorError::CreatedByMissing(target) => GraphError::PredCreatedByMissing {
                feature: feature.id.clone(),
                field: field.name,
                target,
            },
        })?;

        if let Some(unanchored) = anchors.unanchored.first() {
            if feature.deps.is_empty() {
                return Err(GraphError::SelectorAnchorMissing {
                    feature: feature.id.clone(),
                    field: field.name,
                    selector: unanchored.to_string(),
                });
            }
        }
        deps.extend(anchors.features);
    }

    Ok(deps)
}
