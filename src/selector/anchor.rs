//! Compile-time anchor analysis.
//!
//! Answers "which producing features does this selector statically pin
//! to?" without any geometry:
//!
//! - `selector.named(name)` pins to the feature that declares `name` as its
//!   output.
//! - every `pred.createdBy(id)` pins to `id`.
//! - `rank.closestTo` targets are analyzed recursively; their anchors count
//!   as dependencies too.
//!
//! A face/edge/solid query (top level or nested) with no `createdBy`
//! predicate is *unanchored*: it depends on whatever exists at run time.

use std::collections::BTreeSet;

use crate::types::{FeatureId, Predicate, RankRule, Selector};

/// Namespace lookups needed to pin selectors.
pub trait AnchorScope {
    /// Whether a feature with this id exists.
    fn contains_feature(&self, id: &FeatureId) -> bool;

    /// Feature that declares `name` as an output.
    fn output_producer(&self, name: &str) -> Option<&FeatureId>;
}

/// Anchor references that do not exist in the scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorError {
    /// `selector.named` references an output no feature declares.
    #[error("named output '{0}' is not declared by any feature")]
    NamedMissing(String),
    /// `pred.createdBy` references an unknown feature.
    #[error("createdBy references unknown feature '{0}'")]
    CreatedByMissing(FeatureId),
}

/// Result of analyzing one selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorAnchors {
    /// Features the selector pins to.
    pub features: BTreeSet<FeatureId>,
    /// Queries (including nested `closestTo` targets) with no anchor.
    pub unanchored: Vec<Selector>,
}

impl SelectorAnchors {
    /// Whether every query in the selector is pinned to a feature.
    pub fn is_fully_anchored(&self) -> bool {
        self.unanchored.is_empty()
    }
}

/// Analyze a selector against a namespace.
pub fn analyze_selector(
    selector: &Selector,
    scope: &impl AnchorScope,
) -> Result<SelectorAnchors, AnchorError> {
    let mut anchors = SelectorAnchors::default();
    visit(selector, scope, &mut anchors)?;
    Ok(anchors)
}

fn visit(
    selector: &Selector,
    scope: &impl AnchorScope,
    anchors: &mut SelectorAnchors,
) -> Result<(), AnchorError> {
    if let Selector::Named { name } = selector {
        let producer = scope
            .output_producer(name)
            .ok_or_else(|| AnchorError::NamedMissing(name.clone()))?;
        anchors.features.insert(producer.clone());
        return Ok(());
    }
    let Some(query) = selector.query() else {
        return Ok(());
    };

    let mut pinned = false;
    for predicate in query.predicates {
        if let Predicate::CreatedBy { feature_id } = predicate {
            if !scope.contains_feature(feature_id) {
                return Err(AnchorError::CreatedByMissing(feature_id.clone()));
            }
            anchors.features.insert(feature_id.clone());
            pinned = true;
        }
    }
    if !pinned {
        anchors.unanchored.push(selector.clone());
    }

    for rule in query.rank {
        if let RankRule::ClosestTo { target } = rule {
            visit(target, scope, anchors)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Scope {
        features: BTreeSet<FeatureId>,
        outputs: BTreeMap<String, FeatureId>,
    }

    impl AnchorScope for Scope {
        fn contains_feature(&self, id: &FeatureId) -> bool {
            self.features.contains(id)
        }

        fn output_producer(&self, name: &str) -> Option<&FeatureId> {
            self.outputs.get(name)
        }
    }

    fn scope() -> Scope {
        Scope {
            features: ["base", "cut"].into_iter().map(FeatureId::from).collect(),
            outputs: [("body:main".to_string(), FeatureId::from("base"))].into(),
        }
    }

    #[test]
    fn test_named_pins_to_producer() {
        let anchors = analyze_selector(&Selector::named("body:main"), &scope()).unwrap();
        assert_eq!(anchors.features, BTreeSet::from([FeatureId::from("base")]));
        assert!(anchors.is_fully_anchored());

        let err = analyze_selector(&Selector::named("body:ghost"), &scope()).unwrap_err();
        assert_eq!(err, AnchorError::NamedMissing("body:ghost".into()));
    }

    #[test]
    fn test_created_by_and_nested_targets() {
        let selector = Selector::edge(
            vec![Predicate::created_by("cut")],
            vec![RankRule::closest_to(Selector::face(
                vec![Predicate::created_by("base"), Predicate::Planar],
                vec![],
            ))],
        );
        let anchors = analyze_selector(&selector, &scope()).unwrap();
        assert_eq!(anchors.features.len(), 2);
        assert!(anchors.is_fully_anchored());
    }

    #[test]
    fn test_unanchored_nested_target() {
        let selector = Selector::edge(
            vec![Predicate::created_by("cut")],
            vec![RankRule::closest_to(Selector::face(vec![Predicate::Planar], vec![]))],
        );
        let anchors = analyze_selector(&selector, &scope()).unwrap();
        assert_eq!(anchors.unanchored.len(), 1);
    }

    #[test]
    fn test_unknown_created_by() {
        let selector = Selector::face(vec![Predicate::created_by("nope")], vec![]);
        let err = analyze_selector(&selector, &scope()).unwrap_err();
        assert_eq!(err, AnchorError::CreatedByMissing("nope".into()));
    }
}
