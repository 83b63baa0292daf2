//! Selector query types.
//!
//! A selector is a declarative query for geometry produced earlier in the
//! build: a face/edge/solid query filtered by [`Predicate`]s and narrowed by
//! [`RankRule`]s, or a direct reference to a named output.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::feature::{AxisDirection, FeatureId};
use super::selection::SelectionKind;

/// Conjunctive filter tested against a candidate's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Predicate {
    /// Candidate is planar (`meta.planar == true`).
    #[serde(rename = "pred.planar")]
    Planar,
    /// Candidate normal equals the given axis (`meta.normal`).
    #[serde(rename = "pred.normal")]
    Normal {
        /// Expected normal.
        value: AxisDirection,
    },
    /// Candidate was produced by the given feature (`meta.createdBy`).
    #[serde(rename = "pred.createdBy")]
    CreatedBy {
        /// Producing feature.
        #[serde(rename = "featureId")]
        feature_id: FeatureId,
    },
    /// Candidate carries the given role (`meta.role`).
    #[serde(rename = "pred.role")]
    Role {
        /// Expected role.
        value: String,
    },
}

impl Predicate {
    /// `pred.normal(axis)`.
    pub fn normal(value: AxisDirection) -> Self {
        Self::Normal { value }
    }

    /// `pred.createdBy(feature)`.
    pub fn created_by(feature_id: impl Into<FeatureId>) -> Self {
        Self::CreatedBy { feature_id: feature_id.into() }
    }

    /// `pred.role(value)`.
    pub fn role(value: impl Into<String>) -> Self {
        Self::Role { value: value.into() }
    }
}

/// Scoring rule used to narrow an ambiguous candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RankRule {
    /// Largest `area` wins.
    #[serde(rename = "rank.maxArea")]
    MaxArea,
    /// Lowest `centerZ` wins.
    #[serde(rename = "rank.minZ")]
    MinZ,
    /// Highest `centerZ` wins.
    #[serde(rename = "rank.maxZ")]
    MaxZ,
    /// Nearest `center` to the target selection wins.
    #[serde(rename = "rank.closestTo")]
    ClosestTo {
        /// Selector resolving to exactly one reference selection.
        target: Box<Selector>,
    },
}

impl RankRule {
    /// `rank.closestTo(target)`.
    pub fn closest_to(target: Selector) -> Self {
        Self::ClosestTo { target: Box::new(target) }
    }
}

/// Declarative geometry query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Selector {
    /// Face query.
    #[serde(rename = "selector.face")]
    Face {
        /// Filters (conjunction).
        #[serde(default)]
        predicates: Vec<Predicate>,
        /// Ranking rules, applied in order.
        #[serde(default)]
        rank: Vec<RankRule>,
    },
    /// Edge query.
    #[serde(rename = "selector.edge")]
    Edge {
        /// Filters (conjunction).
        #[serde(default)]
        predicates: Vec<Predicate>,
        /// Ranking rules, applied in order.
        #[serde(default)]
        rank: Vec<RankRule>,
    },
    /// Solid query.
    #[serde(rename = "selector.solid")]
    Solid {
        /// Filters (conjunction).
        #[serde(default)]
        predicates: Vec<Predicate>,
        /// Ranking rules, applied in order.
        #[serde(default)]
        rank: Vec<RankRule>,
    },
    /// Direct reference to a named output.
    #[serde(rename = "selector.named")]
    Named {
        /// Output name (e.g. `"body:main"`).
        name: String,
    },
}

/// Borrowed view of a face/edge/solid query.
#[derive(Debug, Clone, Copy)]
pub struct QueryView<'a> {
    /// Selection kind the query filters to.
    pub kind: SelectionKind,
    /// Predicates.
    pub predicates: &'a [Predicate],
    /// Rank rules.
    pub rank: &'a [RankRule],
}

impl Selector {
    /// Face query.
    pub fn face(predicates: Vec<Predicate>, rank: Vec<RankRule>) -> Self {
        Self::Face { predicates, rank }
    }

    /// Edge query.
    pub fn edge(predicates: Vec<Predicate>, rank: Vec<RankRule>) -> Self {
        Self::Edge { predicates, rank }
    }

    /// Solid query.
    pub fn solid(predicates: Vec<Predicate>, rank: Vec<RankRule>) -> Self {
        Self::Solid { predicates, rank }
    }

    /// Named output reference.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    /// Query parts of a face/edge/solid selector; `None` for `named`.
    pub fn query(&self) -> Option<QueryView<'_>> {
        let (kind, predicates, rank) = match self {
            Self::Face { predicates, rank } => (SelectionKind::Face, predicates, rank),
            Self::Edge { predicates, rank } => (SelectionKind::Edge, predicates, rank),
            Self::Solid { predicates, rank } => (SelectionKind::Solid, predicates, rank),
            Self::Named { .. } => return None,
        };
        Some(QueryView { kind, predicates, rank })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name } => write!(f, "selector.named({name})"),
            Self::Face { predicates, rank } => {
                write!(f, "selector.face({}p, {}r)", predicates.len(), rank.len())
            }
            Self::Edge { predicates, rank } => {
                write!(f, "selector.edge({}p, {}r)", predicates.len(), rank.len())
            }
            Self::Solid { predicates, rank } => {
                write!(f, "selector.solid({}p, {}r)", predicates.len(), rank.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_json_shape() {
        let json = r#"{
            "kind": "selector.face",
            "predicates": [
                {"kind": "pred.planar"},
                {"kind": "pred.normal", "value": "+Z"},
                {"kind": "pred.createdBy", "featureId": "base"}
            ],
            "rank": [{"kind": "rank.maxArea"}]
        }"#;
        let selector: Selector = serde_json::from_str(json).unwrap();

        assert_eq!(
            selector,
            Selector::face(
                vec![
                    Predicate::Planar,
                    Predicate::normal(AxisDirection::PosZ),
                    Predicate::created_by("base"),
                ],
                vec![RankRule::MaxArea],
            )
        );
    }

    #[test]
    fn test_closest_to_nests_selector() {
        let json = r#"{
            "kind": "selector.edge",
            "rank": [{"kind": "rank.closestTo", "target": {"kind": "selector.named", "name": "body:main"}}]
        }"#;
        let selector: Selector = serde_json::from_str(json).unwrap();
        let query = selector.query().unwrap();

        assert_eq!(query.kind, SelectionKind::Edge);
        assert!(query.predicates.is_empty());
        assert_eq!(query.rank, &[RankRule::closest_to(Selector::named("body:main"))]);
    }

    #[test]
    fn test_named_has_no_query() {
        assert!(Selector::named("body:main").query().is_none());
    }
}
