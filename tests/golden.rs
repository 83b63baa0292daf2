//! Golden tests for the part kernel.
//!
//! These tests verify determinism and correctness of compilation and
//! selector resolution on small, hand-checked parts.

use part_graph_kernel::types::{meta_keys, Depth, ProfileSpec, Scalar};
use part_graph_kernel::{
    compile_part, hash_feature, resolve_selector, resolve_selector_set, AxisDirection,
    CompileResult, Feature, FeatureId, FeatureKind, ParamOverrides, Part, Predicate, RankRule,
    ResolutionContext, Selection, SelectionKind, Selector,
};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

const BRACKET: &str = r#"{
    "id": "bracket",
    "units": "mm",
    "params": [
        {"id": "width", "type": "length", "value": 40},
        {"id": "thickness", "type": "length", "value": {"kind": "expr.literal", "value": 0.5, "unit": "cm"}},
        {"id": "holes", "type": "count", "value": 4}
    ],
    "features": [
        {
            "id": "round",
            "kind": "feature.fillet",
            "edges": {
                "kind": "selector.edge",
                "predicates": [{"kind": "pred.createdBy", "featureId": "plate"}],
                "rank": [{"kind": "rank.maxZ"}]
            },
            "radius": 1
        },
        {
            "id": "plate",
            "kind": "feature.extrude",
            "profile": {"kind": "profile.ref", "name": "profile:outline"},
            "depth": {"kind": "expr.param", "id": "thickness"},
            "result": "body:plate"
        },
        {
            "id": "sketch",
            "kind": "feature.sketch2d",
            "profiles": [{
                "name": "profile:outline",
                "profile": {
                    "kind": "profile.rectangle",
                    "width": {"kind": "expr.param", "id": "width"},
                    "height": {"kind": "expr.binary", "op": "/", "left": {"kind": "expr.param", "id": "width"}, "right": 2}
                }
            }]
        },
        {
            "id": "drill",
            "kind": "feature.hole",
            "on": {
                "kind": "selector.face",
                "predicates": [
                    {"kind": "pred.createdBy", "featureId": "plate"},
                    {"kind": "pred.planar"},
                    {"kind": "pred.normal", "value": "+Z"},
                    {"kind": "pred.planar"}
                ]
            },
            "diameter": 3,
            "depth": "throughAll",
            "pattern": {"kind": "pattern.ref", "name": "grid"}
        },
        {
            "id": "grid",
            "kind": "pattern.linear",
            "origin": {"kind": "selector.named", "name": "body:plate"},
            "direction": "+X",
            "spacing": 8,
            "count": {"kind": "expr.param", "id": "holes"}
        }
    ],
    "assertions": [{"kind": "assert.minWall", "value": 1.5}]
}"#;

fn bracket() -> Part {
    Part::from_json(BRACKET).expect("bracket parses")
}

fn order_of(result: &CompileResult) -> Vec<&str> {
    result.feature_order.iter().map(FeatureId::as_str).collect()
}

fn extrude(id: &str, result: &str) -> Feature {
    Feature::new(
        id,
        FeatureKind::Extrude {
            profile: ProfileSpec::Rectangle {
                width: Scalar::Value(10.0),
                height: Scalar::Value(10.0),
                center: Default::default(),
            },
            depth: Depth::Distance(Scalar::Value(5.0)),
            axis: None,
            result: result.into(),
            pattern: None,
        },
    )
}

fn fillet(id: &str, edges: Selector) -> Feature {
    Feature::new(
        id,
        FeatureKind::Fillet {
            edges,
            radius: Scalar::Value(1.0),
            result: None,
        },
    )
}

fn face(id: &str, area: f64) -> Selection {
    Selection::new(id, SelectionKind::Face)
        .with_meta(meta_keys::PLANAR, true)
        .with_meta(meta_keys::NORMAL, "+Z")
        .with_meta(meta_keys::AREA, area)
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_compile_determinism() {
    let first = compile_part(&bracket(), None).unwrap();
    for _ in 0..5 {
        let again = compile_part(&bracket(), None).unwrap();
        assert_eq!(first.feature_order, again.feature_order);
        assert_eq!(first.feature_hashes, again.feature_hashes);
        assert_eq!(first.graph, again.graph);
    }
}

#[test]
fn test_bracket_golden_order() {
    let result = compile_part(&bracket(), None).unwrap();
    assert_eq!(order_of(&result), vec!["sketch", "plate", "round", "grid", "drill"]);
}

#[test]
fn test_bracket_normalized_values() {
    let result = compile_part(&bracket(), None).unwrap();

    match &result.feature("plate").unwrap().kind {
        FeatureKind::Extrude { depth, .. } => {
            assert_eq!(*depth, Depth::Distance(Scalar::Value(5.0)))
        }
        other => panic!("unexpected kind {other:?}"),
    }
    match &result.feature("sketch").unwrap().kind {
        FeatureKind::Sketch2d { profiles, .. } => assert_eq!(
            profiles[0].profile,
            ProfileSpec::Rectangle {
                width: Scalar::Value(40.0),
                height: Scalar::Value(20.0),
                center: [Scalar::Value(0.0), Scalar::Value(0.0)],
            }
        ),
        other => panic!("unexpected kind {other:?}"),
    }
    match &result.feature("drill").unwrap().kind {
        FeatureKind::Hole { on, depth, .. } => {
            assert_eq!(*depth, Depth::ThroughAll);
            assert_eq!(
                *on,
                Selector::face(
                    vec![
                        Predicate::created_by("plate"),
                        Predicate::Planar,
                        Predicate::normal(AxisDirection::PosZ),
                    ],
                    vec![],
                )
            );
        }
        other => panic!("unexpected kind {other:?}"),
    }

    assert_eq!(result.diagnostics.len(), 1);
}

#[test]
fn test_feature_hash_is_position_independent() {
    let result = compile_part(&bracket(), None).unwrap();
    let plate = result.feature("plate").unwrap();

    let alone = compile_part(
        &Part::new(
            "other",
            vec![
                result.feature("sketch").unwrap().clone(),
                plate.clone(),
            ],
        ),
        None,
    )
    .unwrap();

    assert_eq!(result.feature_hashes[&plate.id], hash_feature(plate));
    assert_eq!(result.feature_hashes[&plate.id], alone.feature_hashes[&plate.id]);
}

#[test]
fn test_overrides_change_hashes_not_order() {
    let base = compile_part(&bracket(), None).unwrap();

    let mut overrides = ParamOverrides::new();
    overrides.insert("thickness".into(), 8.0);
    let thick = compile_part(&bracket(), Some(&overrides)).unwrap();

    assert_eq!(base.feature_order, thick.feature_order);
    let plate = FeatureId::from("plate");
    assert_ne!(base.feature_hashes[&plate], thick.feature_hashes[&plate]);
    let sketch = FeatureId::from("sketch");
    assert_eq!(base.feature_hashes[&sketch], thick.feature_hashes[&sketch]);

    let base_key = base.cache_key("occt", &ParamOverrides::new()).unwrap();
    let thick_key = thick.cache_key("occt", &overrides).unwrap();
    assert_ne!(base_key, thick_key);
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph Properties
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_order_respects_every_edge() {
    let result = compile_part(&bracket(), None).unwrap();
    for edge in &result.graph.edges {
        let from = result.position(edge.from.as_str()).unwrap();
        let to = result.position(edge.to.as_str()).unwrap();
        assert!(from < to, "{} must precede {}", edge.from, edge.to);
    }
}

#[test]
fn test_uniqueness_enforced() {
    let dup = Part::new("p", vec![extrude("a", "body:a"), extrude("a", "body:b")]);
    assert_eq!(compile_part(&dup, None).unwrap_err().code(), "validation_feature_duplicate");

    let dup_output = Part::new("p", vec![extrude("a", "body:x"), extrude("b", "body:x")]);
    assert_eq!(compile_part(&dup_output, None).unwrap_err().code(), "output_duplicate");

    let mut part = bracket();
    let sketch = part.features.iter().find(|f| f.id.as_str() == "sketch").unwrap().clone();
    let mut copy = sketch;
    copy.id = FeatureId::from("sketch_copy");
    part.features.push(copy);
    assert_eq!(compile_part(&part, None).unwrap_err().code(), "profile_duplicate");
}

#[test]
fn test_profile_ref_anchor_inference() {
    let result = compile_part(&bracket(), None).unwrap();
    let plate = FeatureId::from("plate");
    let deps: Vec<&str> = result.graph.dependencies_of(&plate).map(FeatureId::as_str).collect();
    assert_eq!(deps, vec!["sketch"]);
}

#[test]
fn test_anchorless_selector_rejected() {
    let part = Part::new(
        "p",
        vec![
            extrude("base", "body:main"),
            fillet("f1", Selector::edge(vec![Predicate::role("outer")], vec![])),
        ],
    );
    let err = compile_part(&part, None).unwrap_err();
    assert_eq!(err.code(), "selector_anchor_missing");
}

#[test]
fn test_end_to_end_created_by() {
    let part = Part::new(
        "p",
        vec![
            extrude("base", "body:main"),
            fillet("f1", Selector::edge(vec![Predicate::created_by("base")], vec![])),
        ],
    );
    let result = compile_part(&part, None).unwrap();
    assert_eq!(order_of(&result), vec!["base", "f1"]);

    let dropped = Part::new(
        "p",
        vec![extrude("base", "body:main"), fillet("f1", Selector::edge(vec![], vec![]))],
    );
    assert_eq!(compile_part(&dropped, None).unwrap_err().code(), "selector_anchor_missing");
}

#[test]
fn test_cycle_reported() {
    let part = Part::new(
        "p",
        vec![
            extrude("a", "body:a").with_deps(["b"]),
            extrude("b", "body:b").with_deps(["a"]),
        ],
    );
    let err = compile_part(&part, None).unwrap_err();
    assert_eq!(err.code(), "graph_cycle");
    assert!(err.to_string().contains('a') && err.to_string().contains('b'));
}

// ─────────────────────────────────────────────────────────────────────────────
// Selector Properties
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_rank_ties_kept() {
    let ctx = ResolutionContext::from_selections(vec![
        face("f10", 10.0),
        face("f20a", 20.0),
        face("f20b", 20.0),
    ]);
    let selector = Selector::face(vec![], vec![RankRule::MaxArea]);

    let set = resolve_selector_set(&selector, &ctx).unwrap();
    let ids: Vec<&str> = set.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["f20a", "f20b"]);

    assert_eq!(resolve_selector(&selector, &ctx).unwrap_err().code(), "selector_ambiguous");
}

#[test]
fn test_predicate_conjunction() {
    let ctx = ResolutionContext::from_selections(vec![
        Selection::new("side", SelectionKind::Face)
            .with_meta(meta_keys::PLANAR, true)
            .with_meta(meta_keys::NORMAL, "+X"),
        Selection::new("cyl", SelectionKind::Face).with_meta(meta_keys::PLANAR, false),
        face("top", 1.0),
    ]);
    let selector = Selector::face(
        vec![Predicate::Planar, Predicate::normal(AxisDirection::PosZ)],
        vec![],
    );
    assert_eq!(resolve_selector(&selector, &ctx).unwrap().id, "top");
}

#[test]
fn test_missing_metadata() {
    let ctx = ResolutionContext::from_selections(vec![
        Selection::new("bare", SelectionKind::Face),
        face("top", 1.0),
    ]);
    let err = resolve_selector(&Selector::face(vec![Predicate::Planar], vec![]), &ctx).unwrap_err();
    assert_eq!(err.code(), "selector_meta_missing");
}

// ─────────────────────────────────────────────────────────────────────────────
// Generated DAGs
// ─────────────────────────────────────────────────────────────────────────────

/// Random DAG over `n` features (deps point to lower indices) plus a random
/// declaration order.
fn arb_dag() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    (1usize..12)
        .prop_flat_map(|n| {
            let masks = proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n);
            let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
            (masks, order)
        })
        .prop_map(|(masks, order)| {
            let deps = masks
                .iter()
                .enumerate()
                .map(|(i, row)| (0..i).filter(|&j| row[j]).collect())
                .collect();
            (deps, order)
        })
}

fn dag_part(deps: &[Vec<usize>], order: &[usize]) -> Part {
    let features = order
        .iter()
        .map(|&i| {
            extrude(&format!("f{i}"), &format!("body:f{i}"))
                .with_deps(deps[i].iter().map(|j| format!("f{j}")))
        })
        .collect();
    Part::new("generated", features)
}

proptest! {
    #[test]
    fn generated_order_respects_edges((deps, order) in arb_dag()) {
        let result = compile_part(&dag_part(&deps, &order), None).unwrap();
        prop_assert_eq!(result.feature_order.len(), order.len());
        for (i, ds) in deps.iter().enumerate() {
            let to = result.position(&format!("f{i}")).unwrap();
            for j in ds {
                let from = result.position(&format!("f{j}")).unwrap();
                prop_assert!(from < to);
            }
        }
    }

    #[test]
    fn generated_compile_is_deterministic((deps, order) in arb_dag()) {
        let part = dag_part(&deps, &order);
        let a = compile_part(&part, None).unwrap();
        let b = compile_part(&part, None).unwrap();
        prop_assert_eq!(a.feature_order, b.feature_order);
        prop_assert_eq!(a.feature_hashes, b.feature_hashes);
    }

    #[test]
    fn independent_features_keep_declaration_order(
        order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let none: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
        let result = compile_part(&dag_part(&none, &order), None).unwrap();
        let expected: Vec<String> = order.iter().map(|i| format!("f{i}")).collect();
        let actual: Vec<String> = result.feature_order.iter().map(|f| f.to_string()).collect();
        prop_assert_eq!(actual, expected);
    }
}
