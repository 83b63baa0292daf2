//! Part compilation: normalize → build graph → topological sort.
//!
//! ```text
//! Part ─normalize_part─▶ features ─build_graph─▶ Graph ─topo_sort─▶ order
//!                                                                     │
//!                                         hash_feature (per feature) ◀┘
//! ```
//!
//! The result is a pure function of the part, the overrides and the options:
//! compiling the same input twice yields identical orders and hashes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cache_key::BuildCacheKey;
use crate::graph::{build_graph, topo_sort, Graph, GraphError};
use crate::hasher::hash_feature;
use crate::normalize::{normalize_part, ValidationError};
use crate::params::{ParamOverrides, UnitSystem};
use crate::selector::SelectorError;
use crate::types::{Diagnostic, ErrorReport, Feature, FeatureId, Part};

/// Compile-time configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Unit system for parts that do not declare one.
    pub default_units: UnitSystem,
    /// Emit the data-only diagnostic for constraints/assertions/FTI.
    pub data_only_diagnostics: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_units: UnitSystem::Mm,
            data_only_diagnostics: true,
        }
    }
}

impl CompileOptions {
    /// Read options from the environment.
    ///
    /// - `PART_UNITS`: `mm`, `cm`, `m` or `in` (default `mm`)
    /// - `PART_DATA_ONLY_DIAGNOSTICS`: `true`/`false`/`1`/`0` (default `true`)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(raw) = std::env::var("PART_UNITS") {
            match UnitSystem::from_name(&raw) {
                Some(units) => options.default_units = units,
                None => tracing::warn!(value = %raw, "ignoring unknown PART_UNITS"),
            }
        }

        if let Ok(raw) = std::env::var("PART_DATA_ONLY_DIAGNOSTICS") {
            match parse_flag(&raw) {
                Some(flag) => options.data_only_diagnostics = flag,
                None => tracing::warn!(value = %raw, "ignoring invalid PART_DATA_ONLY_DIAGNOSTICS"),
            }
        }

        options
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Output of a successful compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    /// Part id.
    pub part_id: String,
    /// Effective unit system.
    pub units: UnitSystem,
    /// Deterministic build order.
    pub feature_order: Vec<FeatureId>,
    /// Dependency graph (nodes in declaration order).
    pub graph: Graph,
    /// Normalized features, in build order.
    pub features: Vec<Feature>,
    /// Content hash per feature.
    pub feature_hashes: BTreeMap<FeatureId, String>,
    /// Non-fatal diagnostics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    /// Normalized feature by id.
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id.as_str() == id)
    }

    /// Position of a feature in the build order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.feature_order.iter().position(|f| f.as_str() == id)
    }

    /// Cache key for building this result on a given backend.
    ///
    /// `None` only if `feature_hashes` was edited to drop an ordered feature.
    pub fn cache_key(
        &self,
        backend_fingerprint: &str,
        overrides: &ParamOverrides,
    ) -> Option<BuildCacheKey> {
        BuildCacheKey::derive(
            &self.part_id,
            &self.feature_order,
            &self.feature_hashes,
            backend_fingerprint,
            overrides,
        )
    }
}

/// Any failure surfaced by this crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// Normalization / input validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Graph construction or ordering.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Run-time selector resolution.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

impl CompileError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Graph(e) => e.code(),
            Self::Selector(e) => e.code(),
        }
    }

    /// `{code, message}` report.
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.code(), self.to_string())
    }
}

/// Compiles parts with fixed options.
#[derive(Debug, Clone, Default)]
pub struct PartCompiler {
    options: CompileOptions,
}

impl PartCompiler {
    /// Create a compiler.
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a part.
    pub fn compile(
        &self,
        part: &Part,
        overrides: Option<&ParamOverrides>,
    ) -> Result<CompileResult, CompileError> {
        let empty = ParamOverrides::new();
        let overrides = overrides.unwrap_or(&empty);

        let normalized = normalize_part(part, overrides, &self.options)?;
        let graph = build_graph(&normalized.features)?;
        let feature_order = topo_sort(&graph)?;

        let mut by_id: BTreeMap<FeatureId, Feature> = normalized
            .features
            .into_iter()
            .map(|f| (f.id.clone(), f))
            .collect();
        let features: Vec<Feature> = feature_order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        let feature_hashes = features
            .iter()
            .map(|f| (f.id.clone(), hash_feature(f)))
            .collect();

        tracing::info!(
            part_id = %normalized.part_id,
            feature_count = features.len(),
            edge_count = graph.edge_count(),
            diagnostics = normalized.diagnostics.len(),
            "compiled part"
        );

        Ok(CompileResult {
            part_id: normalized.part_id,
            units: normalized.units,
            feature_order,
            graph,
            features,
            feature_hashes,
            diagnostics: normalized.diagnostics,
        })
    }
}

/// Compile a part with default options.
pub fn compile_part(
    part: &Part,
    overrides: Option<&ParamOverrides>,
) -> Result<CompileResult, CompileError> {
    PartCompiler::default().compile(part, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Depth, FeatureKind, Predicate, ProfileSpec, Scalar, Selector};

    fn base() -> Feature {
        Feature::new(
            "base",
            FeatureKind::Extrude {
                profile: ProfileSpec::Rectangle {
                    width: Scalar::Value(20.0),
                    height: Scalar::Value(10.0),
                    center: Default::default(),
                },
                depth: Depth::Distance(Scalar::Value(5.0)),
                axis: None,
                result: "body:main".into(),
                pattern: None,
            },
        )
    }

    fn fillet(edges: Selector) -> Feature {
        Feature::new(
            "f1",
            FeatureKind::Fillet {
                edges,
                radius: Scalar::Value(1.0),
                result: None,
            },
        )
    }

    #[test]
    fn test_compile_orders_and_hashes() {
        let part = Part::new(
            "plate",
            vec![
                fillet(Selector::edge(vec![Predicate::created_by("base")], vec![])),
                base(),
            ],
        );
        let result = compile_part(&part, None).unwrap();

        let order: Vec<&str> = result.feature_order.iter().map(FeatureId::as_str).collect();
        assert_eq!(order, vec!["base", "f1"]);
        assert_eq!(result.features[0].id.as_str(), "base");
        assert_eq!(result.feature_hashes.len(), 2);
        assert_eq!(result.position("f1"), Some(1));
        assert!(result.feature("base").is_some());
        assert_eq!(result.units, UnitSystem::Mm);
        assert!(result.cache_key("occt", &ParamOverrides::new()).is_some());
    }

    #[test]
    fn test_errors_carry_stage_codes() {
        let part = Part::new(
            "plate",
            vec![base(), fillet(Selector::edge(vec![Predicate::Planar], vec![]))],
        );
        let err = compile_part(&part, None).unwrap_err();
        assert!(matches!(err, CompileError::Graph(_)));
        assert_eq!(err.report().code, "selector_anchor_missing");

        let mut overrides = ParamOverrides::new();
        overrides.insert("ghost".into(), 1.0);
        let err = compile_part(&Part::new("p", vec![base()]), Some(&overrides)).unwrap_err();
        assert_eq!(err.code(), "validation_override_unknown");
    }

    #[test]
    fn test_options_units() {
        let compiler = PartCompiler::new(CompileOptions {
            default_units: UnitSystem::In,
            ..CompileOptions::default()
        });
        let result = compiler.compile(&Part::new("p", vec![base()]), None).unwrap();
        assert_eq!(result.units, UnitSystem::In);
        assert_eq!(compiler.options().default_units, UnitSystem::In);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_options_json_defaults() {
        let options: CompileOptions = serde_json::from_str(r#"{"defaultUnits": "cm"}"#).unwrap();
        assert_eq!(options.default_units, UnitSystem::Cm);
        assert!(options.data_only_diagnostics);
    }
}
