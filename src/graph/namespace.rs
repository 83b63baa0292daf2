//! Part-wide namespaces: feature ids, sketch profiles, outputs, patterns.

use std::collections::{BTreeMap, BTreeSet};

use super::GraphError;
use crate::selector::AnchorScope;
use crate::types::{Feature, FeatureId};

/// Validated namespaces of one feature list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    /// Declared feature ids.
    pub ids: BTreeSet<FeatureId>,
    /// Profile name → declaring sketch.
    pub profiles: BTreeMap<String, FeatureId>,
    /// Output name → producing feature.
    pub outputs: BTreeMap<String, FeatureId>,
    /// Ids of pattern features.
    pub patterns: BTreeSet<FeatureId>,
}

impl Namespace {
    /// Collect namespaces in one pass, failing on the first violation.
    pub fn collect(features: &[Feature]) -> Result<Self, GraphError> {
        let mut ns = Self::default();

        for (index, feature) in features.iter().enumerate() {
            if feature.id.is_empty() {
                return Err(GraphError::FeatureIdRequired { index });
            }
            if !ns.ids.insert(feature.id.clone()) {
                return Err(GraphError::FeatureDuplicate {
                    id: feature.id.clone(),
                });
            }

            for name in feature.declared_profiles() {
                if let Some(first) = ns.profiles.get(name) {
                    return Err(GraphError::ProfileDuplicate {
                        name: name.to_string(),
                        first: first.clone(),
                        second: feature.id.clone(),
                    });
                }
                ns.profiles.insert(name.to_string(), feature.id.clone());
            }

            for name in feature.outputs() {
                if let Some(first) = ns.outputs.get(name) {
                    return Err(GraphError::OutputDuplicate {
                        name: name.to_string(),
                        first: first.clone(),
                        second: feature.id.clone(),
                    });
                }
                ns.outputs.insert(name.to_string(), feature.id.clone());
            }

            if feature.is_pattern() {
                ns.patterns.insert(feature.id.clone());
            }
        }

        Ok(ns)
    }

    /// Sketch that declared a profile.
    pub fn profile_owner(&self, name: &str) -> Option<&FeatureId> {
        self.profiles.get(name)
    }

    /// Whether `id` names a pattern feature.
    pub fn is_pattern(&self, id: &FeatureId) -> bool {
        self.patterns.contains(id)
    }
}

impl AnchorScope for Namespace {
    fn contains_feature(&self, id: &FeatureId) -> bool {
        self.ids.contains(id)
    }

    fn output_producer(&self, name: &str) -> Option<&FeatureId> {
        self.outputs.get(name)
    }
}
