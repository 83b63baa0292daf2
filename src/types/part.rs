//! Part: the unit of compilation.

use serde::{Deserialize, Serialize};

use super::feature::Feature;
use crate::normalize::ValidationError;
use crate::params::{ParamDef, UnitSystem};

/// A part as handed over by the DSL layer, free of authoring sugar.
///
/// `constraints`, `assertions` and `fti` are carried as opaque data; they are
/// not evaluated by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part id.
    pub id: String,
    /// Length unit system (compile option default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<UnitSystem>,
    /// Parameter definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamDef>,
    /// Features in declaration order.
    pub features: Vec<Feature>,
    /// Engineering constraints (data only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<serde_json::Value>,
    /// Assertions (data only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<serde_json::Value>,
    /// Functional tolerancing annotations (data only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fti: Option<serde_json::Value>,
}

impl Part {
    /// Create a part with no parameters or annotations.
    pub fn new(id: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            id: id.into(),
            units: None,
            params: Vec::new(),
            features,
            constraints: Vec::new(),
            assertions: Vec::new(),
            fti: None,
        }
    }

    /// Add parameter definitions.
    pub fn with_params(mut self, params: Vec<ParamDef>) -> Self {
        self.params = params;
        self
    }

    /// Parse a part from JSON.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::Parse(e.to_string()))
    }

    /// Whether the part carries constraint/assertion/FTI data that this
    /// pipeline does not evaluate.
    pub fn has_data_only_annotations(&self) -> bool {
        !self.constraints.is_empty() || !self.assertions.is_empty() || self.fti.is_some()
    }
}
