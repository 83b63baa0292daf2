//! Part parameters and scalar evaluation.
//!
//! A [`ParamContext`] is built once per compile from the part's parameter
//! definitions, the caller's overrides and the unit system. Every `Scalar`
//! field of every feature is then evaluated against it.

pub mod expr;
pub mod units;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::normalize::ValidationError;
use crate::types::Scalar;

pub use units::{Dimension, UnitSystem};

/// Parameter value overrides, keyed by parameter id. Values are already in
/// part units (lengths) or degrees (angles).
pub type ParamOverrides = BTreeMap<String, f64>;

/// Parameter definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    /// Identifier referenced by `expr.param`.
    pub id: String,
    /// Declared dimension.
    #[serde(rename = "type")]
    pub kind: Dimension,
    /// Default value; may reference earlier parameters.
    pub value: Scalar,
}

impl ParamDef {
    /// Create a parameter definition.
    pub fn new(id: impl Into<String>, kind: Dimension, value: impl Into<Scalar>) -> Self {
        Self {
            id: id.into(),
            kind,
            value: value.into(),
        }
    }
}

/// Evaluated parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamValue {
    /// Declared dimension.
    pub kind: Dimension,
    /// Concrete value.
    pub value: f64,
}

fn param_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// Evaluated parameters plus the unit system, passed explicitly to every
/// scalar evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamContext {
    /// Length unit system.
    pub units: UnitSystem,
    /// Evaluated parameters.
    pub values: BTreeMap<String, ParamValue>,
}

impl ParamContext {
    /// Empty context in the given unit system.
    pub fn empty(units: UnitSystem) -> Self {
        Self {
            units,
            values: BTreeMap::new(),
        }
    }

    /// Build a context from definitions and overrides.
    ///
    /// Definitions are evaluated in declaration order, so a definition may
    /// reference only parameters declared before it. An override replaces the
    /// definition's value outright.
    pub fn build(
        defs: &[ParamDef],
        overrides: &ParamOverrides,
        units: UnitSystem,
    ) -> Result<Self, ValidationError> {
        let mut ctx = Self::empty(units);

        for def in defs {
            if !param_name_regex().is_match(&def.id) {
                return Err(ValidationError::ParamName { id: def.id.clone() });
            }
            if ctx.values.contains_key(&def.id) {
                return Err(ValidationError::ParamDuplicate { id: def.id.clone() });
            }

            let value = match overrides.get(&def.id) {
                Some(&v) => {
                    if !v.is_finite() {
                        return Err(ValidationError::NonFinite {
                            context: format!("override for parameter '{}'", def.id),
                        });
                    }
                    v
                }
                None => {
                    if def.kind == Dimension::Angle && is_unitless_literal(&def.value) {
                        return Err(ValidationError::UnitMissing { id: def.id.clone() });
                    }
                    ctx.evaluate(&def.value, def.kind, &format!("parameter '{}'", def.id))?
                }
            };

            ctx.values.insert(def.id.clone(), ParamValue { kind: def.kind, value });
        }

        if let Some(unknown) = overrides.keys().find(|k| !ctx.values.contains_key(*k)) {
            return Err(ValidationError::OverrideUnknown { id: unknown.clone() });
        }

        Ok(ctx)
    }

    /// Look up an evaluated parameter.
    pub fn get(&self, id: &str) -> Option<&ParamValue> {
        self.values.get(id)
    }

    /// Evaluate a scalar to a finite number of the expected dimension.
    ///
    /// `field` names the location for error messages.
    pub fn evaluate(
        &self,
        scalar: &Scalar,
        expected: Dimension,
        field: &str,
    ) -> Result<f64, ValidationError> {
        let value = expr::evaluate_scalar(scalar, expected, self)?;
        if !value.is_finite() {
            return Err(ValidationError::NonFinite {
                context: field.to_string(),
            });
        }
        Ok(value)
    }
}

fn is_unitless_literal(scalar: &Scalar) -> bool {
    match scalar {
        Scalar::Value(_) => true,
        Scalar::Expr(crate::types::Expr::Literal { unit, .. }) => unit.is_none(),
        Scalar::Expr(_) => false,
    }
}
