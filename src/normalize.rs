//! Normalization: parameter evaluation and selector canonicalization.
//!
//! [`normalize_part`] returns a feature list of identical shape in which
//!
//! - every `Scalar` field holds a concrete number (`throughAll`/`full`
//!   sentinels pass through unchanged),
//! - sizes are positive, counts are integers, axis vectors are non-zero,
//! - every embedded selector is in canonical form.
//!
//! Nothing else about a feature changes, so the graph builder and the feature
//! hasher see exactly what the backend will execute.

use regex_lite::Regex;
use std::sync::OnceLock;

use crate::compile::CompileOptions;
use crate::params::{Dimension, ParamContext, ParamOverrides, UnitSystem};
use crate::selector::normalize_selector;
use crate::types::{
    AxisDefinition, AxisSpec, Depth, Diagnostic, ErrorReport, Feature, FeatureKind, Part,
    ProfileSpec, Scalar, Selector, SketchProfile, SweepAngle,
};

/// Code of the diagnostic emitted for constraint/assertion/FTI data.
pub const DATA_ONLY_DIAGNOSTIC: &str = "annotations_data_only";

/// Error type for normalization and input validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Feature with an empty id.
    #[error("Feature at index {index} has an empty id")]
    FeatureIdRequired {
        /// Position in the feature list.
        index: usize,
    },
    /// NaN or infinite value.
    #[error("Non-finite value in {context}")]
    NonFinite {
        /// Where the value appeared.
        context: String,
    },
    /// Size that must be strictly positive.
    #[error("{context} must be positive, got {value}")]
    NonPositive {
        /// Field.
        context: String,
        /// Offending value.
        value: f64,
    },
    /// Count that is not an integer >= 1.
    #[error("{context} must be an integer >= 1, got {value}")]
    CountInvalid {
        /// Field.
        context: String,
        /// Offending value.
        value: f64,
    },
    /// Wrong number of profile elements.
    #[error("{context}: {detail}")]
    ProfileArity {
        /// Field.
        context: String,
        /// What is wrong.
        detail: String,
    },
    /// `profile.ref` used where a concrete profile is required.
    #[error("{context}: profile.ref cannot be declared inside a sketch")]
    ProfileNested {
        /// Field.
        context: String,
    },
    /// Zero-length axis vector.
    #[error("{context}: axis vector has zero length")]
    AxisZero {
        /// Field.
        context: String,
    },
    /// Unrecognized axis literal.
    #[error("Unknown axis literal: {0}")]
    AxisUnknown(String),
    /// Reference to an undefined parameter.
    #[error("Unknown parameter: {id}")]
    ParamMissing {
        /// Parameter id.
        id: String,
    },
    /// Two definitions share an id.
    #[error("Duplicate parameter: {id}")]
    ParamDuplicate {
        /// Parameter id.
        id: String,
    },
    /// Parameter id is not an identifier.
    #[error("Invalid parameter name: {id:?}")]
    ParamName {
        /// Parameter id.
        id: String,
    },
    /// Parameter used where its dimension does not fit.
    #[error("Parameter {id} is a {found} but a {expected} is required")]
    ParamType {
        /// Parameter id.
        id: String,
        /// Declared dimension.
        found: Dimension,
        /// Required dimension.
        expected: Dimension,
    },
    /// Override for an undeclared parameter.
    #[error("Override for unknown parameter: {id}")]
    OverrideUnknown {
        /// Parameter id.
        id: String,
    },
    /// Literal unit not recognized.
    #[error("Unknown unit: {unit}")]
    UnitUnknown {
        /// Unit as written.
        unit: String,
    },
    /// Literal unit of the wrong dimension.
    #[error("Unit {unit} cannot be used for a {expected}")]
    UnitMismatch {
        /// Unit as written.
        unit: String,
        /// Required dimension.
        expected: Dimension,
    },
    /// Angle parameter defined without a unit.
    #[error("Angle parameter {id} needs an explicit unit (deg or rad)")]
    UnitMissing {
        /// Parameter id.
        id: String,
    },
    /// Output name not of the form `body:<name>` / `surface:<name>`.
    #[error("Feature {feature} has invalid output name {name:?}")]
    OutputName {
        /// Feature id.
        feature: String,
        /// Offending name.
        name: String,
    },
    /// Input does not deserialize.
    #[error("Invalid part JSON: {0}")]
    Parse(String),
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FeatureIdRequired { .. } => "validation_feature_id_required",
            Self::NonFinite { .. } => "validation_scalar_non_finite",
            Self::NonPositive { .. } => "validation_scalar_non_positive",
            Self::CountInvalid { .. } => "validation_count_invalid",
            Self::ProfileArity { .. } => "validation_profile_arity",
            Self::ProfileNested { .. } => "validation_profile_nested",
            Self::AxisZero { .. } => "validation_axis_zero",
            Self::AxisUnknown(_) => "validation_axis_unknown",
            Self::ParamMissing { .. } => "validation_param_missing",
            Self::ParamDuplicate { .. } => "validation_param_duplicate",
            Self::ParamName { .. } => "validation_param_name",
            Self::ParamType { .. } => "validation_param_type",
            Self::OverrideUnknown { .. } => "validation_override_unknown",
            Self::UnitUnknown { .. } => "validation_unit_unknown",
            Self::UnitMismatch { .. } => "validation_unit_mismatch",
            Self::UnitMissing { .. } => "validation_unit_missing",
            Self::OutputName { .. } => "validation_output_name",
            Self::Parse(_) => "validation_parse",
        }
    }

    /// `{code, message}` report.
    pub fn report(&self) -> ErrorReport {
        ErrorReport::new(self.code(), self.to_string())
    }
}

/// A part after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPart {
    /// Part id.
    pub part_id: String,
    /// Effective unit system.
    pub units: UnitSystem,
    /// Evaluated parameters.
    pub params: ParamContext,
    /// Normalized features, in declaration order.
    pub features: Vec<Feature>,
    /// Non-fatal diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

fn output_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(body|surface):[A-Za-z0-9_.\-]+$").expect("static regex"))
}

/// Normalize a part.
pub fn normalize_part(
    part: &Part,
    overrides: &ParamOverrides,
    options: &CompileOptions,
) -> Result<NormalizedPart, ValidationError> {
    let units = part.units.unwrap_or(options.default_units);
    let params = ParamContext::build(&part.params, overrides, units)?;

    let features = part
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            if feature.id.is_empty() {
                return Err(ValidationError::FeatureIdRequired { index });
            }
            normalize_feature(feature, &params)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut diagnostics = Vec::new();
    if options.data_only_diagnostics && part.has_data_only_annotations() {
        diagnostics.push(Diagnostic::warning(
            DATA_ONLY_DIAGNOSTIC,
            format!(
                "Part {} carries {} constraint(s), {} assertion(s){}; these are data only and are not evaluated",
                part.id,
                part.constraints.len(),
                part.assertions.len(),
                if part.fti.is_some() { " and FTI data" } else { "" },
            ),
        ));
    }

    tracing::debug!(
        part_id = %part.id,
        feature_count = features.len(),
        param_count = params.values.len(),
        units = %units,
        "normalized part"
    );

    Ok(NormalizedPart {
        part_id: part.id.clone(),
        units,
        params,
        features,
        diagnostics,
    })
}

/// Normalize one feature against an evaluated parameter context.
pub fn normalize_feature(
    feature: &Feature,
    params: &ParamContext,
) -> Result<Feature, ValidationError> {
    let eval = FieldEval { params, feature };

    let kind = match &feature.kind {
        FeatureKind::DatumPlane { normal, offset } => FeatureKind::DatumPlane {
            normal: *normal,
            offset: eval.length(offset, "offset")?,
        },
        FeatureKind::DatumAxis { direction, origin } => FeatureKind::DatumAxis {
            direction: eval.axis(direction, "direction")?,
            origin: eval.point3(origin, "origin")?,
        },
        FeatureKind::DatumFrame { on } => FeatureKind::DatumFrame { on: canonical(on) },
        FeatureKind::Sketch2d { plane, profiles } => FeatureKind::Sketch2d {
            plane: plane.as_ref().map(canonical),
            profiles: profiles
                .iter()
                .map(|p| {
                    Ok(SketchProfile {
                        name: p.name.clone(),
                        profile: eval.profile(&p.profile, &format!("profiles.{}", p.name), false)?,
                    })
                })
                .collect::<Result<_, ValidationError>>()?,
        },
        FeatureKind::Extrude { profile, depth, axis, result, pattern } => FeatureKind::Extrude {
            profile: eval.profile(profile, "profile", true)?,
            depth: eval.depth(depth, "depth")?,
            axis: axis.as_ref().map(|a| eval.axis(a, "axis")).transpose()?,
            result: eval.output(result)?,
            pattern: pattern.clone(),
        },
        FeatureKind::Revolve { profile, axis, angle, result } => FeatureKind::Revolve {
            profile: eval.profile(profile, "profile", true)?,
            axis: eval.axis(axis, "axis")?,
            angle: eval.sweep(angle, "angle")?,
            result: eval.output(result)?,
        },
        FeatureKind::Loft { profiles, result } => {
            if profiles.len() < 2 {
                return Err(ValidationError::ProfileArity {
                    context: eval.context("profiles"),
                    detail: format!("loft needs at least 2 profiles, got {}", profiles.len()),
                });
            }
            FeatureKind::Loft {
                profiles: profiles
                    .iter()
                    .enumerate()
                    .map(|(i, p)| eval.profile(p, &format!("profiles[{i}]"), true))
                    .collect::<Result<_, _>>()?,
                result: eval.output(result)?,
            }
        }
        FeatureKind::Hole { on, position, diameter, depth, pattern, result } => FeatureKind::Hole {
            on: canonical(on),
            position: eval.point2(position, "position")?,
            diameter: eval.positive(diameter, "diameter")?,
            depth: eval.depth(depth, "depth")?,
            pattern: pattern.clone(),
            result: result.as_ref().map(|r| eval.output(r)).transpose()?,
        },
        FeatureKind::Fillet { edges, radius, result } => FeatureKind::Fillet {
            edges: canonical(edges),
            radius: eval.positive(radius, "radius")?,
            result: result.as_ref().map(|r| eval.output(r)).transpose()?,
        },
        FeatureKind::Chamfer { edges, distance, result } => FeatureKind::Chamfer {
            edges: canonical(edges),
            distance: eval.positive(distance, "distance")?,
            result: result.as_ref().map(|r| eval.output(r)).transpose()?,
        },
        FeatureKind::Shell { target, remove, thickness, result } => FeatureKind::Shell {
            target: canonical(target),
            remove: remove.as_ref().map(canonical),
            thickness: eval.positive(thickness, "thickness")?,
            result: result.as_ref().map(|r| eval.output(r)).transpose()?,
        },
        FeatureKind::Mirror { source, plane, result } => FeatureKind::Mirror {
            source: canonical(source),
            plane: canonical(plane),
            result: eval.output(result)?,
        },
        FeatureKind::Boolean { op, left, right, result } => FeatureKind::Boolean {
            op: *op,
            left: canonical(left),
            right: canonical(right),
            result: eval.output(result)?,
        },
        FeatureKind::PatternLinear { origin, direction, spacing, count } => {
            FeatureKind::PatternLinear {
                origin: canonical(origin),
                direction: *direction,
                spacing: eval.positive(spacing, "spacing")?,
                count: eval.count(count, "count", 1)?,
            }
        }
        FeatureKind::PatternCircular { origin, axis, count, angle } => {
            FeatureKind::PatternCircular {
                origin: canonical(origin),
                axis: eval.axis(axis, "axis")?,
                count: eval.count(count, "count", 1)?,
                angle: eval.sweep(angle, "angle")?,
            }
        }
    };

    Ok(Feature {
        id: feature.id.clone(),
        deps: feature.deps.clone(),
        tags: feature.tags.clone(),
        kind,
    })
}

fn canonical(selector: &Selector) -> Selector {
    normalize_selector(selector)
}

/// Field evaluator bound to one feature, so errors name `feature.field`.
struct FieldEval<'a> {
    params: &'a ParamContext,
    feature: &'a Feature,
}

impl FieldEval<'_> {
    fn context(&self, field: &str) -> String {
        format!("{}.{}", self.feature.id, field)
    }

    fn eval(
        &self,
        scalar: &Scalar,
        expected: Dimension,
        field: &str,
    ) -> Result<f64, ValidationError> {
        self.params.evaluate(scalar, expected, &self.context(field))
    }

    fn length(&self, scalar: &Scalar, field: &str) -> Result<Scalar, ValidationError> {
        self.eval(scalar, Dimension::Length, field).map(Scalar::Value)
    }

    fn angle(&self, scalar: &Scalar, field: &str) -> Result<Scalar, ValidationError> {
        self.eval(scalar, Dimension::Angle, field).map(Scalar::Value)
    }

    fn positive(&self, scalar: &Scalar, field: &str) -> Result<Scalar, ValidationError> {
        let value = self.eval(scalar, Dimension::Length, field)?;
        if value <= 0.0 {
            return Err(ValidationError::NonPositive {
                context: self.context(field),
                value,
            });
        }
        Ok(Scalar::Value(value))
    }

    fn count(&self, scalar: &Scalar, field: &str, min: u32) -> Result<Scalar, ValidationError> {
        let value = self.eval(scalar, Dimension::Count, field)?;
        if value.fract() != 0.0 || value < 1.0 {
            return Err(ValidationError::CountInvalid {
                context: self.context(field),
                value,
            });
        }
        if value < f64::from(min) {
            return Err(ValidationError::ProfileArity {
                context: self.context(field),
                detail: format!("needs at least {min}, got {value}"),
            });
        }
        Ok(Scalar::Value(value))
    }

    fn point2(&self, point: &[Scalar; 2], field: &str) -> Result<[Scalar; 2], ValidationError> {
        Ok([
            self.length(&point[0], &format!("{field}[0]"))?,
            self.length(&point[1], &format!("{field}[1]"))?,
        ])
    }

    fn point3(&self, point: &[Scalar; 3], field: &str) -> Result<[Scalar; 3], ValidationError> {
        Ok([
            self.length(&point[0], &format!("{field}[0]"))?,
            self.length(&point[1], &format!("{field}[1]"))?,
            self.length(&point[2], &format!("{field}[2]"))?,
        ])
    }

    fn depth(&self, depth: &Depth, field: &str) -> Result<Depth, ValidationError> {
        match depth {
            Depth::ThroughAll => Ok(Depth::ThroughAll),
            Depth::Distance(d) => self.positive(d, field).map(Depth::Distance),
        }
    }

    fn sweep(&self, angle: &SweepAngle, field: &str) -> Result<SweepAngle, ValidationError> {
        match angle {
            SweepAngle::Full => Ok(SweepAngle::Full),
            SweepAngle::Angle(a) => self.angle(a, field).map(SweepAngle::Angle),
        }
    }

    fn axis(&self, axis: &AxisSpec, field: &str) -> Result<AxisSpec, ValidationError> {
        match axis {
            AxisSpec::Direction(d) => Ok(AxisSpec::Direction(*d)),
            AxisSpec::Defined(AxisDefinition::SketchNormal) => {
                Ok(AxisSpec::Defined(AxisDefinition::SketchNormal))
            }
            AxisSpec::Defined(AxisDefinition::Vector { direction }) => {
                let mut components = [0.0; 3];
                for (i, c) in direction.iter().enumerate() {
                    components[i] = self.eval(c, Dimension::Count, &format!("{field}[{i}]"))?;
                }
                if components.iter().all(|c| *c == 0.0) {
                    return Err(ValidationError::AxisZero {
                        context: self.context(field),
                    });
                }
                Ok(AxisSpec::Defined(AxisDefinition::Vector {
                    direction: components.map(Scalar::Value),
                }))
            }
        }
    }

    fn profile(
        &self,
        profile: &ProfileSpec,
        field: &str,
        allow_ref: bool,
    ) -> Result<ProfileSpec, ValidationError> {
        match profile {
            ProfileSpec::Rectangle { width, height, center } => Ok(ProfileSpec::Rectangle {
                width: self.positive(width, &format!("{field}.width"))?,
                height: self.positive(height, &format!("{field}.height"))?,
                center: self.point2(center, &format!("{field}.center"))?,
            }),
            ProfileSpec::Circle { radius, center } => Ok(ProfileSpec::Circle {
                radius: self.positive(radius, &format!("{field}.radius"))?,
                center: self.point2(center, &format!("{field}.center"))?,
            }),
            ProfileSpec::Poly { sides, radius, center, rotation } => Ok(ProfileSpec::Poly {
                sides: self.count(sides, &format!("{field}.sides"), 3)?,
                radius: self.positive(radius, &format!("{field}.radius"))?,
                center: self.point2(center, &format!("{field}.center"))?,
                rotation: rotation
                    .as_ref()
                    .map(|r| self.angle(r, &format!("{field}.rotation")))
                    .transpose()?,
            }),
            ProfileSpec::Ref { name } => {
                if !allow_ref {
                    return Err(ValidationError::ProfileNested {
                        context: self.context(field),
                    });
                }
                Ok(ProfileSpec::Ref { name: name.clone() })
            }
        }
    }

    fn output(&self, name: &str) -> Result<String, ValidationError> {
        if !output_name_regex().is_match(name) {
            return Err(ValidationError::OutputName {
                feature: self.feature.id.to_string(),
                name: name.to_string(),
            });
        }
        Ok(name.to_string())
    }
}
