//! Feature types for the part kernel.
//!
//! A feature is one step of a part's build history. Common fields (`id`,
//! explicit `deps`, `tags`) live on [`Feature`]; the kind-specific payload is
//! the closed [`FeatureKind`] enum, serialized with an internal `kind` tag.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use super::selector::Selector;
use crate::normalize::ValidationError;

/// Unique identifier for a feature within a part.
///
/// Wraps the author-supplied id string and implements `Ord` so that maps and
/// sets keyed by feature id iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    /// Create a new FeatureId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty (never valid in a normalized part).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for FeatureId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Signed principal axis direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AxisDirection {
    /// +X
    PosX,
    /// -X
    NegX,
    /// +Y
    PosY,
    /// -Y
    NegY,
    /// +Z
    PosZ,
    /// -Z
    NegZ,
}

impl AxisDirection {
    /// Parse an axis literal (`"+X"`, `"-Z"`, ...).
    pub fn from_literal(s: &str) -> Option<Self> {
        match s.trim() {
            "+X" => Some(Self::PosX),
            "-X" => Some(Self::NegX),
            "+Y" => Some(Self::PosY),
            "-Y" => Some(Self::NegY),
            "+Z" => Some(Self::PosZ),
            "-Z" => Some(Self::NegZ),
            _ => None,
        }
    }

    /// The literal form of this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PosX => "+X",
            Self::NegX => "-X",
            Self::PosY => "+Y",
            Self::NegY => "-Y",
            Self::PosZ => "+Z",
            Self::NegZ => "-Z",
        }
    }
}

impl FromStr for AxisDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_literal(s).ok_or_else(|| ValidationError::AxisUnknown(s.to_string()))
    }
}

impl TryFrom<String> for AxisDirection {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AxisDirection> for String {
    fn from(axis: AxisDirection) -> Self {
        axis.as_str().to_string()
    }
}

impl fmt::Display for AxisDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary operator in a scalar expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    #[serde(rename = "+")]
    Add,
    /// Subtraction.
    #[serde(rename = "-")]
    Sub,
    /// Multiplication.
    #[serde(rename = "*")]
    Mul,
    /// Division.
    #[serde(rename = "/")]
    Div,
}

/// Scalar expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    /// Literal number, optionally with a unit (`mm`, `in`, `deg`, ...).
    #[serde(rename = "expr.literal")]
    Literal {
        /// Numeric value.
        value: f64,
        /// Unit suffix.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    /// Reference to a part parameter.
    #[serde(rename = "expr.param")]
    Param {
        /// Parameter id.
        id: String,
    },
    /// Binary operation.
    #[serde(rename = "expr.binary")]
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Scalar>,
        /// Right operand.
        right: Box<Scalar>,
    },
    /// Negation.
    #[serde(rename = "expr.neg")]
    Neg {
        /// Operand.
        value: Box<Scalar>,
    },
}

/// A number or an expression. After normalization every scalar is a `Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Concrete number.
    Value(f64),
    /// Unevaluated expression.
    Expr(Expr),
}

impl Scalar {
    /// The concrete value, if this scalar has been evaluated.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Expr(_) => None,
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Self::Value(0.0)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<Expr> for Scalar {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

/// Extrusion/hole depth: a distance or the `"throughAll"` sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DepthRepr", into = "DepthRepr")]
pub enum Depth {
    /// Cut or extrude through the whole body.
    ThroughAll,
    /// Finite distance.
    Distance(Scalar),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DepthRepr {
    Keyword(DepthKeyword),
    Distance(Scalar),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum DepthKeyword {
    #[serde(rename = "throughAll")]
    ThroughAll,
}

impl From<DepthRepr> for Depth {
    fn from(repr: DepthRepr) -> Self {
        match repr {
            DepthRepr::Keyword(DepthKeyword::ThroughAll) => Self::ThroughAll,
            DepthRepr::Distance(s) => Self::Distance(s),
        }
    }
}

impl From<Depth> for DepthRepr {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::ThroughAll => Self::Keyword(DepthKeyword::ThroughAll),
            Depth::Distance(s) => Self::Distance(s),
        }
    }
}

/// Revolution/pattern sweep angle in degrees, or the `"full"` sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SweepRepr", into = "SweepRepr")]
pub enum SweepAngle {
    /// Full turn.
    #[default]
    Full,
    /// Partial sweep.
    Angle(Scalar),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum SweepRepr {
    Keyword(SweepKeyword),
    Angle(Scalar),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SweepKeyword {
    #[serde(rename = "full")]
    Full,
}

impl From<SweepRepr> for SweepAngle {
    fn from(repr: SweepRepr) -> Self {
        match repr {
            SweepRepr::Keyword(SweepKeyword::Full) => Self::Full,
            SweepRepr::Angle(s) => Self::Angle(s),
        }
    }
}

impl From<SweepAngle> for SweepRepr {
    fn from(angle: SweepAngle) -> Self {
        match angle {
            SweepAngle::Full => Self::Keyword(SweepKeyword::Full),
            SweepAngle::Angle(s) => Self::Angle(s),
        }
    }
}

/// Axis given either as a principal direction literal or a definition object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    /// `"+X"`, `"-Z"`, ...
    Direction(AxisDirection),
    /// `axis.vector` / `axis.sketch.normal`.
    Defined(AxisDefinition),
}

/// Object form of an axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AxisDefinition {
    /// Explicit direction vector.
    #[serde(rename = "axis.vector")]
    Vector {
        /// Direction components.
        direction: [Scalar; 3],
    },
    /// Normal of the sketch plane the profile lives on.
    #[serde(rename = "axis.sketch.normal")]
    SketchNormal,
}

/// 2D profile used by sketches and profile-consuming features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ProfileSpec {
    /// Axis-aligned rectangle.
    #[serde(rename = "profile.rectangle")]
    Rectangle {
        /// Width (X).
        width: Scalar,
        /// Height (Y).
        height: Scalar,
        /// Center point.
        #[serde(default)]
        center: [Scalar; 2],
    },
    /// Circle.
    #[serde(rename = "profile.circle")]
    Circle {
        /// Radius.
        radius: Scalar,
        /// Center point.
        #[serde(default)]
        center: [Scalar; 2],
    },
    /// Regular polygon.
    #[serde(rename = "profile.poly")]
    Poly {
        /// Number of sides (>= 3).
        sides: Scalar,
        /// Circumradius.
        radius: Scalar,
        /// Center point.
        #[serde(default)]
        center: [Scalar; 2],
        /// Rotation in degrees.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<Scalar>,
    },
    /// Reference to a named profile declared by a sketch.
    #[serde(rename = "profile.ref")]
    Ref {
        /// Profile name (e.g. `"profile:base"`).
        name: String,
    },
}

impl ProfileSpec {
    /// Referenced profile name, if this is a `profile.ref`.
    pub fn ref_name(&self) -> Option<&str> {
        match self {
            Self::Ref { name } => Some(name),
            Self::Rectangle { .. } | Self::Circle { .. } | Self::Poly { .. } => None,
        }
    }
}

/// Named profile declared by a sketch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchProfile {
    /// Profile name, unique across the part.
    pub name: String,
    /// Profile geometry.
    pub profile: ProfileSpec,
}

/// Reference to a pattern feature by id (`{"kind": "pattern.ref", "name": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PatternRefRepr", into = "PatternRefRepr")]
pub struct PatternRef {
    /// Id of the pattern feature.
    pub name: FeatureId,
}

impl PatternRef {
    /// Reference the pattern feature `name`.
    pub fn new(name: impl Into<FeatureId>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum PatternRefRepr {
    #[serde(rename = "pattern.ref")]
    Ref { name: FeatureId },
}

impl From<PatternRefRepr> for PatternRef {
    fn from(repr: PatternRefRepr) -> Self {
        match repr {
            PatternRefRepr::Ref { name } => Self { name },
        }
    }
}

impl From<PatternRef> for PatternRefRepr {
    fn from(r: PatternRef) -> Self {
        Self::Ref { name: r.name }
    }
}

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    /// Union of both operands.
    Union,
    /// Left minus right.
    Subtract,
    /// Common volume.
    Intersect,
}

/// How many selections a selector field expects at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one selection (`resolve_selector`).
    One,
    /// One or more selections (`resolve_selector_set`).
    Many,
}

/// A selector-valued field on a feature.
#[derive(Debug, Clone, Copy)]
pub struct SelectorField<'a> {
    /// Field name as serialized.
    pub name: &'static str,
    /// The selector.
    pub selector: &'a Selector,
    /// Expected run-time cardinality.
    pub cardinality: Cardinality,
}

/// Kind-specific payload of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FeatureKind {
    /// Construction plane through the origin offset along its normal.
    #[serde(rename = "datum.plane")]
    DatumPlane {
        /// Plane normal.
        normal: AxisDirection,
        /// Offset along the normal.
        #[serde(default)]
        offset: Scalar,
    },
    /// Construction axis.
    #[serde(rename = "datum.axis")]
    DatumAxis {
        /// Axis direction.
        direction: AxisSpec,
        /// Point on the axis.
        #[serde(default)]
        origin: [Scalar; 3],
    },
    /// Coordinate frame placed on existing geometry.
    #[serde(rename = "datum.frame")]
    DatumFrame {
        /// Geometry the frame sits on.
        on: Selector,
    },
    /// Sketch declaring named profiles.
    #[serde(rename = "feature.sketch2d")]
    Sketch2d {
        /// Face or named output to sketch on (XY plane when absent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plane: Option<Selector>,
        /// Declared profiles.
        profiles: Vec<SketchProfile>,
    },
    /// Linear extrusion of a profile.
    #[serde(rename = "feature.extrude")]
    Extrude {
        /// Profile to extrude.
        profile: ProfileSpec,
        /// Extrusion depth.
        depth: Depth,
        /// Extrusion axis (sketch normal when absent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        axis: Option<AxisSpec>,
        /// Produced output name.
        result: String,
        /// Pattern replicating the extrusion.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<PatternRef>,
    },
    /// Revolution of a profile around an axis.
    #[serde(rename = "feature.revolve")]
    Revolve {
        /// Profile to revolve.
        profile: ProfileSpec,
        /// Revolution axis.
        axis: AxisSpec,
        /// Sweep angle.
        #[serde(default)]
        angle: SweepAngle,
        /// Produced output name.
        result: String,
    },
    /// Loft through two or more profiles.
    #[serde(rename = "feature.loft")]
    Loft {
        /// Section profiles in loft order.
        profiles: Vec<ProfileSpec>,
        /// Produced output name.
        result: String,
    },
    /// Hole drilled into a face.
    #[serde(rename = "feature.hole")]
    Hole {
        /// Face to drill into.
        on: Selector,
        /// Position on the face.
        #[serde(default)]
        position: [Scalar; 2],
        /// Hole diameter.
        diameter: Scalar,
        /// Hole depth.
        depth: Depth,
        /// Pattern replicating the hole.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<PatternRef>,
        /// Produced output name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    /// Round edges.
    #[serde(rename = "feature.fillet")]
    Fillet {
        /// Edges to round.
        edges: Selector,
        /// Fillet radius.
        radius: Scalar,
        /// Produced output name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    /// Bevel edges.
    #[serde(rename = "feature.chamfer")]
    Chamfer {
        /// Edges to bevel.
        edges: Selector,
        /// Chamfer distance.
        distance: Scalar,
        /// Produced output name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    /// Hollow a solid.
    #[serde(rename = "feature.shell")]
    Shell {
        /// Solid to hollow.
        target: Selector,
        /// Face left open.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remove: Option<Selector>,
        /// Wall thickness.
        thickness: Scalar,
        /// Produced output name.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    /// Mirror a body across a plane.
    #[serde(rename = "feature.mirror")]
    Mirror {
        /// Body to mirror.
        source: Selector,
        /// Mirror plane face.
        plane: Selector,
        /// Produced output name.
        result: String,
    },
    /// Boolean combination of two bodies.
    #[serde(rename = "feature.boolean")]
    Boolean {
        /// Operation.
        op: BooleanOp,
        /// Left operand.
        left: Selector,
        /// Right operand.
        right: Selector,
        /// Produced output name.
        result: String,
    },
    /// Linear instance layout.
    #[serde(rename = "pattern.linear")]
    PatternLinear {
        /// Seed geometry.
        origin: Selector,
        /// Step direction.
        direction: AxisDirection,
        /// Distance between instances.
        spacing: Scalar,
        /// Number of instances.
        count: Scalar,
    },
    /// Circular instance layout.
    #[serde(rename = "pattern.circular")]
    PatternCircular {
        /// Seed geometry.
        origin: Selector,
        /// Rotation axis.
        axis: AxisSpec,
        /// Number of instances.
        count: Scalar,
        /// Total angle covered.
        #[serde(default)]
        angle: SweepAngle,
    },
}

impl FeatureKind {
    /// The serialized `kind` tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DatumPlane { .. } => "datum.plane",
            Self::DatumAxis { .. } => "datum.axis",
            Self::DatumFrame { .. } => "datum.frame",
            Self::Sketch2d { .. } => "feature.sketch2d",
            Self::Extrude { .. } => "feature.extrude",
            Self::Revolve { .. } => "feature.revolve",
            Self::Loft { .. } => "feature.loft",
            Self::Hole { .. } => "feature.hole",
            Self::Fillet { .. } => "feature.fillet",
            Self::Chamfer { .. } => "feature.chamfer",
            Self::Shell { .. } => "feature.shell",
            Self::Mirror { .. } => "feature.mirror",
            Self::Boolean { .. } => "feature.boolean",
            Self::PatternLinear { .. } => "pattern.linear",
            Self::PatternCircular { .. } => "pattern.circular",
        }
    }
}

/// One step of a part's build history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique feature id.
    pub id: FeatureId,
    /// Explicit dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<FeatureId>,
    /// Free-form tags forwarded to the backend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub kind: FeatureKind,
}

impl Feature {
    /// Create a feature with no explicit deps or tags.
    pub fn new(id: impl Into<FeatureId>, kind: FeatureKind) -> Self {
        Self {
            id: id.into(),
            deps: Vec::new(),
            tags: Vec::new(),
            kind,
        }
    }

    /// Add explicit dependencies.
    pub fn with_deps(mut self, deps: impl IntoIterator<Item = impl Into<FeatureId>>) -> Self {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this feature is a pattern layout.
    pub fn is_pattern(&self) -> bool {
        matches!(
            self.kind,
            FeatureKind::PatternLinear { .. } | FeatureKind::PatternCircular { .. }
        )
    }

    /// Output names produced by this feature.
    pub fn outputs(&self) -> Vec<&str> {
        match &self.kind {
            FeatureKind::Extrude { result, .. }
            | FeatureKind::Revolve { result, .. }
            | FeatureKind::Loft { result, .. }
            | FeatureKind::Mirror { result, .. }
            | FeatureKind::Boolean { result, .. } => vec![result.as_str()],
            FeatureKind::Hole { result, .. }
            | FeatureKind::Fillet { result, .. }
            | FeatureKind::Chamfer { result, .. }
            | FeatureKind::Shell { result, .. } => result.iter().map(String::as_str).collect(),
            FeatureKind::DatumPlane { .. }
            | FeatureKind::DatumAxis { .. }
            | FeatureKind::DatumFrame { .. }
            | FeatureKind::Sketch2d { .. }
            | FeatureKind::PatternLinear { .. }
            | FeatureKind::PatternCircular { .. } => Vec::new(),
        }
    }

    /// Profile names declared by this feature (sketches only).
    pub fn declared_profiles(&self) -> Vec<&str> {
        match &self.kind {
            FeatureKind::Sketch2d { profiles, .. } => {
                profiles.iter().map(|p| p.name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Profile names this feature consumes through `profile.ref`.
    pub fn profile_refs(&self) -> Vec<&str> {
        match &self.kind {
            FeatureKind::Extrude { profile, .. } | FeatureKind::Revolve { profile, .. } => {
                profile.ref_name().into_iter().collect()
            }
            FeatureKind::Loft { profiles, .. } => {
                profiles.iter().filter_map(ProfileSpec::ref_name).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Pattern reference, if any.
    pub fn pattern_ref(&self) -> Option<&PatternRef> {
        match &self.kind {
            FeatureKind::Extrude { pattern, .. } | FeatureKind::Hole { pattern, .. } => {
                pattern.as_ref()
            }
            _ => None,
        }
    }

    /// Every selector-valued field, in declaration order.
    pub fn selector_fields(&self) -> Vec<SelectorField<'_>> {
        fn one<'a>(name: &'static str, selector: &'a Selector) -> SelectorField<'a> {
            SelectorField { name, selector, cardinality: Cardinality::One }
        }

        match &self.kind {
            FeatureKind::DatumFrame { on } => vec![one("on", on)],
            FeatureKind::Sketch2d { plane, .. } => {
                plane.iter().map(|p| one("plane", p)).collect()
            }
            FeatureKind::Hole { on, .. } => vec![one("on", on)],
            FeatureKind::Fillet { edges, .. } | FeatureKind::Chamfer { edges, .. } => {
                vec![SelectorField {
                    name: "edges",
                    selector: edges,
                    cardinality: Cardinality::Many,
                }]
            }
            FeatureKind::Shell { target, remove, .. } => {
                let mut fields = vec![one("target", target)];
                fields.extend(remove.iter().map(|r| one("remove", r)));
                fields
            }
            FeatureKind::Mirror { source, plane, .. } => {
                vec![one("source", source), one("plane", plane)]
            }
            FeatureKind::Boolean { left, right, .. } => {
                vec![one("left", left), one("right", right)]
            }
            FeatureKind::PatternLinear { origin, .. }
            | FeatureKind::PatternCircular { origin, .. } => vec![one("origin", origin)],
            FeatureKind::DatumPlane { .. }
            | FeatureKind::DatumAxis { .. }
            | FeatureKind::Extrude { .. }
            | FeatureKind::Revolve { .. }
            | FeatureKind::Loft { .. } => Vec::new(),
        }
    }
}
