//! Run-time geometry selections produced by the backend.
//!
//! Metadata stays a sparse key → value map because different backends report
//! different optional fields. All type narrowing goes through
//! [`Selection::require`], so predicates and rank rules share one
//! "field present with the right type" check.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    /// BRep face.
    Face,
    /// BRep edge.
    Edge,
    /// Solid body.
    Solid,
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Face => write!(f, "face"),
            Self::Edge => write!(f, "edge"),
            Self::Solid => write!(f, "solid"),
        }
    }
}

/// Well-known metadata keys.
pub mod meta_keys {
    /// `bool`: face lies in a plane.
    pub const PLANAR: &str = "planar";
    /// `text`: axis literal of a planar face normal.
    pub const NORMAL: &str = "normal";
    /// `number`: face area.
    pub const AREA: &str = "area";
    /// `number`: Z of the centroid.
    pub const CENTER_Z: &str = "centerZ";
    /// `vec3`: centroid.
    pub const CENTER: &str = "center";
    /// `text`: producing feature id.
    pub const CREATED_BY: &str = "createdBy";
    /// `text`: semantic role.
    pub const ROLE: &str = "role";
    /// `text`: output the selection belongs to.
    pub const OWNER_KEY: &str = "ownerKey";
}

/// One metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    /// Boolean flag.
    Bool(bool),
    /// Number.
    Number(f64),
    /// String.
    Text(String),
    /// 3-vector.
    Vec3([f64; 3]),
}

impl MetaValue {
    /// The type of this value.
    pub fn meta_type(&self) -> MetaType {
        match self {
            Self::Bool(_) => MetaType::Bool,
            Self::Number(_) => MetaType::Number,
            Self::Text(_) => MetaType::Text,
            Self::Vec3(_) => MetaType::Vec3,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<[f64; 3]> for MetaValue {
    fn from(v: [f64; 3]) -> Self {
        Self::Vec3(v)
    }
}

/// Metadata value type, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaType {
    /// Boolean.
    Bool,
    /// Number.
    Number,
    /// String.
    Text,
    /// 3-vector.
    Vec3,
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "string"),
            Self::Vec3 => write!(f, "vec3"),
        }
    }
}

/// A required metadata field was absent or had the wrong type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Selection {selection_id} has no {expected} metadata field '{key}'{}", found_suffix(.found))]
pub struct MetaMissing {
    /// Selection being inspected.
    pub selection_id: String,
    /// Metadata key.
    pub key: String,
    /// Type the caller needed.
    pub expected: MetaType,
    /// Type actually present, if any.
    pub found: Option<MetaType>,
}

fn found_suffix(found: &Option<MetaType>) -> String {
    found.map(|t| format!(" (found {t})")).unwrap_or_default()
}

/// Concrete geometric query result produced by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Backend-assigned id.
    pub id: String,
    /// Face, edge or solid.
    pub kind: SelectionKind,
    /// Sparse metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, MetaValue>,
}

impl Selection {
    /// Create a selection with empty metadata.
    pub fn new(id: impl Into<String>, kind: SelectionKind) -> Self {
        Self {
            id: id.into(),
            kind,
            meta: BTreeMap::new(),
        }
    }

    /// Set a metadata field.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Look up `key` and narrow it with `extract`, failing with [`MetaMissing`]
    /// when the field is absent or of another type.
    pub fn require<'a, T>(
        &'a self,
        key: &str,
        expected: MetaType,
        extract: impl FnOnce(&'a MetaValue) -> Option<T>,
    ) -> Result<T, MetaMissing> {
        let value = self.meta.get(key);
        value.and_then(extract).ok_or_else(|| MetaMissing {
            selection_id: self.id.clone(),
            key: key.to_string(),
            expected,
            found: value.map(MetaValue::meta_type),
        })
    }

    /// Required boolean field.
    pub fn require_bool(&self, key: &str) -> Result<bool, MetaMissing> {
        self.require(key, MetaType::Bool, MetaValue::as_bool)
    }

    /// Required numeric field.
    pub fn require_number(&self, key: &str) -> Result<f64, MetaMissing> {
        self.require(key, MetaType::Number, MetaValue::as_number)
    }

    /// Required string field.
    pub fn require_text(&self, key: &str) -> Result<&str, MetaMissing> {
        self.require(key, MetaType::Text, MetaValue::as_text)
    }

    /// Required 3-vector field.
    pub fn require_vec3(&self, key: &str) -> Result<[f64; 3], MetaMissing> {
        self.require(key, MetaType::Vec3, MetaValue::as_vec3)
    }

    /// Output this selection belongs to, when the backend reports one.
    pub fn owner_key(&self) -> Option<&str> {
        self.meta.get(meta_keys::OWNER_KEY).and_then(MetaValue::as_text)
    }
}

/// Result of executing one feature on the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendOutput {
    /// Named outputs produced (`body:*`, `surface:*`).
    #[serde(default)]
    pub outputs: BTreeMap<String, Selection>,
    /// Newly produced selections, in backend order.
    #[serde(default)]
    pub selections: Vec<Selection>,
}

/// Accumulated selections and named outputs for one part build.
///
/// Owned by the executor; grown with [`ResolutionContext::absorb`] after each
/// feature executes. Resolution only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionContext {
    /// All selections produced so far, in production order.
    #[serde(default)]
    pub selections: Vec<Selection>,
    /// Named outputs produced so far.
    #[serde(default)]
    pub named: BTreeMap<String, Selection>,
}

impl ResolutionContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from existing selections.
    pub fn from_selections(selections: Vec<Selection>) -> Self {
        Self {
            selections,
            named: BTreeMap::new(),
        }
    }

    /// Register (or replace) a named output.
    pub fn register_named(&mut self, name: impl Into<String>, selection: Selection) {
        self.named.insert(name.into(), selection);
    }

    /// Merge one feature's backend output.
    ///
    /// Earlier selections whose `ownerKey` matches an `ownerKey` in the new
    /// output are dropped first, since the body they belonged to was rebuilt.
    /// The new selections are then appended and the named outputs registered,
    /// replacing earlier outputs of the same name.
    pub fn absorb(&mut self, output: BackendOutput) {
        let rebuilt: BTreeSet<String> = output
            .selections
            .iter()
            .filter_map(Selection::owner_key)
            .map(str::to_string)
            .collect();

        if !rebuilt.is_empty() {
            let before = self.selections.len();
            self.selections
                .retain(|s| s.owner_key().map_or(true, |owner| !rebuilt.contains(owner)));
            tracing::trace!(
                owners = rebuilt.len(),
                superseded = before - self.selections.len(),
                "superseded rebuilt selections"
            );
        }

        self.selections.extend(output.selections);
        self.named.extend(output.outputs);
    }

    /// Number of accumulated selections.
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    /// Whether no selections have been produced.
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_json_values() {
        let json = r#"{
            "id": "face:1",
            "kind": "face",
            "meta": {"planar": true, "normal": "+Z", "area": 100, "center": [0, 0, 5]}
        }"#;
        let sel: Selection = serde_json::from_str(json).unwrap();

        assert_eq!(sel.kind, SelectionKind::Face);
        assert_eq!(sel.require_bool(meta_keys::PLANAR), Ok(true));
        assert_eq!(sel.require_text(meta_keys::NORMAL), Ok("+Z"));
        assert_eq!(sel.require_number(meta_keys::AREA), Ok(100.0));
        assert_eq!(sel.require_vec3(meta_keys::CENTER), Ok([0.0, 0.0, 5.0]));
    }

    #[test]
    fn test_require_reports_missing_and_wrong_type() {
        let sel = Selection::new("edge:3", SelectionKind::Edge).with_meta("area", "large");

        let missing = sel.require_number(meta_keys::CENTER_Z).unwrap_err();
        assert_eq!(missing.key, "centerZ");
        assert_eq!(missing.found, None);

        let wrong = sel.require_number(meta_keys::AREA).unwrap_err();
        assert_eq!(wrong.expected, MetaType::Number);
        assert_eq!(wrong.found, Some(MetaType::Text));
        assert!(wrong.to_string().contains("found string"));
    }

    #[test]
    fn test_absorb_appends_and_registers() {
        let mut ctx = ResolutionContext::new();
        let body = Selection::new("base:body:main", SelectionKind::Solid);
        let mut outputs = BTreeMap::new();
        outputs.insert("body:main".to_string(), body.clone());

        ctx.absorb(BackendOutput {
            outputs,
            selections: vec![body, Selection::new("face:1", SelectionKind::Face)],
        });
        ctx.absorb(BackendOutput {
            outputs: BTreeMap::new(),
            selections: vec![Selection::new("edge:1", SelectionKind::Edge)],
        });

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.selections[2].id, "edge:1");
        assert!(ctx.named.contains_key("body:main"));
    }

    #[test]
    fn test_absorb_supersedes_rebuilt_owner() {
        let face = |id: &str, owner: &str| {
            Selection::new(id, SelectionKind::Face)
                .with_meta(meta_keys::CREATED_BY, "base")
                .with_meta(meta_keys::OWNER_KEY, owner)
        };
        let mut ctx = ResolutionContext::new();
        ctx.absorb(BackendOutput {
            outputs: BTreeMap::new(),
            selections: vec![
                face("face:old", "body:main"),
                face("face:other", "body:boss"),
                Selection::new("face:loose", SelectionKind::Face),
            ],
        });
        ctx.absorb(BackendOutput {
            outputs: BTreeMap::new(),
            selections: vec![face("face:new", "body:main")],
        });

        let ids: Vec<&str> = ctx.selections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["face:other", "face:loose", "face:new"]);
        assert_eq!(ctx.selections[2].owner_key(), Some("body:main"));
        assert_eq!(ctx.selections[1].owner_key(), None);
    }
}
