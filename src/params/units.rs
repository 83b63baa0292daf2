//! Units and dimensions for scalar evaluation.
//!
//! Lengths are carried in the part's [`UnitSystem`]; angles are carried in
//! degrees; counts are dimensionless.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::normalize::ValidationError;

/// Length unit system of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Millimetres.
    #[default]
    Mm,
    /// Centimetres.
    Cm,
    /// Metres.
    M,
    /// Inches.
    In,
}

impl UnitSystem {
    /// Parse a unit system name.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mm" => Some(Self::Mm),
            "cm" => Some(Self::Cm),
            "m" => Some(Self::M),
            "in" | "inch" => Some(Self::In),
            _ => None,
        }
    }

    /// Millimetres per unit.
    fn mm_per_unit(&self) -> f64 {
        match self {
            Self::Mm => 1.0,
            Self::Cm => 10.0,
            Self::M => 1000.0,
            Self::In => 25.4,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mm => write!(f, "mm"),
            Self::Cm => write!(f, "cm"),
            Self::M => write!(f, "m"),
            Self::In => write!(f, "in"),
        }
    }
}

/// Physical dimension a scalar field expects (and a parameter declares).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Length in part units.
    Length,
    /// Angle in degrees.
    Angle,
    /// Dimensionless count or factor.
    Count,
}

impl Dimension {
    /// Whether a parameter of dimension `self` may be used where `expected`
    /// is required. Counts act as dimensionless factors anywhere.
    pub fn usable_as(&self, expected: Dimension) -> bool {
        *self == expected || *self == Dimension::Count
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => write!(f, "length"),
            Self::Angle => write!(f, "angle"),
            Self::Count => write!(f, "count"),
        }
    }
}

enum Unit {
    Length(UnitSystem),
    Degrees,
    Radians,
}

fn parse_unit(unit: &str) -> Option<Unit> {
    match unit.trim() {
        "deg" => Some(Unit::Degrees),
        "rad" => Some(Unit::Radians),
        other => UnitSystem::from_name(other).map(Unit::Length),
    }
}

/// Convert a literal carrying `unit` into the canonical representation for
/// `expected` (part units for lengths, degrees for angles).
pub fn convert_literal(
    value: f64,
    unit: Option<&str>,
    expected: Dimension,
    units: UnitSystem,
) -> Result<f64, ValidationError> {
    let Some(unit_name) = unit else {
        return Ok(value);
    };
    let unit = parse_unit(unit_name).ok_or_else(|| ValidationError::UnitUnknown {
        unit: unit_name.to_string(),
    })?;

    match (expected, unit) {
        (Dimension::Length, Unit::Length(from)) => {
            Ok(value * from.mm_per_unit() / units.mm_per_unit())
        }
        (Dimension::Angle, Unit::Degrees) => Ok(value),
        (Dimension::Angle, Unit::Radians) => Ok(value.to_degrees()),
        _ => Err(ValidationError::UnitMismatch {
            unit: unit_name.to_string(),
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversion() {
        assert_eq!(
            convert_literal(2.0, Some("cm"), Dimension::Length, UnitSystem::Mm).unwrap(),
            20.0
        );
        assert_eq!(
            convert_literal(1.0, Some("in"), Dimension::Length, UnitSystem::Mm).unwrap(),
            25.4
        );
        assert_eq!(
            convert_literal(500.0, Some("mm"), Dimension::Length, UnitSystem::M).unwrap(),
            0.5
        );
        assert_eq!(convert_literal(7.0, None, Dimension::Length, UnitSystem::In).unwrap(), 7.0);
    }

    #[test]
    fn test_angle_conversion() {
        let deg = convert_literal(
            std::f64::consts::PI,
            Some("rad"),
            Dimension::Angle,
            UnitSystem::Mm,
        )
        .unwrap();
        assert!((deg - 180.0).abs() < 1e-9);
        assert_eq!(
            convert_literal(45.0, Some("deg"), Dimension::Angle, UnitSystem::Mm).unwrap(),
            45.0
        );
    }

    #[test]
    fn test_unit_errors() {
        let err =
            convert_literal(1.0, Some("furlong"), Dimension::Length, UnitSystem::Mm).unwrap_err();
        assert_eq!(err.code(), "validation_unit_unknown");

        let err = convert_literal(1.0, Some("deg"), Dimension::Length, UnitSystem::Mm).unwrap_err();
        assert_eq!(err.code(), "validation_unit_mismatch");

        let err = convert_literal(3.0, Some("mm"), Dimension::Count, UnitSystem::Mm).unwrap_err();
        assert_eq!(err.code(), "validation_unit_mismatch");
    }

    #[test]
    fn test_count_usable_anywhere() {
        assert!(Dimension::Count.usable_as(Dimension::Length));
        assert!(!Dimension::Angle.usable_as(Dimension::Length));
        assert!(!Dimension::Length.usable_as(Dimension::Count));
    }
}
