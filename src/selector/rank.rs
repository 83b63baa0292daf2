//! Rank rules: scoring and tie-preserving narrowing.
//!
//! Every rule maps a candidate to a score where higher is better:
//!
//! ```text
//! rank.maxArea     score =  area
//! rank.minZ        score = -centerZ
//! rank.maxZ        score =  centerZ
//! rank.closestTo   score = -|center - target.center|
//! ```
//!
//! Each rule keeps every candidate tied at the best score (exact float
//! equality), so later rules break ties left by earlier ones. Ranking stops
//! as soon as a single candidate remains.

use super::resolve::resolve_selector;
use super::SelectorError;
use crate::types::{meta_keys, RankRule, ResolutionContext, Selection};

/// A rule ready to score candidates. `closestTo` targets are resolved once
/// per rule application, not once per candidate.
#[derive(Debug, Clone, Copy)]
pub enum RankScorer {
    /// `rank.maxArea`.
    MaxArea,
    /// `rank.minZ`.
    MinZ,
    /// `rank.maxZ`.
    MaxZ,
    /// `rank.closestTo`, with the target's center.
    ClosestTo([f64; 3]),
}

impl RankScorer {
    /// Prepare a rule, resolving a `closestTo` target against `ctx`.
    pub fn prepare(rule: &RankRule, ctx: &ResolutionContext) -> Result<Self, SelectorError> {
        Ok(match rule {
            RankRule::MaxArea => Self::MaxArea,
            RankRule::MinZ => Self::MinZ,
            RankRule::MaxZ => Self::MaxZ,
            RankRule::ClosestTo { target } => {
                let reference = resolve_selector(target, ctx)?;
                Self::ClosestTo(reference.require_vec3(meta_keys::CENTER)?)
            }
        })
    }

    /// Score a candidate. Higher is better.
    pub fn score(&self, candidate: &Selection) -> Result<f64, SelectorError> {
        Ok(match self {
            Self::MaxArea => candidate.require_number(meta_keys::AREA)?,
            Self::MinZ => -candidate.require_number(meta_keys::CENTER_Z)?,
            Self::MaxZ => candidate.require_number(meta_keys::CENTER_Z)?,
            Self::ClosestTo(target) => {
                -distance(&candidate.require_vec3(meta_keys::CENTER)?, target)
            }
        })
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Apply rank rules in order, keeping all candidates tied at the best score.
///
/// Candidate order is preserved. The result may be empty when every score is
/// NaN; callers report that as `selector_empty_after_rank`.
pub fn apply_rank<'a>(
    mut candidates: Vec<&'a Selection>,
    rules: &[RankRule],
    ctx: &ResolutionContext,
) -> Result<Vec<&'a Selection>, SelectorError> {
    for rule in rules {
        if candidates.len() <= 1 {
            break;
        }

        let scorer = RankScorer::prepare(rule, ctx)?;
        let scored = candidates
            .into_iter()
            .map(|c| scorer.score(c).map(|s| (s, c)))
            .collect::<Result<Vec<_>, _>>()?;

        let best = scored
            .iter()
            .map(|(s, _)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        candidates = scored
            .into_iter()
            .filter(|(s, _)| *s == best)
            .map(|(_, c)| c)
            .collect();
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Predicate, SelectionKind, Selector};

    fn face(id: &str, area: f64, z: f64) -> Selection {
        Selection::new(id, SelectionKind::Face)
            .with_meta(meta_keys::AREA, area)
            .with_meta(meta_keys::CENTER_Z, z)
            .with_meta(meta_keys::CENTER, [0.0, 0.0, z])
    }

    #[test]
    fn test_ties_survive_to_next_rule() {
        let faces = [face("a", 10.0, 1.0), face("b", 10.0, 5.0), face("c", 4.0, 9.0)];
        let ctx = ResolutionContext::new();
        let refs: Vec<&Selection> = faces.iter().collect();

        let after_area = apply_rank(refs.clone(), &[RankRule::MaxArea], &ctx).unwrap();
        let ids: Vec<&str> = after_area.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let after_z = apply_rank(refs, &[RankRule::MaxArea, RankRule::MaxZ], &ctx).unwrap();
        assert_eq!(after_z.len(), 1);
        assert_eq!(after_z[0].id, "b");
    }

    #[test]
    fn test_min_z() {
        let faces = [face("a", 1.0, 3.0), face("b", 1.0, -2.0)];
        let ranked =
            apply_rank(faces.iter().collect(), &[RankRule::MinZ], &ResolutionContext::new())
                .unwrap();
        assert_eq!(ranked[0].id, "b");
    }

    #[test]
    fn test_single_candidate_skips_rules() {
        let lonely = Selection::new("x", SelectionKind::Face);
        let ranked =
            apply_rank(vec![&lonely], &[RankRule::MaxArea], &ResolutionContext::new()).unwrap();
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_missing_metric_is_error() {
        let a = face("a", 1.0, 0.0);
        let b = Selection::new("b", SelectionKind::Face);
        let err = apply_rank(vec![&a, &b], &[RankRule::MaxArea], &ResolutionContext::new())
            .unwrap_err();
        assert_eq!(err.code(), "selector_meta_missing");
    }

    #[test]
    fn test_closest_to_resolves_target() {
        let reference = Selection::new("ref", SelectionKind::Face)
            .with_meta(meta_keys::ROLE, "datum")
            .with_meta(meta_keys::CENTER, [0.0, 0.0, 4.0]);
        let ctx = ResolutionContext::from_selections(vec![reference]);

        let faces = [face("low", 1.0, 0.0), face("near", 1.0, 3.5), face("high", 1.0, 10.0)];
        let rule = RankRule::closest_to(Selector::face(vec![Predicate::role("datum")], vec![]));
        let ranked = apply_rank(faces.iter().collect(), &[rule], &ctx).unwrap();

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "near");
    }

    #[test]
    fn test_nan_scores_empty_the_set() {
        let a = face("a", f64::NAN, 0.0);
        let b = face("b", f64::NAN, 0.0);
        let ranked =
            apply_rank(vec![&a, &b], &[RankRule::MaxArea], &ResolutionContext::new()).unwrap();
        assert!(ranked.is_empty());
    }
}
