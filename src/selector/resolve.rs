//! Run-time selector resolution.
//!
//! Resolution is a read-only function of a selector and a
//! [`ResolutionContext`]:
//!
//! 1. `selector.named` looks the name up in the registered outputs.
//! 2. Otherwise candidates are the context's selections of the selector's
//!    kind, in production order, that pass every predicate. Predicates are
//!    evaluated left to right and stop at the first failure.
//! 3. Rank rules narrow the candidate list (see [`super::rank`]).

use std::collections::BTreeMap;

use super::rank::apply_rank;
use super::SelectorError;
use crate::types::{
    meta_keys, AxisDirection, Cardinality, Feature, Predicate, ResolutionContext, Selection,
    Selector,
};

/// Selections resolved for each selector field of a feature.
pub type ResolvedSelectors = BTreeMap<&'static str, Vec<Selection>>;

/// Resolve a selector to one or more selections.
pub fn resolve_selector_set(
    selector: &Selector,
    ctx: &ResolutionContext,
) -> Result<Vec<Selection>, SelectorError> {
    Ok(resolve_refs(selector, ctx)?.into_iter().cloned().collect())
}

/// Resolve a selector to exactly one selection.
pub fn resolve_selector(
    selector: &Selector,
    ctx: &ResolutionContext,
) -> Result<Selection, SelectorError> {
    let mut matches = resolve_refs(selector, ctx)?;
    match matches.len() {
        1 => Ok(matches.swap_remove(0).clone()),
        0 => Err(SelectorError::EmptyAfterRank {
            selector: selector.to_string(),
        }),
        _ => Err(SelectorError::Ambiguous {
            selector: selector.to_string(),
            candidates: matches.iter().map(|s| s.id.clone()).collect(),
        }),
    }
}

/// Resolve every selector field of a feature, honouring each field's
/// cardinality. Errors name the failing field.
pub fn resolve_feature_selectors(
    feature: &Feature,
    ctx: &ResolutionContext,
) -> Result<ResolvedSelectors, SelectorError> {
    let mut resolved = ResolvedSelectors::new();

    for field in feature.selector_fields() {
        let result = match field.cardinality {
            Cardinality::One => resolve_selector(field.selector, ctx).map(|s| vec![s]),
            Cardinality::Many => resolve_selector_set(field.selector, ctx),
        };
        let selections = result.map_err(|source| SelectorError::InField {
            feature: feature.id.clone(),
            field: field.name,
            source: Box::new(source),
        })?;
        resolved.insert(field.name, selections);
    }

    tracing::debug!(
        feature_id = %feature.id,
        fields = resolved.len(),
        "resolved feature selectors"
    );
    Ok(resolved)
}

fn resolve_refs<'a>(
    selector: &Selector,
    ctx: &'a ResolutionContext,
) -> Result<Vec<&'a Selection>, SelectorError> {
    if let Selector::Named { name } = selector {
        let selection = ctx
            .named
            .get(name)
            .ok_or_else(|| SelectorError::NamedMissing { name: name.clone() })?;
        return Ok(vec![selection]);
    }
    let Some(query) = selector.query() else {
        return Ok(Vec::new());
    };

    let mut candidates = Vec::new();
    for selection in ctx.selections.iter().filter(|s| s.kind == query.kind) {
        if matches_all(query.predicates, selection)? {
            candidates.push(selection);
        }
    }

    if candidates.is_empty() {
        return Err(SelectorError::Empty {
            selector: selector.to_string(),
            kind: query.kind,
        });
    }
    if query.rank.is_empty() {
        return Ok(candidates);
    }

    let ranked = apply_rank(candidates, query.rank, ctx)?;
    if ranked.is_empty() {
        return Err(SelectorError::EmptyAfterRank {
            selector: selector.to_string(),
        });
    }
    Ok(ranked)
}

fn matches_all(predicates: &[Predicate], selection: &Selection) -> Result<bool, SelectorError> {
    for predicate in predicates {
        if !predicate_matches(predicate, selection)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Test one predicate against a selection's metadata.
pub fn predicate_matches(
    predicate: &Predicate,
    selection: &Selection,
) -> Result<bool, SelectorError> {
    Ok(match predicate {
        Predicate::Planar => selection.require_bool(meta_keys::PLANAR)?,
        Predicate::Normal { value } => {
            let normal = selection.require_text(meta_keys::NORMAL)?;
            AxisDirection::from_literal(normal) == Some(*value)
        }
        Predicate::CreatedBy { feature_id } => {
            selection.require_text(meta_keys::CREATED_BY)? == feature_id.as_str()
        }
        Predicate::Role { value } => selection.require_text(meta_keys::ROLE)? == value,
    })
}
