//! Canonical selector form.
//!
//! Structurally identical queries must hash identically, so predicate and
//! rank lists are de-duplicated (first occurrence wins, order preserved).
//! `closestTo` targets are canonicalized recursively before comparison.

use std::collections::HashSet;
use std::hash::Hash;

use crate::types::{RankRule, Selector};

/// Return the canonical form of a selector. Identity for `selector.named`.
pub fn normalize_selector(selector: &Selector) -> Selector {
    match selector {
        Selector::Named { .. } => selector.clone(),
        Selector::Face { predicates, rank } => Selector::Face {
            predicates: dedup_in_order(predicates.iter().cloned()),
            rank: normalize_rank(rank),
        },
        Selector::Edge { predicates, rank } => Selector::Edge {
            predicates: dedup_in_order(predicates.iter().cloned()),
            rank: normalize_rank(rank),
        },
        Selector::Solid { predicates, rank } => Selector::Solid {
            predicates: dedup_in_order(predicates.iter().cloned()),
            rank: normalize_rank(rank),
        },
    }
}

fn normalize_rank(rank: &[RankRule]) -> Vec<RankRule> {
    dedup_in_order(rank.iter().map(|rule| match rule {
        RankRule::ClosestTo { target } => RankRule::closest_to(normalize_selector(target)),
        RankRule::MaxArea | RankRule::MinZ | RankRule::MaxZ => rule.clone(),
    }))
}

fn dedup_in_order<T: Eq + Hash + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
