//! Disjunctive normal form rewriting.
//!
//! ## Rewrite rules (applied bottom-up)
//!
//! ```text
//! leaf                      → leaf
//! or(.., or(x, y), ..)      → or(.., x, y, ..)                 splice
//! and(.., and(x, y), ..)    → and(.., x, y, ..)                splice, when no operand is an or
//! and(a, or(x, y), b)       → or(and(a, x, b), and(a, y, b))   distribute, then re-normalize
//! ```
//!
//! Distributing `k` or-operands with `b1..bk` branches produces `b1 * .. * bk`
//! conjunctions. Filter trees come from a UI and stay small, so the blow-up is
//! accepted rather than capped.

use crate::filter::{Filter, FilterKind, Operands};
use std::ops::Deref;
use thiserror::Error;

/// The normalizer produced an `Or` nested under an `And`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("normalizer left an Or below an And in {offending}")]
pub struct NormalizationInvariantError {
    pub offending: Filter,
}

/// A filter in DNF: a leaf, an `And` of leaves, or an `Or` whose operands are
/// leaves or `And`s of leaves. Only [`to_dnf`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedFilter(Filter);

impl NormalizedFilter {
    pub fn as_filter(&self) -> &Filter {
        &self.0
    }

    pub fn into_filter(self) -> Filter {
        self.0
    }
}

impl Deref for NormalizedFilter {
    type Target = Filter;

    fn deref(&self) -> &Filter {
        &self.0
    }
}

/// Rewrites `filter` into disjunctive normal form.
pub fn to_dnf(filter: &Filter) -> Result<NormalizedFilter, NormalizationInvariantError> {
    let normalized = normalize(filter.clone());
    check_no_or_under_and(&normalized)?;
    Ok(NormalizedFilter(normalized))
}

fn normalize(filter: Filter) -> Filter {
    match filter {
        Filter::Or(operands) => normalize_or(operands),
        Filter::And(operands) => normalize_and(operands),
        leaf @ (Filter::Owner(_)
        | Filter::FieldAnyOf(_)
        | Filter::TagCoverage(_)
        | Filter::QuantityCompare(_)
        | Filter::CrossEntityAnyOf(_)) => leaf,
    }
}

fn normalize_or(operands: Operands) -> Filter {
    let mut flattened = Vec::with_capacity(operands.len());
    for operand in operands.into_vec() {
        match normalize(operand) {
            Filter::Or(inner) => flattened.extend(inner.into_vec()),
            other => flattened.push(other),
        }
    }
    Filter::Or(Operands::from_vec(flattened))
}

fn normalize_and(operands: Operands) -> Filter {
    let normalized: Vec<Filter> = operands.into_vec().into_iter().map(normalize).collect();

    if !normalized.iter().any(|operand| matches!(operand, Filter::Or(_))) {
        let mut flattened = Vec::with_capacity(normalized.len());
        for operand in normalized {
            match operand {
                Filter::And(inner) => flattened.extend(inner.into_vec()),
                other => flattened.push(other),
            }
        }
        return Filter::And(Operands::from_vec(flattened));
    }

    // One conjunction per combination of or-branches; every other operand
    // stays at its original position.
    let mut combinations: Vec<Vec<Filter>> = vec![Vec::with_capacity(normalized.len())];
    for operand in &normalized {
        match operand {
            Filter::Or(branches) => {
                combinations = combinations
                    .into_iter()
                    .flat_map(|prefix| {
                        branches.iter().map(move |branch| {
                            let mut next = prefix.clone();
                            next.push(branch.clone());
                            next
                        })
                    })
                    .collect();
            }
            fixed => {
                for combination in &mut combinations {
                    combination.push(fixed.clone());
                }
            }
        }
    }

    let distributed = combinations
        .into_iter()
        .map(|combination| Filter::And(Operands::from_vec(combination)))
        .collect();
    normalize_or(Operands::from_vec(distributed))
}

fn check_no_or_under_and(filter: &Filter) -> Result<(), NormalizationInvariantError> {
    for visited in filter.traverse() {
        if visited.node.kind() == FilterKind::And
            && !visited
                .node
                .contains_exactly(0, usize::MAX, &[FilterKind::Or])
        {
            return Err(NormalizationInvariantError {
                offending: visited.node.clone(),
            });
        }
    }
    Ok(())
}
