//! Ownership-scoping check applied to normalized filters.
//!
//! Every disjunct of a selection must be tied to exactly one owner. After DNF
//! normalization only two shapes satisfy that:
//!
//! ```text
//! owner(u)                                         single owner leaf
//! and(owner(u), leaf, ..)                          one scoped conjunction
//! or(and(owner(u1), ..), and(owner(u2), ..), ..)   scoped conjunctions only
//! ```

use crate::filter::{Filter, FilterKind};
use crate::normalizer::NormalizedFilter;
use std::fmt;
use std::ops::Deref;
use thiserror::Error;

/// Why a subtree was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureViolation {
    /// A lone leaf that is not an owner.
    UnscopedLeaf,
    /// A disjunct that is not wrapped in an `And`.
    UnscopedBranch,
    /// An `And` without an owner operand.
    MissingOwner,
    /// An `And` with more than one owner operand.
    MultipleOwners { count: usize },
}

impl fmt::Display for StructureViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureViolation::UnscopedLeaf => f.write_str("filter is not scoped to an owner"),
            StructureViolation::UnscopedBranch => {
                f.write_str("every alternative must be an And scoped to one owner")
            }
            StructureViolation::MissingOwner => f.write_str("And has no owner condition"),
            StructureViolation::MultipleOwners { count } => {
                write!(f, "And has {} owner conditions, expected exactly one", count)
            }
        }
    }
}

/// The filter does not scope every alternative to exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter structure: {reason} in {subtree}")]
pub struct StructureError {
    pub reason: StructureViolation,
    /// The offending part of the normalized filter.
    pub subtree: Filter,
}

/// A normalized filter that passed [`validate`]; the only input translators accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedFilter(NormalizedFilter);

impl ValidatedFilter {
    pub fn as_filter(&self) -> &Filter {
        self.0.as_filter()
    }

    pub fn into_normalized(self) -> NormalizedFilter {
        self.0
    }
}

impl Deref for ValidatedFilter {
    type Target = Filter;

    fn deref(&self) -> &Filter {
        self.0.as_filter()
    }
}

pub fn validate(normalized: NormalizedFilter) -> Result<ValidatedFilter, StructureError> {
    check_root(normalized.as_filter())?;
    Ok(ValidatedFilter(normalized))
}

fn check_root(root: &Filter) -> Result<(), StructureError> {
    match root {
        Filter::Owner(_) => Ok(()),
        Filter::And(_) => check_scoped_and(root),
        Filter::Or(branches) => {
            for branch in branches {
                match branch {
                    Filter::And(_) => check_scoped_and(branch)?,
                    _ => return Err(reject(StructureViolation::UnscopedBranch, branch)),
                }
            }
            Ok(())
        }
        Filter::FieldAnyOf(_)
        | Filter::TagCoverage(_)
        | Filter::QuantityCompare(_)
        | Filter::CrossEntityAnyOf(_) => Err(reject(StructureViolation::UnscopedLeaf, root)),
    }
}

/// `and` must have exactly one owner among its direct operands. Normalization
/// guarantees those operands are leaves.
fn check_scoped_and(and: &Filter) -> Result<(), StructureError> {
    if and.contains_exactly(1, 1, &[FilterKind::Owner]) {
        return Ok(());
    }
    let reason = match and.count_matching_types(1, &[FilterKind::Owner]) {
        0 => StructureViolation::MissingOwner,
        count => StructureViolation::MultipleOwners { count },
    };
    Err(reject(reason, and))
}

fn reject(reason: StructureViolation, subtree: &Filter) -> StructureError {
    StructureError {
        reason,
        subtree: subtree.clone(),
    }
}
