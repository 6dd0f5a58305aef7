//! The filter tree: leaf conditions joined by `And` / `Or` combinators.
//!
//! A [`Filter`] is an immutable, exclusively owned tree. Leaf payloads are
//! wrapped in small structs whose constructors reject empty value sets and
//! blank elements, so every value of this type that exists is well-formed.
//!
//! ```text
//! and(owner(7f1c…), or(category[dairy, fruit], shop[corner]))
//!  ├─ owner                     leaf
//!  └─ or                        combinator
//!      ├─ category[…]           leaf
//!      └─ shop[…]               leaf
//! ```

use crate::tag::Tag;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while building a filter node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("{kind} requires at least one value")]
    EmptyValues { kind: FilterKind },

    #[error("{kind} values must not be blank")]
    BlankValue { kind: FilterKind },

    #[error("{kind} requires at least one operand")]
    NoOperands { kind: FilterKind },

    #[error("tag must not be blank")]
    BlankTag,
}

/// Identifier of the user owning an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new(id: Uuid) -> Self {
        OwnerId(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        OwnerId(id)
    }
}

impl FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(OwnerId)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Entity attribute a [`FieldAnyOf`] leaf tests for membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Category,
    Shop,
    Grade,
    Manufacturer,
    Unit,
    DishName,
    IngredientCategory,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Category,
        Field::Shop,
        Field::Grade,
        Field::Manufacturer,
        Field::Unit,
        Field::DishName,
        Field::IngredientCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Shop => "shop",
            Field::Grade => "grade",
            Field::Manufacturer => "manufacturer",
            Field::Unit => "unit",
            Field::DishName => "dish-name",
            Field::IngredientCategory => "ingredient-category",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Association followed by a [`CrossEntityAnyOf`] leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// Dish → its ingredients, matched by ingredient category.
    DishIngredients,
    /// Menu → the dishes it contains, matched by dish name.
    MenuDishes,
}

impl Relation {
    pub const ALL: [Relation; 2] = [Relation::DishIngredients, Relation::MenuDishes];

    /// The attribute of the related entity the values are tested against.
    pub fn target_field(&self) -> Field {
        match self {
            Relation::DishIngredients => Field::IngredientCategory,
            Relation::MenuDishes => Field::DishName,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::DishIngredients => "dish-ingredients",
            Relation::MenuDishes => "menu-dishes",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a quantity leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompOp {
    Lt,  // <
    Lte, // <=
    Gt,  // >
    Gte, // >=
    Eq,  // =
}

impl CompOp {
    pub const ALL: [CompOp; 5] = [CompOp::Lt, CompOp::Lte, CompOp::Gt, CompOp::Gte, CompOp::Eq];

    pub fn symbol(&self) -> &'static str {
        match self {
            CompOp::Lt => "<",
            CompOp::Lte => "<=",
            CompOp::Gt => ">",
            CompOp::Gte => ">=",
            CompOp::Eq => "=",
        }
    }
}

/// `field ∈ values`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAnyOf {
    field: Field,
    values: BTreeSet<String>,
}

impl FieldAnyOf {
    pub fn field(&self) -> Field {
        self.field
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }
}

/// The entity must carry every tag in the set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagCoverage {
    tags: BTreeSet<Tag>,
}

impl TagCoverage {
    pub fn tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }
}

/// `quantity op threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantityCompare {
    pub op: CompOp,
    pub threshold: Decimal,
}

/// Some entity reachable through `relation` has its target field in `values`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrossEntityAnyOf {
    relation: Relation,
    values: BTreeSet<String>,
}

impl CrossEntityAnyOf {
    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }
}

/// Non-empty, ordered operand list of a combinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operands(Vec<Filter>);

impl Operands {
    /// Callers inside the crate guarantee `operands` is non-empty.
    pub(crate) fn from_vec(operands: Vec<Filter>) -> Self {
        debug_assert!(!operands.is_empty(), "combinator built without operands");
        Operands(operands)
    }

    pub fn as_slice(&self) -> &[Filter] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Filter> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Operands {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A selection predicate tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    Owner(OwnerId),
    FieldAnyOf(FieldAnyOf),
    TagCoverage(TagCoverage),
    QuantityCompare(QuantityCompare),
    CrossEntityAnyOf(CrossEntityAnyOf),
    And(Operands),
    Or(Operands),
}

/// Discriminant of a [`Filter`] node, used for type-occurrence queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    Owner,
    FieldAnyOf,
    TagCoverage,
    QuantityCompare,
    CrossEntityAnyOf,
    And,
    Or,
}

impl FilterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Owner => "Owner",
            FilterKind::FieldAnyOf => "FieldAnyOf",
            FilterKind::TagCoverage => "TagCoverage",
            FilterKind::QuantityCompare => "QuantityCompare",
            FilterKind::CrossEntityAnyOf => "CrossEntityAnyOf",
            FilterKind::And => "And",
            FilterKind::Or => "Or",
        }
    }

    pub fn is_combinator(&self) -> bool {
        matches!(self, FilterKind::And | FilterKind::Or)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collects literal values into a set, rejecting blank elements and empty input.
fn literal_set<I, S>(kind: FilterKind, values: I) -> Result<BTreeSet<String>, ConstructionError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut set = BTreeSet::new();
    for value in values {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConstructionError::BlankValue { kind });
        }
        set.insert(value);
    }
    if set.is_empty() {
        return Err(ConstructionError::EmptyValues { kind });
    }
    Ok(set)
}

impl Filter {
    pub fn owner(id: impl Into<OwnerId>) -> Self {
        Filter::Owner(id.into())
    }

    pub fn field_any_of<I, S>(field: Field, values: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = literal_set(FilterKind::FieldAnyOf, values)?;
        Ok(Filter::FieldAnyOf(FieldAnyOf { field, values }))
    }

    /// Builds a tag-coverage leaf from raw strings, normalizing each tag.
    pub fn tags<I, S>(tags: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags = tags
            .into_iter()
            .map(Tag::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::tag_coverage(tags)
    }

    pub fn tag_coverage<I>(tags: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Tag>,
    {
        let tags: BTreeSet<Tag> = tags.into_iter().collect();
        if tags.is_empty() {
            return Err(ConstructionError::EmptyValues {
                kind: FilterKind::TagCoverage,
            });
        }
        Ok(Filter::TagCoverage(TagCoverage { tags }))
    }

    pub fn quantity(op: CompOp, threshold: impl Into<Decimal>) -> Self {
        Filter::QuantityCompare(QuantityCompare {
            op,
            threshold: threshold.into(),
        })
    }

    pub fn cross_any_of<I, S>(relation: Relation, values: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = literal_set(FilterKind::CrossEntityAnyOf, values)?;
        Ok(Filter::CrossEntityAnyOf(CrossEntityAnyOf { relation, values }))
    }

    pub fn and<I>(operands: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Filter>,
    {
        let operands: Vec<Filter> = operands.into_iter().collect();
        if operands.is_empty() {
            return Err(ConstructionError::NoOperands {
                kind: FilterKind::And,
            });
        }
        Ok(Filter::And(Operands(operands)))
    }

    pub fn or<I>(operands: I) -> Result<Self, ConstructionError>
    where
        I: IntoIterator<Item = Filter>,
    {
        let operands: Vec<Filter> = operands.into_iter().collect();
        if operands.is_empty() {
            return Err(ConstructionError::NoOperands {
                kind: FilterKind::Or,
            });
        }
        Ok(Filter::Or(Operands(operands)))
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Owner(_) => FilterKind::Owner,
            Filter::FieldAnyOf(_) => FilterKind::FieldAnyOf,
            Filter::TagCoverage(_) => FilterKind::TagCoverage,
            Filter::QuantityCompare(_) => FilterKind::QuantityCompare,
            Filter::CrossEntityAnyOf(_) => FilterKind::CrossEntityAnyOf,
            Filter::And(_) => FilterKind::And,
            Filter::Or(_) => FilterKind::Or,
        }
    }

    pub fn is_leaf(&self) -> bool {
        !self.kind().is_combinator()
    }

    /// Direct children; empty for leaves.
    pub fn operands(&self) -> &[Filter] {
        match self {
            Filter::And(operands) | Filter::Or(operands) => operands.as_slice(),
            Filter::Owner(_)
            | Filter::FieldAnyOf(_)
            | Filter::TagCoverage(_)
            | Filter::QuantityCompare(_)
            | Filter::CrossEntityAnyOf(_) => &[],
        }
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Owner(id) => write!(f, "owner({})", id),
            Filter::FieldAnyOf(leaf) => {
                write!(f, "{}[", leaf.field)?;
                write_list(f, &leaf.values)?;
                f.write_str("]")
            }
            Filter::TagCoverage(leaf) => {
                f.write_str("tags[")?;
                write_list(f, &leaf.tags)?;
                f.write_str("]")
            }
            Filter::QuantityCompare(leaf) => {
                write!(f, "quantity {} {}", leaf.op.symbol(), leaf.threshold)
            }
            Filter::CrossEntityAnyOf(leaf) => {
                write!(f, "{}[", leaf.relation)?;
                write_list(f, &leaf.values)?;
                f.write_str("]")
            }
            Filter::And(operands) => {
                f.write_str("and(")?;
                write_list(f, operands)?;
                f.write_str(")")
            }
            Filter::Or(operands) => {
                f.write_str("or(")?;
                write_list(f, operands)?;
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> OwnerId {
        OwnerId::new(Uuid::from_u128(1))
    }

    #[test]
    fn test_field_any_of_rejects_empty_values() {
        let result = Filter::field_any_of(Field::Category, Vec::<String>::new());
        assert_eq!(
            result,
            Err(ConstructionError::EmptyValues {
                kind: FilterKind::FieldAnyOf
            })
        );
    }

    #[test]
    fn test_field_any_of_rejects_blank_value() {
        let result = Filter::field_any_of(Field::Shop, ["corner", "  "]);
        assert_eq!(
            result,
            Err(ConstructionError::BlankValue {
                kind: FilterKind::FieldAnyOf
            })
        );
    }

    #[test]
    fn test_cross_any_of_rejects_empty_values() {
        let result = Filter::cross_any_of(Relation::MenuDishes, Vec::<&str>::new());
        assert!(matches!(
            result,
            Err(ConstructionError::EmptyValues {
                kind: FilterKind::CrossEntityAnyOf
            })
        ));
    }

    #[test]
    fn test_tags_reject_empty_and_blank() {
        assert!(matches!(
            Filter::tags(Vec::<&str>::new()),
            Err(ConstructionError::EmptyValues { .. })
        ));
        assert_eq!(Filter::tags(["vegan", " "]), Err(ConstructionError::BlankTag));
    }

    #[test]
    fn test_combinators_reject_zero_operands() {
        assert_eq!(
            Filter::and(vec![]),
            Err(ConstructionError::NoOperands {
                kind: FilterKind::And
            })
        );
        assert_eq!(
            Filter::or(vec![]),
            Err(ConstructionError::NoOperands {
                kind: FilterKind::Or
            })
        );
    }

    #[test]
    fn test_duplicate_values_collapse() {
        let a = Filter::field_any_of(Field::Grade, ["a", "b", "a"]).unwrap();
        let b = Filter::field_any_of(Field::Grade, ["b", "a"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_operand_order_matters_for_equality() {
        let owner = Filter::owner(user());
        let unit = Filter::field_any_of(Field::Unit, ["kg"]).unwrap();
        let ab = Filter::and(vec![owner.clone(), unit.clone()]).unwrap();
        let ba = Filter::and(vec![unit, owner]).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_kind_and_operands() {
        let owner = Filter::owner(user());
        assert!(owner.is_leaf());
        assert!(owner.operands().is_empty());

        let or = Filter::or(vec![owner.clone(), Filter::quantity(CompOp::Gt, 0)]).unwrap();
        assert_eq!(or.kind(), FilterKind::Or);
        assert!(!or.is_leaf());
        assert_eq!(or.operands().len(), 2);
    }

    #[test]
    fn test_display() {
        let filter = Filter::and(vec![
            Filter::owner(user()),
            Filter::field_any_of(Field::Category, ["fruit", "dairy"]).unwrap(),
            Filter::quantity(CompOp::Gte, 2),
        ])
        .unwrap();
        assert_eq!(
            filter.to_string(),
            "and(owner(00000000-0000-0000-0000-000000000001), category[dairy, fruit], quantity >= 2)"
        );
    }

    #[test]
    fn test_owner_id_parsing() {
        let id: OwnerId = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(id, user());
        assert!("not-a-uuid".parse::<OwnerId>().is_err());
    }
}
