//! JSON wire format of [`Filter`].
//!
//! ```json
//! {"type": "and", "values": [
//!     {"type": "owner", "values": ["7f1c0b0e-2d4e-4c1a-9a57-3d1c9f0a1b2c"]},
//!     {"type": "category", "values": ["dairy", "fruit"]},
//!     {"type": "greaterThan", "values": ["0"]}
//! ]}
//! ```
//!
//! Combinators carry nested objects in operand order; every leaf carries
//! strings. Field and relation leaves are discriminated by the field or
//! relation name, quantity leaves by the operator.

use crate::filter::{CompOp, ConstructionError, Field, Filter, OwnerId, Relation};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::str::FromStr;
use thiserror::Error;

/// Malformed or structurally inconsistent filter JSON.
#[derive(Debug, Error)]
#[error("invalid filter JSON: {source}")]
pub struct ParseError {
    #[from]
    source: serde_json::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireKind {
    And,
    Or,
    Owner,
    Tags,
    Category,
    Shop,
    Grade,
    Manufacturer,
    Unit,
    DishName,
    IngredientCategory,
    DishIngredients,
    MenuDishes,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Equal,
}

impl WireKind {
    fn as_str(&self) -> &'static str {
        match self {
            WireKind::And => "and",
            WireKind::Or => "or",
            WireKind::Owner => "owner",
            WireKind::Tags => "tags",
            WireKind::Category => "category",
            WireKind::Shop => "shop",
            WireKind::Grade => "grade",
            WireKind::Manufacturer => "manufacturer",
            WireKind::Unit => "unit",
            WireKind::DishName => "dishName",
            WireKind::IngredientCategory => "ingredientCategory",
            WireKind::DishIngredients => "dishIngredients",
            WireKind::MenuDishes => "menuDishes",
            WireKind::LessThan => "lessThan",
            WireKind::LessOrEqual => "lessOrEqual",
            WireKind::GreaterThan => "greaterThan",
            WireKind::GreaterOrEqual => "greaterOrEqual",
            WireKind::Equal => "equal",
        }
    }

    fn of_field(field: Field) -> Self {
        match field {
            Field::Category => WireKind::Category,
            Field::Shop => WireKind::Shop,
            Field::Grade => WireKind::Grade,
            Field::Manufacturer => WireKind::Manufacturer,
            Field::Unit => WireKind::Unit,
            Field::DishName => WireKind::DishName,
            Field::IngredientCategory => WireKind::IngredientCategory,
        }
    }

    fn of_relation(relation: Relation) -> Self {
        match relation {
            Relation::DishIngredients => WireKind::DishIngredients,
            Relation::MenuDishes => WireKind::MenuDishes,
        }
    }

    fn of_op(op: CompOp) -> Self {
        match op {
            CompOp::Lt => WireKind::LessThan,
            CompOp::Lte => WireKind::LessOrEqual,
            CompOp::Gt => WireKind::GreaterThan,
            CompOp::Gte => WireKind::GreaterOrEqual,
            CompOp::Eq => WireKind::Equal,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireNode {
    #[serde(rename = "type")]
    kind: WireKind,
    values: Vec<Value>,
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a nested filter",
    }
}

/// Structural problems found after the JSON itself parsed.
#[derive(Debug, Error)]
enum WireError {
    #[error("'{kind}' expects nested filters, found {found}")]
    UnexpectedLiteral {
        kind: &'static str,
        found: &'static str,
    },

    #[error("'{kind}' expects strings, found {found}")]
    UnexpectedNode {
        kind: &'static str,
        found: &'static str,
    },

    #[error("operand {index} of '{kind}': {source}")]
    Operand {
        kind: &'static str,
        index: usize,
        source: serde_json::Error,
    },

    #[error("'{kind}' expects exactly one value, found {found}")]
    Arity { kind: &'static str, found: usize },

    #[error("invalid owner id '{value}': {source}")]
    OwnerId { value: String, source: uuid::Error },

    #[error("invalid quantity threshold '{value}': {source}")]
    Threshold {
        value: String,
        source: rust_decimal::Error,
    },

    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

fn literals(kind: WireKind, values: Vec<Value>) -> Result<Vec<String>, WireError> {
    values
        .into_iter()
        .map(|value| match value {
            Value::String(literal) => Ok(literal),
            other => Err(WireError::UnexpectedNode {
                kind: kind.as_str(),
                found: describe(&other),
            }),
        })
        .collect()
}

fn single_literal(kind: WireKind, values: Vec<Value>) -> Result<String, WireError> {
    let mut literals = literals(kind, values)?;
    if literals.len() != 1 {
        return Err(WireError::Arity {
            kind: kind.as_str(),
            found: literals.len(),
        });
    }
    Ok(literals.remove(0))
}

// Objects go through `WireNode` one at a time so serde's own message
// (unknown type, missing field) reaches the caller.
fn operands(kind: WireKind, values: Vec<Value>) -> Result<Vec<Filter>, WireError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(_) => {
                let node = serde_json::from_value::<WireNode>(value).map_err(|source| {
                    WireError::Operand {
                        kind: kind.as_str(),
                        index,
                        source,
                    }
                })?;
                decode(node)
            }
            other => Err(WireError::UnexpectedLiteral {
                kind: kind.as_str(),
                found: describe(&other),
            }),
        })
        .collect()
}

fn decode(node: WireNode) -> Result<Filter, WireError> {
    let WireNode { kind, values } = node;
    let filter = match kind {
        WireKind::And => Filter::and(operands(kind, values)?)?,
        WireKind::Or => Filter::or(operands(kind, values)?)?,
        WireKind::Owner => {
            let value = single_literal(kind, values)?;
            let owner = OwnerId::from_str(&value)
                .map_err(|source| WireError::OwnerId { value, source })?;
            Filter::owner(owner)
        }
        WireKind::Tags => Filter::tags(literals(kind, values)?)?,
        WireKind::Category => Filter::field_any_of(Field::Category, literals(kind, values)?)?,
        WireKind::Shop => Filter::field_any_of(Field::Shop, literals(kind, values)?)?,
        WireKind::Grade => Filter::field_any_of(Field::Grade, literals(kind, values)?)?,
        WireKind::Manufacturer => {
            Filter::field_any_of(Field::Manufacturer, literals(kind, values)?)?
        }
        WireKind::Unit => Filter::field_any_of(Field::Unit, literals(kind, values)?)?,
        WireKind::DishName => Filter::field_any_of(Field::DishName, literals(kind, values)?)?,
        WireKind::IngredientCategory => {
            Filter::field_any_of(Field::IngredientCategory, literals(kind, values)?)?
        }
        WireKind::DishIngredients => {
            Filter::cross_any_of(Relation::DishIngredients, literals(kind, values)?)?
        }
        WireKind::MenuDishes => Filter::cross_any_of(Relation::MenuDishes, literals(kind, values)?)?,
        WireKind::LessThan => quantity(kind, CompOp::Lt, values)?,
        WireKind::LessOrEqual => quantity(kind, CompOp::Lte, values)?,
        WireKind::GreaterThan => quantity(kind, CompOp::Gt, values)?,
        WireKind::GreaterOrEqual => quantity(kind, CompOp::Gte, values)?,
        WireKind::Equal => quantity(kind, CompOp::Eq, values)?,
    };
    Ok(filter)
}

fn quantity(kind: WireKind, op: CompOp, values: Vec<Value>) -> Result<Filter, WireError> {
    let value = single_literal(kind, values)?;
    let threshold = Decimal::from_str(value.trim())
        .map_err(|source| WireError::Threshold { value, source })?;
    Ok(Filter::quantity(op, threshold))
}

fn node(kind: WireKind, values: Vec<Value>) -> Value {
    json!({ "type": kind.as_str(), "values": values })
}

fn strings<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<Value> {
    values.into_iter().map(|value| Value::from(value.as_str())).collect()
}

/// Encodes a filter as a JSON value.
pub fn to_value(filter: &Filter) -> Value {
    match filter {
        Filter::Owner(owner) => node(WireKind::Owner, vec![Value::from(owner.to_string())]),
        Filter::FieldAnyOf(any_of) => node(WireKind::of_field(any_of.field()), strings(any_of.values())),
        Filter::TagCoverage(coverage) => node(
            WireKind::Tags,
            coverage
                .tags()
                .iter()
                .map(|tag| Value::from(tag.as_str()))
                .collect(),
        ),
        Filter::QuantityCompare(compare) => node(
            WireKind::of_op(compare.op),
            vec![Value::from(compare.threshold.to_string())],
        ),
        Filter::CrossEntityAnyOf(cross) => {
            node(WireKind::of_relation(cross.relation()), strings(cross.values()))
        }
        Filter::And(operands) => node(WireKind::And, operands.iter().map(to_value).collect()),
        Filter::Or(operands) => node(WireKind::Or, operands.iter().map(to_value).collect()),
    }
}

pub fn to_json(filter: &Filter) -> String {
    to_value(filter).to_string()
}

pub fn from_json(input: &str) -> Result<Filter, ParseError> {
    Ok(serde_json::from_str(input)?)
}

pub fn from_value(value: Value) -> Result<Filter, ParseError> {
    Ok(serde_json::from_value(value)?)
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = WireNode::deserialize(deserializer)?;
        decode(node).map_err(D::Error::custom)
    }
}
