//! Translation of validated filters into sea-query condition expressions.
//!
//! Each aggregate has its own translator with a fixed leaf table; the
//! combinators are handled once here by folding the translated operands.

pub mod dish;
pub mod menu;
pub mod product;

pub use dish::{CategoryColumnEvaluator, DishTranslator, IngredientFilterEvaluator};
pub use menu::MenuTranslator;
pub use product::ProductTranslator;

use crate::filter::{CompOp, Field, Filter, FilterKind, OwnerId, QuantityCompare, Relation};
use crate::tag::Tag;
use crate::validator::ValidatedFilter;
use sea_query::{
    Asterisk, Expr, Func, Iden, MysqlQueryBuilder, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr, SqliteQueryBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The entity kinds a filter can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Product,
    Dish,
    Menu,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Product => "product",
            Aggregate::Dish => "dish",
            Aggregate::Menu => "menu",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "product" | "products" => Ok(Aggregate::Product),
            "dish" | "dishes" => Ok(Aggregate::Dish),
            "menu" | "menus" => Ok(Aggregate::Menu),
            other => Err(format!("unknown aggregate '{}'", other)),
        }
    }
}

/// SQL dialect used when rendering a condition for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl SqlDialect {
    pub fn render(&self, select: &SelectStatement) -> String {
        match self {
            SqlDialect::Postgres => select.to_string(PostgresQueryBuilder),
            SqlDialect::Mysql => select.to_string(MysqlQueryBuilder),
            SqlDialect::Sqlite => select.to_string(SqliteQueryBuilder),
        }
    }
}

/// A leaf or combinator the translator has no mapping for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("{aggregate} translator has no mapping for {kind} filters")]
    UnsupportedFilterKind { aggregate: Aggregate, kind: FilterKind },

    #[error("{aggregate} translator has no column for field '{field}'")]
    UnsupportedField { aggregate: Aggregate, field: Field },

    #[error("{aggregate} translator cannot follow relation '{relation}'")]
    UnsupportedRelation { aggregate: Aggregate, relation: Relation },
}

/// Table or column identifier resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident(pub String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Ident(name.into())
    }
}

impl Iden for Ident {
    fn unquoted(&self, s: &mut dyn fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Backend condition produced by a translator.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionExpression {
    aggregate: Aggregate,
    table: Ident,
    expr: SimpleExpr,
}

impl ConditionExpression {
    pub fn aggregate(&self) -> Aggregate {
        self.aggregate
    }

    pub fn expr(&self) -> &SimpleExpr {
        &self.expr
    }

    pub fn into_expr(self) -> SimpleExpr {
        self.expr
    }

    /// `SELECT * FROM <table> WHERE <condition>`, ready for an executor to add
    /// ordering and paging.
    pub fn to_select(&self) -> SelectStatement {
        Query::select()
            .column(Asterisk)
            .from(self.table.clone())
            .and_where(self.expr.clone())
            .to_owned()
    }

    pub fn to_sql(&self, dialect: SqlDialect) -> String {
        dialect.render(&self.to_select())
    }
}

/// Per-aggregate leaf translation table.
pub trait ConditionTranslator {
    fn aggregate(&self) -> Aggregate;

    /// Table the translated condition applies to.
    fn table(&self) -> &Ident;

    fn translate_leaf(&self, leaf: &Filter) -> Result<SimpleExpr, TranslateError>;

    fn translate(&self, filter: &ValidatedFilter) -> Result<ConditionExpression, TranslateError> {
        let expr = translate_node(self, filter.as_filter())?;
        Ok(ConditionExpression {
            aggregate: self.aggregate(),
            table: self.table().clone(),
            expr,
        })
    }

    fn unsupported(&self, leaf: &Filter) -> TranslateError {
        TranslateError::UnsupportedFilterKind {
            aggregate: self.aggregate(),
            kind: leaf.kind(),
        }
    }
}

fn translate_node<T>(translator: &T, node: &Filter) -> Result<SimpleExpr, TranslateError>
where
    T: ConditionTranslator + ?Sized,
{
    match node {
        Filter::And(operands) => {
            let conditions = operands
                .iter()
                .map(|operand| translate_node(translator, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(combine_conditions_with_and(conditions))
        }
        Filter::Or(operands) => {
            let conditions = operands
                .iter()
                .map(|operand| translate_node(translator, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(combine_conditions_with_or(conditions))
        }
        leaf => translator.translate_leaf(leaf),
    }
}

/// Left fold seeded by the first condition.
fn combine_conditions_with_and(conditions: Vec<SimpleExpr>) -> SimpleExpr {
    conditions
        .into_iter()
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| Expr::val(true).into())
}

fn combine_conditions_with_or(conditions: Vec<SimpleExpr>) -> SimpleExpr {
    conditions
        .into_iter()
        .reduce(|acc, expr| acc.or(expr))
        .unwrap_or_else(|| Expr::val(false).into())
}

pub(crate) fn col(table: &Ident, column: &str) -> Expr {
    Expr::col((table.clone(), Ident::new(column)))
}

pub(crate) fn owner_condition(table: &Ident, owner: &OwnerId) -> SimpleExpr {
    col(table, "owner_id").eq(owner.as_uuid())
}

pub(crate) fn any_of_condition(table: &Ident, column: &str, values: &BTreeSet<String>) -> SimpleExpr {
    col(table, column).is_in(values.iter().cloned())
}

pub(crate) fn quantity_condition(table: &Ident, leaf: &QuantityCompare) -> SimpleExpr {
    let quantity = col(table, "quantity");
    match leaf.op {
        CompOp::Lt => quantity.lt(leaf.threshold),
        CompOp::Lte => quantity.lte(leaf.threshold),
        CompOp::Gt => quantity.gt(leaf.threshold),
        CompOp::Gte => quantity.gte(leaf.threshold),
        CompOp::Eq => quantity.eq(leaf.threshold),
    }
}

/// `<entity>.id IN (SELECT fk FROM tags WHERE tag IN (..) GROUP BY fk HAVING COUNT(DISTINCT tag) = n)`
///
/// Counting the distinct matching tags per entity makes this an all-of test:
/// an entity carrying only some of the tags has a smaller count.
pub(crate) fn tag_coverage_condition(
    entity_table: &Ident,
    tag_table: &Ident,
    foreign_key: &str,
    tags: &BTreeSet<Tag>,
) -> SimpleExpr {
    let tagged = (tag_table.clone(), Ident::new(foreign_key));
    let covering = Query::select()
        .column(tagged.clone())
        .from(tag_table.clone())
        .and_where(col(tag_table, "tag").is_in(tags.iter().map(|tag| tag.as_str().to_string())))
        .group_by_col(tagged)
        // DISTINCT: repeated (entity, tag) rows must not stand in for missing tags
        .and_having(Expr::expr(Func::count_distinct(col(tag_table, "tag"))).eq(tags.len() as i64))
        .to_owned();

    col(entity_table, "id").in_subquery(covering)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::filter::Filter;
    use crate::normalizer::to_dnf;
    use crate::validator::{validate, ValidatedFilter};
    use uuid::Uuid;

    pub const USER: u128 = 1;

    pub fn owner() -> Filter {
        Filter::owner(Uuid::from_u128(USER))
    }

    pub fn owned(leaves: Vec<Filter>) -> ValidatedFilter {
        let mut operands = vec![owner()];
        operands.extend(leaves);
        validated(Filter::and(operands).unwrap())
    }

    pub fn validated(filter: Filter) -> ValidatedFilter {
        validate(to_dnf(&filter).unwrap()).unwrap()
    }
}
