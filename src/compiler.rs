//! Filter compiler: runs normalization, validation and translation in one call.
//!
//! ```text
//! Filter ──to_dnf──▶ NormalizedFilter ──validate──▶ ValidatedFilter ──translate──▶ ConditionExpression
//! ```

use crate::condition::{
    Aggregate, CategoryColumnEvaluator, ConditionExpression, ConditionTranslator, DishTranslator,
    IngredientFilterEvaluator, MenuTranslator, ProductTranslator, SqlDialect, TranslateError,
};
use crate::config::TableMappingConfig;
use crate::filter::{ConstructionError, Filter};
use crate::normalizer::{to_dnf, NormalizationInvariantError, NormalizedFilter};
use crate::validator::{validate, StructureError};
use crate::wire::{self, ParseError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Configuration for the filter compiler
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub table_mapping: TableMappingConfig,
    /// Dialect used for the rendered diagnostic SQL.
    pub dialect: SqlDialect,
    /// Normalized filters with more alternatives than this are logged.
    pub dnf_warn_branches: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            table_mapping: TableMappingConfig::default(),
            dialect: SqlDialect::default(),
            dnf_warn_branches: 64,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("internal normalization error: {0}")]
    Invariant(#[from] NormalizationInvariantError),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}

impl CompileError {
    /// Whether the caller sent a bad filter, as opposed to a defect in the
    /// engine or its wiring.
    pub fn is_user_error(&self) -> bool {
        match self {
            CompileError::Parse(_) | CompileError::Construction(_) | CompileError::Structure(_) => {
                true
            }
            CompileError::Invariant(_) | CompileError::Translate(_) => false,
        }
    }
}

/// Result of filter compilation
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub normalized: NormalizedFilter,
    pub condition: ConditionExpression,
    /// `SELECT * FROM .. WHERE ..` in the configured dialect.
    pub sql: String,
}

/// Compiles filters into conditions for any aggregate.
pub struct FilterCompiler {
    config: CompilerConfig,
    ingredients: Arc<dyn IngredientFilterEvaluator>,
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self::from_config(CompilerConfig::default())
    }

    pub fn from_config(config: CompilerConfig) -> Self {
        Self {
            config,
            ingredients: Arc::new(CategoryColumnEvaluator::default()),
        }
    }

    /// Replaces the capability used to match dish ingredients.
    pub fn with_ingredient_evaluator(mut self, ingredients: Arc<dyn IngredientFilterEvaluator>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn translator(&self, aggregate: Aggregate) -> Box<dyn ConditionTranslator> {
        let tables = &self.config.table_mapping;
        match aggregate {
            Aggregate::Product => Box::new(ProductTranslator::new(tables)),
            Aggregate::Dish => Box::new(DishTranslator::new(tables, Arc::clone(&self.ingredients))),
            Aggregate::Menu => Box::new(MenuTranslator::new(tables)),
        }
    }

    pub fn compile(&self, filter: &Filter, aggregate: Aggregate) -> Result<CompileResult, CompileError> {
        debug!(
            %aggregate,
            nodes = filter.node_count(),
            depth = filter.depth(),
            "compiling filter"
        );

        let normalized = to_dnf(filter)?;
        let branches = match normalized.as_filter() {
            Filter::Or(alternatives) => alternatives.len(),
            _ => 1,
        };
        if branches > self.config.dnf_warn_branches {
            warn!(
                %aggregate,
                branches,
                limit = self.config.dnf_warn_branches,
                "normalized filter has many alternatives"
            );
        }
        debug!(filter = %normalized.as_filter(), "normalized");

        let validated = match validate(normalized.clone()) {
            Ok(validated) => validated,
            Err(err) => {
                warn!(%aggregate, reason = %err.reason, subtree = %err.subtree, "rejected filter structure");
                return Err(err.into());
            }
        };

        let condition = self.translator(aggregate).translate(&validated)?;
        let sql = condition.to_sql(self.config.dialect);
        debug!(%aggregate, %sql, "compiled filter");

        Ok(CompileResult {
            normalized,
            condition,
            sql,
        })
    }

    /// Decodes wire-format JSON and compiles it.
    pub fn compile_json(&self, input: &str, aggregate: Aggregate) -> Result<CompileResult, CompileError> {
        let filter = wire::from_json(input)?;
        self.compile(&filter, aggregate)
    }
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CompOp, Field, FilterKind};
    use crate::validator::StructureViolation;
    use uuid::Uuid;

    fn owner(n: u128) -> Filter {
        Filter::owner(Uuid::from_u128(n))
    }

    #[test]
    fn test_compile_distributes_owner() {
        let filter = Filter::and(vec![
            owner(1),
            Filter::or(vec![
                Filter::field_any_of(Field::Category, ["a", "b"]).unwrap(),
                Filter::field_any_of(Field::Shop, ["x"]).unwrap(),
            ])
            .unwrap(),
        ])
        .unwrap();

        let result = FilterCompiler::new().compile(&filter, Aggregate::Product).unwrap();
        assert_eq!(result.normalized.kind(), FilterKind::Or);
        assert_eq!(result.normalized.operands().len(), 2);
        assert_eq!(result.condition.aggregate(), Aggregate::Product);
        assert_eq!(
            result.sql.matches(r#""products"."owner_id""#).count(),
            2,
            "{}",
            result.sql
        );
    }

    #[test]
    fn test_structure_error_is_a_user_error() {
        let filter = Filter::and(vec![owner(1), owner(2)]).unwrap();
        let err = FilterCompiler::new().compile(&filter, Aggregate::Menu).unwrap_err();
        assert!(err.is_user_error());
        match err {
            CompileError::Structure(err) => {
                assert_eq!(err.reason, StructureViolation::MultipleOwners { count: 2 })
            }
            other => panic!("expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_kind_is_not_a_user_error() {
        let filter = Filter::and(vec![owner(1), Filter::quantity(CompOp::Gt, 0)]).unwrap();
        let compiler = FilterCompiler::new();

        assert!(compiler.compile(&filter, Aggregate::Product).is_ok());

        let err = compiler.compile(&filter, Aggregate::Dish).unwrap_err();
        assert!(!err.is_user_error());
        assert!(matches!(
            err,
            CompileError::Translate(TranslateError::UnsupportedFilterKind {
                aggregate: Aggregate::Dish,
                kind: FilterKind::QuantityCompare,
            })
        ));
    }

    #[test]
    fn test_compile_json() {
        let input = r#"{"type": "and", "values": [
            {"type": "owner", "values": ["00000000-0000-0000-0000-000000000001"]},
            {"type": "tags", "values": ["Vegan", "quick"]}
        ]}"#;
        let result = FilterCompiler::new().compile_json(input, Aggregate::Dish).unwrap();
        assert!(result.sql.contains(r#""dish_tags"."tag" IN ('quick', 'vegan')"#), "{}", result.sql);
    }

    #[test]
    fn test_compile_json_ingredient_category_for_dishes() {
        let input = r#"{"type": "and", "values": [
            {"type": "owner", "values": ["00000000-0000-0000-0000-000000000001"]},
            {"type": "ingredientCategory", "values": ["dairy"]}
        ]}"#;
        let result = FilterCompiler::new().compile_json(input, Aggregate::Dish).unwrap();
        assert!(
            result.sql.contains(r#""dishes"."id" IN (SELECT "dish_ingredients"."dish_id""#),
            "{}",
            result.sql
        );
    }

    #[test]
    fn test_compile_json_parse_error() {
        let err = FilterCompiler::new()
            .compile_json("{not json", Aggregate::Product)
            .unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_dialect_is_configurable() {
        let config = CompilerConfig {
            dialect: SqlDialect::Mysql,
            ..Default::default()
        };
        let result = FilterCompiler::from_config(config)
            .compile(&owner(1), Aggregate::Menu)
            .unwrap();
        assert!(result.sql.starts_with("SELECT * FROM `menus` WHERE `menus`.`owner_id` = "));
    }
}
