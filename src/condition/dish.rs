//! Dish selection conditions.
//!
//! Ingredient matching depends on filters stored per ingredient, which this
//! crate does not interpret. An [`IngredientFilterEvaluator`] supplies the
//! condition over the dish/ingredient association rows instead.

use super::{
    any_of_condition, col, owner_condition, tag_coverage_condition, Aggregate,
    ConditionTranslator, Ident, TranslateError,
};
use crate::config::{entity, TableMappingConfig};
use crate::filter::{CrossEntityAnyOf, Field, Filter, Relation};
use sea_query::{Query, SimpleExpr};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Evaluates stored ingredient filters against candidate categories.
pub trait IngredientFilterEvaluator: Send + Sync {
    /// Condition over rows of `association` that holds when the ingredient's
    /// stored filter admits at least one of `categories`.
    fn admits_any_category(&self, association: &Ident, categories: &BTreeSet<String>) -> SimpleExpr;
}

/// Treats the stored ingredient filter as a plain category column on the
/// association row.
#[derive(Debug, Clone)]
pub struct CategoryColumnEvaluator {
    column: String,
}

impl CategoryColumnEvaluator {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

impl Default for CategoryColumnEvaluator {
    fn default() -> Self {
        Self::new("product_category")
    }
}

impl IngredientFilterEvaluator for CategoryColumnEvaluator {
    fn admits_any_category(&self, association: &Ident, categories: &BTreeSet<String>) -> SimpleExpr {
        any_of_condition(association, &self.column, categories)
    }
}

pub struct DishTranslator {
    dishes: Ident,
    dish_tags: Ident,
    dish_ingredients: Ident,
    ingredients: Arc<dyn IngredientFilterEvaluator>,
}

impl DishTranslator {
    pub fn new(tables: &TableMappingConfig, ingredients: Arc<dyn IngredientFilterEvaluator>) -> Self {
        Self {
            dishes: Ident::new(tables.get_table_name(entity::DISH)),
            dish_tags: Ident::new(tables.get_table_name(entity::DISH_TAG)),
            dish_ingredients: Ident::new(tables.get_table_name(entity::DISH_INGREDIENT)),
            ingredients,
        }
    }

    fn column(field: Field) -> Option<&'static str> {
        match field {
            Field::DishName => Some("name"),
            Field::Category
            | Field::Shop
            | Field::Grade
            | Field::Manufacturer
            | Field::Unit
            | Field::IngredientCategory => None,
        }
    }

    /// `dishes.id IN (SELECT dish_id FROM dish_ingredients WHERE <stored filter admits>)`
    fn ingredient_condition(&self, categories: &BTreeSet<String>) -> SimpleExpr {
        let with_ingredient = Query::select()
            .column((self.dish_ingredients.clone(), Ident::new("dish_id")))
            .from(self.dish_ingredients.clone())
            .and_where(
                self.ingredients
                    .admits_any_category(&self.dish_ingredients, categories),
            )
            .to_owned();
        col(&self.dishes, "id").in_subquery(with_ingredient)
    }

    fn cross_condition(&self, cross: &CrossEntityAnyOf) -> Result<SimpleExpr, TranslateError> {
        match cross.relation() {
            Relation::DishIngredients => Ok(self.ingredient_condition(cross.values())),
            relation @ Relation::MenuDishes => Err(TranslateError::UnsupportedRelation {
                aggregate: Aggregate::Dish,
                relation,
            }),
        }
    }
}

impl ConditionTranslator for DishTranslator {
    fn aggregate(&self) -> Aggregate {
        Aggregate::Dish
    }

    fn table(&self) -> &Ident {
        &self.dishes
    }

    fn translate_leaf(&self, leaf: &Filter) -> Result<SimpleExpr, TranslateError> {
        match leaf {
            Filter::Owner(owner) => Ok(owner_condition(&self.dishes, owner)),
            // same subquery as the `dish-ingredients` relation
            Filter::FieldAnyOf(any_of) if any_of.field() == Field::IngredientCategory => {
                Ok(self.ingredient_condition(any_of.values()))
            }
            Filter::FieldAnyOf(any_of) => {
                let column =
                    Self::column(any_of.field()).ok_or(TranslateError::UnsupportedField {
                        aggregate: Aggregate::Dish,
                        field: any_of.field(),
                    })?;
                Ok(any_of_condition(&self.dishes, column, any_of.values()))
            }
            Filter::TagCoverage(coverage) => Ok(tag_coverage_condition(
                &self.dishes,
                &self.dish_tags,
                "dish_id",
                coverage.tags(),
            )),
            Filter::CrossEntityAnyOf(cross) => self.cross_condition(cross),
            Filter::QuantityCompare(_) | Filter::And(_) | Filter::Or(_) => {
                Err(self.unsupported(leaf))
            }
        }
    }
}
