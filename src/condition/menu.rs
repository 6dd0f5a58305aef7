//! Menu selection conditions. Menus have no directly filterable fields; they
//! are selected by owner, tags and the names of the dishes they contain.

use super::{
    col, owner_condition, tag_coverage_condition, Aggregate, ConditionTranslator, Ident,
    TranslateError,
};
use crate::config::{entity, TableMappingConfig};
use crate::filter::{CrossEntityAnyOf, Filter, Relation};
use sea_query::{Expr, Query, SimpleExpr};

pub struct MenuTranslator {
    menus: Ident,
    menu_tags: Ident,
    menu_dishes: Ident,
    dishes: Ident,
}

impl MenuTranslator {
    pub fn new(tables: &TableMappingConfig) -> Self {
        Self {
            menus: Ident::new(tables.get_table_name(entity::MENU)),
            menu_tags: Ident::new(tables.get_table_name(entity::MENU_TAG)),
            menu_dishes: Ident::new(tables.get_table_name(entity::MENU_DISH)),
            dishes: Ident::new(tables.get_table_name(entity::DISH)),
        }
    }

    /// `menus.id IN (SELECT menu_id FROM menu_dishes JOIN dishes .. WHERE dishes.name IN (..))`
    fn dish_condition(&self, cross: &CrossEntityAnyOf) -> Result<SimpleExpr, TranslateError> {
        match cross.relation() {
            Relation::MenuDishes => {
                let with_dish = Query::select()
                    .column((self.menu_dishes.clone(), Ident::new("menu_id")))
                    .from(self.menu_dishes.clone())
                    .inner_join(
                        self.dishes.clone(),
                        Expr::col((self.dishes.clone(), Ident::new("id")))
                            .equals((self.menu_dishes.clone(), Ident::new("dish_id"))),
                    )
                    .and_where(col(&self.dishes, "name").is_in(cross.values().iter().cloned()))
                    .to_owned();
                Ok(col(&self.menus, "id").in_subquery(with_dish))
            }
            relation @ Relation::DishIngredients => Err(TranslateError::UnsupportedRelation {
                aggregate: Aggregate::Menu,
                relation,
            }),
        }
    }
}

impl ConditionTranslator for MenuTranslator {
    fn aggregate(&self) -> Aggregate {
        Aggregate::Menu
    }

    fn table(&self) -> &Ident {
        &self.menus
    }

    fn translate_leaf(&self, leaf: &Filter) -> Result<SimpleExpr, TranslateError> {
        match leaf {
            Filter::Owner(owner) => Ok(owner_condition(&self.menus, owner)),
            Filter::FieldAnyOf(any_of) => Err(TranslateError::UnsupportedField {
                aggregate: Aggregate::Menu,
                field: any_of.field(),
            }),
            Filter::TagCoverage(coverage) => Ok(tag_coverage_condition(
                &self.menus,
                &self.menu_tags,
                "menu_id",
                coverage.tags(),
            )),
            Filter::CrossEntityAnyOf(cross) => self.dish_condition(cross),
            Filter::QuantityCompare(_) | Filter::And(_) | Filter::Or(_) => {
                Err(self.unsupported(leaf))
            }
        }
    }
}
