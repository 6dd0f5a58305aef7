//! Product selection conditions.
//!
//! | leaf                  | condition                                   |
//! |-----------------------|---------------------------------------------|
//! | `Owner`               | `products.owner_id = id`                    |
//! | `FieldAnyOf`          | `products.<column> IN (..)`                 |
//! | `TagCoverage`         | all-of subquery over `product_tags`         |
//! | `QuantityCompare`     | `products.quantity <op> threshold`          |
//! | `CrossEntityAnyOf`    | unsupported                                 |

use super::{
    any_of_condition, owner_condition, quantity_condition, tag_coverage_condition, Aggregate,
    ConditionTranslator, Ident, TranslateError,
};
use crate::config::{entity, TableMappingConfig};
use crate::filter::{Field, Filter};
use sea_query::SimpleExpr;

pub struct ProductTranslator {
    products: Ident,
    product_tags: Ident,
}

impl ProductTranslator {
    pub fn new(tables: &TableMappingConfig) -> Self {
        Self {
            products: Ident::new(tables.get_table_name(entity::PRODUCT)),
            product_tags: Ident::new(tables.get_table_name(entity::PRODUCT_TAG)),
        }
    }

    fn column(field: Field) -> Option<&'static str> {
        match field {
            Field::Category => Some("category"),
            Field::Shop => Some("shop"),
            Field::Grade => Some("grade"),
            Field::Manufacturer => Some("manufacturer"),
            Field::Unit => Some("unit"),
            Field::DishName | Field::IngredientCategory => None,
        }
    }
}

impl ConditionTranslator for ProductTranslator {
    fn aggregate(&self) -> Aggregate {
        Aggregate::Product
    }

    fn table(&self) -> &Ident {
        &self.products
    }

    fn translate_leaf(&self, leaf: &Filter) -> Result<SimpleExpr, TranslateError> {
        match leaf {
            Filter::Owner(owner) => Ok(owner_condition(&self.products, owner)),
            Filter::FieldAnyOf(any_of) => {
                let column =
                    Self::column(any_of.field()).ok_or(TranslateError::UnsupportedField {
                        aggregate: Aggregate::Product,
                        field: any_of.field(),
                    })?;
                Ok(any_of_condition(&self.products, column, any_of.values()))
            }
            Filter::TagCoverage(coverage) => Ok(tag_coverage_condition(
                &self.products,
                &self.product_tags,
                "product_id",
                coverage.tags(),
            )),
            Filter::QuantityCompare(compare) => Ok(quantity_condition(&self.products, compare)),
            Filter::CrossEntityAnyOf(_) | Filter::And(_) | Filter::Or(_) => {
                Err(self.unsupported(leaf))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::test_support::{owned, owner, validated};
    use crate::condition::SqlDialect;
    use crate::filter::{CompOp, FilterKind, Relation};

    fn translator() -> ProductTranslator {
        ProductTranslator::new(&TableMappingConfig::default())
    }

    fn sql(filter: &crate::validator::ValidatedFilter) -> String {
        translator()
            .translate(filter)
            .unwrap()
            .to_sql(SqlDialect::Postgres)
    }

    #[test]
    fn test_owner_only() {
        let sql = sql(&validated(owner()));
        assert!(sql.starts_with(r#"SELECT * FROM "products" WHERE "products"."owner_id" = "#));
        assert!(sql.contains("00000000-0000-0000-0000-000000000001"));
    }

    #[test]
    fn test_quantity_greater_than_zero() {
        let sql = sql(&owned(vec![Filter::quantity(CompOp::Gt, 0)]));
        assert!(sql.contains(r#""products"."quantity" > 0"#));
    }

    #[test]
    fn test_every_comparison_operator() {
        for (op, rendered) in [
            (CompOp::Lt, "<"),
            (CompOp::Lte, "<="),
            (CompOp::Gt, ">"),
            (CompOp::Gte, ">="),
            (CompOp::Eq, "="),
        ] {
            let sql = sql(&owned(vec![Filter::quantity(op, 5)]));
            assert!(
                sql.contains(&format!(r#""products"."quantity" {} 5"#, rendered)),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn test_field_membership() {
        let sql = sql(&owned(vec![
            Filter::field_any_of(Field::Category, ["dairy", "fruit"]).unwrap(),
            Filter::field_any_of(Field::Manufacturer, ["acme"]).unwrap(),
        ]));
        assert!(sql.contains(r#""products"."category" IN ('dairy', 'fruit')"#));
        assert!(sql.contains(r#""products"."manufacturer" IN ('acme')"#));
        assert!(sql.contains(" AND "));
    }

    #[test]
    fn test_tag_coverage_requires_every_tag() {
        let sql = sql(&owned(vec![Filter::tags(["t1", "t2"]).unwrap()]));
        assert!(sql.contains(r#""products"."id" IN (SELECT "product_tags"."product_id" FROM "product_tags""#));
        assert!(sql.contains(r#""product_tags"."tag" IN ('t1', 't2')"#));
        assert!(sql.contains(r#"GROUP BY "product_tags"."product_id""#));
        assert!(sql.contains(r#"HAVING COUNT(DISTINCT "product_tags"."tag") = 2"#));
    }

    #[test]
    fn test_alternatives_are_joined_with_or() {
        let filter = Filter::and(vec![
            owner(),
            Filter::or(vec![
                Filter::field_any_of(Field::Shop, ["corner"]).unwrap(),
                Filter::field_any_of(Field::Unit, ["kg"]).unwrap(),
            ])
            .unwrap(),
        ])
        .unwrap();
        let sql = sql(&validated(filter));
        assert!(sql.contains(" OR "));
        assert!(sql.contains(r#""products"."shop" IN ('corner')"#));
        assert!(sql.contains(r#""products"."unit" IN ('kg')"#));
    }

    #[test]
    fn test_dish_only_field_is_rejected() {
        let err = translator()
            .translate(&owned(vec![
                Filter::field_any_of(Field::DishName, ["soup"]).unwrap()
            ]))
            .unwrap_err();
        assert_eq!(
            err,
            TranslateError::UnsupportedField {
                aggregate: Aggregate::Product,
                field: Field::DishName,
            }
        );
    }

    #[test]
    fn test_cross_entity_is_unsupported() {
        let err = translator()
            .translate(&owned(vec![
                Filter::cross_any_of(Relation::MenuDishes, ["soup"]).unwrap()
            ]))
            .unwrap_err();
        assert_eq!(
            err,
            TranslateError::UnsupportedFilterKind {
                aggregate: Aggregate::Product,
                kind: FilterKind::CrossEntityAnyOf,
            }
        );
    }

    #[test]
    fn test_table_names_follow_configuration() {
        let mut tables = TableMappingConfig::default();
        tables
            .mappings
            .insert(entity::PRODUCT.to_string(), "pantry".to_string());
        let sql = ProductTranslator::new(&tables)
            .translate(&owned(vec![]))
            .unwrap()
            .to_sql(SqlDialect::Postgres);
        assert!(sql.contains(r#"FROM "pantry" WHERE "pantry"."owner_id""#));
    }
}
