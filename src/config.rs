//! 配置模块，负责加载JSON表映射配置文件

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 翻译器解析为表名的逻辑实体名
pub mod entity {
    pub const PRODUCT: &str = "Product";
    pub const PRODUCT_TAG: &str = "ProductTag";
    pub const DISH: &str = "Dish";
    pub const DISH_TAG: &str = "DishTag";
    pub const DISH_INGREDIENT: &str = "DishIngredient";
    pub const MENU: &str = "Menu";
    pub const MENU_TAG: &str = "MenuTag";
    pub const MENU_DISH: &str = "MenuDish";
}

/// 表映射配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    Missing { path: String },

    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("无法解析JSON配置文件 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 表映射配置结构
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMappingConfig {
    /// 实体名到数据库表名的映射
    #[serde(flatten)]
    pub mappings: HashMap<String, String>,
}

impl TableMappingConfig {
    /// 从JSON文件加载表映射配置
    ///
    /// 文件中的条目覆盖默认映射，文件未提及的实体保留默认表名
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        if !path_ref.exists() {
            return Err(ConfigError::Missing { path: display });
        }

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let overrides: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;

        let mut config = Self::default();
        config.mappings.extend(overrides);
        Ok(config)
    }

    /// 获取实体对应的表名，如果不存在则返回小写的实体名
    pub fn get_table_name(&self, entity: &str) -> String {
        self.mappings
            .get(entity)
            .cloned()
            .unwrap_or_else(|| entity.to_lowercase())
    }

    /// 获取所有映射
    pub fn get_mappings(&self) -> &HashMap<String, String> {
        &self.mappings
    }
}

impl Default for TableMappingConfig {
    fn default() -> Self {
        let mappings = [
            (entity::PRODUCT, "products"),
            (entity::PRODUCT_TAG, "product_tags"),
            (entity::DISH, "dishes"),
            (entity::DISH_TAG, "dish_tags"),
            (entity::DISH_INGREDIENT, "dish_ingredients"),
            (entity::MENU, "menus"),
            (entity::MENU_TAG, "menu_tags"),
            (entity::MENU_DISH, "menu_dishes"),
        ]
        .into_iter()
        .map(|(entity, table)| (entity.to_string(), table.to_string()))
        .collect();

        Self { mappings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        // 创建临时配置文件
        let temp_file = "test_cookbook_table_mapping.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(
            file,
            r#"{{
            "Product": "pantry_items",
            "Recipe": "recipes"
        }}"#
        )
        .unwrap();

        let config = TableMappingConfig::from_json_file(temp_file).unwrap();
        assert_eq!(config.get_table_name("Product"), "pantry_items");
        assert_eq!(config.get_table_name("Recipe"), "recipes");
        assert_eq!(config.get_table_name("Dish"), "dishes");
        assert_eq!(config.get_table_name("Unknown"), "unknown");

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_invalid_json_config() {
        let temp_file = "test_cookbook_invalid.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = TableMappingConfig::from_json_file(temp_file);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = TableMappingConfig::from_json_file("non_existent_cookbook_file.json");
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_default_config() {
        let config = TableMappingConfig::default();
        assert_eq!(config.get_table_name(entity::MENU_DISH), "menu_dishes");
        assert_eq!(config.get_table_name("Unknown"), "unknown");
    }
}
