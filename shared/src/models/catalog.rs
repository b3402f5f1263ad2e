//! Canteen Menu Catalog Model (分类 + 菜品)

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult, ErrorCode};

/// Stock sentinel: not tracked, always available
pub const UNLIMITED_STOCK: i64 = -1;

/// At or below this many units an item reports `low_stock`
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Menu category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuCategoryCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

/// Update category payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MenuCategoryUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Derived stock state of a menu item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Unlimited,
    OutOfStock,
    LowStock,
    InStock,
}

/// Menu item entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category_id: i64,
    pub price: f64,
    pub original_price: Option<f64>,
    pub image: Option<String>,
    pub is_veg: bool,
    pub is_available: bool,
    pub is_active: bool,
    /// -1 = unlimited
    pub stock: i64,
    pub order_count: i64,
    pub preparation_time_mins: i32,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MenuItem {
    pub fn tracks_stock(&self) -> bool {
        self.stock != UNLIMITED_STOCK
    }

    /// round((original − price) / original × 100) when discounted, else 0
    pub fn discount_percentage(&self) -> i32 {
        match self.original_price {
            Some(original) if original > self.price && original > 0.0 => {
                (((original - self.price) / original) * 100.0).round() as i32
            }
            _ => 0,
        }
    }

    pub fn stock_status(&self) -> StockStatus {
        match self.stock {
            UNLIMITED_STOCK => StockStatus::Unlimited,
            s if s <= 0 => StockStatus::OutOfStock,
            s if s <= LOW_STOCK_THRESHOLD => StockStatus::LowStock,
            _ => StockStatus::InStock,
        }
    }

    /// Check the item can be put in a cart / order in the given quantity
    pub fn ensure_orderable(&self, quantity: i32) -> AppResult<()> {
        if !self.is_active || !self.is_available {
            return Err(AppError::with_message(
                ErrorCode::MenuItemUnavailable,
                format!("{} is not available", self.name),
            )
            .with_detail("menu_item_id", self.id));
        }
        if self.tracks_stock() && self.stock < i64::from(quantity) {
            return Err(AppError::with_message(
                ErrorCode::OutOfStock,
                format!("Only {} of {} left in stock", self.stock.max(0), self.name),
            )
            .with_detail("menu_item_id", self.id)
            .with_detail("available", self.stock.max(0)));
        }
        Ok(())
    }
}

/// Menu item as served to clients (stored fields + derived fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemView {
    #[serde(flatten)]
    pub item: MenuItem,
    pub discount_percentage: i32,
    pub stock_status: StockStatus,
}

impl From<MenuItem> for MenuItemView {
    fn from(item: MenuItem) -> Self {
        Self {
            discount_percentage: item.discount_percentage(),
            stock_status: item.stock_status(),
            item,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stock() -> i64 {
    UNLIMITED_STOCK
}

fn default_preparation_time() -> i32 {
    15
}

/// Create menu item payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuItemCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub category_id: i64,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub price: f64,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub original_price: Option<f64>,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    #[serde(default = "default_true")]
    pub is_veg: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default = "default_stock")]
    #[validate(range(min = -1))]
    pub stock: i64,
    #[serde(default = "default_preparation_time")]
    #[validate(range(min = 1, max = 240))]
    pub preparation_time_mins: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Update menu item payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MenuItemUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub category_id: Option<i64>,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub original_price: Option<f64>,
    #[validate(length(max = 2048))]
    pub image: Option<String>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
    pub is_active: Option<bool>,
    #[validate(range(min = -1))]
    pub stock: Option<i64>,
    #[validate(range(min = 1, max = 240))]
    pub preparation_time_mins: Option<i32>,
    pub tags: Option<Vec<String>>,
}

impl MenuItem {
    /// Apply a partial update in place
    pub fn apply_update(&mut self, update: MenuItemUpdate, now: i64) {
        if let Some(v) = update.name {
            self.name = v;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        if let Some(v) = update.category_id {
            self.category_id = v;
        }
        if let Some(v) = update.price {
            self.price = v;
        }
        if update.original_price.is_some() {
            self.original_price = update.original_price;
        }
        if update.image.is_some() {
            self.image = update.image;
        }
        if let Some(v) = update.is_veg {
            self.is_veg = v;
        }
        if let Some(v) = update.is_available {
            self.is_available = v;
        }
        if let Some(v) = update.is_active {
            self.is_active = v;
        }
        if let Some(v) = update.stock {
            self.stock = v;
        }
        if let Some(v) = update.preparation_time_mins {
            self.preparation_time_mins = v;
        }
        if let Some(v) = update.tags {
            self.tags = v;
        }
        self.updated_at = now;
    }
}

/// Availability toggle payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub is_available: bool,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn menu_item(id: i64, name: &str, price: f64) -> MenuItem {
        MenuItem {
            id,
            name: name.to_string(),
            description: None,
            category_id: 1,
            price,
            original_price: None,
            image: None,
            is_veg: true,
            is_available: true,
            is_active: true,
            stock: UNLIMITED_STOCK,
            order_count: 0,
            preparation_time_mins: 15,
            tags: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::menu_item;
    use super::*;

    #[test]
    fn test_discount_percentage() {
        let mut item = menu_item(1, "Paneer Roll", 80.0);
        assert_eq!(item.discount_percentage(), 0);

        item.original_price = Some(100.0);
        assert_eq!(item.discount_percentage(), 20);

        item.original_price = Some(120.0);
        // 40 / 120 = 33.33..%
        assert_eq!(item.discount_percentage(), 33);

        // original below price is not a discount
        item.original_price = Some(60.0);
        assert_eq!(item.discount_percentage(), 0);
    }

    #[test]
    fn test_stock_status() {
        let mut item = menu_item(1, "Samosa", 15.0);
        assert_eq!(item.stock_status(), StockStatus::Unlimited);
        item.stock = 0;
        assert_eq!(item.stock_status(), StockStatus::OutOfStock);
        item.stock = 10;
        assert_eq!(item.stock_status(), StockStatus::LowStock);
        item.stock = 11;
        assert_eq!(item.stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_ensure_orderable() {
        let mut item = menu_item(1, "Dosa", 40.0);
        assert!(item.ensure_orderable(100).is_ok());

        item.stock = 2;
        assert!(item.ensure_orderable(2).is_ok());
        let err = item.ensure_orderable(3).unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfStock);

        item.is_available = false;
        let err = item.ensure_orderable(1).unwrap_err();
        assert_eq!(err.code, ErrorCode::MenuItemUnavailable);
    }

    #[test]
    fn test_view_flattens_derived_fields() {
        let mut item = menu_item(9, "Thali", 90.0);
        item.original_price = Some(120.0);
        item.stock = 5;
        let json = serde_json::to_value(MenuItemView::from(item)).unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["discount_percentage"], 25);
        assert_eq!(json["stock_status"], "low_stock");
    }

    #[test]
    fn test_create_defaults() {
        let create: MenuItemCreate =
            serde_json::from_str(r#"{"name":"Tea","category_id":1,"price":10}"#).unwrap();
        assert_eq!(create.stock, UNLIMITED_STOCK);
        assert_eq!(create.preparation_time_mins, 15);
        assert!(create.is_available);
        assert!(create.validate().is_ok());
    }
}
