//! Cart Model
//!
//! 每个用户一个购物车。任何修改之后都从 items 重新计算 total_amount 和
//! item_count，从不增量更新。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult, ErrorCode};
use crate::money;

use super::catalog::MenuItem;

/// Cart line (price is a snapshot taken when the line was last touched)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i32,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// Cart entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<CartItem>,
    pub total_amount: f64,
    pub item_count: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cart {
    /// Empty cart for a user (lazily created on first access)
    pub fn new(id: i64, user_id: i64, now: i64) -> Self {
        Self {
            id,
            user_id,
            items: Vec::new(),
            total_amount: 0.0,
            item_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recompute totals from the current lines
    pub fn recalculate_total(&mut self) {
        self.total_amount = money::sum_lines(self.items.iter().map(|i| (i.price, i.quantity)));
        self.item_count = self.items.iter().map(|i| i.quantity).sum();
    }

    fn position(&self, menu_item_id: i64) -> Option<usize> {
        self.items.iter().position(|i| i.menu_item_id == menu_item_id)
    }

    /// Add a menu item, merging into an existing line for the same item
    ///
    /// The line's name and price are refreshed from the menu item; special
    /// instructions are replaced when new ones are given.
    pub fn add_item(
        &mut self,
        menu_item: &MenuItem,
        quantity: i32,
        special_instructions: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        if quantity < 1 {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                "quantity must be at least 1",
            ));
        }

        match self.position(menu_item.id) {
            Some(idx) => {
                let line = &mut self.items[idx];
                line.quantity += quantity;
                line.price = menu_item.price;
                line.name = menu_item.name.clone();
                if special_instructions.is_some() {
                    line.special_instructions = special_instructions;
                }
            }
            None => self.items.push(CartItem {
                menu_item_id: menu_item.id,
                name: menu_item.name.clone(),
                quantity,
                price: menu_item.price,
                special_instructions,
            }),
        }

        self.touch(now);
        Ok(())
    }

    /// Overwrite a line's quantity; quantity ≤ 0 removes the line
    pub fn update_item_quantity(
        &mut self,
        menu_item_id: i64,
        quantity: i32,
        now: i64,
    ) -> AppResult<()> {
        let idx = self
            .position(menu_item_id)
            .ok_or_else(|| line_not_found(menu_item_id))?;

        if quantity <= 0 {
            self.items.remove(idx);
        } else {
            self.items[idx].quantity = quantity;
        }

        self.touch(now);
        Ok(())
    }

    pub fn remove_item(&mut self, menu_item_id: i64, now: i64) -> AppResult<()> {
        let idx = self
            .position(menu_item_id)
            .ok_or_else(|| line_not_found(menu_item_id))?;
        self.items.remove(idx);
        self.touch(now);
        Ok(())
    }

    pub fn clear(&mut self, now: i64) {
        self.items.clear();
        self.touch(now);
    }

    fn touch(&mut self, now: i64) {
        self.recalculate_total();
        self.updated_at = now;
    }
}

fn line_not_found(menu_item_id: i64) -> AppError {
    AppError::new(ErrorCode::CartItemNotFound).with_detail("menu_item_id", menu_item_id)
}

/// Add to cart payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCartItem {
    pub menu_item_id: i64,
    #[validate(range(min = 1, max = 50))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub special_instructions: Option<String>,
}

/// Update quantity payload (≤ 0 removes the line)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCartItem {
    #[validate(range(max = 50))]
    pub quantity: i32,
}
