//! Canteen Order Model
//!
//! 订单从购物车快照创建，创建时一次性计算 final_amount，之后任何状态变更
//! 都不会重新计算金额。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::error::{AppError, AppResult, ErrorCode};
use crate::money::{self, to_decimal, to_f64};

use super::cart::Cart;
use super::common::StatusChange;

/// Minutes added on top of the slowest dish for the delivery estimate
pub const DELIVERY_BUFFER_MINS: i64 = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
    Card,
    Wallet,
}

/// Frozen order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub subtotal: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Discount {
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[validate(length(max = 50))]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeliveryAddress {
    #[validate(length(max = 50))]
    pub hostel_block: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub room_number: String,
    pub floor: Option<i32>,
    #[validate(length(max = 200))]
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRating {
    pub food_rating: i32,
    pub delivery_rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rated_at: i64,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub delivery_fee: f64,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub discount: Discount,
    pub final_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub delivery_address: DeliveryAddress,
    pub special_instructions: Option<String>,
    pub estimated_delivery_time: Option<i64>,
    pub preparation_start_time: Option<i64>,
    pub preparation_end_time: Option<i64>,
    pub actual_delivery_time: Option<i64>,
    pub delivery_person_id: Option<i64>,
    pub cancellation_reason: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub status_history: Vec<StatusChange<OrderStatus>>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub rating: Option<OrderRating>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Delivery pricing applied at placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryPricing {
    pub delivery_fee: f64,
    /// Orders whose total reaches this amount ship free
    pub free_delivery_threshold: f64,
}

impl DeliveryPricing {
    pub fn fee_for(&self, total_amount: f64) -> f64 {
        if total_amount >= self.free_delivery_threshold {
            0.0
        } else {
            self.delivery_fee
        }
    }
}

/// Place order payload (lines come from the caller's cart)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[validate(nested)]
    pub delivery_address: DeliveryAddress,
    #[validate(length(max = 500))]
    pub special_instructions: Option<String>,
    #[validate(nested)]
    pub discount: Option<Discount>,
}

/// Format `YYYYMMDD` + 4-digit day sequence
pub fn format_order_number(day: NaiveDate, sequence: i64) -> String {
    format!("{}{:04}", day.format("%Y%m%d"), sequence)
}

impl Order {
    /// Build an order from a cart snapshot
    ///
    /// Lines are frozen, the delivery fee is chosen from `pricing` and
    /// `final_amount = total + fee − discount` is fixed here.
    pub fn from_cart(
        id: i64,
        order_number: String,
        cart: &Cart,
        request: PlaceOrderRequest,
        pricing: &DeliveryPricing,
        now: i64,
    ) -> AppResult<Self> {
        if cart.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }

        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .map(|line| OrderItem {
                menu_item_id: line.menu_item_id,
                name: line.name.clone(),
                price: line.price,
                quantity: line.quantity,
                subtotal: money::line_total(line.price, line.quantity),
                special_instructions: line.special_instructions.clone(),
            })
            .collect();

        let total_amount = money::sum_lines(items.iter().map(|i| (i.price, i.quantity)));
        let delivery_fee = pricing.fee_for(total_amount);
        let discount = request.discount.unwrap_or_default();

        let gross = to_decimal(total_amount) + to_decimal(delivery_fee);
        let discount_amount = to_decimal(discount.amount);
        if !money::is_valid_amount(discount.amount) || discount_amount > gross {
            return Err(AppError::validation("discount exceeds order amount")
                .with_detail("discount", discount.amount));
        }
        let final_amount = to_f64(gross - discount_amount);

        Ok(Self {
            id,
            order_number,
            user_id: cart.user_id,
            items,
            total_amount,
            delivery_fee,
            discount,
            final_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            delivery_address: request.delivery_address,
            special_instructions: request.special_instructions,
            estimated_delivery_time: None,
            preparation_start_time: None,
            preparation_end_time: None,
            actual_delivery_time: None,
            delivery_person_id: None,
            cancellation_reason: None,
            status_history: vec![StatusChange::new(
                OrderStatus::Pending,
                cart.user_id,
                Some("Order placed".to_string()),
                now,
            )],
            rating: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Estimated delivery = now + slowest dish + delivery buffer
    pub fn with_estimated_delivery(mut self, max_preparation_mins: i32, now: i64) -> Self {
        let minutes = i64::from(max_preparation_mins.max(0)) + DELIVERY_BUFFER_MINS;
        self.estimated_delivery_time = Some(now + minutes * 60_000);
        self
    }

    /// Advance the order status (staff action)
    pub fn update_status(
        &mut self,
        new_status: OrderStatus,
        actor: i64,
        notes: Option<String>,
        now: i64,
    ) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidTransition,
                format!("Order is already {}", self.status.as_str()),
            ));
        }
        if new_status == OrderStatus::Cancelled {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidTransition,
                "Use the cancel operation to cancel an order",
            ));
        }

        match new_status {
            OrderStatus::Preparing => self.preparation_start_time = Some(now),
            OrderStatus::Ready => self.preparation_end_time = Some(now),
            OrderStatus::Delivered => self.actual_delivery_time = Some(now),
            _ => {}
        }

        self.record_status(new_status, actor, notes, now);
        Ok(())
    }

    /// Cancel; only pending or confirmed orders can be cancelled
    pub fn cancel_order(&mut self, reason: String, actor: i64, now: i64) -> AppResult<()> {
        if !self.status.is_cancellable() {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidTransition,
                format!("Order cannot be cancelled once {}", self.status.as_str()),
            ));
        }
        if self.payment_status == PaymentStatus::Paid {
            self.payment_status = PaymentStatus::Refunded;
        }
        self.cancellation_reason = Some(reason.clone());
        self.record_status(OrderStatus::Cancelled, actor, Some(reason), now);
        Ok(())
    }

    /// Rate a delivered order (overwrites any earlier rating)
    pub fn add_rating(&mut self, input: OrderRatingInput, now: i64) -> AppResult<()> {
        if self.status != OrderStatus::Delivered {
            return Err(AppError::new(ErrorCode::OrderNotDelivered));
        }
        self.rating = Some(OrderRating {
            food_rating: input.food_rating,
            delivery_rating: input.delivery_rating,
            comment: input.comment,
            rated_at: now,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Hand the order to a delivery person; logged against the current status
    pub fn assign_delivery_person(
        &mut self,
        person_id: i64,
        actor: i64,
        now: i64,
    ) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidTransition,
                format!("Order is already {}", self.status.as_str()),
            ));
        }
        self.delivery_person_id = Some(person_id);
        self.record_status(
            self.status,
            actor,
            Some(format!("Delivery person {person_id} assigned")),
            now,
        );
        Ok(())
    }

    fn record_status(&mut self, status: OrderStatus, actor: i64, notes: Option<String>, now: i64) {
        self.status = status;
        self.status_history
            .push(StatusChange::new(status, actor, notes, now));
        self.updated_at = now;
    }
}

/// Status update payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Cancel payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelOrderRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

/// Assign delivery person payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignDeliveryRequest {
    pub delivery_person_id: i64,
}

/// Rating payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderRatingInput {
    #[validate(range(min = 1, max = 5))]
    pub food_rating: i32,
    #[validate(range(min = 1, max = 5))]
    pub delivery_rating: i32,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Order aggregates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Σ final_amount of delivered orders
    pub total_revenue: f64,
    pub average_order_value: f64,
    pub average_food_rating: Option<f64>,
    pub average_delivery_rating: Option<f64>,
}

impl OrderStats {
    /// Empty stats with every status bucket present
    pub fn zeroed() -> Self {
        Self {
            by_status: OrderStatus::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), 0))
                .collect(),
            ..Default::default()
        }
    }
}
