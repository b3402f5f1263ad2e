//! Order Repository

use super::{RepoError, RepoResult, merge_counts};
use shared::models::{Order, OrderStats, OrderStatus};
use sqlx::{SqliteExecutor, SqlitePool};

const COLUMNS: &str = "id, order_number, user_id, items, total_amount, delivery_fee, discount, final_amount, \
                       status, payment_status, payment_method, delivery_address, special_instructions, \
                       estimated_delivery_time, preparation_start_time, preparation_end_time, \
                       actual_delivery_time, delivery_person_id, cancellation_reason, status_history, \
                       rating, created_at, updated_at";

/// List filters
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to one customer
    pub user_id: Option<i64>,
    pub status: Option<OrderStatus>,
    /// `[from, to)` on created_at (Unix millis)
    pub created_from: Option<i64>,
    pub created_to: Option<i64>,
}

const FILTER: &str = "(?1 IS NULL OR user_id = ?1) \
    AND (?2 IS NULL OR status = ?2) \
    AND (?3 IS NULL OR created_at >= ?3) \
    AND (?4 IS NULL OR created_at < ?4)";

/// Issue the next order sequence number for a business day (`YYYYMMDD`)
///
/// Runs inside the placement transaction, so two placements on the same day
/// can never read the same value.
pub async fn next_day_sequence(executor: impl SqliteExecutor<'_>, day: &str) -> RepoResult<i64> {
    let seq: i64 = sqlx::query_scalar(
        "INSERT INTO order_day_sequence (day, last_seq) VALUES (?, 1) \
         ON CONFLICT(day) DO UPDATE SET last_seq = last_seq + 1 RETURNING last_seq",
    )
    .bind(day)
    .fetch_one(executor)
    .await?;
    Ok(seq)
}

pub async fn insert(executor: impl SqliteExecutor<'_>, order: &Order) -> RepoResult<()> {
    sqlx::query(&format!(
        "INSERT INTO orders ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(sqlx::types::Json(&order.items))
    .bind(order.total_amount)
    .bind(order.delivery_fee)
    .bind(sqlx::types::Json(&order.discount))
    .bind(order.final_amount)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.payment_method)
    .bind(sqlx::types::Json(&order.delivery_address))
    .bind(&order.special_instructions)
    .bind(order.estimated_delivery_time)
    .bind(order.preparation_start_time)
    .bind(order.preparation_end_time)
    .bind(order.actual_delivery_time)
    .bind(order.delivery_person_id)
    .bind(&order.cancellation_reason)
    .bind(sqlx::types::Json(&order.status_history))
    .bind(sqlx::types::Json(&order.rating))
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(executor)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => {
            RepoError::Duplicate(format!("Order number {} already exists", order.order_number))
        }
        other => other,
    })?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {COLUMNS} FROM orders WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

/// Persist the mutable part of an order after a lifecycle method ran.
///
/// Amounts, lines and the order number are fixed at placement and never
/// written again.
pub async fn save(pool: &SqlitePool, order: &Order) -> RepoResult<()> {
    let rows = sqlx::query(
        "UPDATE orders SET status = ?, payment_status = ?, preparation_start_time = ?, \
         preparation_end_time = ?, actual_delivery_time = ?, delivery_person_id = ?, \
         cancellation_reason = ?, status_history = ?, rating = ?, updated_at = ? WHERE id = ?",
    )
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.preparation_start_time)
    .bind(order.preparation_end_time)
    .bind(order.actual_delivery_time)
    .bind(order.delivery_person_id)
    .bind(&order.cancellation_reason)
    .bind(sqlx::types::Json(&order.status_history))
    .bind(sqlx::types::Json(&order.rating))
    .bind(order.updated_at)
    .bind(order.id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {} not found", order.id)));
    }
    Ok(())
}

/// Newest first
pub async fn list(
    pool: &SqlitePool,
    filter: &OrderFilter,
    offset: u32,
    limit: u32,
) -> RepoResult<(Vec<Order>, u64)> {
    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {COLUMNS} FROM orders WHERE {FILTER} ORDER BY created_at DESC, id DESC LIMIT ?5 OFFSET ?6"
    ))
    .bind(filter.user_id)
    .bind(filter.status)
    .bind(filter.created_from)
    .bind(filter.created_to)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {FILTER}"))
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_one(pool)
        .await?;

    Ok((orders, total as u64))
}

/// Order aggregates; revenue and average value count delivered orders only
pub async fn stats(pool: &SqlitePool) -> RepoResult<OrderStats> {
    let mut stats = OrderStats::zeroed();

    let by_status: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
            .fetch_all(pool)
            .await?;
    stats.total_orders = by_status.iter().map(|(_, n)| n).sum();
    merge_counts(&mut stats.by_status, by_status);

    let (revenue, delivered): (Option<f64>, i64) = sqlx::query_as(
        "SELECT SUM(final_amount), COUNT(*) FROM orders WHERE status = 'delivered'",
    )
    .fetch_one(pool)
    .await?;
    stats.total_revenue = shared::money::to_f64(shared::money::to_decimal(revenue.unwrap_or(0.0)));
    if delivered > 0 {
        stats.average_order_value = shared::money::to_f64(shared::money::to_decimal(
            stats.total_revenue / delivered as f64,
        ));
    }

    let (food, delivery): (Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT AVG(json_extract(rating, '$.food_rating')), AVG(json_extract(rating, '$.delivery_rating')) \
         FROM orders WHERE rating != 'null'",
    )
    .fetch_one(pool)
    .await?;
    stats.average_food_rating = food.map(round1);
    stats.average_delivery_rating = delivery.map(round1);

    Ok(stats)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::pool;
    use shared::models::{
        Cart, CartItem, DeliveryAddress, DeliveryPricing, OrderRatingInput, PaymentMethod,
        PlaceOrderRequest,
    };

    fn order(id: i64, number: &str, user_id: i64, price: f64, now: i64) -> Order {
        let mut cart = Cart::new(1, user_id, 0);
        cart.items.push(CartItem {
            menu_item_id: 5,
            name: "Thali".into(),
            quantity: 2,
            price,
            special_instructions: None,
        });
        cart.recalculate_total();
        let request = PlaceOrderRequest {
            payment_method: PaymentMethod::Upi,
            delivery_address: DeliveryAddress {
                hostel_block: Some("A".into()),
                room_number: "A-101".into(),
                floor: Some(1),
                landmark: None,
            },
            special_instructions: None,
            discount: None,
        };
        let pricing = DeliveryPricing {
            delivery_fee: 10.0,
            free_delivery_threshold: 100.0,
        };
        Order::from_cart(id, number.into(), &cart, request, &pricing, now).unwrap()
    }

    #[tokio::test]
    async fn test_day_sequence_increments_per_day() {
        let pool = pool().await;
        assert_eq!(next_day_sequence(&pool, "20250301").await.unwrap(), 1);
        assert_eq!(next_day_sequence(&pool, "20250301").await.unwrap(), 2);
        assert_eq!(next_day_sequence(&pool, "20250302").await.unwrap(), 1);
        assert_eq!(next_day_sequence(&pool, "20250301").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insert_roundtrip_and_unique_number() {
        let pool = pool().await;
        let placed = order(1, "202503010001", 7, 30.0, 100);
        insert(&pool, &placed).await.unwrap();

        let stored = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(stored.final_amount, 70.0);
        assert_eq!(stored.delivery_fee, 10.0);
        assert_eq!(stored.status_history.len(), 1);
        assert!(stored.rating.is_none());
        assert_eq!(stored.delivery_address.room_number, "A-101");

        let err = insert(&pool, &order(2, "202503010001", 7, 30.0, 101))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_save_list_and_stats() {
        let pool = pool().await;
        insert(&pool, &order(1, "202503010001", 7, 30.0, 100)).await.unwrap();
        insert(&pool, &order(2, "202503010002", 8, 60.0, 200)).await.unwrap();
        insert(&pool, &order(3, "202503010003", 7, 10.0, 300)).await.unwrap();

        let mut delivered = find_by_id(&pool, 2).await.unwrap().unwrap();
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            delivered.update_status(status, 99, None, 400).unwrap();
        }
        delivered
            .add_rating(
                OrderRatingInput {
                    food_rating: 4,
                    delivery_rating: 5,
                    comment: None,
                },
                500,
            )
            .unwrap();
        save(&pool, &delivered).await.unwrap();

        let mut cancelled = find_by_id(&pool, 3).await.unwrap().unwrap();
        cancelled.cancel_order("changed mind".into(), 7, 600).unwrap();
        save(&pool, &cancelled).await.unwrap();

        let own = OrderFilter {
            user_id: Some(7),
            ..Default::default()
        };
        let (orders, total) = list(&pool, &own, 0, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(orders[0].id, 3);

        let pending = OrderFilter {
            status: Some(OrderStatus::Pending),
            ..Default::default()
        };
        assert_eq!(list(&pool, &pending, 0, 10).await.unwrap().1, 1);

        let window = OrderFilter {
            created_from: Some(150),
            created_to: Some(300),
            ..Default::default()
        };
        assert_eq!(list(&pool, &window, 0, 10).await.unwrap().1, 1);

        let stats = stats(&pool).await.unwrap();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.by_status["pending"], 1);
        assert_eq!(stats.by_status["delivered"], 1);
        assert_eq!(stats.by_status["cancelled"], 1);
        assert_eq!(stats.by_status["preparing"], 0);
        // 2 × 60 = 120 ≥ threshold, free delivery
        assert_eq!(stats.total_revenue, 120.0);
        assert_eq!(stats.average_order_value, 120.0);
        assert_eq!(stats.average_food_rating, Some(4.0));
        assert_eq!(stats.average_delivery_rating, Some(5.0));
    }

    #[tokio::test]
    async fn test_empty_stats_are_zeroed() {
        let pool = pool().await;
        let stats = stats(&pool).await.unwrap();
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.by_status.len(), OrderStatus::ALL.len());
        assert!(stats.by_status.values().all(|n| *n == 0));
        assert_eq!(stats.average_food_rating, None);
    }
}
