//! 下单流程
//!
//! 购物车 → 订单 在一个 SQLite 事务内完成：
//!
//! ```text
//! day sequence ticket ─▶ load cart ─▶ ensure_orderable (每行) ─▶ Order::from_cart
//!                     ─▶ insert order ─▶ record_sale (每行, stock 守卫) ─▶ clear cart ─▶ commit
//! ```
//!
//! 任何一步失败都整体回滚：订单不落库、库存不扣减、购物车保持原样。
//!
//! 事务的第一条语句必须是写 (序号 upsert)。WAL 下先读后写的事务升级写锁时
//! 若别的连接已提交，会直接得到 SQLITE_BUSY_SNAPSHOT，busy_timeout 不生效；
//! 先写则在拿锁阶段排队等待。

use chrono_tz::Tz;
use shared::models::{DeliveryPricing, Order, PlaceOrderRequest, format_order_number};
use shared::util::snowflake_id;
use sqlx::SqlitePool;

use crate::db::repository::{cart, menu_item, order};
use crate::utils::time::millis_to_local_date;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Turn the user's cart into an order
pub async fn place_order(
    pool: &SqlitePool,
    user_id: i64,
    request: PlaceOrderRequest,
    pricing: &DeliveryPricing,
    tz: Tz,
    now: i64,
) -> AppResult<Order> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

    let day = millis_to_local_date(now, tz);
    let sequence = order::next_day_sequence(&mut *tx, &day.format("%Y%m%d").to_string()).await?;

    let mut cart = cart::find_by_user(&mut *tx, user_id)
        .await?
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::new(ErrorCode::OrderEmpty))?;

    let mut max_preparation_mins = 0;
    for line in &cart.items {
        let item = menu_item::find_by_id(&mut *tx, line.menu_item_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::MenuItemNotFound,
                    format!("Menu item {} no longer exists", line.menu_item_id),
                )
            })?;
        item.ensure_orderable(line.quantity)?;
        max_preparation_mins = max_preparation_mins.max(item.preparation_time_mins);
    }

    let order = Order::from_cart(
        snowflake_id(),
        format_order_number(day, sequence),
        &cart,
        request,
        pricing,
        now,
    )?
    .with_estimated_delivery(max_preparation_mins, now);

    order::insert(&mut *tx, &order).await?;

    for line in &order.items {
        if !menu_item::record_sale(&mut *tx, line.menu_item_id, line.quantity, now).await? {
            // tx 在 drop 时回滚
            return Err(AppError::with_message(
                ErrorCode::OutOfStock,
                format!("{} sold out while placing the order", line.name),
            )
            .with_detail("menu_item_id", line.menu_item_id));
        }
    }

    cart.clear(now);
    cart::save(&mut *tx, &cart).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(format!("Failed to commit order: {e}")))?;

    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        user_id,
        final_amount = order.final_amount,
        "Order placed"
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DeliveryAddress, OrderStatus, PaymentMethod};

    use crate::db::DbService;
    use crate::db::repository::menu_item::fixtures::{item_dto, seed_category};
    use crate::db::repository::test_support::{insert_user, pool};

    const TZ: Tz = chrono_tz::Asia::Kolkata;

    fn pricing() -> DeliveryPricing {
        DeliveryPricing {
            delivery_fee: 10.0,
            free_delivery_threshold: 100.0,
        }
    }

    fn request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            payment_method: PaymentMethod::Upi,
            delivery_address: DeliveryAddress {
                hostel_block: Some("B".into()),
                room_number: "204".into(),
                floor: Some(2),
                landmark: None,
            },
            special_instructions: None,
            discount: None,
        }
    }

    async fn seed_cart(pool: &SqlitePool, user_id: i64, lines: &[(i64, i32)]) {
        let mut cart = cart::get_or_create(pool, user_id, 0).await.unwrap();
        for (item_id, qty) in lines {
            let item = menu_item::find_by_id(pool, *item_id).await.unwrap().unwrap();
            cart.add_item(&item, *qty, None, 1).unwrap();
        }
        cart::save(pool, &cart).await.unwrap();
    }

    #[tokio::test]
    async fn test_place_order_clears_cart_and_records_sales() {
        let pool = pool().await;
        insert_user(&pool, 7, "student").await;
        seed_category(&pool, 1).await;
        let mut dosa = item_dto("Masala Dosa", 1, 40.0);
        dosa.stock = 5;
        dosa.preparation_time_mins = 20;
        menu_item::create(&pool, 10, dosa, 0).await.unwrap();
        menu_item::create(&pool, 11, item_dto("Chai", 1, 15.0), 0).await.unwrap();
        seed_cart(&pool, 7, &[(10, 2), (11, 1)]).await;

        let now = 1_740_800_000_000;
        let order = place_order(&pool, 7, request(), &pricing(), TZ, now).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, 95.0);
        assert_eq!(order.delivery_fee, 10.0);
        assert_eq!(order.final_amount, 105.0);
        assert!(order.order_number.ends_with("0001"));
        assert_eq!(
            order.estimated_delivery_time,
            Some(now + (20 + 15) * 60_000)
        );

        let dosa = menu_item::find_by_id(&pool, 10).await.unwrap().unwrap();
        assert_eq!(dosa.stock, 3);
        assert_eq!(dosa.order_count, 2);

        let cart = cart::find_by_user(&pool, 7).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount, 0.0);

        // 同一天的第二单序号递增
        seed_cart(&pool, 7, &[(11, 1)]).await;
        let second = place_order(&pool, 7, request(), &pricing(), TZ, now + 1).await.unwrap();
        assert!(second.order_number.ends_with("0002"));
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let pool = pool().await;
        insert_user(&pool, 7, "student").await;
        let err = place_order(&pool, 7, request(), &pricing(), TZ, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back() {
        let pool = pool().await;
        insert_user(&pool, 7, "student").await;
        seed_category(&pool, 1).await;
        let mut thali = item_dto("Thali", 1, 80.0);
        thali.stock = 3;
        menu_item::create(&pool, 10, thali, 0).await.unwrap();
        seed_cart(&pool, 7, &[(10, 2)]).await;

        // 购物车之后库存被改小
        let mut item = menu_item::find_by_id(&pool, 10).await.unwrap().unwrap();
        item.stock = 1;
        menu_item::save(&pool, &item).await.unwrap();

        let err = place_order(&pool, 7, request(), &pricing(), TZ, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OutOfStock);

        let (orders, total) = order::list(&pool, &Default::default(), 0, 10).await.unwrap();
        assert!(orders.is_empty());
        assert_eq!(total, 0);
        let cart = cart::find_by_user(&pool, 7).await.unwrap().unwrap();
        assert_eq!(cart.item_count, 2);
        let item = menu_item::find_by_id(&pool, 10).await.unwrap().unwrap();
        assert_eq!(item.stock, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_on_file_database_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("hostel.db").display());
        let pool = DbService::new(&url).await.unwrap().pool;

        const STUDENTS: i64 = 20;
        seed_category(&pool, 1).await;
        menu_item::create(&pool, 10, item_dto("Poha", 1, 30.0), 0).await.unwrap();
        for user_id in 1..=STUDENTS {
            insert_user(&pool, user_id, "student").await;
            seed_cart(&pool, user_id, &[(10, 1)]).await;
        }

        let now = 1_740_800_000_000;
        let handles: Vec<_> = (1..=STUDENTS)
            .map(|user_id| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    place_order(&pool, user_id, request(), &pricing(), TZ, now).await
                })
            })
            .collect();

        let mut numbers = std::collections::HashSet::new();
        for handle in handles {
            let order = handle.await.unwrap().unwrap();
            numbers.insert(order.order_number);
        }
        assert_eq!(numbers.len(), STUDENTS as usize);

        let (_, total) = order::list(&pool, &Default::default(), 0, 50).await.unwrap();
        assert_eq!(total, STUDENTS as u64);
        let poha = menu_item::find_by_id(&pool, 10).await.unwrap().unwrap();
        assert_eq!(poha.order_count, STUDENTS);
    }
}
