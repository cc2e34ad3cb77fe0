//! # Order Repository
//!
//! Database operations for orders, line-item snapshots, the status history
//! ledger and delivery records.
//!
//! ## Order Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Order Creation (one transaction)                    │
//! │                                                                     │
//! │  insert_order_in()          → orders row (status = pending)         │
//! │  insert_item_in() × N       → frozen snapshots of each pet          │
//! │  insert_history_in()        → initial 'pending' ledger entry        │
//! │  insert_delivery_in()       → deliveries row (status = pending)     │
//! │                                                                     │
//! │  All four commit together or not at all; the service layer owns     │
//! │  the transaction.                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use pawmart_core::{Delivery, Order, OrderItem, OrderStatus, OrderStatusHistory};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Inserts (transaction-scoped)
    // =========================================================================

    /// Inserts an order row.
    pub async fn insert_order_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, guest_contact_id, delivery_address_id,
                subtotal_cents, delivery_fee_cents, payment_method, status,
                cancellation_reason, cancelled_at, delivered_at, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(&order.guest_contact_id)
        .bind(&order.delivery_address_id)
        .bind(order.subtotal_cents)
        .bind(order.delivery_fee_cents)
        .bind(order.payment_method)
        .bind(order.status)
        .bind(&order.cancellation_reason)
        .bind(order.cancelled_at)
        .bind(order.delivered_at)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a line-item snapshot.
    pub async fn insert_item_in(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, pet_id, name_snapshot, species_snapshot,
                breed_snapshot, price_snapshot_cents, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.pet_id)
        .bind(&item.name_snapshot)
        .bind(&item.species_snapshot)
        .bind(&item.breed_snapshot)
        .bind(item.price_snapshot_cents)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Appends a status history entry. The ledger is append-only; there is
    /// deliberately no update or delete counterpart.
    pub async fn insert_history_in(
        conn: &mut SqliteConnection,
        entry: &OrderStatusHistory,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (id, order_id, status, changed_by, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.order_id)
        .bind(entry.status)
        .bind(&entry.changed_by)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a delivery record.
    pub async fn insert_delivery_in(
        conn: &mut SqliteConnection,
        delivery: &Delivery,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO deliveries (
                id, order_id, status, scheduled_date, dispatched_at,
                delivered_at, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&delivery.id)
        .bind(&delivery.order_id)
        .bind(delivery.status)
        .bind(delivery.scheduled_date)
        .bind(delivery.dispatched_at)
        .bind(delivery.delivered_at)
        .bind(&delivery.notes)
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Gets an order by ID on an existing connection.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT
                id, order_number, user_id, guest_contact_id, delivery_address_id,
                subtotal_cents, delivery_fee_cents, payment_method, status,
                cancellation_reason, cancelled_at, delivered_at, notes,
                created_at, updated_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(order)
    }

    /// Checks whether an order number is already in use.
    pub async fn order_number_exists_in(
        conn: &mut SqliteConnection,
        order_number: &str,
    ) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_number = ?")
            .bind(order_number)
            .fetch_one(conn)
            .await?;

        Ok(count > 0)
    }

    /// Gets all items for an order, oldest first.
    pub async fn get_items_in(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT
                id, order_id, pet_id, name_snapshot, species_snapshot,
                breed_snapshot, price_snapshot_cents, created_at
            FROM order_items
            WHERE order_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(conn)
        .await?;

        Ok(items)
    }

    /// Gets the status ledger for an order, in chronological order.
    pub async fn get_history_in(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<OrderStatusHistory>> {
        let history = sqlx::query_as::<_, OrderStatusHistory>(
            r#"
            SELECT id, order_id, status, changed_by, notes, created_at
            FROM order_status_history
            WHERE order_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(conn)
        .await?;

        Ok(history)
    }

    /// Gets the delivery record for an order.
    pub async fn get_delivery_for_order_in(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Option<Delivery>> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            SELECT
                id, order_id, status, scheduled_date, dispatched_at,
                delivered_at, notes, created_at, updated_at
            FROM deliveries
            WHERE order_id = ?
            "#,
        )
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

        Ok(delivery)
    }

    /// Gets a delivery record by its own id.
    pub async fn get_delivery_in(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Delivery>> {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            SELECT
                id, order_id, status, scheduled_date, dispatched_at,
                delivered_at, notes, created_at, updated_at
            FROM deliveries
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(delivery)
    }

    /// Lists deliveries scheduled inside a date window, earliest first.
    pub async fn list_deliveries_scheduled_between(
        &self,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> DbResult<Vec<Delivery>> {
        let deliveries = sqlx::query_as::<_, Delivery>(
            r#"
            SELECT
                id, order_id, status, scheduled_date, dispatched_at,
                delivered_at, notes, created_at, updated_at
            FROM deliveries
            WHERE scheduled_date IS NOT NULL AND scheduled_date BETWEEN ? AND ?
            ORDER BY scheduled_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(deliveries)
    }

    /// Writes a delivery's mutable fields. Timestamps are set-once by the
    /// service layer; this function persists whatever state it is handed.
    pub async fn update_delivery_in(
        conn: &mut SqliteConnection,
        delivery: &Delivery,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE deliveries
            SET status = ?, scheduled_date = ?, dispatched_at = ?,
                delivered_at = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(delivery.status)
        .bind(delivery.scheduled_date)
        .bind(delivery.dispatched_at)
        .bind(delivery.delivered_at)
        .bind(&delivery.notes)
        .bind(delivery.updated_at)
        .bind(&delivery.id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Delivery", delivery.id.as_str()));
        }

        Ok(())
    }

    // =========================================================================
    // Status writes (transaction-scoped)
    // =========================================================================

    /// Writes a plain status change (no lifecycle timestamps involved).
    pub async fn set_status_in(
        conn: &mut SqliteConnection,
        order_id: &str,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(order_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    /// Marks an order cancelled, recording the reason and timestamp.
    pub async fn mark_cancelled_in(
        conn: &mut SqliteConnection,
        order_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled', cancellation_reason = ?, cancelled_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reason)
        .bind(now)
        .bind(now)
        .bind(order_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    /// Marks an order delivered. The delivered timestamp is set once; a
    /// pre-existing value is left untouched.
    pub async fn mark_delivered_in(
        conn: &mut SqliteConnection,
        order_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'delivered',
                delivered_at = COALESCE(delivered_at, ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(order_id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }
}
