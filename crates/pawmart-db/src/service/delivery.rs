//! # Delivery Service
//!
//! Admin surface for the delivery sub-lifecycle. A delivery's status is
//! independent of its order's, except at the end: marking a delivery
//! `delivered` routes the parent order through the order state machine.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::pool::Database;
use crate::repository::order::OrderRepository;
use crate::service::{ServiceError, ServiceResult};
use pawmart_core::{
    lifecycle, CoreError, Delivery, DeliveryStatus, OrderStatus, OrderStatusHistory,
    ValidationError,
};

/// Input for updating a delivery. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct DeliveryUpdate {
    pub status: Option<DeliveryStatus>,
    pub scheduled_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Manages delivery records.
#[derive(Debug, Clone)]
pub struct DeliveryService {
    db: Database,
}

impl DeliveryService {
    /// Creates a delivery service.
    pub fn new(db: Database) -> Self {
        DeliveryService { db }
    }

    /// Updates a delivery's status, schedule or notes.
    ///
    /// `dispatched_at` and `delivered_at` are stamped once, on first entry
    /// into the respective status, and never overwritten - which keeps
    /// dispatched_at <= delivered_at. A transition to `delivered` also moves
    /// the parent order to `delivered` through the state machine; an order
    /// that is not `out_for_delivery` rejects the whole update with
    /// `InvalidTransition`.
    pub async fn update_status(
        &self,
        delivery_id: &str,
        change: DeliveryUpdate,
        actor: Option<&str>,
    ) -> ServiceResult<Delivery> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        let delivery = OrderRepository::get_delivery_in(&mut tx, delivery_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Delivery", delivery_id))?;

        let mut updated = Delivery {
            scheduled_date: change.scheduled_date.or(delivery.scheduled_date),
            notes: change.notes.clone().or_else(|| delivery.notes.clone()),
            updated_at: now,
            ..delivery.clone()
        };

        if let Some(next) = change.status {
            lifecycle::validate_delivery_transition(delivery.status, next)?;
            updated.status = next;

            match next {
                DeliveryStatus::Dispatched => {
                    if updated.dispatched_at.is_none() {
                        updated.dispatched_at = Some(now);
                    }
                }
                DeliveryStatus::Delivered => {
                    if updated.delivered_at.is_none() {
                        updated.delivered_at = Some(now);
                    }

                    // The parent order follows, through its own state
                    // machine - no silent forcing.
                    let order = OrderRepository::get_by_id_in(&mut tx, &delivery.order_id)
                        .await?
                        .ok_or_else(|| {
                            CoreError::not_found("Order", delivery.order_id.as_str())
                        })?;
                    lifecycle::validate_order_transition(
                        order.status,
                        OrderStatus::Delivered,
                        None,
                    )?;
                    OrderRepository::mark_delivered_in(&mut tx, &order.id, now).await?;
                    OrderRepository::insert_history_in(
                        &mut tx,
                        &OrderStatusHistory {
                            id: Uuid::new_v4().to_string(),
                            order_id: order.id.clone(),
                            status: OrderStatus::Delivered,
                            changed_by: actor.map(str::to_string),
                            notes: Some("Delivery completed.".to_string()),
                            created_at: now,
                        },
                    )
                    .await?;
                }
                DeliveryStatus::Pending | DeliveryStatus::Failed => {}
            }
        }

        OrderRepository::update_delivery_in(&mut tx, &updated).await?;
        tx.commit().await.map_err(ServiceError::from)?;

        debug!(delivery_id, status = %updated.status, "Delivery updated");
        Ok(updated)
    }

    /// Calendar view: deliveries of a given month grouped by scheduled date.
    pub async fn calendar(
        &self,
        year: i32,
        month: u32,
    ) -> ServiceResult<BTreeMap<NaiveDate, Vec<Delivery>>> {
        let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "month".to_string(),
                reason: format!("{year}-{month} is not a calendar month"),
            }
        })?;
        let to = from
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "month".to_string(),
                reason: "month out of range".to_string(),
            })?;

        let deliveries = self
            .db
            .orders()
            .list_deliveries_scheduled_between(from, to)
            .await?;

        let mut calendar: BTreeMap<NaiveDate, Vec<Delivery>> = BTreeMap::new();
        for delivery in deliveries {
            if let Some(date) = delivery.scheduled_date {
                calendar.entry(date).or_default().push(delivery);
            }
        }

        Ok(calendar)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::cart::CartService;
    use crate::service::order::{OrderService, PlaceOrderRequest};
    use crate::testutil::{seed_pet, test_db};

    async fn placed_order(db: &Database) -> crate::service::order::OrderDetails {
        let pet = seed_pet(db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();

        let orders = OrderService::new(db.clone());
        orders
            .place_order(
                &PlaceOrderRequest {
                    address_line: "12 Canal Road, Lahore".to_string(),
                    email: Some("guest@example.com".to_string()),
                    ..Default::default()
                },
                None,
                "sess-1",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_stamps_timestamp_once() {
        let db = test_db().await;
        let placed = placed_order(&db).await;
        let deliveries = DeliveryService::new(db.clone());

        let dispatched = deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Dispatched),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap();
        let stamp = dispatched.dispatched_at.unwrap();

        // A failed attempt and a re-dispatch keep the original stamp.
        deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Failed),
                    notes: Some("Nobody home.".to_string()),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap();
        let redispatched = deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Dispatched),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap();

        assert_eq!(redispatched.dispatched_at.unwrap(), stamp);
        assert_eq!(redispatched.notes.as_deref(), Some("Nobody home."));
    }

    #[tokio::test]
    async fn test_delivered_requires_out_for_delivery_order() {
        let db = test_db().await;
        let placed = placed_order(&db).await;
        let deliveries = DeliveryService::new(db.clone());

        deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Dispatched),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap();

        // The order is still pending, so completing the delivery is refused
        // and nothing is written.
        let err = deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Delivered),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition { .. })
        ));

        let orders = OrderService::new(db.clone());
        let details = orders.get_order(&placed.order.id).await.unwrap();
        assert_eq!(details.delivery.status, DeliveryStatus::Dispatched);
        assert!(details.delivery.delivered_at.is_none());
    }

    #[tokio::test]
    async fn test_delivered_propagates_to_order() {
        let db = test_db().await;
        let placed = placed_order(&db).await;
        let orders = OrderService::new(db.clone());
        let deliveries = DeliveryService::new(db.clone());

        for status in [OrderStatus::Confirmed, OrderStatus::OutForDelivery] {
            orders
                .update_status(&placed.order.id, status, Some("admin-1"), None, None)
                .await
                .unwrap();
        }
        deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Dispatched),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap();

        let delivered = deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Delivered),
                    ..Default::default()
                },
                Some("admin-1"),
            )
            .await
            .unwrap();

        // Monotonic stamps on the delivery.
        assert!(delivered.dispatched_at.unwrap() <= delivered.delivered_at.unwrap());

        // The order followed through its state machine with a ledger entry.
        let details = orders.get_order(&placed.order.id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Delivered);
        assert!(details.order.delivered_at.is_some());
        assert_eq!(
            details.history.last().unwrap().notes.as_deref(),
            Some("Delivery completed.")
        );
    }

    #[tokio::test]
    async fn test_rejects_invalid_delivery_transition() {
        let db = test_db().await;
        let placed = placed_order(&db).await;
        let deliveries = DeliveryService::new(db.clone());

        // pending → delivered skips dispatch.
        let err = deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    status: Some(DeliveryStatus::Delivered),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_calendar_groups_by_date() {
        let db = test_db().await;
        let placed = placed_order(&db).await;
        let deliveries = DeliveryService::new(db.clone());

        let date = NaiveDate::from_ymd_opt(2026, 8, 14).unwrap();
        deliveries
            .update_status(
                &placed.delivery.id,
                DeliveryUpdate {
                    scheduled_date: Some(date),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        let calendar = deliveries.calendar(2026, 8).await.unwrap();
        assert_eq!(calendar.len(), 1);
        assert_eq!(calendar[&date].len(), 1);

        let empty = deliveries.calendar(2026, 9).await.unwrap();
        assert!(empty.is_empty());
    }
}
