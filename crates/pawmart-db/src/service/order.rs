//! # Order Service
//!
//! Converts a locked cart into an order, and drives the order status
//! lifecycle afterwards.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │               place_order (one transaction)                         │
//! │                                                                     │
//! │  1. load caller's locks          → EmptyCart if none                │
//! │  2. re-check expiry at tx start  → CartExpired if any lapsed        │
//! │  3. extend participating locks   (conversion cannot race the sweep) │
//! │  4. insert delivery address      (immutable row)                    │
//! │  5. resolve buyer                (user id, or guest by email)       │
//! │  6. subtotal from current prices                                    │
//! │  7. generate unique ORD-XXXXXX                                      │
//! │  8. order + item snapshots; pets → sold; locks consumed             │
//! │  9. initial history entry        (pending, "Order placed.")         │
//! │  10. delivery record             (pending)                          │
//! │  ── COMMIT ──                                                       │
//! │  11. fire-and-forget confirmation to the buyer email                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any failure before commit rolls the whole conversion back: no partial
//! order, no orphaned snapshot, no consumed lock.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::cart::CartLockRepository;
use crate::repository::contact::ContactRepository;
use crate::repository::order::OrderRepository;
use crate::repository::pet::PetRepository;
use crate::service::notify::{LogNotifier, OrderNotifier};
use crate::service::{ServiceError, ServiceResult};
use pawmart_core::{
    lifecycle, validation, CoreError, Delivery, DeliveryStatus, Order, OrderItem, OrderStatus,
    OrderStatusHistory, PaymentMethod, PetStatus, ValidationError, DEFAULT_LOCK_WINDOW_MINUTES,
    ORDER_NUMBER_PREFIX, ORDER_NUMBER_RANDOM_LEN,
};

// =============================================================================
// Request / Response Types
// =============================================================================

/// Input for placing an order from the caller's cart.
#[derive(Debug, Clone, Default)]
pub struct PlaceOrderRequest {
    pub address_line: String,
    pub city: Option<String>,
    pub area: Option<String>,

    /// Caller-supplied delivery fee in cents; validated non-negative, never
    /// server-computed.
    pub delivery_fee_cents: i64,

    /// Buyer email. Required for guests (it keys the guest contact); for
    /// authenticated callers it is only a confirmation address, since user
    /// records live in the external auth service.
    pub email: Option<String>,

    /// Attached to the guest contact on first creation only.
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,

    pub notes: Option<String>,
}

/// A fully assembled order: the row plus items, ledger and delivery.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderStatusHistory>,
    pub delivery: Delivery,
}

// =============================================================================
// Order Service
// =============================================================================

/// Assembles orders from locked carts and applies status transitions.
#[derive(Clone)]
pub struct OrderService {
    db: Database,
    notifier: Arc<dyn OrderNotifier>,
    lock_window: chrono::Duration,
}

impl OrderService {
    /// Creates an order service with the default log-only notifier.
    pub fn new(db: Database) -> Self {
        Self::with_notifier(db, Arc::new(LogNotifier))
    }

    /// Creates an order service with an explicit notification dispatcher.
    pub fn with_notifier(db: Database, notifier: Arc<dyn OrderNotifier>) -> Self {
        OrderService {
            db,
            notifier,
            lock_window: chrono::Duration::minutes(DEFAULT_LOCK_WINDOW_MINUTES),
        }
    }

    /// Places an order from the caller's locked cart. One atomic operation:
    /// all writes commit together or none do.
    pub async fn place_order(
        &self,
        request: &PlaceOrderRequest,
        user_id: Option<&str>,
        session_id: &str,
    ) -> ServiceResult<OrderDetails> {
        validation::validate_address_line(&request.address_line)?;
        validation::validate_delivery_fee(request.delivery_fee_cents)?;

        // Guests must be resolvable to a contact; the email is the key.
        let guest_email = match user_id {
            None => {
                validation::validate_session_id(session_id)?;
                let email = request.email.as_deref().ok_or(ValidationError::Required {
                    field: "email".to_string(),
                })?;
                validation::validate_email(email)?;
                Some(email)
            }
            Some(_) => {
                if let Some(email) = request.email.as_deref() {
                    validation::validate_email(email)?;
                }
                None
            }
        };

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        // 1. The caller's locks, scoped exactly like a cart view.
        let locks = CartLockRepository::list_for_owner_in(&mut tx, user_id, session_id).await?;
        if locks.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        // 2. No participating lock may have lapsed as of transaction start.
        if locks.iter().any(|lock| lock.locked_until < now) {
            return Err(CoreError::CartExpired.into());
        }

        // 3. Extend every participating lock by a full window so a concurrent
        //    sweep cannot release them mid-conversion.
        let guard_until = now + self.lock_window;
        for lock in &locks {
            CartLockRepository::extend_in(&mut tx, &lock.id, guard_until).await?;
        }

        // 4. Persist the delivery address.
        let address = ContactRepository::insert_address_in(
            &mut tx,
            request.address_line.trim(),
            request.city.as_deref(),
            request.area.as_deref(),
        )
        .await?;

        // 5. Resolve buyer identity.
        let guest_contact = match guest_email {
            Some(email) => {
                let existing = ContactRepository::find_guest_by_email_in(&mut tx, email).await?;
                match existing {
                    Some(contact) => Some(contact),
                    None => Some(
                        ContactRepository::insert_guest_in(
                            &mut tx,
                            email,
                            request.guest_name.as_deref(),
                            request.guest_phone.as_deref(),
                        )
                        .await?,
                    ),
                }
            }
            None => None,
        };

        // 6. Subtotal from the current pet prices.
        let mut pets = Vec::with_capacity(locks.len());
        for lock in &locks {
            let pet = PetRepository::get_by_id_in(&mut tx, &lock.pet_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Pet", lock.pet_id.as_str()))?;
            pets.push(pet);
        }
        let subtotal_cents: i64 = pets.iter().map(|pet| pet.price_cents).sum();

        // 7. Generate a unique order number.
        let order_number = loop {
            let candidate = generate_order_number();
            if !OrderRepository::order_number_exists_in(&mut tx, &candidate).await? {
                break candidate;
            }
        };

        // 8. Create the order, snapshot each locked pet, mark it sold and
        //    consume its lock.
        let order = Order {
            id: Uuid::new_v4().to_string(),
            order_number,
            user_id: user_id.map(str::to_string),
            guest_contact_id: guest_contact.as_ref().map(|g| g.id.clone()),
            delivery_address_id: address.id.clone(),
            subtotal_cents,
            delivery_fee_cents: request.delivery_fee_cents,
            payment_method: PaymentMethod::Cod,
            status: OrderStatus::Pending,
            cancellation_reason: None,
            cancelled_at: None,
            delivered_at: None,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        OrderRepository::insert_order_in(&mut tx, &order).await?;

        let mut items = Vec::with_capacity(locks.len());
        for (lock, pet) in locks.iter().zip(&pets) {
            // A pet soft-deleted between lock acquisition and checkout
            // aborts the whole conversion.
            if pet.deleted_at.is_some() {
                return Err(CoreError::PetUnavailable(pet.id.clone()).into());
            }

            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                pet_id: Some(pet.id.clone()),
                name_snapshot: pet.name.clone(),
                species_snapshot: pet.species.clone(),
                breed_snapshot: pet.breed.clone(),
                price_snapshot_cents: pet.price_cents,
                created_at: now,
            };
            OrderRepository::insert_item_in(&mut tx, &item).await?;
            PetRepository::set_status_in(&mut tx, &pet.id, PetStatus::Sold, now).await?;
            CartLockRepository::delete_in(&mut tx, &lock.id).await?;
            items.push(item);
        }

        // 9. Initial ledger entry.
        let initial_entry = OrderStatusHistory {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            status: OrderStatus::Pending,
            changed_by: user_id.map(str::to_string),
            notes: Some("Order placed.".to_string()),
            created_at: now,
        };
        OrderRepository::insert_history_in(&mut tx, &initial_entry).await?;

        // 10. Delivery record.
        let delivery = Delivery {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            status: DeliveryStatus::Pending,
            scheduled_date: None,
            dispatched_at: None,
            delivered_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        OrderRepository::insert_delivery_in(&mut tx, &delivery).await?;

        tx.commit().await.map_err(ServiceError::from)?;

        info!(
            order_number = %order.order_number,
            items = items.len(),
            total_cents = order.total_cents(),
            "Order placed"
        );

        // 11. Post-commit confirmation; a notifier problem can no longer
        //     affect the order.
        let buyer_email = match user_id {
            Some(_) => request.email.as_deref(),
            None => guest_contact.as_ref().map(|g| g.email.as_str()),
        };
        if let Some(email) = buyer_email {
            self.notifier.order_placed(&order, email);
        }

        Ok(OrderDetails {
            order,
            items,
            history: vec![initial_entry],
            delivery,
        })
    }

    /// Applies a status transition to an order.
    ///
    /// Effects are atomic with the status write: cancellation returns every
    /// still-live pet to the pool and stamps `cancelled_at`; delivery stamps
    /// `delivered_at` once. Every transition appends one ledger entry.
    pub async fn update_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        actor: Option<&str>,
        notes: Option<&str>,
        cancellation_reason: Option<&str>,
    ) -> ServiceResult<OrderDetails> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        let order = OrderRepository::get_by_id_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        lifecycle::validate_order_transition(order.status, new_status, cancellation_reason)?;

        match new_status {
            OrderStatus::Cancelled => {
                let reason = cancellation_reason.ok_or(ValidationError::Required {
                    field: "cancellation_reason".to_string(),
                })?;
                validation::validate_cancellation_reason(reason)?;
                OrderRepository::mark_cancelled_in(&mut tx, order_id, reason.trim(), now).await?;

                // Inventory returns to the pool for every item whose live
                // pet record still exists.
                let items = OrderRepository::get_items_in(&mut tx, order_id).await?;
                for item in &items {
                    if let Some(pet_id) = &item.pet_id {
                        PetRepository::release_if_live_in(&mut tx, pet_id, now).await?;
                    }
                }
            }
            OrderStatus::Delivered => {
                OrderRepository::mark_delivered_in(&mut tx, order_id, now).await?;
            }
            _ => {
                OrderRepository::set_status_in(&mut tx, order_id, new_status, now).await?;
            }
        }

        let entry = OrderStatusHistory {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            status: new_status,
            changed_by: actor.map(str::to_string),
            notes: notes.map(str::to_string),
            created_at: now,
        };
        OrderRepository::insert_history_in(&mut tx, &entry).await?;

        let refreshed = OrderRepository::get_by_id_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        let details = load_details_in(&mut tx, refreshed).await?;

        tx.commit().await.map_err(ServiceError::from)?;

        debug!(order_id, status = %new_status, "Order status updated");
        Ok(details)
    }

    /// Loads an order with items, history and delivery.
    pub async fn get_order(&self, order_id: &str) -> ServiceResult<OrderDetails> {
        let mut conn = self.db.pool().acquire().await.map_err(ServiceError::from)?;

        let order = OrderRepository::get_by_id_in(&mut conn, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        Ok(load_details_in(&mut conn, order).await?)
    }
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("lock_window", &self.lock_window)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_details_in(conn: &mut SqliteConnection, order: Order) -> Result<OrderDetails, DbError> {
    let items = OrderRepository::get_items_in(conn, &order.id).await?;
    let history = OrderRepository::get_history_in(conn, &order.id).await?;
    let delivery = OrderRepository::get_delivery_for_order_in(conn, &order.id)
        .await?
        .ok_or_else(|| DbError::not_found("Delivery", order.id.as_str()))?;

    Ok(OrderDetails {
        order,
        items,
        history,
        delivery,
    })
}

/// Generates a candidate order number: `ORD-` plus short random uppercase
/// alphanumerics. Uniqueness is the caller's check.
fn generate_order_number() -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..ORDER_NUMBER_RANDOM_LEN)
        .map(|_| {
            let c: u8 = rng.sample(rand::distributions::Alphanumeric);
            (c as char).to_ascii_uppercase()
        })
        .collect();

    format!("{ORDER_NUMBER_PREFIX}{code}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::cart::CartService;
    use crate::testutil::{backdate_lock, seed_pet, test_db};

    fn guest_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            address_line: "12 Canal Road, Lahore".to_string(),
            city: Some("Lahore".to_string()),
            delivery_fee_cents: 1_500,
            email: Some("guest@example.com".to_string()),
            guest_name: Some("Sana".to_string()),
            guest_phone: Some("+92-300-0000000".to_string()),
            ..Default::default()
        }
    }

    async fn count_rows(db: &crate::pool::Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_place_order_guest_happy_path() {
        let db = test_db().await;
        let pet_a = seed_pet(&db, "Biscuit", 250_000).await;
        let pet_b = seed_pet(&db, "Mochi", 180_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet_a.id, None, "sess-1").await.unwrap();
        cart.acquire_lock(&pet_b.id, None, "sess-1").await.unwrap();

        let details = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();

        assert!(details.order.order_number.starts_with(ORDER_NUMBER_PREFIX));
        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.order.subtotal_cents, 430_000);
        assert_eq!(details.order.total_cents(), 431_500);
        assert!(details.order.user_id.is_none());
        assert!(details.order.guest_contact_id.is_some());

        // Snapshots frozen from the pets.
        assert_eq!(details.items.len(), 2);
        assert_eq!(details.items[0].name_snapshot, "Biscuit");
        assert_eq!(details.items[0].price_snapshot_cents, 250_000);

        // Initial ledger entry.
        assert_eq!(details.history.len(), 1);
        assert_eq!(details.history[0].status, OrderStatus::Pending);
        assert_eq!(details.history[0].notes.as_deref(), Some("Order placed."));
        assert!(details.history[0].changed_by.is_none());

        // Delivery record created alongside.
        assert_eq!(details.delivery.status, DeliveryStatus::Pending);

        // Pets sold, locks consumed.
        for pet_id in [&pet_a.id, &pet_b.id] {
            let pet = db.pets().get_by_id(pet_id).await.unwrap().unwrap();
            assert_eq!(pet.status, PetStatus::Sold);
        }
        assert!(cart.view_cart(None, "sess-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_authenticated_records_actor() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet.id, Some("user-1"), "")
            .await
            .unwrap();

        let request = PlaceOrderRequest {
            email: None,
            guest_name: None,
            guest_phone: None,
            ..guest_request()
        };
        let details = orders
            .place_order(&request, Some("user-1"), "")
            .await
            .unwrap();

        assert_eq!(details.order.user_id.as_deref(), Some("user-1"));
        assert!(details.order.guest_contact_id.is_none());
        assert_eq!(details.history[0].changed_by.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_place_order_empty_cart_creates_nothing() {
        let db = test_db().await;
        let orders = OrderService::new(db.clone());

        let err = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::EmptyCart)));

        assert_eq!(count_rows(&db, "orders").await, 0);
        assert_eq!(count_rows(&db, "addresses").await, 0);
        assert_eq!(count_rows(&db, "guest_contacts").await, 0);
    }

    #[tokio::test]
    async fn test_place_order_expired_cart() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        let lock = cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        backdate_lock(&db, &lock.id, 20).await;

        let err = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(CoreError::CartExpired)));
        assert_eq!(count_rows(&db, "orders").await, 0);
    }

    #[tokio::test]
    async fn test_place_order_guest_requires_email() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        let lock = cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();

        let request = PlaceOrderRequest {
            email: None,
            ..guest_request()
        };
        let err = orders
            .place_order(&request, None, "sess-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::Validation(_))
        ));

        // Nothing consumed: the lock and the reservation survive.
        assert_eq!(count_rows(&db, "orders").await, 0);
        let pet = db.pets().get_by_id(&pet.id).await.unwrap().unwrap();
        assert_eq!(pet.status, PetStatus::Reserved);
        let view = cart.view_cart(None, "sess-1").await.unwrap();
        assert_eq!(view[0].lock.id, lock.id);
    }

    #[tokio::test]
    async fn test_place_order_rejects_negative_fee() {
        let db = test_db().await;
        let orders = OrderService::new(db.clone());

        let request = PlaceOrderRequest {
            delivery_fee_cents: -100,
            ..guest_request()
        };
        let err = orders
            .place_order(&request, None, "sess-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_place_order_rolls_back_mid_conversion_failure() {
        let db = test_db().await;
        let pet_a = seed_pet(&db, "Biscuit", 250_000).await;
        let pet_b = seed_pet(&db, "Mochi", 180_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet_a.id, None, "sess-1").await.unwrap();
        cart.acquire_lock(&pet_b.id, None, "sess-1").await.unwrap();

        // The second pet disappears from the catalog after it was locked;
        // the conversion fails after the first pet was already marked sold
        // inside the transaction.
        db.pets().soft_delete(&pet_b.id).await.unwrap();

        let err = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::PetUnavailable(_))
        ));

        // All-or-nothing: zero new orders, zero snapshots, zero consumed
        // locks, original statuses intact.
        assert_eq!(count_rows(&db, "orders").await, 0);
        assert_eq!(count_rows(&db, "order_items").await, 0);
        assert_eq!(count_rows(&db, "addresses").await, 0);
        assert_eq!(count_rows(&db, "cart_locks").await, 2);
        let pet_a = db.pets().get_by_id(&pet_a.id).await.unwrap().unwrap();
        assert_eq!(pet_a.status, PetStatus::Reserved);
    }

    #[tokio::test]
    async fn test_guest_contact_reused_across_orders() {
        let db = test_db().await;
        let pet_a = seed_pet(&db, "Biscuit", 250_000).await;
        let pet_b = seed_pet(&db, "Mochi", 180_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet_a.id, None, "sess-1").await.unwrap();
        let first = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();

        cart.acquire_lock(&pet_b.id, None, "sess-1").await.unwrap();
        // Same email, different name: the contact is keyed by email and the
        // original name sticks.
        let request = PlaceOrderRequest {
            guest_name: Some("Someone Else".to_string()),
            ..guest_request()
        };
        let second = orders.place_order(&request, None, "sess-1").await.unwrap();

        assert_eq!(
            first.order.guest_contact_id,
            second.order.guest_contact_id
        );
        assert_eq!(count_rows(&db, "guest_contacts").await, 1);
    }

    #[tokio::test]
    async fn test_update_status_confirm_appends_history() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        let placed = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();

        let details = orders
            .update_status(
                &placed.order.id,
                OrderStatus::Confirmed,
                Some("admin-1"),
                Some("Payment on delivery confirmed by phone."),
                None,
            )
            .await
            .unwrap();

        assert_eq!(details.order.status, OrderStatus::Confirmed);
        assert_eq!(details.history.len(), 2);
        assert_eq!(details.history[1].status, OrderStatus::Confirmed);
        assert_eq!(details.history[1].changed_by.as_deref(), Some("admin-1"));
    }

    #[tokio::test]
    async fn test_update_status_rejects_invalid_transitions() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        let placed = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();

        // pending → delivered skips the table.
        let err = orders
            .update_status(&placed.order.id, OrderStatus::Delivered, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition { .. })
        ));

        // Walk to delivered, then try to go backwards.
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            orders
                .update_status(&placed.order.id, status, Some("admin-1"), None, None)
                .await
                .unwrap();
        }

        let err = orders
            .update_status(&placed.order.id, OrderStatus::Confirmed, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_delivered_sets_timestamp() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        let placed = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();

        for status in [OrderStatus::Confirmed, OrderStatus::OutForDelivery] {
            orders
                .update_status(&placed.order.id, status, Some("admin-1"), None, None)
                .await
                .unwrap();
        }
        let details = orders
            .update_status(
                &placed.order.id,
                OrderStatus::Delivered,
                Some("admin-1"),
                None,
                None,
            )
            .await
            .unwrap();

        assert!(details.order.delivered_at.is_some());
        assert!(details.order.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_returns_inventory() {
        let db = test_db().await;
        let pet_a = seed_pet(&db, "Biscuit", 250_000).await;
        let pet_b = seed_pet(&db, "Mochi", 180_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet_a.id, None, "sess-1").await.unwrap();
        cart.acquire_lock(&pet_b.id, None, "sess-1").await.unwrap();
        let placed = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();
        orders
            .update_status(
                &placed.order.id,
                OrderStatus::Confirmed,
                Some("admin-1"),
                None,
                None,
            )
            .await
            .unwrap();

        let before = orders.get_order(&placed.order.id).await.unwrap();
        let details = orders
            .update_status(
                &placed.order.id,
                OrderStatus::Cancelled,
                Some("admin-1"),
                None,
                Some("Buyer unreachable."),
            )
            .await
            .unwrap();

        assert_eq!(details.order.status, OrderStatus::Cancelled);
        assert_eq!(
            details.order.cancellation_reason.as_deref(),
            Some("Buyer unreachable.")
        );
        assert!(details.order.cancelled_at.is_some());

        // Both pets return to the pool.
        for pet_id in [&pet_a.id, &pet_b.id] {
            let pet = db.pets().get_by_id(pet_id).await.unwrap().unwrap();
            assert_eq!(pet.status, PetStatus::Available);
        }

        // Exactly one ledger entry appended for the cancellation.
        assert_eq!(details.history.len(), before.history.len() + 1);
        assert_eq!(
            details.history.last().unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_cancel_without_reason_is_rejected() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        let placed = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();

        let err = orders
            .update_status(&placed.order.id, OrderStatus::Cancelled, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(CoreError::Validation(_))
        ));

        // The order is untouched.
        let details = orders.get_order(&placed.order.id).await.unwrap();
        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.history.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_skips_soft_deleted_pets() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let orders = OrderService::new(db.clone());

        cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        let placed = orders
            .place_order(&guest_request(), None, "sess-1")
            .await
            .unwrap();
        db.pets().soft_delete(&pet.id).await.unwrap();

        orders
            .update_status(
                &placed.order.id,
                OrderStatus::Cancelled,
                Some("admin-1"),
                None,
                Some("Listing withdrawn."),
            )
            .await
            .unwrap();

        // The soft-deleted pet stays sold; it is no longer in the pool.
        let pet = db.pets().get_by_id(&pet.id).await.unwrap().unwrap();
        assert_eq!(pet.status, PetStatus::Sold);
    }

    #[tokio::test]
    async fn test_order_number_shape() {
        let number = generate_order_number();
        assert!(number.starts_with(ORDER_NUMBER_PREFIX));
        assert_eq!(
            number.len(),
            ORDER_NUMBER_PREFIX.len() + ORDER_NUMBER_RANDOM_LEN
        );
        assert!(number[ORDER_NUMBER_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
