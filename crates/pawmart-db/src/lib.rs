//! # pawmart-db: Storage & Services for Pawmart
//!
//! SQLite persistence and the cart-to-order reservation pipeline.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Pawmart Data Flow                             │
//! │                                                                     │
//! │  HTTP controllers (external)                                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                  pawmart-db (THIS CRATE)                      │  │
//! │  │                                                               │  │
//! │  │   ┌────────────┐   ┌──────────────┐   ┌───────────────────┐  │  │
//! │  │   │  services  │   │ repositories │   │  pool/migrations  │  │  │
//! │  │   │ Cart/Order │──►│ SQL per      │──►│  SqlitePool, WAL, │  │  │
//! │  │   │ Sweeper    │   │ entity       │   │  embedded .sql    │  │  │
//! │  │   └────────────┘   └──────────────┘   └───────────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database (WAL mode, foreign keys on)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//! - [`repository`] - Repository implementations (pet, cart lock, order, ...)
//! - [`service`] - Cart, order, delivery, settings services and the sweeper
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pawmart_db::{CartService, Database, DbConfig, ExpirySweeper, OrderService};
//!
//! let db = Database::new(DbConfig::new("pawmart.db")).await?;
//!
//! let cart = CartService::new(db.clone());
//! let lock = cart.acquire_lock(&pet_id, None, &session_id).await?;
//!
//! let sweeper = ExpirySweeper::new(db.clone()).spawn(DEFAULT_SWEEP_INTERVAL);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cart::CartLockRepository;
pub use repository::contact::ContactRepository;
pub use repository::order::OrderRepository;
pub use repository::pet::{NewPet, PetRepository};
pub use repository::settings::SettingsRepository;

// Service re-exports for convenience
pub use service::{
    CartEntry, CartService, DeliveryService, DeliveryUpdate, ExpirySweeper, LogNotifier,
    NoOpNotifier, OrderDetails, OrderNotifier, OrderService, PlaceOrderRequest, ServiceError,
    ServiceResult, SettingsService, SweeperHandle, DEFAULT_SWEEP_INTERVAL,
};

// =============================================================================
// Test Utilities
// =============================================================================

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{Duration, Utc};

    use crate::pool::{Database, DbConfig};
    use crate::repository::pet::NewPet;
    use pawmart_core::Pet;

    /// Fresh in-memory database with migrations applied.
    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    /// Inserts an available pet listing.
    pub async fn seed_pet(db: &Database, name: &str, price_cents: i64) -> Pet {
        db.pets()
            .insert(NewPet {
                name: name.to_string(),
                species: "dog".to_string(),
                breed: Some("mixed".to_string()),
                age_months: Some(6),
                price_cents,
                description: None,
            })
            .await
            .expect("seed pet")
    }

    /// Moves a lock's expiry `minutes` into the past (negative values move
    /// it into the future).
    pub async fn backdate_lock(db: &Database, lock_id: &str, minutes: i64) {
        let until = Utc::now() - Duration::minutes(minutes);
        sqlx::query("UPDATE cart_locks SET locked_until = ? WHERE id = ?")
            .bind(until)
            .bind(lock_id)
            .execute(db.pool())
            .await
            .expect("backdate lock");
    }
}
