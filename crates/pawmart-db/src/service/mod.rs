//! # Service Layer
//!
//! The cart-to-order reservation pipeline.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │  client ──► CartService ──────► OrderService ──► order lifecycle    │
//! │             (lock acquisition)  (transactional   (update_status)    │
//! │                    ▲             conversion)                        │
//! │                    │                                                │
//! │             ExpirySweeper (periodic, releases expired locks)        │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every service takes its collaborators (database handle, notifier, lock
//! window) as explicit constructor arguments; there are no ambient globals.

pub mod cart;
pub mod delivery;
pub mod notify;
pub mod order;
pub mod settings;
pub mod sweeper;

pub use cart::{CartEntry, CartService};
pub use delivery::{DeliveryService, DeliveryUpdate};
pub use notify::{LogNotifier, NoOpNotifier, OrderNotifier};
pub use order::{OrderDetails, OrderService, PlaceOrderRequest};
pub use settings::SettingsService;
pub use sweeper::{ExpirySweeper, SweeperHandle, DEFAULT_SWEEP_INTERVAL};

use thiserror::Error;
use tracing::error;

use crate::error::DbError;
use pawmart_core::{CoreError, ValidationError};

// =============================================================================
// Service Error
// =============================================================================

/// Error surface of the service layer.
///
/// Domain failures are typed, recoverable and returned to the caller
/// unlogged; storage failures are opaque, always logged, and distinct from
/// the business taxonomy.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule rejected the operation. The caller corrects input or
    /// retries.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The storage layer itself failed (constraint machinery, connection
    /// loss, ...).
    #[error("Storage failure: {0}")]
    Storage(DbError),
}

impl ServiceError {
    /// Whether this is a recoverable business-rule failure.
    pub fn is_domain(&self) -> bool {
        matches!(self, ServiceError::Domain(_))
    }
}

/// Storage failures are logged here, exactly once, as they cross into the
/// service boundary. Domain failures never pass through this conversion.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        error!(error = %err, "Storage failure");
        ServiceError::Storage(err)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Domain(CoreError::Validation(err))
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
