//! # Error Types
//!
//! Domain-specific error types for pawmart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  pawmart-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Malformed caller input                      │
//! │                                                                     │
//! │  pawmart-db errors (separate crate)                                 │
//! │  ├── DbError          - Storage failures (opaque, always logged)    │
//! │  └── ServiceError     - Domain | Storage at the service boundary    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (pet id, status names, ...)
//! 3. Errors are enum variants, never String
//! 4. Every variant here is recoverable and user-facing; the caller corrects
//!    input or retries

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations in the reservation and order pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The pet is not available for reservation (sold, or soft-deleted).
    #[error("Pet {0} is not available")]
    PetUnavailable(String),

    /// An unexpired lock on the pet is held by a different owner.
    ///
    /// Also the outcome for the loser of two concurrent acquire attempts:
    /// the storage-layer uniqueness constraint resolves the race and the
    /// violation maps here, never to a silent overwrite.
    #[error("Pet {0} is already reserved by another customer")]
    AlreadyReserved(String),

    /// Entity absent, or present but not owned by the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Order placement attempted with no live locks in the cart.
    #[error("Your cart is empty")]
    EmptyCart,

    /// A participating lock expired before the order transaction started.
    #[error("Your cart lock has expired; please add items again")]
    CartExpired,

    /// Status transition not in the allowed table.
    #[error("Cannot transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidTransition error from any pair of status names.
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        CoreError::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised at the boundary of each operation before
/// any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g. malformed email, invalid JSON).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AlreadyReserved("pet-42".to_string());
        assert_eq!(
            err.to_string(),
            "Pet pet-42 is already reserved by another customer"
        );

        let err = CoreError::invalid_transition("delivered", "confirmed");
        assert_eq!(
            err.to_string(),
            "Cannot transition from 'delivered' to 'confirmed'"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "cancellation_reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
