//! # pawmart-core: Pure Business Logic for Pawmart
//!
//! This crate is the heart of the Pawmart marketplace backend. It contains the
//! domain model and all business rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Pawmart Architecture                            │
//! │                                                                     │
//! │  HTTP controllers / auth / media  (external to this workspace)      │
//! │                        │                                            │
//! │  ┌─────────────────────▼─────────────────────────────────────────┐  │
//! │  │                pawmart-db (storage + services)                │  │
//! │  │   CartService ──► OrderService ──► ExpirySweeper              │  │
//! │  └─────────────────────┬─────────────────────────────────────────┘  │
//! │                        │                                            │
//! │  ┌─────────────────────▼─────────────────────────────────────────┐  │
//! │  │              ★ pawmart-core (THIS CRATE) ★                    │  │
//! │  │                                                               │  │
//! │  │   ┌─────────┐  ┌────────┐  ┌───────────┐  ┌────────────┐     │  │
//! │  │   │  types  │  │ money  │  │ lifecycle │  │ validation │     │  │
//! │  │   │  Pet    │  │ Money  │  │  status   │  │   rules    │     │  │
//! │  │   │CartLock │  │ cents  │  │ machines  │  │   checks   │     │  │
//! │  │   │  Order  │  └────────┘  └───────────┘  └────────────┘     │  │
//! │  │   └─────────┘                                                │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Pet, CartLock, Order, Delivery, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`lifecycle`] - Order and delivery status state machines
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary validation of caller-supplied input

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default lock window in minutes: how long a pet stays reserved for a cart
/// owner before the lock may be swept.
///
/// The window is advisory. Expiry is acted on by the sweeper or by the next
/// cart read / merge / order placement touching the lock, never instantly.
pub const DEFAULT_LOCK_WINDOW_MINUTES: i64 = 15;

/// Prefix for generated order numbers (`ORD-XXXXXX`).
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Number of random alphanumeric characters in an order number.
pub const ORDER_NUMBER_RANDOM_LEN: usize = 6;
