//! # Status Lifecycles
//!
//! Transition tables for the order and delivery state machines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   pending ──► confirmed ──► out_for_delivery ──► delivered (■)      │
//! │      │            │                │                                │
//! │      └────────────┴────────────────┴──────────► cancelled (■)       │
//! │                                                                     │
//! │   (■) terminal - no outgoing transitions                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   pending ──► dispatched ──► delivered (■)                          │
//! │      │            │ ▲                                               │
//! │      │            ▼ │  retry                                        │
//! │      └────────► failed                                              │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition is validated here before any storage write; rejected
//! transitions surface as [`CoreError::InvalidTransition`] and leave state
//! untouched.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{DeliveryStatus, OrderStatus};

// =============================================================================
// Order State Machine
// =============================================================================

impl OrderStatus {
    /// Statuses this one may transition to.
    pub const fn allowed_transitions(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[OrderStatus::Confirmed, OrderStatus::Cancelled],
            OrderStatus::Confirmed => &[OrderStatus::OutForDelivery, OrderStatus::Cancelled],
            OrderStatus::OutForDelivery => &[OrderStatus::Delivered, OrderStatus::Cancelled],
            OrderStatus::Delivered | OrderStatus::Cancelled => &[],
        }
    }

    /// Whether a transition to `next` is allowed from this status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Whether this status has no outgoing transitions.
    pub const fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Validates an order status change, including the extra requirements a
/// target status imposes (a cancellation must carry a non-empty reason).
pub fn validate_order_transition(
    current: OrderStatus,
    next: OrderStatus,
    cancellation_reason: Option<&str>,
) -> CoreResult<()> {
    if !current.can_transition_to(next) {
        return Err(CoreError::invalid_transition(
            current.as_str(),
            next.as_str(),
        ));
    }

    if next == OrderStatus::Cancelled
        && cancellation_reason.map_or(true, |r| r.trim().is_empty())
    {
        return Err(ValidationError::Required {
            field: "cancellation_reason".to_string(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Delivery State Machine
// =============================================================================

impl DeliveryStatus {
    /// Statuses this one may transition to. `failed` allows re-dispatch.
    pub const fn allowed_transitions(self) -> &'static [DeliveryStatus] {
        match self {
            DeliveryStatus::Pending => &[DeliveryStatus::Dispatched, DeliveryStatus::Failed],
            DeliveryStatus::Dispatched => &[DeliveryStatus::Delivered, DeliveryStatus::Failed],
            DeliveryStatus::Failed => &[DeliveryStatus::Dispatched],
            DeliveryStatus::Delivered => &[],
        }
    }

    /// Whether a transition to `next` is allowed from this status.
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

/// Validates a delivery status change.
pub fn validate_delivery_transition(
    current: DeliveryStatus,
    next: DeliveryStatus,
) -> CoreResult<()> {
    if !current.can_transition_to(next) {
        return Err(CoreError::invalid_transition(
            current.as_str(),
            next.as_str(),
        ));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
