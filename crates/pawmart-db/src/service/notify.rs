//! # Order Notifications
//!
//! Fire-and-forget confirmation dispatch. The actual mail rendering and
//! delivery live outside this workspace; the pipeline only hands over an
//! order and a destination address.

use tracing::info;

use pawmart_core::Order;

/// Trait for dispatching order confirmations.
///
/// Implementations must be fire-and-forget: they may spawn work, but they
/// must not block and must not fail - a lost notification never fails an
/// order placement.
pub trait OrderNotifier: Send + Sync {
    /// Called after an order has committed, with the resolved buyer email.
    fn order_placed(&self, order: &Order, email: &str);
}

/// Notifier that records the dispatch in the log stream.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl OrderNotifier for LogNotifier {
    fn order_placed(&self, order: &Order, email: &str) {
        info!(
            order_number = %order.order_number,
            email,
            total_cents = order.total_cents(),
            "Order confirmation dispatched"
        );
    }
}

/// No-op notifier for testing.
#[derive(Debug, Default)]
pub struct NoOpNotifier;

impl OrderNotifier for NoOpNotifier {
    fn order_placed(&self, _order: &Order, _email: &str) {}
}
