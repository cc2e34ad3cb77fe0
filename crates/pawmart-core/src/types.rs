//! # Domain Types
//!
//! Core domain types for the Pawmart marketplace.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────────────┐  │
//! │  │     Pet       │   │   CartLock    │   │        Order          │  │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────────────  │  │
//! │  │  id (UUID)    │◄──│  pet_id (UQ)  │   │  order_number (UQ)    │  │
//! │  │  status       │   │  user/session │   │  status               │  │
//! │  │  price_cents  │   │  locked_until │   │  subtotal + fee       │  │
//! │  └───────────────┘   └───────────────┘   └──────────┬────────────┘  │
//! │                                                     │               │
//! │              ┌──────────────┬───────────────────────┤               │
//! │              ▼              ▼                       ▼               │
//! │       ┌────────────┐ ┌──────────────────┐  ┌──────────────┐        │
//! │       │ OrderItem  │ │OrderStatusHistory│  │   Delivery   │        │
//! │       │ (snapshot) │ │  (append-only)   │  │  (1-to-1)    │        │
//! │       └────────────┘ └──────────────────┘  └──────────────┘        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Orders carry both an `id` (UUID v4, immutable, used for relations) and a
//! business identifier (`order_number`, short, human-readable).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Pet
// =============================================================================

/// Availability of a pet listing.
///
/// The status field is the single source of truth for availability. Writes
/// come exclusively from the cart manager and the order assembler; the lock
/// expiry timestamp is a secondary, eventually-reconciled signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PetStatus {
    /// Listed and free to reserve.
    Available,
    /// Locked into somebody's cart.
    Reserved,
    /// Purchased; terminal for the listing.
    Sold,
}

impl PetStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PetStatus::Available => "available",
            PetStatus::Reserved => "reserved",
            PetStatus::Sold => "sold",
        }
    }
}

impl std::fmt::Display for PetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pet listed on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Pet {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Species (e.g. "dog", "cat").
    pub species: String,

    /// Breed, when known.
    pub breed: Option<String>,

    /// Age in months.
    pub age_months: Option<i64>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Availability status.
    pub status: PetStatus,

    /// Optional listing description.
    pub description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker. A deleted pet stays referenced by old order item
    /// snapshots but is gone from the catalog.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Pet {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the pet can be reserved right now.
    pub fn is_available(&self) -> bool {
        self.status == PetStatus::Available && self.deleted_at.is_none()
    }
}

// =============================================================================
// Cart Lock
// =============================================================================

/// A time-boxed reservation of one pet for one cart owner.
///
/// ## Invariants
/// - At most one lock per pet (UNIQUE constraint at the storage layer).
/// - Exactly one of `user_id` / `session_id` is set, never both. Authenticated
///   owners are keyed by user id; guests by an opaque session token.
/// - Deleted on release, sweep, or consumption into an order. Updated in place
///   only to extend `locked_until` or to re-point ownership during a
///   guest-to-user merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLock {
    pub id: String,

    /// The reserved pet.
    pub pet_id: String,

    /// Owning user, when the lock was taken (or merged) by an authenticated
    /// caller.
    pub user_id: Option<String>,

    /// Owning guest session, when no user is attached.
    pub session_id: Option<String>,

    /// Expiry of the reservation window.
    pub locked_until: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl CartLock {
    /// Whether the reservation window has passed.
    pub fn is_expired(&self) -> bool {
        self.locked_until < Utc::now()
    }

    /// Whether the given caller owns this lock.
    ///
    /// Authenticated callers match on user id only (the session header is
    /// ignored); guests match on session id, and only while no user is
    /// attached.
    pub fn is_owned_by(&self, user_id: Option<&str>, session_id: &str) -> bool {
        match user_id {
            Some(uid) => self.user_id.as_deref() == Some(uid),
            None => self.user_id.is_none() && self.session_id.as_deref() == Some(session_id),
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order. See [`crate::lifecycle`] for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How an order is paid. Cash on delivery is the only supported method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cod
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order.
///
/// Created atomically with its line items, initial history entry and delivery
/// record - an order is never partially persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,

    /// Short business identifier (`ORD-XXXXXX`), unique, collision-checked
    /// before assignment.
    pub order_number: String,

    /// Buyer, when authenticated.
    pub user_id: Option<String>,

    /// Buyer contact record, when placed as a guest.
    pub guest_contact_id: Option<String>,

    /// Immutable delivery address row.
    pub delivery_address_id: String,

    /// Sum of the item price snapshots, in cents.
    pub subtotal_cents: i64,

    /// Caller-supplied delivery fee, in cents. Never negative.
    pub delivery_fee_cents: i64,

    pub payment_method: PaymentMethod,

    pub status: OrderStatus,

    /// Required when (and only when) the order is cancelled.
    pub cancellation_reason: Option<String>,

    /// Set when the order enters `cancelled`.
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Set when the order enters `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Order total: subtotal plus delivery fee.
    #[inline]
    pub fn total_cents(&self) -> i64 {
        self.subtotal_cents + self.delivery_fee_cents
    }

    /// Returns the total as a Money type.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
///
/// Uses the snapshot pattern: pet name, species, breed and price are frozen at
/// the moment of purchase, so the order history survives later edits or
/// soft-deletion of the live pet record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,

    /// Reference to the live pet record; nullable because the pet may be
    /// soft-deleted after the sale.
    pub pet_id: Option<String>,

    /// Pet name at time of purchase (frozen).
    pub name_snapshot: String,

    /// Species at time of purchase (frozen).
    pub species_snapshot: String,

    /// Breed at time of purchase (frozen).
    pub breed_snapshot: Option<String>,

    /// Price in cents at time of purchase (frozen).
    pub price_snapshot_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the snapshot price as Money.
    #[inline]
    pub fn price_snapshot(&self) -> Money {
        Money::from_cents(self.price_snapshot_cents)
    }
}

// =============================================================================
// Order Status History
// =============================================================================

/// One entry in an order's append-only status ledger.
///
/// A row is written for every transition, including the initial `pending`
/// entry at creation. Entries are never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderStatusHistory {
    pub id: String,
    pub order_id: String,

    /// Status the order moved to.
    pub status: OrderStatus,

    /// Acting user, if any (guest-placed orders record no actor).
    pub changed_by: Option<String>,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Delivery
// =============================================================================

/// Delivery sub-status. Independent of the order status; see
/// [`crate::lifecycle`] for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Dispatched,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Dispatched => "dispatched",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery record, one-to-one with an order.
///
/// `dispatched_at` and `delivered_at` are set once and are monotonic:
/// dispatched_at <= delivered_at whenever both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Delivery {
    pub id: String,
    pub order_id: String,
    pub status: DeliveryStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Guest Contact
// =============================================================================

/// Lightweight identity record for unauthenticated buyers, keyed by email.
/// Name and phone are attached on first creation only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GuestContact {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Address
// =============================================================================

/// A delivery address. Insert-only: addresses are never updated or
/// deduplicated once attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: String,
    pub address_line: String,
    pub city: Option<String>,
    pub area: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// System Settings
// =============================================================================

/// Declared value type of a system setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Integer,
    Boolean,
    Json,
}

/// A typed key/value system setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SystemSetting {
    pub id: String,
    pub key: String,

    /// Raw stored value; interpret through [`SystemSetting::typed_value`].
    pub value: String,

    pub setting_type: SettingType,
    pub description: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A setting value cast to its declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Json(serde_json::Value),
}

impl SystemSetting {
    /// Returns the value cast to its declared type.
    pub fn typed_value(&self) -> Result<SettingValue, ValidationError> {
        match self.setting_type {
            SettingType::String => Ok(SettingValue::String(self.value.clone())),
            SettingType::Integer => self
                .value
                .parse::<i64>()
                .map(SettingValue::Integer)
                .map_err(|_| ValidationError::InvalidFormat {
                    field: self.key.clone(),
                    reason: "stored value is not a valid integer".to_string(),
                }),
            SettingType::Boolean => match self.value.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(SettingValue::Boolean(true)),
                "false" | "0" => Ok(SettingValue::Boolean(false)),
                _ => Err(ValidationError::InvalidFormat {
                    field: self.key.clone(),
                    reason: "stored value is not a valid boolean".to_string(),
                }),
            },
            SettingType::Json => serde_json::from_str(&self.value)
                .map(SettingValue::Json)
                .map_err(|_| ValidationError::InvalidFormat {
                    field: self.key.clone(),
                    reason: "stored value is not valid JSON".to_string(),
                }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lock(user: Option<&str>, session: Option<&str>, until: DateTime<Utc>) -> CartLock {
        CartLock {
            id: "lock-1".to_string(),
            pet_id: "pet-1".to_string(),
            user_id: user.map(str::to_string),
            session_id: session.map(str::to_string),
            locked_until: until,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_lock_expiry() {
        let live = lock(None, Some("s1"), Utc::now() + Duration::minutes(15));
        assert!(!live.is_expired());

        let stale = lock(None, Some("s1"), Utc::now() - Duration::seconds(1));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_lock_ownership_scoping() {
        let user_lock = lock(Some("u1"), None, Utc::now());
        // Authenticated caller matches on user id; session header is ignored.
        assert!(user_lock.is_owned_by(Some("u1"), "whatever"));
        assert!(!user_lock.is_owned_by(Some("u2"), "whatever"));
        // A guest never sees a user-owned lock, even with a matching session.
        assert!(!user_lock.is_owned_by(None, "whatever"));

        let guest_lock = lock(None, Some("s1"), Utc::now());
        assert!(guest_lock.is_owned_by(None, "s1"));
        assert!(!guest_lock.is_owned_by(None, "s2"));
        assert!(!guest_lock.is_owned_by(Some("u1"), "s1"));
    }

    #[test]
    fn test_order_total() {
        let order = Order {
            id: "o1".to_string(),
            order_number: "ORD-ABC123".to_string(),
            user_id: None,
            guest_contact_id: Some("g1".to_string()),
            delivery_address_id: "a1".to_string(),
            subtotal_cents: 250_000,
            delivery_fee_cents: 1_500,
            payment_method: PaymentMethod::Cod,
            status: OrderStatus::Pending,
            cancellation_reason: None,
            cancelled_at: None,
            delivered_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(order.total_cents(), 251_500);
    }

    #[test]
    fn test_setting_typed_value_casts() {
        let mut setting = SystemSetting {
            id: "s1".to_string(),
            key: "cart_lock_duration_minutes".to_string(),
            value: "15".to_string(),
            setting_type: SettingType::Integer,
            description: None,
            updated_by: None,
            updated_at: Utc::now(),
        };
        assert_eq!(setting.typed_value().unwrap(), SettingValue::Integer(15));

        setting.setting_type = SettingType::Boolean;
        setting.value = "true".to_string();
        assert_eq!(setting.typed_value().unwrap(), SettingValue::Boolean(true));

        setting.setting_type = SettingType::Json;
        setting.value = r#"{"a":1}"#.to_string();
        assert!(matches!(
            setting.typed_value().unwrap(),
            SettingValue::Json(_)
        ));
    }

    #[test]
    fn test_setting_typed_value_rejects_garbage() {
        let setting = SystemSetting {
            id: "s1".to_string(),
            key: "max_upload_size_mb".to_string(),
            value: "not-a-number".to_string(),
            setting_type: SettingType::Integer,
            description: None,
            updated_by: None,
            updated_at: Utc::now(),
        };
        assert!(setting.typed_value().is_err());
    }
}
