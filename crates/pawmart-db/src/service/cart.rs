//! # Cart Service
//!
//! Owns guest/user cart contents and the inventory lock lifecycle.
//!
//! ## Lock Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   acquire_lock ──► CartLock (locked_until = now + window)           │
//! │        │                │                                           │
//! │        │                ├── view_cart (user) ──► window slides      │
//! │        │                ├── merge_guest_cart ──► owner re-pointed,  │
//! │        │                │                        fresh window       │
//! │        │                ├── release_lock ──► pet available again    │
//! │        │                ├── expiry sweep ──► pet available again    │
//! │        │                └── place_order ──► pet sold, lock consumed │
//! │        │                                                            │
//! │        └── pet.status: available ──► reserved                       │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Scoping
//! Authenticated callers are scoped strictly to their user id (the session
//! header is ignored); guests are scoped to their session, and only to locks
//! with no user attached.

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::pool::Database;
use crate::repository::cart::CartLockRepository;
use crate::repository::pet::PetRepository;
use crate::service::{ServiceError, ServiceResult};
use pawmart_core::{
    validation, CartLock, CoreError, Pet, PetStatus, DEFAULT_LOCK_WINDOW_MINUTES,
};

// =============================================================================
// Cart Entry
// =============================================================================

/// One cart line: the lock plus the pet it reserves.
#[derive(Debug, Clone)]
pub struct CartEntry {
    pub lock: CartLock,
    pub pet: Pet,
}

// =============================================================================
// Cart Service
// =============================================================================

/// Manages reservation locks for guest and user carts.
#[derive(Debug, Clone)]
pub struct CartService {
    db: Database,
    lock_window: Duration,
}

impl CartService {
    /// Creates a cart service with the default 15-minute lock window.
    pub fn new(db: Database) -> Self {
        Self::with_lock_window(db, Duration::minutes(DEFAULT_LOCK_WINDOW_MINUTES))
    }

    /// Creates a cart service with an explicit lock window.
    pub fn with_lock_window(db: Database, lock_window: Duration) -> Self {
        CartService { db, lock_window }
    }

    /// Reserves a pet for the caller's cart.
    ///
    /// ## Failure Modes
    /// - `NotFound` - no such pet
    /// - `PetUnavailable` - sold or soft-deleted
    /// - `AlreadyReserved` - an unexpired lock is held by a different owner,
    ///   or the caller lost the insert race for the same pet
    ///
    /// An expired lock on the pet is deleted and overwritten. Re-acquiring a
    /// pet the caller already holds extends the window and returns the
    /// existing lock.
    pub async fn acquire_lock(
        &self,
        pet_id: &str,
        user_id: Option<&str>,
        session_id: &str,
    ) -> ServiceResult<CartLock> {
        if user_id.is_none() {
            validation::validate_session_id(session_id)?;
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        let pet = PetRepository::get_by_id_in(&mut tx, pet_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Pet", pet_id))?;

        if pet.deleted_at.is_some() || pet.status == PetStatus::Sold {
            return Err(CoreError::PetUnavailable(pet_id.to_string()).into());
        }

        if let Some(existing) = CartLockRepository::get_by_pet_in(&mut tx, pet_id).await? {
            if existing.locked_until >= now {
                if existing.is_owned_by(user_id, session_id) {
                    // Idempotent re-acquire: slide the window.
                    let until = now + self.lock_window;
                    CartLockRepository::extend_in(&mut tx, &existing.id, until).await?;
                    tx.commit().await.map_err(ServiceError::from)?;
                    return Ok(CartLock {
                        locked_until: until,
                        ..existing
                    });
                }
                return Err(CoreError::AlreadyReserved(pet_id.to_string()).into());
            }

            // Expired lock: the previous owner forfeits it.
            CartLockRepository::delete_in(&mut tx, &existing.id).await?;
        }
        // A `reserved` pet with no live lock is acquirable: expiry is
        // advisory, and sweeper lag must not block the pet.

        PetRepository::set_status_in(&mut tx, pet_id, PetStatus::Reserved, now).await?;

        let lock = CartLock {
            id: Uuid::new_v4().to_string(),
            pet_id: pet_id.to_string(),
            user_id: user_id.map(str::to_string),
            // Authenticated owners are keyed by user id alone; storing the
            // session alongside would surface the lock in two carts at once.
            session_id: if user_id.is_some() {
                None
            } else {
                Some(session_id.to_string())
            },
            locked_until: now + self.lock_window,
            created_at: now,
        };

        match CartLockRepository::insert_in(&mut tx, &lock).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation() => {
                // Lost the race to a concurrent acquire; never overwrite.
                return Err(CoreError::AlreadyReserved(pet_id.to_string()).into());
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await.map_err(ServiceError::from)?;

        debug!(pet_id, lock_id = %lock.id, "Cart lock acquired");
        Ok(lock)
    }

    /// Returns the caller's cart.
    ///
    /// Sweeps expired locks first, then - for authenticated callers - slides
    /// every owned lock's window forward so a reservation is never lost
    /// merely by browsing.
    pub async fn view_cart(
        &self,
        user_id: Option<&str>,
        session_id: &str,
    ) -> ServiceResult<Vec<CartEntry>> {
        if user_id.is_none() {
            validation::validate_session_id(session_id)?;
        }

        self.release_expired_locks().await?;

        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        if let Some(uid) = user_id {
            let until = Utc::now() + self.lock_window;
            CartLockRepository::extend_for_user_in(&mut tx, uid, until).await?;
        }

        let locks = CartLockRepository::list_for_owner_in(&mut tx, user_id, session_id).await?;

        let mut entries = Vec::with_capacity(locks.len());
        for lock in locks {
            let pet = PetRepository::get_by_id_in(&mut tx, &lock.pet_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Pet", lock.pet_id.clone()))?;
            entries.push(CartEntry { lock, pet });
        }

        tx.commit().await.map_err(ServiceError::from)?;
        Ok(entries)
    }

    /// Releases a lock the caller owns, returning the pet to `available`.
    pub async fn release_lock(
        &self,
        lock_id: &str,
        user_id: Option<&str>,
        session_id: &str,
    ) -> ServiceResult<()> {
        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        let lock = CartLockRepository::get_by_id_in(&mut tx, lock_id)
            .await?
            .filter(|l| l.is_owned_by(user_id, session_id))
            .ok_or_else(|| CoreError::not_found("Cart item", lock_id))?;

        PetRepository::release_if_live_in(&mut tx, &lock.pet_id, Utc::now()).await?;
        CartLockRepository::delete_in(&mut tx, &lock.id).await?;

        tx.commit().await.map_err(ServiceError::from)?;

        debug!(lock_id, pet_id = %lock.pet_id, "Cart lock released");
        Ok(())
    }

    /// Merges a guest session's cart into a user's cart after login.
    ///
    /// Every session-owned lock is re-pointed to the user, the session owner
    /// is cleared, and the expiry resets to a full window measured from the
    /// merge moment - not from the original acquisition. Returns the number
    /// of locks merged.
    pub async fn merge_guest_cart(&self, session_id: &str, user_id: &str) -> ServiceResult<u64> {
        validation::validate_session_id(session_id)?;
        if user_id.trim().is_empty() {
            return Err(pawmart_core::ValidationError::Required {
                field: "user_id".to_string(),
            }
            .into());
        }

        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        let until = Utc::now() + self.lock_window;
        let merged =
            CartLockRepository::merge_session_into_user_in(&mut tx, session_id, user_id, until)
                .await?;

        tx.commit().await.map_err(ServiceError::from)?;

        if merged > 0 {
            info!(session_id, user_id, merged, "Guest cart merged");
        }
        Ok(merged)
    }

    /// Releases all expired locks and restores pet availability.
    ///
    /// Idempotent. Each lock is deleted only if still expired at delete time,
    /// so a reservation extended by a concurrent cart view survives the
    /// sweep. Returns the number of locks released.
    pub async fn release_expired_locks(&self) -> ServiceResult<u64> {
        let mut tx = self.db.pool().begin().await.map_err(ServiceError::from)?;

        let expired = CartLockRepository::list_expired_in(&mut tx, Utc::now()).await?;

        let mut released = 0;
        for lock in expired {
            let deleted =
                CartLockRepository::delete_if_expired_in(&mut tx, &lock.id, Utc::now()).await?;
            if deleted == 0 {
                // Extended in the meantime; leave the reservation alone.
                continue;
            }

            PetRepository::release_if_live_in(&mut tx, &lock.pet_id, Utc::now()).await?;
            released += 1;
        }

        tx.commit().await.map_err(ServiceError::from)?;

        if released > 0 {
            debug!(released, "Expired cart locks released");
        }
        Ok(released)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
