//! # Cart Lock Repository
//!
//! Database operations for reservation locks.
//!
//! The `cart_locks_pet_unique` constraint is load-bearing: two concurrent
//! inserts for the same pet cannot both succeed, and the loser's
//! `UniqueViolation` is what the cart service maps to `AlreadyReserved`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use pawmart_core::CartLock;

/// Repository for cart lock database operations.
#[derive(Debug, Clone)]
pub struct CartLockRepository {
    pool: SqlitePool,
}

impl CartLockRepository {
    /// Creates a new CartLockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartLockRepository { pool }
    }

    /// Inserts a lock. A `UniqueViolation` here means another owner won the
    /// race for the same pet.
    pub async fn insert_in(conn: &mut SqliteConnection, lock: &CartLock) -> DbResult<()> {
        debug!(id = %lock.id, pet_id = %lock.pet_id, "Inserting cart lock");

        sqlx::query(
            r#"
            INSERT INTO cart_locks (id, pet_id, user_id, session_id, locked_until, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lock.id)
        .bind(&lock.pet_id)
        .bind(&lock.user_id)
        .bind(&lock.session_id)
        .bind(lock.locked_until)
        .bind(lock.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets a lock by its own id.
    pub async fn get_by_id_in(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<CartLock>> {
        let lock = sqlx::query_as::<_, CartLock>(
            r#"
            SELECT id, pet_id, user_id, session_id, locked_until, created_at
            FROM cart_locks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(lock)
    }

    /// Gets the lock for a pet, if one exists (expired or not).
    pub async fn get_by_pet_in(
        conn: &mut SqliteConnection,
        pet_id: &str,
    ) -> DbResult<Option<CartLock>> {
        let lock = sqlx::query_as::<_, CartLock>(
            r#"
            SELECT id, pet_id, user_id, session_id, locked_until, created_at
            FROM cart_locks
            WHERE pet_id = ?
            "#,
        )
        .bind(pet_id)
        .fetch_optional(conn)
        .await?;

        Ok(lock)
    }

    /// Lists locks scoped to a caller: authenticated callers get their
    /// user-owned locks (session ignored), guests get session-owned locks
    /// with no user attached.
    pub async fn list_for_owner_in(
        conn: &mut SqliteConnection,
        user_id: Option<&str>,
        session_id: &str,
    ) -> DbResult<Vec<CartLock>> {
        let locks = match user_id {
            Some(uid) => {
                sqlx::query_as::<_, CartLock>(
                    r#"
                    SELECT id, pet_id, user_id, session_id, locked_until, created_at
                    FROM cart_locks
                    WHERE user_id = ?
                    ORDER BY created_at
                    "#,
                )
                .bind(uid)
                .fetch_all(conn)
                .await?
            }
            None => {
                sqlx::query_as::<_, CartLock>(
                    r#"
                    SELECT id, pet_id, user_id, session_id, locked_until, created_at
                    FROM cart_locks
                    WHERE user_id IS NULL AND session_id = ?
                    ORDER BY created_at
                    "#,
                )
                .bind(session_id)
                .fetch_all(conn)
                .await?
            }
        };

        Ok(locks)
    }

    /// Lists all locks whose expiry is in the past.
    pub async fn list_expired_in(
        conn: &mut SqliteConnection,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<CartLock>> {
        let locks = sqlx::query_as::<_, CartLock>(
            r#"
            SELECT id, pet_id, user_id, session_id, locked_until, created_at
            FROM cart_locks
            WHERE locked_until < ?
            ORDER BY locked_until
            "#,
        )
        .bind(now)
        .fetch_all(conn)
        .await?;

        Ok(locks)
    }

    /// Extends a single lock's expiry.
    pub async fn extend_in(
        conn: &mut SqliteConnection,
        id: &str,
        until: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE cart_locks SET locked_until = ? WHERE id = ?")
            .bind(until)
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Sliding-window renewal: extends every lock a user owns. Returns the
    /// number of locks touched.
    pub async fn extend_for_user_in(
        conn: &mut SqliteConnection,
        user_id: &str,
        until: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query("UPDATE cart_locks SET locked_until = ? WHERE user_id = ?")
            .bind(until)
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a lock unconditionally. Returns rows affected.
    pub async fn delete_in(conn: &mut SqliteConnection, id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_locks WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a lock only if it is still expired at delete time.
    ///
    /// This is the sweep's tie-break against a concurrent sliding-window
    /// extension: an extended lock no longer matches the predicate and
    /// survives (0 rows affected).
    pub async fn delete_if_expired_in(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_locks WHERE id = ? AND locked_until < ?")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Re-points every session-owned (user-less) lock to a user and resets
    /// the expiry to a fresh window. Returns the number of locks merged.
    pub async fn merge_session_into_user_in(
        conn: &mut SqliteConnection,
        session_id: &str,
        user_id: &str,
        until: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cart_locks
            SET user_id = ?, session_id = NULL, locked_until = ?
            WHERE session_id = ? AND user_id IS NULL
            "#,
        )
        .bind(user_id)
        .bind(until)
        .bind(session_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts all live (unexpired) locks. Diagnostic helper.
    pub async fn count_live(&self, now: DateTime<Utc>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cart_locks WHERE locked_until >= ?")
                .bind(now)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
