//! # Pet Repository
//!
//! Database operations for the pet catalog. Status writes are only ever
//! issued by the cart and order services; nothing else touches
//! `pets.status`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pawmart_core::{Pet, PetStatus};

/// Input for creating a pet listing.
#[derive(Debug, Clone)]
pub struct NewPet {
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub age_months: Option<i64>,
    pub price_cents: i64,
    pub description: Option<String>,
}

/// Repository for pet database operations.
#[derive(Debug, Clone)]
pub struct PetRepository {
    pool: SqlitePool,
}

impl PetRepository {
    /// Creates a new PetRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PetRepository { pool }
    }

    /// Inserts a new pet listing (admin surface / seeding).
    pub async fn insert(&self, new: NewPet) -> DbResult<Pet> {
        let now = Utc::now();
        let pet = Pet {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            species: new.species,
            breed: new.breed,
            age_months: new.age_months,
            price_cents: new.price_cents,
            status: PetStatus::Available,
            description: new.description,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        debug!(id = %pet.id, name = %pet.name, "Inserting pet");

        sqlx::query(
            r#"
            INSERT INTO pets (
                id, name, species, breed, age_months, price_cents,
                status, description, created_at, updated_at, deleted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pet.id)
        .bind(&pet.name)
        .bind(&pet.species)
        .bind(&pet.breed)
        .bind(pet.age_months)
        .bind(pet.price_cents)
        .bind(pet.status)
        .bind(&pet.description)
        .bind(pet.created_at)
        .bind(pet.updated_at)
        .bind(pet.deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(pet)
    }

    /// Gets a pet by ID (soft-deleted pets included; callers decide).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Pet>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_in(&mut conn, id).await
    }

    /// Gets a pet by ID on an existing connection.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            SELECT
                id, name, species, breed, age_months, price_cents,
                status, description, created_at, updated_at, deleted_at
            FROM pets
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(pet)
    }

    /// Lists live available pets, newest first.
    pub async fn list_available(&self, limit: i64) -> DbResult<Vec<Pet>> {
        let pets = sqlx::query_as::<_, Pet>(
            r#"
            SELECT
                id, name, species, breed, age_months, price_cents,
                status, description, created_at, updated_at, deleted_at
            FROM pets
            WHERE status = 'available' AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(pets)
    }

    /// Sets a pet's availability status.
    pub async fn set_status_in(
        conn: &mut SqliteConnection,
        pet_id: &str,
        status: PetStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE pets SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(pet_id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pet", pet_id));
        }

        Ok(())
    }

    /// Returns a pet to `available`, but only while the live record exists.
    ///
    /// Used by cancellation (inventory back to the pool) and by the sweeper;
    /// soft-deleted pets are left alone. Returns the number of rows touched.
    pub async fn release_if_live_in(
        conn: &mut SqliteConnection,
        pet_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE pets SET status = 'available', updated_at = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(pet_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Soft-deletes a pet listing.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE pets SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pet", id));
        }

        Ok(())
    }
}
