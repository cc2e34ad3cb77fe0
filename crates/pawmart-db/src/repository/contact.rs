//! # Contact Repository
//!
//! Plain create/read operations for delivery addresses and guest contacts.
//! No business logic lives here.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use pawmart_core::{Address, GuestContact};

/// Repository for address and guest contact operations.
#[derive(Debug, Clone)]
pub struct ContactRepository {
    pool: SqlitePool,
}

impl ContactRepository {
    /// Creates a new ContactRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ContactRepository { pool }
    }

    /// Inserts an immutable address row and returns it.
    pub async fn insert_address_in(
        conn: &mut SqliteConnection,
        address_line: &str,
        city: Option<&str>,
        area: Option<&str>,
    ) -> DbResult<Address> {
        let address = Address {
            id: Uuid::new_v4().to_string(),
            address_line: address_line.to_string(),
            city: city.map(str::to_string),
            area: area.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO addresses (id, address_line, city, area, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&address.id)
        .bind(&address.address_line)
        .bind(&address.city)
        .bind(&address.area)
        .bind(address.created_at)
        .execute(conn)
        .await?;

        Ok(address)
    }

    /// Gets an address by id.
    pub async fn get_address(&self, id: &str) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            "SELECT id, address_line, city, area, created_at FROM addresses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Finds a guest contact by email.
    pub async fn find_guest_by_email_in(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> DbResult<Option<GuestContact>> {
        let contact = sqlx::query_as::<_, GuestContact>(
            "SELECT id, email, name, phone, created_at FROM guest_contacts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(contact)
    }

    /// Inserts a guest contact. Name and phone are attached here, on first
    /// creation, and never afterwards.
    pub async fn insert_guest_in(
        conn: &mut SqliteConnection,
        email: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> DbResult<GuestContact> {
        let contact = GuestContact {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            phone: phone.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO guest_contacts (id, email, name, phone, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&contact.id)
        .bind(&contact.email)
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(contact.created_at)
        .execute(conn)
        .await?;

        Ok(contact)
    }
}
