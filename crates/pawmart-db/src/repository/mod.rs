//! # Repository Module
//!
//! Per-entity SQL behind a clean API.
//!
//! ## Conventions
//! - Pool-scoped convenience methods live on the repository structs.
//! - Operations that participate in multi-row transactions are associated
//!   functions with an `_in` suffix taking `&mut SqliteConnection`, so the
//!   service layer can compose them inside a single `BEGIN ... COMMIT`.
//! - SQL is runtime-bound (`sqlx::query` / `query_as` + `.bind()`).
//!
//! ## Available Repositories
//!
//! - [`pet::PetRepository`] - catalog inventory, status writes
//! - [`cart::CartLockRepository`] - reservation locks
//! - [`order::OrderRepository`] - orders, items, history, deliveries
//! - [`contact::ContactRepository`] - addresses and guest contacts
//! - [`settings::SettingsRepository`] - typed system settings

pub mod cart;
pub mod contact;
pub mod order;
pub mod pet;
pub mod settings;
