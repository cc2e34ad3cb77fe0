//! # Settings Repository
//!
//! Database operations for typed system settings.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use pawmart_core::SystemSetting;

/// Repository for system setting operations.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Gets all settings, ordered by key.
    pub async fn all(&self) -> DbResult<Vec<SystemSetting>> {
        let settings = sqlx::query_as::<_, SystemSetting>(
            r#"
            SELECT id, key, value, setting_type, description, updated_by, updated_at
            FROM system_settings
            ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Gets a setting by key.
    pub async fn get_by_key(&self, key: &str) -> DbResult<Option<SystemSetting>> {
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"
            SELECT id, key, value, setting_type, description, updated_by, updated_at
            FROM system_settings
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    /// Updates a setting's raw value. The declared type never changes.
    pub async fn update_value(
        &self,
        key: &str,
        raw_value: &str,
        updated_by: &str,
    ) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE system_settings SET value = ?, updated_by = ?, updated_at = ? WHERE key = ?",
        )
        .bind(raw_value)
        .bind(updated_by)
        .bind(now)
        .bind(key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Setting", key));
        }

        Ok(())
    }
}
