//! # Settings Service
//!
//! Typed system settings. Every setting declares a type; raw values are
//! validated against it on write and cast on read.

use std::collections::BTreeMap;

use tracing::info;

use crate::pool::Database;
use crate::service::ServiceResult;
use pawmart_core::{CoreError, SettingType, SettingValue, SystemSetting, ValidationError};

/// Reads and writes typed system settings.
#[derive(Debug, Clone)]
pub struct SettingsService {
    db: Database,
}

impl SettingsService {
    /// Creates a settings service.
    pub fn new(db: Database) -> Self {
        SettingsService { db }
    }

    /// Returns all settings with values cast to their declared types.
    pub async fn all(&self) -> ServiceResult<BTreeMap<String, SettingValue>> {
        let settings = self.db.settings().all().await?;

        let mut map = BTreeMap::new();
        for setting in settings {
            let value = setting.typed_value().map_err(CoreError::from)?;
            map.insert(setting.key, value);
        }

        Ok(map)
    }

    /// Gets a single setting value, typed.
    pub async fn get(&self, key: &str) -> ServiceResult<SettingValue> {
        let setting = self
            .db
            .settings()
            .get_by_key(key)
            .await?
            .ok_or_else(|| CoreError::not_found("Setting", key))?;

        Ok(setting.typed_value().map_err(CoreError::from)?)
    }

    /// Updates a setting value (admin only). The raw value must be
    /// compatible with the setting's declared type.
    pub async fn set(
        &self,
        key: &str,
        raw_value: &str,
        updated_by: &str,
    ) -> ServiceResult<SystemSetting> {
        let setting = self
            .db
            .settings()
            .get_by_key(key)
            .await?
            .ok_or_else(|| CoreError::not_found("Setting", key))?;

        validate_raw_value(key, setting.setting_type, raw_value)?;

        self.db
            .settings()
            .update_value(key, raw_value, updated_by)
            .await?;

        let fresh = self
            .db
            .settings()
            .get_by_key(key)
            .await?
            .ok_or_else(|| CoreError::not_found("Setting", key))?;

        info!(key, value = raw_value, updated_by, "Setting updated");
        Ok(fresh)
    }
}

/// Checks that a raw value parses under the declared type.
fn validate_raw_value(
    key: &str,
    setting_type: SettingType,
    raw: &str,
) -> Result<(), ValidationError> {
    let ok = match setting_type {
        SettingType::String => true,
        SettingType::Integer => raw.parse::<i64>().is_ok(),
        SettingType::Boolean => matches!(
            raw.to_ascii_lowercase().as_str(),
            "true" | "false" | "1" | "0"
        ),
        SettingType::Json => serde_json::from_str::<serde_json::Value>(raw).is_ok(),
    };

    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: key.to_string(),
            reason: format!("value must be a valid {setting_type:?}").to_ascii_lowercase(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
