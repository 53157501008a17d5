use chrono::Utc;
use sea_orm::{sea_query::OnConflict, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{str::FromStr, sync::Arc};
use tracing::{info, instrument, warn};

use crate::{
    auth::{require_admin, AuthUser},
    entities::store_setting,
    errors::ServiceError,
    events::{Event, EventSender},
};

/// The fixed set of setting rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettingKey {
    StoreInfo,
    OperationalStatus,
    RewardSettings,
}

impl SettingKey {
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        SettingKey::from_str(raw)
            .map_err(|_| ServiceError::NotFound(format!("Unknown setting '{}'", raw)))
    }

    /// Value returned when the row has never been written.
    pub fn default_value(&self) -> Value {
        match self {
            SettingKey::StoreInfo => serde_json::to_value(StoreInfo::default()),
            SettingKey::OperationalStatus => serde_json::to_value(OperationalStatus::default()),
            SettingKey::RewardSettings => Ok(Value::Object(Default::default())),
        }
        .unwrap_or(Value::Null)
    }

    /// Checks that `value` has the shape this key stores.
    fn validate(&self, value: &Value) -> Result<(), ServiceError> {
        let parsed = match self {
            SettingKey::StoreInfo => serde_json::from_value::<StoreInfo>(value.clone()).map(|_| ()),
            SettingKey::OperationalStatus => {
                serde_json::from_value::<OperationalStatus>(value.clone()).map(|_| ())
            }
            SettingKey::RewardSettings if value.is_object() => Ok(()),
            SettingKey::RewardSettings => {
                return Err(ServiceError::ValidationError(
                    "reward_settings must be a JSON object".to_string(),
                ))
            }
        };
        parsed.map_err(|e| ServiceError::ValidationError(format!("Invalid {}: {}", self, e)))
    }
}

/// Gates consulted before checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalStatus {
    #[serde(default = "default_true")]
    pub is_open: bool,
    #[serde(default = "default_true")]
    pub accepting_orders: bool,
}

impl Default for OperationalStatus {
    fn default() -> Self {
        Self {
            is_open: true,
            accepting_orders: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub opening_hours: String,
    pub address: String,
    pub announcement: String,
}

/// Key/value store settings: public read, admin write.
#[derive(Clone)]
pub struct StoreSettingsService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
}

impl StoreSettingsService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_setting(&self, key: SettingKey) -> Result<Value, ServiceError> {
        let row = store_setting::Entity::find_by_id(key.to_string())
            .one(&*self.db)
            .await?;
        Ok(row.map(|r| r.value).unwrap_or_else(|| key.default_value()))
    }

    /// The open/accepting flags. A stored value that no longer parses is
    /// treated as the defaults.
    pub async fn operational_status(&self) -> Result<OperationalStatus, ServiceError> {
        let value = self.get_setting(SettingKey::OperationalStatus).await?;
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Unreadable operational_status setting: {}", e);
            OperationalStatus::default()
        }))
    }

    pub async fn store_info(&self) -> Result<StoreInfo, ServiceError> {
        let value = self.get_setting(SettingKey::StoreInfo).await?;
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Unreadable store_info setting: {}", e);
            StoreInfo::default()
        }))
    }

    #[instrument(skip(self, actor, value))]
    pub async fn update_setting(
        &self,
        actor: Option<&AuthUser>,
        key: SettingKey,
        value: Value,
    ) -> Result<Value, ServiceError> {
        require_admin(actor)?;
        key.validate(&value)?;

        let row = store_setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.clone()),
            updated_at: Set(Utc::now()),
        };

        store_setting::Entity::insert(row)
            .on_conflict(
                OnConflict::column(store_setting::Column::Key)
                    .update_columns([store_setting::Column::Value, store_setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::StoreSettingUpdated(key.to_string()))
                .await;
        }

        info!(key = %key, "Store setting updated");
        Ok(value)
    }
}
