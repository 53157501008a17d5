use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global add-on catalog entry, shared by every product that offers it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_addons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Trimmed, lowercased `name`; unique across the catalog.
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub normalized_name: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::variant_addon::Entity")]
    VariantAddons,
}

impl Related<super::variant_addon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VariantAddons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
