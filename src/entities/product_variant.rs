use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named size or style of a product. `price_modifier` is signed and is added
/// to the product's base price.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price_modifier: Decimal,
    /// Display order within the product.
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(has_many = "super::variant_addon::Entity")]
    VariantAddons,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::variant_addon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VariantAddons.def()
    }
}

impl Related<super::product_addon::Entity> for Entity {
    fn to() -> RelationDef {
        super::variant_addon::Relation::Addon.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::variant_addon::Relation::Variant.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
