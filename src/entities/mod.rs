//! Relational records persisted through sea-orm.

pub mod category;
pub mod order;
pub mod order_item;
pub mod order_item_addon;
pub mod product;
pub mod product_addon;
pub mod product_variant;
pub mod store_setting;
pub mod variant_addon;
