//! Domain types that are not rows of their own.

pub mod cart;
pub mod catalog;
pub mod order_status;

pub use cart::{Cart, CartLine, SelectedAddon};
pub use catalog::{AddonOption, ProductConfiguration, VariantOption};
pub use order_status::OrderStatus;
