//! Storefront services: catalog, pricing, cart and checkout.
pub mod cart_service;
pub mod cart_store;
pub mod checkout_service;
pub mod pricing_service;
pub mod product_catalog_service;

pub use cart_service::CartService;
pub use cart_store::{CartStore, FileCartStore, InMemoryCartStore, DEFAULT_CART_KEY};
pub use checkout_service::{CheckoutService, CheckoutTotals, PlacedOrder, TAX_RATE};
pub use pricing_service::{PricingService, Selection};
pub use product_catalog_service::{ProductCatalogService, ProductDetail};
