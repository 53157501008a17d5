pub mod checkout;
pub mod common;
pub mod health;
pub mod menu;
pub mod orders;
pub mod products;
pub mod settings;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        commerce::{
            CartService, CartStore, CheckoutService, PricingService, ProductCatalogService,
        },
        order_status::OrderStatusService,
        orders::OrderService,
        store_settings::StoreSettingsService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub product_catalog: Arc<ProductCatalogService>,
    pub pricing: Arc<PricingService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub order: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub settings: Arc<StoreSettingsService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        cart_store: Arc<dyn CartStore>,
        config: &AppConfig,
    ) -> Self {
        let product_catalog = Arc::new(ProductCatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let pricing = Arc::new(PricingService::new(product_catalog.clone()));
        let settings = Arc::new(StoreSettingsService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let order = Arc::new(OrderService::new(
            db_pool.clone(),
            Some(event_sender.clone()),
        ));
        let order_status = Arc::new(OrderStatusService::new(
            db_pool,
            Some(event_sender),
            config.enforce_status_transitions,
        ));
        let checkout = Arc::new(CheckoutService::new(
            order.clone(),
            settings.clone(),
            config.materialize_policy,
        ));
        let cart = Arc::new(CartService::new(cart_store));

        Self {
            product_catalog,
            pricing,
            cart,
            checkout,
            order,
            order_status,
            settings,
        }
    }
}
