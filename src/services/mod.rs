// Storefront
pub mod commerce;

// Orders and their lifecycle
pub mod order_status;
pub mod orders;

// Global flags consulted at checkout
pub mod store_settings;
