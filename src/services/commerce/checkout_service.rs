use crate::{
    auth::{require_user, AuthUser},
    config::MaterializePolicy,
    errors::ServiceError,
    models::Cart,
    services::{
        commerce::pricing_service::round2,
        orders::{MaterializationReport, OrderService},
        store_settings::StoreSettingsService,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Flat rate applied once to the cart subtotal.
pub const TAX_RATE: Decimal = dec!(0.08);

/// Totals charged for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

impl CheckoutTotals {
    /// `grand_total = round2(subtotal × (1 + TAX_RATE))`; `tax` is the
    /// difference so the parts always add up.
    pub fn for_cart(cart: &Cart) -> Result<Self, ServiceError> {
        let subtotal = cart.subtotal()?;
        let grand_total = subtotal
            .checked_mul(Decimal::ONE + TAX_RATE)
            .map(round2)
            .ok_or_else(|| ServiceError::ValidationError("Cart total is out of range".to_string()))?;
        Ok(Self {
            subtotal,
            tax: grand_total - subtotal,
            grand_total,
        })
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
    pub report: MaterializationReport,
}

/// Checkout service for converting carts to orders
#[derive(Clone)]
pub struct CheckoutService {
    order_service: Arc<OrderService>,
    settings: Arc<StoreSettingsService>,
    policy: MaterializePolicy,
}

impl CheckoutService {
    pub fn new(
        order_service: Arc<OrderService>,
        settings: Arc<StoreSettingsService>,
        policy: MaterializePolicy,
    ) -> Self {
        Self {
            order_service,
            settings,
            policy,
        }
    }

    /// Writes `cart` as an order for the caller. The cart itself is not
    /// touched.
    #[instrument(skip(self, actor, cart), fields(lines = cart.len()))]
    pub async fn place_order(
        &self,
        actor: Option<&AuthUser>,
        cart: &Cart,
    ) -> Result<PlacedOrder, ServiceError> {
        let user = require_user(actor)?;

        if cart.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let status = self.settings.operational_status().await?;
        if !status.is_open {
            warn!(user_id = %user.user_id, "Checkout attempted while store is closed");
            return Err(ServiceError::StoreClosed);
        }
        if !status.accepting_orders {
            warn!(user_id = %user.user_id, "Checkout attempted while orders are paused");
            return Err(ServiceError::NotAcceptingOrders);
        }

        for line in cart.lines() {
            line.verify()?;
        }

        let totals = CheckoutTotals::for_cart(cart)?;
        let report = self
            .order_service
            .materialize(user.user_id, cart.lines(), totals.grand_total, self.policy)
            .await?;

        info!(
            order_id = %report.order_id,
            user_id = %user.user_id,
            grand_total = %totals.grand_total,
            "Order placed"
        );

        Ok(PlacedOrder {
            order_id: report.order_id,
            subtotal: totals.subtotal,
            tax: totals.tax,
            grand_total: totals.grand_total,
            report,
        })
    }

    /// Places the order and empties `cart` only if that succeeded.
    pub async fn checkout_and_clear(
        &self,
        actor: Option<&AuthUser>,
        cart: &mut Cart,
    ) -> Result<PlacedOrder, ServiceError> {
        let placed = self.place_order(actor, cart).await?;
        cart.clear();
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CartLine;

    fn cart_with(lines: &[(Decimal, i64)]) -> Cart {
        let mut cart = Cart::new();
        for (unit, qty) in lines {
            cart.add_line(
                CartLine::new(
                    Uuid::new_v4(),
                    "Item".into(),
                    "Standard".into(),
                    *unit,
                    vec![],
                    *qty,
                )
                .unwrap(),
            )
            .unwrap();
        }
        cart
    }

    #[test]
    fn reference_cart_totals() {
        let totals =
            CheckoutTotals::for_cart(&cart_with(&[(dec!(5.50), 2), (dec!(3.75), 1)])).unwrap();
        assert_eq!(totals.subtotal, dec!(14.75));
        assert_eq!(totals.grand_total, dec!(15.93));
        assert_eq!(totals.tax, dec!(1.18));
    }

    #[test]
    fn tax_is_applied_once_to_the_subtotal() {
        let totals = CheckoutTotals::for_cart(&cart_with(&[
            (dec!(1.00), 1),
            (dec!(1.01), 1),
            (dec!(0.99), 1),
        ]))
        .unwrap();
        assert_eq!(totals.subtotal, dec!(3.00));
        assert_eq!(totals.grand_total, dec!(3.24));
        assert_eq!(totals.subtotal + totals.tax, totals.grand_total);
    }

    #[test]
    fn empty_cart_totals_are_zero() {
        let totals = CheckoutTotals::for_cart(&Cart::new()).unwrap();
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }

    #[test]
    fn totals_near_the_decimal_limit_are_rejected() {
        let json = format!(
            r#"{{"lines":[{{"product_id":"{}","product_name":"Latte","variant_label":"Large","unit_price":"1","quantity":1,"total_price":"{}"}}]}}"#,
            Uuid::nil(),
            Decimal::MAX
        );
        let cart: Cart = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            CheckoutTotals::for_cart(&cart),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
