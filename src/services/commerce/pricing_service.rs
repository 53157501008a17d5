use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{
        cart::{CartLine, SelectedAddon},
        catalog::DEFAULT_VARIANT_LABEL,
        ProductConfiguration,
    },
    services::commerce::product_catalog_service::ProductCatalogService,
};

/// Largest quantity a single line may carry. Stored order items hold an
/// `i32` quantity.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Rounds half away from zero to cents.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `base + modifier + Σ add-ons`. Not floored at zero: a large negative
/// modifier yields a negative unit price.
pub fn unit_price(base_price: Decimal, price_modifier: Option<Decimal>, addon_prices: &[Decimal]) -> Decimal {
    base_price + price_modifier.unwrap_or(Decimal::ZERO) + addon_prices.iter().copied().sum::<Decimal>()
}

/// `round2(unit_price × quantity)`. Rounding happens once, here.
pub fn line_total(unit_price: Decimal, quantity: i64) -> Result<Decimal, ServiceError> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(ServiceError::InvalidQuantity(quantity));
    }
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(round2)
        .ok_or_else(|| ServiceError::ValidationError("Line total is out of range".to_string()))
}

/// What a customer picked in the customization dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
    pub quantity: i64,
}

/// Prices a selection against a product configuration, producing a cart
/// line whose prices are fixed from now on.
///
/// Add-ons are checked against every add-on the product offers, not only
/// those linked to the chosen variant. Repeated add-on ids count once.
pub fn price_selection(
    config: &ProductConfiguration,
    selection: &Selection,
) -> Result<CartLine, ServiceError> {
    if selection.quantity < 1 {
        return Err(ServiceError::InvalidQuantity(selection.quantity));
    }

    let variant = selection
        .variant_id
        .map(|id| config.variant(id).ok_or(ServiceError::UnknownVariant(id)))
        .transpose()?;
    if variant.is_none() && !config.variants.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "A size must be chosen for {}",
            config.name
        )));
    }

    let mut addons: Vec<SelectedAddon> = Vec::with_capacity(selection.addon_ids.len());
    let mut seen: Vec<Uuid> = Vec::with_capacity(selection.addon_ids.len());
    for id in &selection.addon_ids {
        if seen.contains(id) {
            continue;
        }
        let addon = config.addon(*id).ok_or(ServiceError::UnknownAddon(*id))?;
        seen.push(*id);
        addons.push(SelectedAddon {
            name: addon.name.clone(),
            price: addon.price,
        });
    }

    let addon_prices: Vec<Decimal> = addons.iter().map(|a| a.price).collect();
    let unit = unit_price(
        config.base_price,
        variant.map(|v| v.price_modifier),
        &addon_prices,
    );

    let variant_label = variant
        .map(|v| v.name.clone())
        .unwrap_or_else(|| DEFAULT_VARIANT_LABEL.to_string());

    CartLine::new(
        config.product_id,
        config.name.clone(),
        variant_label,
        unit,
        addons,
        selection.quantity,
    )
}

/// Loads the live configuration of a product and prices a selection
/// against it.
#[derive(Clone)]
pub struct PricingService {
    catalog: Arc<ProductCatalogService>,
}

impl PricingService {
    pub fn new(catalog: Arc<ProductCatalogService>) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self))]
    pub async fn quote(&self, product_id: Uuid, selection: &Selection) -> Result<CartLine, ServiceError> {
        let config = self.catalog.product_configuration(product_id).await?;
        if !config.is_available {
            return Err(ServiceError::ValidationError(format!(
                "{} is currently unavailable",
                config.name
            )));
        }
        price_selection(&config, selection)
    }
}
