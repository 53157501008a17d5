use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::ServiceError;

/// Label shown for a cart line when the product has no variant selected.
pub const DEFAULT_VARIANT_LABEL: &str = "Standard";

/// Canonical form used for case-insensitive name comparisons.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_decimal_min_zero(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn find_duplicate<'a, I>(existing: I, incoming: &str, editing_index: Option<usize>) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let wanted = normalize_name(incoming);
    existing
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != editing_index)
        .any(|(_, name)| normalize_name(name) == wanted)
}

/// Rejects `incoming` when it matches one of `existing` ignoring case and
/// surrounding whitespace. `editing_index` names the entry being renamed so it
/// does not collide with itself.
pub fn validate_variant_name<'a, I>(
    existing: I,
    incoming: &str,
    editing_index: Option<usize>,
) -> Result<(), ServiceError>
where
    I: IntoIterator<Item = &'a str>,
{
    if find_duplicate(existing, incoming, editing_index) {
        return Err(ServiceError::DuplicateVariantName(incoming.trim().to_string()));
    }
    Ok(())
}

/// Same rule as [`validate_variant_name`] for add-on names.
pub fn validate_addon_name<'a, I>(
    existing: I,
    incoming: &str,
    editing_index: Option<usize>,
) -> Result<(), ServiceError>
where
    I: IntoIterator<Item = &'a str>,
{
    if find_duplicate(existing, incoming, editing_index) {
        return Err(ServiceError::DuplicateAddonName(incoming.trim().to_string()));
    }
    Ok(())
}

/// A variant as submitted by staff.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct VariantInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[serde(default)]
    pub price_modifier: Decimal,
}

/// An add-on as submitted by staff. The price only applies when the name is
/// new to the global catalog.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct AddonInput {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(custom = "validate_decimal_min_zero")]
    #[serde(default)]
    pub price: Decimal,
}

/// Full product form: attributes plus the complete variant and add-on sets.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom = "validate_decimal_min_zero")]
    pub base_price: Decimal,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
    #[serde(default)]
    pub addons: Vec<AddonInput>,
}

fn default_available() -> bool {
    true
}

impl ProductInput {
    /// Field validation plus the uniqueness rules for the variant and add-on
    /// sets, each entry checked against every other entry in its set.
    pub fn validate_sets(&self) -> Result<(), ServiceError> {
        self.validate()?;

        for variant in &self.variants {
            variant.validate()?;
        }
        for addon in &self.addons {
            addon.validate()?;
        }

        let variant_names: Vec<&str> = self.variants.iter().map(|v| v.name.as_str()).collect();
        for (idx, name) in variant_names.iter().enumerate() {
            validate_variant_name(variant_names.iter().copied(), name, Some(idx))?;
        }

        let addon_names: Vec<&str> = self.addons.iter().map(|a| a.name.as_str()).collect();
        for (idx, name) in addon_names.iter().enumerate() {
            validate_addon_name(addon_names.iter().copied(), name, Some(idx))?;
        }

        Ok(())
    }
}

/// One purchasable variant and the add-ons linked to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOption {
    pub id: Uuid,
    pub name: String,
    pub price_modifier: Decimal,
    pub addon_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonOption {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// Everything the pricing engine needs to know about one product.
///
/// `addons` is the union of the add-ons linked to any of the product's
/// variants, in first-seen order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConfiguration {
    pub product_id: Uuid,
    pub name: String,
    pub base_price: Decimal,
    pub is_available: bool,
    pub variants: Vec<VariantOption>,
    pub addons: Vec<AddonOption>,
}

impl ProductConfiguration {
    pub fn variant(&self, id: Uuid) -> Option<&VariantOption> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn addon(&self, id: Uuid) -> Option<&AddonOption> {
        self.addons.iter().find(|a| a.id == id)
    }
}
