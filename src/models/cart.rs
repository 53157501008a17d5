use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ServiceError, services::commerce::pricing_service::line_total};

/// Add-on copied into a cart line at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAddon {
    pub name: String,
    pub price: Decimal,
}

/// One configured and priced entry in the cart.
///
/// Names and prices are snapshots. `unit_price` never changes once the line
/// exists; `total_price` is recomputed from it whenever the quantity does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub variant_label: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub addons: Vec<SelectedAddon>,
    #[serde(default)]
    pub addon_display: String,
    pub quantity: i64,
    pub total_price: Decimal,
}

impl CartLine {
    pub fn new(
        product_id: Uuid,
        product_name: String,
        variant_label: String,
        unit_price: Decimal,
        addons: Vec<SelectedAddon>,
        quantity: i64,
    ) -> Result<Self, ServiceError> {
        let total_price = line_total(unit_price, quantity)?;
        let addon_display = display_addons(&addons);

        Ok(Self {
            product_id,
            product_name,
            variant_label,
            unit_price,
            addons,
            addon_display,
            quantity,
            total_price,
        })
    }

    /// Checks that a line received from a client is internally consistent:
    /// quantity in range, total derived from unit price and quantity, and the
    /// display string derived from the add-ons.
    pub fn verify(&self) -> Result<(), ServiceError> {
        let expected = line_total(self.unit_price, self.quantity)?;
        if self.total_price != expected {
            return Err(ServiceError::ValidationError(format!(
                "Line total for {} does not match its price and quantity",
                self.product_name
            )));
        }
        if self.addon_display != display_addons(&self.addons) {
            return Err(ServiceError::ValidationError(format!(
                "Add-ons for {} do not match their description",
                self.product_name
            )));
        }
        Ok(())
    }

    /// Lines with the same product, variant label and add-on display are one
    /// configuration.
    pub fn same_configuration(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id
            && self.variant_label == other.variant_label
            && self.addon_display == other.addon_display
    }

    /// A copy of this line at another quantity, total recomputed.
    pub fn with_quantity(&self, quantity: i64) -> Result<CartLine, ServiceError> {
        let total_price = line_total(self.unit_price, quantity)?;
        Ok(CartLine {
            quantity,
            total_price,
            ..self.clone()
        })
    }
}

fn display_addons(addons: &[SelectedAddon]) -> String {
    addons
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered cart lines. Position is the only identity a line has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Merges into an existing line with the same configuration, otherwise
    /// appends.
    pub fn add_line(&mut self, line: CartLine) -> Result<(), ServiceError> {
        if line.quantity < 1 {
            return Err(ServiceError::InvalidQuantity(line.quantity));
        }

        match self.lines.iter().position(|l| l.same_configuration(&line)) {
            Some(idx) => {
                let existing = &self.lines[idx];
                let quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or(ServiceError::InvalidQuantity(line.quantity))?;
                let merged = existing.with_quantity(quantity)?;
                self.lines[idx] = merged;
            }
            None => self.lines.push(line.with_quantity(line.quantity)?),
        }
        Ok(())
    }

    /// Sets the quantity of line `index`. Zero or less removes the line.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> Result<(), ServiceError> {
        let line = self
            .lines
            .get(index)
            .ok_or(ServiceError::CartLineNotFound(index))?;

        if quantity <= 0 {
            self.lines.remove(index);
        } else {
            let replaced = line.with_quantity(quantity)?;
            self.lines[index] = replaced;
        }
        Ok(())
    }

    /// Increments or decrements line `index` by `delta`.
    pub fn adjust_quantity(&mut self, index: usize, delta: i64) -> Result<(), ServiceError> {
        let current = self
            .lines
            .get(index)
            .ok_or(ServiceError::CartLineNotFound(index))?
            .quantity;
        self.set_quantity(index, current.saturating_add(delta))
    }

    pub fn remove_line(&mut self, index: usize) -> Result<CartLine, ServiceError> {
        if index >= self.lines.len() {
            return Err(ServiceError::CartLineNotFound(index));
        }
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_items(&self) -> Result<i64, ServiceError> {
        self.lines.iter().try_fold(0i64, |acc, l| {
            acc.checked_add(l.quantity)
                .ok_or(ServiceError::InvalidQuantity(l.quantity))
        })
    }

    /// Sum of the already-rounded line totals.
    pub fn subtotal(&self) -> Result<Decimal, ServiceError> {
        self.lines.iter().try_fold(Decimal::ZERO, |acc, l| {
            acc.checked_add(l.total_price)
                .ok_or_else(|| ServiceError::ValidationError("Cart total is out of range".to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::commerce::pricing_service::MAX_LINE_QUANTITY;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn line(product_id: Uuid, variant: &str, addons: &[(&str, Decimal)], unit: Decimal, qty: i64) -> CartLine {
        CartLine::new(
            product_id,
            "Latte".into(),
            variant.into(),
            unit,
            addons
                .iter()
                .map(|(name, price)| SelectedAddon {
                    name: name.to_string(),
                    price: *price,
                })
                .collect(),
            qty,
        )
        .unwrap()
    }

    #[test]
    fn identical_configuration_merges() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add_line(line(product, "Large", &[("Oat Milk", dec!(0.75))], dec!(6.25), 1))
            .unwrap();
        cart.add_line(line(product, "Large", &[("Oat Milk", dec!(0.75))], dec!(6.25), 2))
            .unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[0].total_price, dec!(18.75));
    }

    #[test]
    fn merge_keeps_existing_unit_price() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add_line(line(product, "Large", &[], dec!(5.00), 1)).unwrap();
        // Catalog price changed since the first add.
        cart.add_line(line(product, "Large", &[], dec!(5.50), 1)).unwrap();

        assert_eq!(cart.lines()[0].unit_price, dec!(5.00));
        assert_eq!(cart.lines()[0].total_price, dec!(10.00));
    }

    #[test]
    fn different_configurations_append_in_order() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add_line(line(product, "Small", &[], dec!(4.00), 1)).unwrap();
        cart.add_line(line(product, "Large", &[], dec!(5.00), 1)).unwrap();
        cart.add_line(line(product, "Large", &[("Vanilla", dec!(0.50))], dec!(5.50), 1))
            .unwrap();

        let labels: Vec<_> = cart
            .lines()
            .iter()
            .map(|l| (l.variant_label.as_str(), l.addon_display.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("Small", ""), ("Large", ""), ("Large", "Vanilla")]
        );
    }

    #[test]
    fn set_quantity_recomputes_or_removes() {
        let mut cart = Cart::new();
        cart.add_line(line(Uuid::new_v4(), "Standard", &[], dec!(3.75), 1))
            .unwrap();

        cart.set_quantity(0, 4).unwrap();
        assert_eq!(cart.lines()[0].total_price, dec!(15.00));

        cart.set_quantity(0, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn adjust_quantity_round_trip_restores_total() {
        let mut cart = Cart::new();
        cart.add_line(line(Uuid::new_v4(), "Standard", &[], dec!(3.33), 2))
            .unwrap();
        let before = cart.subtotal().unwrap();

        cart.adjust_quantity(0, 3).unwrap();
        cart.adjust_quantity(0, -3).unwrap();

        assert_eq!(cart.subtotal().unwrap(), before);
        cart.adjust_quantity(0, -2).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let mut cart = Cart::new();
        assert_matches!(cart.set_quantity(0, 1), Err(ServiceError::CartLineNotFound(0)));
        assert_matches!(cart.remove_line(3), Err(ServiceError::CartLineNotFound(3)));
        assert_matches!(cart.adjust_quantity(1, 1), Err(ServiceError::CartLineNotFound(1)));
    }

    #[test]
    fn totals_match_reference_cart() {
        let mut cart = Cart::new();
        cart.add_line(line(Uuid::new_v4(), "Large", &[], dec!(5.50), 2)).unwrap();
        cart.add_line(line(Uuid::new_v4(), "Standard", &[], dec!(3.75), 1))
            .unwrap();

        assert_eq!(cart.total_items().unwrap(), 3);
        assert_eq!(cart.subtotal().unwrap(), dec!(14.75));

        cart.clear();
        assert_eq!(cart.subtotal().unwrap(), Decimal::ZERO);
        assert_eq!(cart.total_items().unwrap(), 0);
    }

    #[test]
    fn merging_past_the_quantity_limit_is_rejected() {
        let product = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add_line(line(product, "Large", &[], dec!(5.00), MAX_LINE_QUANTITY))
            .unwrap();

        assert_matches!(
            cart.add_line(line(product, "Large", &[], dec!(5.00), 1)),
            Err(ServiceError::InvalidQuantity(_))
        );
        assert_eq!(cart.lines()[0].quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn huge_quantities_are_rejected_without_overflow() {
        let product = Uuid::new_v4();
        let mut huge = line(product, "Large", &[], dec!(5.00), 1);
        huge.quantity = i64::MAX;

        let mut cart = Cart::new();
        assert_matches!(
            cart.add_line(huge.clone()),
            Err(ServiceError::InvalidQuantity(_))
        );

        cart.add_line(line(product, "Large", &[], dec!(5.00), 1)).unwrap();
        assert_matches!(cart.add_line(huge), Err(ServiceError::InvalidQuantity(_)));
    }

    #[test]
    fn oversized_totals_are_errors_not_panics() {
        let json = format!(
            r#"{{"lines":[{l},{l}]}}"#,
            l = format!(
                r#"{{"product_id":"{}","product_name":"Latte","variant_label":"Large","unit_price":"1","quantity":1,"total_price":"{}"}}"#,
                Uuid::nil(),
                Decimal::MAX
            )
        );
        let cart: Cart = serde_json::from_str(&json).unwrap();
        assert_matches!(cart.subtotal(), Err(ServiceError::ValidationError(_)));

        let json = format!(
            r#"{{"lines":[{l},{l}]}}"#,
            l = format!(
                r#"{{"product_id":"{}","product_name":"Latte","variant_label":"Large","unit_price":"1","quantity":{},"total_price":"1"}}"#,
                Uuid::nil(),
                i64::MAX
            )
        );
        let cart: Cart = serde_json::from_str(&json).unwrap();
        assert_matches!(cart.total_items(), Err(ServiceError::InvalidQuantity(_)));
    }

    #[test]
    fn verify_catches_edited_lines() {
        let good = line(Uuid::new_v4(), "Large", &[("Oat Milk", dec!(0.75))], dec!(5.00), 100);
        assert!(good.verify().is_ok());

        let mut cheap = good.clone();
        cheap.total_price = dec!(0.01);
        assert_matches!(cheap.verify(), Err(ServiceError::ValidationError(_)));

        let mut relabelled = good.clone();
        relabelled.addon_display = String::new();
        assert_matches!(relabelled.verify(), Err(ServiceError::ValidationError(_)));

        let mut zero = good;
        zero.quantity = 0;
        assert_matches!(zero.verify(), Err(ServiceError::InvalidQuantity(0)));
    }

    #[test]
    fn cart_survives_json_round_trip() {
        let mut cart = Cart::new();
        cart.add_line(line(Uuid::new_v4(), "Large", &[("Oat Milk", dec!(0.75))], dec!(6.25), 2))
            .unwrap();
        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
