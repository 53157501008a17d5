//! Property-based tests for pricing, cart merging and checkout totals.
//!
//! These tests use proptest to check the money rules over a wide range of
//! prices and quantities.

use nowa_api::{
    models::{
        cart::{Cart, CartLine, SelectedAddon},
        AddonOption, ProductConfiguration, VariantOption,
    },
    services::commerce::{
        pricing_service::{line_total, price_selection, round2, unit_price},
        CheckoutTotals, Selection,
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

// Strategies for generating test data
fn cents_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn signed_cents_strategy() -> impl Strategy<Value = Decimal> {
    (-5_000i64..5_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn quantity_strategy() -> impl Strategy<Value = i64> {
    1i64..50
}

fn line_strategy() -> impl Strategy<Value = (usize, Decimal, i64)> {
    (0usize..4, cents_strategy(), quantity_strategy())
}

fn make_line(product_id: Uuid, variant: &str, unit: Decimal, qty: i64) -> CartLine {
    CartLine::new(
        product_id,
        "Drink".into(),
        variant.into(),
        unit,
        vec![SelectedAddon {
            name: "Oat Milk".into(),
            price: Decimal::new(75, 2),
        }],
        qty,
    )
    .expect("valid line")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn unit_price_is_exact_sum(
        base in cents_strategy(),
        modifier in signed_cents_strategy(),
        addons in prop::collection::vec(cents_strategy(), 0..5),
    ) {
        let expected = base + modifier + addons.iter().copied().sum::<Decimal>();
        prop_assert_eq!(unit_price(base, Some(modifier), &addons), expected);
        prop_assert_eq!(
            unit_price(base, None, &addons),
            base + addons.iter().copied().sum::<Decimal>()
        );
    }

    #[test]
    fn line_total_has_at_most_two_decimals(unit in cents_strategy(), qty in quantity_strategy()) {
        let total = line_total(unit, qty).unwrap();
        prop_assert!(total.scale() <= 2);
        prop_assert_eq!(total, round2(unit * Decimal::from(qty)));
    }

    #[test]
    fn non_positive_quantities_are_rejected(unit in cents_strategy(), qty in -100i64..1) {
        prop_assert!(line_total(unit, qty).is_err());
    }

    #[test]
    fn quantity_round_trip_restores_total(
        unit in cents_strategy(),
        qty in quantity_strategy(),
        delta in 1i64..100,
    ) {
        let mut cart = Cart::new();
        cart.add_line(make_line(Uuid::new_v4(), "Large", unit, qty)).unwrap();
        let before = cart.lines()[0].total_price;

        cart.adjust_quantity(0, delta).unwrap();
        cart.adjust_quantity(0, -delta).unwrap();

        prop_assert_eq!(cart.lines()[0].quantity, qty);
        prop_assert_eq!(cart.lines()[0].total_price, before);
    }

    #[test]
    fn merging_preserves_items_and_subtotal(lines in prop::collection::vec(line_strategy(), 1..20)) {
        let product_id = Uuid::new_v4();
        let variants = ["Small", "Medium", "Large", "Kids"];

        // One price per configuration, as it would be after a quote.
        let mut cart = Cart::new();
        let mut prices: [Option<Decimal>; 4] = [None; 4];
        let mut expected_items = 0i64;
        for (variant_idx, price, qty) in &lines {
            let unit = *prices[*variant_idx].get_or_insert(*price);
            cart.add_line(make_line(product_id, variants[*variant_idx], unit, *qty)).unwrap();
            expected_items += qty;
        }

        let distinct = prices.iter().filter(|p| p.is_some()).count();
        prop_assert_eq!(cart.len(), distinct);
        prop_assert_eq!(cart.total_items().unwrap(), expected_items);

        for line in cart.lines() {
            prop_assert_eq!(line.total_price, line_total(line.unit_price, line.quantity).unwrap());
        }
        prop_assert_eq!(
            cart.subtotal().unwrap(),
            cart.lines().iter().map(|l| l.total_price).sum::<Decimal>()
        );
    }

    #[test]
    fn checkout_totals_add_up(lines in prop::collection::vec(line_strategy(), 0..10)) {
        let mut cart = Cart::new();
        for (idx, (_, price, qty)) in lines.iter().enumerate() {
            cart.add_line(make_line(Uuid::new_v4(), &format!("v{}", idx), *price, *qty)).unwrap();
        }

        let totals = CheckoutTotals::for_cart(&cart).unwrap();
        prop_assert_eq!(totals.subtotal + totals.tax, totals.grand_total);
        prop_assert!(totals.grand_total.scale() <= 2);
        prop_assert!(totals.tax >= Decimal::ZERO);
        prop_assert_eq!(totals.grand_total, round2(totals.subtotal * Decimal::new(108, 2)));
    }

    #[test]
    fn quoted_lines_ignore_repeated_addons(
        base in cents_strategy(),
        modifier in signed_cents_strategy(),
        addon_price in cents_strategy(),
        repeats in 1usize..5,
        qty in quantity_strategy(),
    ) {
        let addon_id = Uuid::new_v4();
        let variant_id = Uuid::new_v4();
        let config = ProductConfiguration {
            product_id: Uuid::new_v4(),
            name: "Latte".into(),
            base_price: base,
            is_available: true,
            variants: vec![VariantOption {
                id: variant_id,
                name: "Large".into(),
                price_modifier: modifier,
                addon_ids: vec![addon_id],
            }],
            addons: vec![AddonOption {
                id: addon_id,
                name: "Extra Shot".into(),
                price: addon_price,
            }],
        };

        let line = price_selection(
            &config,
            &Selection {
                variant_id: Some(variant_id),
                addon_ids: vec![addon_id; repeats],
                quantity: qty,
            },
        )
        .unwrap();

        prop_assert_eq!(line.unit_price, base + modifier + addon_price);
        prop_assert_eq!(line.addons.len(), 1);
        prop_assert_eq!(line.total_price, round2(line.unit_price * Decimal::from(qty)));
    }
}
