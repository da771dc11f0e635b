//! Pure pricing calculator.
//!
//! Turns a cart item list into a monetary breakdown. The breakdown is
//! recomputed in full on every change to the items rather than patched
//! incrementally, so displayed totals can never drift apart between the
//! cart and checkout views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lakshmi_core::Money;

use crate::cart::CartItem;

/// Orders at or above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::new(Decimal::from_parts(500, 0, 0, false, 0));

/// Flat shipping fee below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Money = Money::new(Decimal::from_parts(50, 0, 0, false, 0));

/// GST rate applied to the subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Monetary breakdown of a cart. Derived, never cached across mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    /// Sum of unit price times quantity over all lines.
    pub subtotal: Money,
    /// Zero at or above the free-shipping threshold, else the flat fee.
    pub shipping_cost: Money,
    /// Tax on the subtotal, rounded half-up to the minor unit.
    pub tax_amount: Money,
    /// `subtotal + shipping_cost + tax_amount`.
    pub total: Money,
}

/// Compute the monetary breakdown for a list of cart items.
///
/// Uses the snapshot prices already stored on the items; prices are never
/// re-fetched here. No side effects.
#[must_use]
pub fn price(items: &[CartItem]) -> PricingBreakdown {
    let subtotal: Money = items.iter().map(CartItem::line_total).sum();

    let shipping_cost = if subtotal >= FREE_SHIPPING_THRESHOLD {
        Money::ZERO
    } else {
        FLAT_SHIPPING_FEE
    };

    let tax_amount = subtotal.mul_rate(TAX_RATE).round_minor();

    PricingBreakdown {
        subtotal,
        shipping_cost,
        tax_amount,
        total: subtotal + shipping_cost + tax_amount,
    }
}
