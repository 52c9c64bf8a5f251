//! Variant price derivation

use rust_decimal::Decimal;

use crate::models::Variant;

/// Price charged for a variant
///
/// The variant's own price wins unless it is exactly zero, in which case the
/// product's base price applies. Never persisted; recomputed on every read so
/// base price changes propagate.
pub fn effective_price(variant: &Variant, base_price: Decimal) -> Decimal {
    if variant.price.is_zero() {
        base_price
    } else {
        variant.price
    }
}
