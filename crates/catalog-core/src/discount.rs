//! # Discount Calculator
//!
//! Computes the final price of a product under a discount specification and
//! enforces the $0.01 price floor.
//!
//! ## Rules
//! - Percent: `price * (1 - value/100)`, rounded half-up to whole cents.
//! - Fixed: `price - value`, no further rounding (both are already exact
//!   cent amounts).
//! - Post-condition checked by callers on every apply path: the result must
//!   be at least $0.01, otherwise the operation fails with `InvalidPrice`.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::money::{Money, MIN_FINAL_PRICE};

/// A discount specification, independent of where it came from
/// (coupon or direct application).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discount {
    /// Whole-percent cut, value ∈ [1, 80] enforced at creation time.
    Percent(i64),
    /// Fixed amount subtracted from the price.
    Fixed(Money),
}

/// Computes the price after applying `discount` to `price`.
///
/// Does NOT enforce the floor; see [`check_floor`]. Keeping computation and
/// enforcement separate lets read paths recompute displayed prices without
/// re-raising errors for records that were valid when written.
///
/// ## Example
/// ```rust
/// use catalog_core::discount::{final_price, Discount};
/// use catalog_core::money::Money;
///
/// let price = Money::from_cents(10000); // $100.00
/// assert_eq!(final_price(price, &Discount::Percent(10)).cents(), 9000);
/// assert_eq!(
///     final_price(price, &Discount::Fixed(Money::from_cents(2500))).cents(),
///     7500
/// );
/// ```
pub fn final_price(price: Money, discount: &Discount) -> Money {
    match discount {
        Discount::Percent(percent) => price.apply_percent_discount(*percent),
        Discount::Fixed(amount) => price - *amount,
    }
}

/// Enforces the $0.01 floor on a computed final price.
pub fn check_floor(price: Money) -> DomainResult<Money> {
    if price < MIN_FINAL_PRICE {
        return Err(DomainError::InvalidPrice(format!(
            "final price after discount cannot be less than $0.01 (got {price})"
        )));
    }
    Ok(price)
}

// =============================================================================
// Unit Tests
// =============================================================================
