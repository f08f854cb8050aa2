//! # Domain Types
//!
//! Entities owned by the catalog: products, coupons, and the discount
//! application records linking them.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product  ── created on product-create                                  │
//! │           ── mutated on patch / discount-apply / soft-delete / restore  │
//! │           ── never hard-deleted (deleted_at set instead)                │
//! │                                                                         │
//! │  Coupon   ── usage tracked by uses_count (0 ≤ count ≤ effective cap)    │
//! │           ── one_shot == true forces max_uses == NULL (cap of 1)        │
//! │                                                                         │
//! │  Application records ── created on apply, closed (removed_at set)       │
//! │           on removal, material coupon edit, or product price change;    │
//! │           never physically deleted                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::discount::Discount;
use crate::money::Money;

// =============================================================================
// Coupon
// =============================================================================

/// The two coupon flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum CouponKind {
    /// Takes a whole-percent cut of the price (value ∈ [1, 80]).
    Percent,
    /// Subtracts a fixed amount of cents from the price (value > 0).
    Fixed,
}

/// A discount coupon.
///
/// `value` is interpreted per `kind`: whole percent for [`CouponKind::Percent`],
/// cents for [`CouponKind::Fixed`]. Use [`Coupon::discount`] for the typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: i64,
    /// Normalized, unique code (see [`crate::normalize::normalize`]).
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    /// A one-shot coupon is usable at most once in total.
    pub one_shot: bool,
    /// Optional usage cap; mutually exclusive with `one_shot`.
    pub max_uses: Option<i64>,
    /// Times this coupon is currently applied. Never negative, never above
    /// the effective cap.
    pub uses_count: i64,
    /// Validity window: `[valid_from, valid_until)`.
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft-delete marker; `None` means active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// The typed discount this coupon grants.
    pub fn discount(&self) -> Discount {
        match self.kind {
            CouponKind::Percent => Discount::Percent(self.value),
            CouponKind::Fixed => Discount::Fixed(Money::from_cents(self.value)),
        }
    }

    /// True when the coupon has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A priced catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    /// Display name: trimmed, internal whitespace collapsed, case preserved.
    pub name: String,
    /// Uniqueness key derived from `name` (diacritic-stripped, lower-cased).
    pub normalized_name: String,
    pub description: Option<String>,
    pub price_cents: Money,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Soft-delete marker; `None` means active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// True when the product has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Derived flag: a product with no stock left.
    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }
}

// =============================================================================
// Discount Applications
// =============================================================================

/// Records a coupon's attachment to a product.
///
/// At most one row per product may have `removed_at == NULL` at any time
/// (the "active application" invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductCouponApplication {
    pub id: i64,
    pub product_id: i64,
    pub coupon_id: i64,
    pub applied_at: DateTime<Utc>,
    /// `None` while the application is active.
    pub removed_at: Option<DateTime<Utc>>,
}

/// A standalone percent discount on a product, with no coupon involved.
///
/// Same active/removed pattern as [`ProductCouponApplication`]; a product may
/// carry at most one active discount in total, of either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductDirectDiscountApplication {
    pub id: i64,
    pub product_id: i64,
    /// Whole percent, constrained to [1, 80].
    pub percent: i64,
    pub applied_at: DateTime<Utc>,
    /// `None` while the application is active.
    pub removed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_coupon(kind: CouponKind, value: i64) -> Coupon {
        Coupon {
            id: 1,
            code: "promo".into(),
            kind,
            value,
            one_shot: false,
            max_uses: None,
            uses_count: 0,
            valid_from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            valid_until: Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_coupon_kind_serde_lowercase() {
        assert_eq!(serde_json::to_string(&CouponKind::Percent).unwrap(), "\"percent\"");
        assert_eq!(serde_json::to_string(&CouponKind::Fixed).unwrap(), "\"fixed\"");
        let kind: CouponKind = serde_json::from_str("\"fixed\"").unwrap();
        assert_eq!(kind, CouponKind::Fixed);
    }

    #[test]
    fn test_coupon_typed_discount() {
        assert_eq!(
            sample_coupon(CouponKind::Percent, 10).discount(),
            Discount::Percent(10)
        );
        assert_eq!(
            sample_coupon(CouponKind::Fixed, 500).discount(),
            Discount::Fixed(Money::from_cents(500))
        );
    }

    #[test]
    fn test_product_out_of_stock_is_derived() {
        let mut product = Product {
            id: 1,
            name: "Coffee".into(),
            normalized_name: "coffee".into(),
            description: None,
            price_cents: Money::from_cents(1000),
            stock: 3,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
            deleted_at: None,
        };
        assert!(!product.is_out_of_stock());
        product.stock = 0;
        assert!(product.is_out_of_stock());
    }
}
