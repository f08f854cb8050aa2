//! # Caller-Visible Result Shapes
//!
//! DTOs returned by the services. The HTTP layer (external to this crate)
//! serializes these as-is.
//!
//! ## Why DTOs?
//! - Decouples internal domain model from the caller contract
//! - Allows selective field exposure (a summary hides `uses_count`)
//! - Handles serde rename to camelCase for JS consumption

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::discount::{final_price, Discount};
use crate::money::Money;
use crate::types::{Coupon, CouponKind, Product};

// =============================================================================
// Coupon Views
// =============================================================================

/// Public coupon shape, without usage internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSummary {
    pub id: i64,
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub one_shot: bool,
    pub max_uses: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl From<&Coupon> for CouponSummary {
    fn from(coupon: &Coupon) -> Self {
        CouponSummary {
            id: coupon.id,
            code: coupon.code.clone(),
            kind: coupon.kind,
            value: coupon.value,
            one_shot: coupon.one_shot,
            max_uses: coupon.max_uses,
            valid_from: coupon.valid_from,
            valid_until: coupon.valid_until,
        }
    }
}

/// Full coupon shape: summary plus usage counter and audit timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDetails {
    pub id: i64,
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub one_shot: bool,
    pub max_uses: Option<i64>,
    pub uses_count: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&Coupon> for CouponDetails {
    fn from(coupon: &Coupon) -> Self {
        CouponDetails {
            id: coupon.id,
            code: coupon.code.clone(),
            kind: coupon.kind,
            value: coupon.value,
            one_shot: coupon.one_shot,
            max_uses: coupon.max_uses,
            uses_count: coupon.uses_count,
            valid_from: coupon.valid_from,
            valid_until: coupon.valid_until,
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
            deleted_at: coupon.deleted_at,
        }
    }
}

// =============================================================================
// Product Views
// =============================================================================

/// Plain product shape, no discount decoration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Money,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        ProductSummary {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price_cents: product.price_cents,
            stock: product.stock,
            created_at: product.created_at,
            updated_at: product.updated_at,
            deleted_at: product.deleted_at,
        }
    }
}

/// The discount block shown on a decorated product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub kind: CouponKind,
    /// Whole percent for `percent`, cents for `fixed`.
    pub value: i64,
    pub applied_at: DateTime<Utc>,
}

impl AppliedDiscount {
    /// The typed discount this block describes.
    pub fn discount(&self) -> Discount {
        match self.kind {
            CouponKind::Percent => Discount::Percent(self.value),
            CouponKind::Fixed => Discount::Fixed(Money::from_cents(self.value)),
        }
    }
}

/// Product decorated with its active discount, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDiscountView {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub stock: i64,
    /// Derived: `stock <= 0`.
    pub is_out_of_stock: bool,
    pub price_cents: Money,
    /// Price after the active discount; equals `price_cents` when none.
    pub final_price_cents: Money,
    pub discount: Option<AppliedDiscount>,
    pub has_coupon_applied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductDiscountView {
    /// Decorates `product` with at most one active discount.
    ///
    /// `has_coupon_applied` distinguishes a coupon-backed discount from a
    /// direct one; it is only meaningful when `discount` is `Some`.
    pub fn decorate(
        product: &Product,
        discount: Option<AppliedDiscount>,
        has_coupon_applied: bool,
    ) -> Self {
        let final_price_cents = match &discount {
            Some(applied) => final_price(product.price_cents, &applied.discount()),
            None => product.price_cents,
        };

        ProductDiscountView {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            stock: product.stock,
            is_out_of_stock: product.is_out_of_stock(),
            price_cents: product.price_cents,
            final_price_cents,
            discount,
            has_coupon_applied,
            created_at: product.created_at,
            updated_at: product.updated_at,
            deleted_at: product.deleted_at,
        }
    }

    /// True when any discount is active on this product.
    pub fn has_discount(&self) -> bool {
        self.discount.is_some()
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of results.
///
/// `total_elements` counts rows matching the storage-side filters, before the
/// in-memory `hasDiscount` / `withCouponApplied` post-filters are applied to
/// the page slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_elements: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
