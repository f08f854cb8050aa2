//! # Product Discount Orchestrator
//!
//! Product lifecycle plus the discount state machine: a product carries at
//! most one active discount, coupon-backed or direct, and every mutation of
//! that state runs as one transaction.
//!
//! ## Apply Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_coupon_discount                                                  │
//! │                                                                         │
//! │  1. resolve coupon by normalized code          → NotFound               │
//! │  2. usability (deleted / capacity / window)    → BusinessRule|Conflict  │
//! │  3. resolve product, must not be deleted       → NotFound|BusinessRule  │
//! │  4. no active discount of either kind          → Conflict               │
//! │  5. final price above the $0.01 floor          → InvalidPrice           │
//! │  6. guarded counter claim (the atomic step)    → Conflict on 0 rows     │
//! │  7. record the application, commit                                      │
//! │                                                                         │
//! │  Steps 1-5 are advisory reads; step 6 re-states the capacity rule in    │
//! │  SQL so two racing appliers cannot both claim the last use.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use catalog_core::patch::{apply, PatchOp};
use catalog_core::{
    check_floor, final_price, normalize, usability, validate_product, AppliedDiscount, CouponKind,
    DomainError, DomainResult, Product, ProductDiscountView, ProductDraft, ProductSummary,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::pool::Database;
use crate::repository::{application, coupon, product};

/// Fields a product patch may not change: identity, the derived uniqueness
/// key, and the audit trail.
const IMMUTABLE_FIELDS: [&str; 5] = [
    "id",
    "normalized_name",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Direct discount percent bounds, same as percent coupons.
const DIRECT_PERCENT_RANGE: std::ops::RangeInclusive<i64> = 1..=80;

/// Product lifecycle and discount orchestration.
#[derive(Debug, Clone)]
pub struct ProductService {
    db: Database,
}

impl ProductService {
    pub fn new(db: Database) -> Self {
        ProductService { db }
    }

    /// Creates a product from a draft.
    ///
    /// Uniqueness is checked on the normalized name, so accent and casing
    /// variants of an existing name collide.
    pub async fn create(&self, draft: ProductDraft) -> DomainResult<ProductSummary> {
        let now = Utc::now();
        let attrs = validate_product(&draft)?;
        let key = normalize(&attrs.name);

        let mut tx = self.db.begin().await?;

        if product::normalized_name_taken(tx.as_mut(), &key, -1).await? {
            return Err(DomainError::Conflict(format!(
                "a product named '{}' already exists",
                attrs.name
            )));
        }

        let id = product::insert(tx.as_mut(), &attrs, &key, now).await?;
        let created = product::get_by_id(tx.as_mut(), id)
            .await?
            .ok_or_else(|| DomainError::Integrity("inserted product not readable".to_string()))?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, name = %created.name, "Product created");
        Ok(ProductSummary::from(&created))
    }

    /// Fetches one product decorated with its active discount, if any.
    pub async fn get(&self, id: i64) -> DomainResult<ProductDiscountView> {
        let mut conn = self.db.acquire().await?;
        let product = load_active(&mut conn, id).await?;
        decorate(&mut conn, &product).await
    }

    /// Soft-deletes a product.
    ///
    /// An active discount is removed first, releasing the coupon use, so a
    /// later restore brings the product back undiscounted.
    pub async fn soft_delete(&self, id: i64) -> DomainResult<()> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut product_row = load_active(tx.as_mut(), id).await?;
        remove_active_discount(tx.as_mut(), id, now).await?;

        product_row.deleted_at = Some(now);
        product_row.updated_at = Some(now);
        product::update(tx.as_mut(), &product_row).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, name = %product_row.name, "Product soft-deleted");
        Ok(())
    }

    /// Restores a soft-deleted product.
    pub async fn restore(&self, id: i64) -> DomainResult<ProductSummary> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut product_row = product::get_by_id(tx.as_mut(), id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))?;
        if !product_row.is_deleted() {
            return Err(DomainError::BusinessRule(format!(
                "product {id} is not deleted"
            )));
        }

        product_row.deleted_at = None;
        product_row.updated_at = Some(now);
        product::update(tx.as_mut(), &product_row).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, name = %product_row.name, "Product restored");
        Ok(ProductSummary::from(&product_row))
    }

    /// Applies a coupon to a product by its (not necessarily normalized) code.
    pub async fn apply_coupon_discount(
        &self,
        product_id: i64,
        code: &str,
    ) -> DomainResult<ProductDiscountView> {
        let now = Utc::now();
        let normalized = normalize(code);
        let mut tx = self.db.begin().await?;

        let coupon_row = coupon::get_by_code(tx.as_mut(), &normalized)
            .await?
            .ok_or_else(|| DomainError::not_found("Coupon", &normalized))?;

        usability(&coupon_row, now).map_err(|reason| {
            if reason.is_contention() {
                DomainError::Conflict(reason.to_string())
            } else {
                DomainError::BusinessRule(reason.to_string())
            }
        })?;

        let product_row = load_for_discount(tx.as_mut(), product_id).await?;
        ensure_no_active_discount(tx.as_mut(), product_id).await?;

        let discounted = final_price(product_row.price_cents, &coupon_row.discount());
        check_floor(discounted)?;

        // The atomic step: re-checks capacity inside the UPDATE
        if !coupon::increment_uses(tx.as_mut(), coupon_row.id).await? {
            return Err(DomainError::Conflict(format!(
                "coupon '{}' was claimed concurrently and has no uses left",
                coupon_row.code
            )));
        }
        application::insert_coupon_application(tx.as_mut(), product_id, coupon_row.id, now)
            .await?;

        let view = decorate(tx.as_mut(), &product_row).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(product_id, coupon = %coupon_row.code, "Coupon discount applied");
        Ok(view)
    }

    /// Applies a standalone percent discount to a product.
    pub async fn apply_direct_discount(
        &self,
        product_id: i64,
        percent: i64,
    ) -> DomainResult<ProductDiscountView> {
        let now = Utc::now();

        if !DIRECT_PERCENT_RANGE.contains(&percent) {
            return Err(DomainError::BusinessRule(
                "discount percent must be between 1 and 80".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let product_row = load_for_discount(tx.as_mut(), product_id).await?;
        ensure_no_active_discount(tx.as_mut(), product_id).await?;

        let discounted = product_row.price_cents.apply_percent_discount(percent);
        check_floor(discounted)?;

        application::insert_direct_application(tx.as_mut(), product_id, percent, now).await?;

        let view = decorate(tx.as_mut(), &product_row).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(product_id, percent, "Direct discount applied");
        Ok(view)
    }

    /// Removes the product's active discount, whichever kind it is.
    ///
    /// Removing a coupon discount releases the claimed use.
    pub async fn remove_discount(&self, product_id: i64) -> DomainResult<ProductDiscountView> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let product_row = load_active(tx.as_mut(), product_id).await?;

        if !remove_active_discount(tx.as_mut(), product_id, now).await? {
            return Err(DomainError::BusinessRule(format!(
                "product {product_id} has no active discount"
            )));
        }

        let view = decorate(tx.as_mut(), &product_row).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(product_id, "Discount removed");
        Ok(view)
    }

    /// Applies a JSON patch to a product.
    ///
    /// A price change invalidates the active discount (its floor check and
    /// final price were computed against the old price), so the discount is
    /// removed in the same transaction.
    pub async fn patch(&self, id: i64, ops: &[PatchOp]) -> DomainResult<ProductDiscountView> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let current = load_active(tx.as_mut(), id).await?;

        let snapshot = serde_json::to_value(&current)
            .map_err(|e| DomainError::Integrity(format!("product not serializable: {e}")))?;
        let patched = apply(&snapshot, ops)
            .map_err(|e| DomainError::BusinessRule(format!("patch rejected: {e}")))?;

        check_immutable_fields(&snapshot, &patched)?;

        let draft: ProductDraft = serde_json::from_value(patched)
            .map_err(|e| DomainError::BusinessRule(format!("patch produced invalid fields: {e}")))?;
        let attrs = validate_product(&draft)?;

        let key = normalize(&attrs.name);
        if key != current.normalized_name
            && product::normalized_name_taken(tx.as_mut(), &key, id).await?
        {
            return Err(DomainError::Conflict(format!(
                "a product named '{}' already exists",
                attrs.name
            )));
        }

        if attrs.price_cents != current.price_cents {
            let removed = remove_active_discount(tx.as_mut(), id, now).await?;
            if removed {
                debug!(id, "Price change removed the active discount");
            }
        }

        let updated = Product {
            name: attrs.name,
            normalized_name: key,
            description: attrs.description,
            price_cents: attrs.price_cents,
            stock: attrs.stock,
            updated_at: Some(now),
            ..current
        };
        product::update(tx.as_mut(), &updated).await?;

        let view = decorate(tx.as_mut(), &updated).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, name = %updated.name, "Product patched");
        Ok(view)
    }
}

// =============================================================================
// Shared Steps
// =============================================================================

/// Loads a product that exists and is not soft-deleted.
async fn load_active(conn: &mut SqliteConnection, id: i64) -> DomainResult<Product> {
    let product = product::get_by_id(conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found("Product", id))?;
    if product.is_deleted() {
        return Err(DomainError::not_found("Product", id));
    }
    Ok(product)
}

/// Loads a product for a discount-apply path. A missing id is `NotFound`,
/// but a soft-deleted product is a rule violation: the caller named a real
/// product that is merely ineligible.
async fn load_for_discount(conn: &mut SqliteConnection, id: i64) -> DomainResult<Product> {
    let product = product::get_by_id(conn, id)
        .await?
        .ok_or_else(|| DomainError::not_found("Product", id))?;
    if product.is_deleted() {
        return Err(DomainError::BusinessRule(format!(
            "product {id} is deleted and cannot receive a discount"
        )));
    }
    Ok(product)
}

/// Rejects when the product already carries an active discount.
async fn ensure_no_active_discount(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DomainResult<()> {
    if application::has_active_discount(conn, product_id).await? {
        return Err(DomainError::Conflict(format!(
            "product {product_id} already has an active discount"
        )));
    }
    Ok(())
}

/// Closes the product's active discount, if any. Closing a coupon
/// application releases the claimed use; a counter that cannot be released
/// is corrupt state and fails the whole transaction.
async fn remove_active_discount(
    conn: &mut SqliteConnection,
    product_id: i64,
    now: DateTime<Utc>,
) -> DomainResult<bool> {
    if let Some(app) = application::active_coupon_for_product(conn, product_id).await? {
        if !coupon::decrement_uses(conn, app.coupon_id, 1).await? {
            return Err(DomainError::Integrity(format!(
                "coupon {} has an active application but a zero usage count",
                app.coupon_id
            )));
        }
        application::close_coupon_application(conn, app.id, now).await?;
        return Ok(true);
    }

    if let Some(app) = application::active_direct_for_product(conn, product_id).await? {
        application::close_direct_application(conn, app.id, now).await?;
        return Ok(true);
    }

    Ok(false)
}

/// Decorates a product with its active discount. A coupon application wins
/// over a direct one if both are somehow present.
async fn decorate(
    conn: &mut SqliteConnection,
    product: &Product,
) -> DomainResult<ProductDiscountView> {
    let coupons = application::active_coupon_discounts(conn, &[product.id]).await?;
    if let Some(active) = coupons.first() {
        let applied = AppliedDiscount {
            kind: active.kind,
            value: active.value,
            applied_at: active.applied_at,
        };
        return Ok(ProductDiscountView::decorate(product, Some(applied), true));
    }

    if let Some(active) = application::active_direct_for_product(conn, product.id).await? {
        let applied = AppliedDiscount {
            kind: CouponKind::Percent,
            value: active.percent,
            applied_at: active.applied_at,
        };
        return Ok(ProductDiscountView::decorate(product, Some(applied), false));
    }

    Ok(ProductDiscountView::decorate(product, None, false))
}

/// Rejects a patch that changes any immutable field, including removing it.
fn check_immutable_fields(snapshot: &Value, patched: &Value) -> DomainResult<()> {
    for field in IMMUTABLE_FIELDS {
        if snapshot.get(field) != patched.get(field) {
            return Err(DomainError::BusinessRule(format!(
                "field '{field}' cannot be modified"
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
