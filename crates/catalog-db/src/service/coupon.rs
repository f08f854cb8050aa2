//! # Coupon Lifecycle Service
//!
//! Create, list, inspect, soft-delete, and patch coupons.
//!
//! ## Patch Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load ──► snapshot (JSON) ──► apply ops ──► immutable-field check       │
//! │       ──► deserialize draft ──► validate ──► side effects ──► persist   │
//! │                                                                         │
//! │  The live row is only touched in the final step; any failure along      │
//! │  the way rolls the transaction back and leaves the coupon untouched.    │
//! │                                                                         │
//! │  A change to kind or value rewrites the coupon's meaning, so every      │
//! │  active application of it is closed and the claimed uses are released   │
//! │  in the same transaction.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use catalog_core::patch::{apply, PatchOp};
use catalog_core::{
    validate_coupon, Coupon, CouponDetails, CouponDraft, CouponSummary, DomainError, DomainResult,
};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::pool::Database;
use crate::repository::{application, coupon};

/// Fields a patch may not change: identity, audit trail, and the usage
/// counter, which only moves through guarded repository updates.
const IMMUTABLE_FIELDS: [&str; 6] = [
    "id",
    "code",
    "uses_count",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Coupon lifecycle operations.
#[derive(Debug, Clone)]
pub struct CouponService {
    db: Database,
}

impl CouponService {
    pub fn new(db: Database) -> Self {
        CouponService { db }
    }

    /// Creates a coupon from a draft.
    ///
    /// The code is normalized before the uniqueness check, so `" PROMO10 "`
    /// and `"promo10"` collide.
    pub async fn create(&self, draft: CouponDraft) -> DomainResult<CouponDetails> {
        let now = Utc::now();
        let attrs = validate_coupon(&draft, 0, now)?;

        let mut tx = self.db.begin().await?;

        if coupon::code_taken(tx.as_mut(), &attrs.code, -1).await? {
            return Err(DomainError::Conflict(format!(
                "coupon code '{}' already exists",
                attrs.code
            )));
        }

        let id = coupon::insert(tx.as_mut(), &attrs, now).await?;
        let created = coupon::get_by_id(tx.as_mut(), id)
            .await?
            .ok_or_else(|| DomainError::Integrity("inserted coupon not readable".to_string()))?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, code = %created.code, "Coupon created");
        Ok(CouponDetails::from(&created))
    }

    /// Lists coupons. With `only_valid`, restricts to coupons usable right
    /// now; otherwise every coupon, deleted ones included.
    pub async fn list(&self, only_valid: bool) -> DomainResult<Vec<CouponSummary>> {
        let mut conn = self.db.acquire().await?;
        let coupons = if only_valid {
            coupon::list_valid(&mut conn, Utc::now()).await?
        } else {
            coupon::list_all(&mut conn).await?
        };
        Ok(coupons.iter().map(CouponSummary::from).collect())
    }

    /// Fetches one coupon with its usage counter and audit timestamps.
    pub async fn get(&self, id: i64) -> DomainResult<CouponDetails> {
        let mut conn = self.db.acquire().await?;
        let coupon = coupon::get_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DomainError::not_found("Coupon", id))?;
        Ok(CouponDetails::from(&coupon))
    }

    /// Soft-deletes a coupon. It stops being applicable immediately;
    /// existing applications stay in place.
    pub async fn soft_delete(&self, id: i64) -> DomainResult<()> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let mut coupon_row = coupon::get_by_id(tx.as_mut(), id)
            .await?
            .ok_or_else(|| DomainError::not_found("Coupon", id))?;
        if coupon_row.is_deleted() {
            return Err(DomainError::not_found("Coupon", id));
        }

        coupon_row.deleted_at = Some(now);
        coupon_row.updated_at = Some(now);
        coupon::update(tx.as_mut(), &coupon_row).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, code = %coupon_row.code, "Coupon soft-deleted");
        Ok(())
    }

    /// Applies a JSON patch to a coupon.
    ///
    /// Validation sees the *patched* snapshot as a whole, so a patch that
    /// leaves the coupon in an invalid state is rejected with every field
    /// violation at once and nothing persists.
    pub async fn patch(&self, id: i64, ops: &[PatchOp]) -> DomainResult<CouponDetails> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let current = coupon::get_by_id(tx.as_mut(), id)
            .await?
            .ok_or_else(|| DomainError::not_found("Coupon", id))?;
        if current.is_deleted() {
            return Err(DomainError::not_found("Coupon", id));
        }

        let snapshot = serde_json::to_value(&current)
            .map_err(|e| DomainError::Integrity(format!("coupon not serializable: {e}")))?;
        let patched = apply(&snapshot, ops)
            .map_err(|e| DomainError::BusinessRule(format!("patch rejected: {e}")))?;

        check_immutable_fields(&snapshot, &patched)?;

        let draft: CouponDraft = serde_json::from_value(patched)
            .map_err(|e| DomainError::BusinessRule(format!("patch produced invalid fields: {e}")))?;
        let attrs = validate_coupon(&draft, current.uses_count, now)?;

        // Changing the discount terms invalidates every active application
        let material_change = attrs.kind != current.kind || attrs.value != current.value;
        if material_change {
            let closed = application::close_all_for_coupon(tx.as_mut(), id, now).await?;
            if closed > 0 {
                let released = coupon::decrement_uses(tx.as_mut(), id, closed).await?;
                if !released {
                    return Err(DomainError::Integrity(format!(
                        "coupon {id} has {closed} active applications but a lower usage count"
                    )));
                }
                debug!(id, closed, "Released uses from closed applications");
            }
        }

        let updated = Coupon {
            kind: attrs.kind,
            value: attrs.value,
            one_shot: attrs.one_shot,
            max_uses: attrs.max_uses,
            valid_from: attrs.valid_from,
            valid_until: attrs.valid_until,
            updated_at: Some(now),
            ..current
        };
        coupon::update(tx.as_mut(), &updated).await?;

        let reloaded = coupon::get_by_id(tx.as_mut(), id)
            .await?
            .ok_or_else(|| DomainError::Integrity("updated coupon not readable".to_string()))?;
        tx.commit().await.map_err(crate::error::DbError::from)?;

        info!(id, code = %reloaded.code, "Coupon patched");
        Ok(CouponDetails::from(&reloaded))
    }
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
