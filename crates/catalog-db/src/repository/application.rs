//! # Discount Application Repository
//!
//! SQL for the two application tables. Partial unique indexes guarantee at
//! most one *active* row per product in each table; the orchestrator checks
//! cross-table exclusivity before inserting, inside the same transaction.

use catalog_core::{CouponKind, ProductCouponApplication, ProductDirectDiscountApplication};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;

/// An active coupon application joined with the coupon's discount terms,
/// as needed to decorate a catalog page.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveCouponDiscount {
    pub product_id: i64,
    pub coupon_id: i64,
    pub kind: CouponKind,
    pub value: i64,
    pub applied_at: DateTime<Utc>,
}

/// The active coupon application for a product, if any.
pub async fn active_coupon_for_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Option<ProductCouponApplication>> {
    let row = sqlx::query_as::<_, ProductCouponApplication>(
        "SELECT id, product_id, coupon_id, applied_at, removed_at
         FROM product_coupon_applications
         WHERE product_id = ? AND removed_at IS NULL",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// The active direct discount for a product, if any.
pub async fn active_direct_for_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Option<ProductDirectDiscountApplication>> {
    let row = sqlx::query_as::<_, ProductDirectDiscountApplication>(
        "SELECT id, product_id, percent, applied_at, removed_at
         FROM product_direct_discount_applications
         WHERE product_id = ? AND removed_at IS NULL",
    )
    .bind(product_id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// True when the product carries an active discount of either kind.
pub async fn has_active_discount(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<bool> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM product_coupon_applications
             WHERE product_id = ?1 AND removed_at IS NULL
         ) OR EXISTS (
             SELECT 1 FROM product_direct_discount_applications
             WHERE product_id = ?1 AND removed_at IS NULL
         )",
    )
    .bind(product_id)
    .fetch_one(conn)
    .await?;

    Ok(exists != 0)
}

/// Records a coupon application.
pub async fn insert_coupon_application(
    conn: &mut SqliteConnection,
    product_id: i64,
    coupon_id: i64,
    applied_at: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(product_id, coupon_id, "Recording coupon application");

    let result = sqlx::query(
        "INSERT INTO product_coupon_applications (product_id, coupon_id, applied_at)
         VALUES (?, ?, ?)",
    )
    .bind(product_id)
    .bind(coupon_id)
    .bind(applied_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Records a direct percent discount application.
pub async fn insert_direct_application(
    conn: &mut SqliteConnection,
    product_id: i64,
    percent: i64,
    applied_at: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(product_id, percent, "Recording direct discount application");

    let result = sqlx::query(
        "INSERT INTO product_direct_discount_applications (product_id, percent, applied_at)
         VALUES (?, ?, ?)",
    )
    .bind(product_id)
    .bind(percent)
    .bind(applied_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Closes one coupon application row.
pub async fn close_coupon_application(
    conn: &mut SqliteConnection,
    application_id: i64,
    removed_at: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE product_coupon_applications SET removed_at = ?
         WHERE id = ? AND removed_at IS NULL",
    )
    .bind(removed_at)
    .bind(application_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Closes one direct discount application row.
pub async fn close_direct_application(
    conn: &mut SqliteConnection,
    application_id: i64,
    removed_at: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        "UPDATE product_direct_discount_applications SET removed_at = ?
         WHERE id = ? AND removed_at IS NULL",
    )
    .bind(removed_at)
    .bind(application_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Closes every active application of a coupon (a material coupon edit
/// detaches it from all products). Returns how many rows were closed, so
/// the caller can release that many uses.
pub async fn close_all_for_coupon(
    conn: &mut SqliteConnection,
    coupon_id: i64,
    removed_at: DateTime<Utc>,
) -> DbResult<i64> {
    let result = sqlx::query(
        "UPDATE product_coupon_applications SET removed_at = ?
         WHERE coupon_id = ? AND removed_at IS NULL",
    )
    .bind(removed_at)
    .bind(coupon_id)
    .execute(conn)
    .await?;

    let closed = result.rows_affected() as i64;
    debug!(coupon_id, closed, "Closed coupon applications");
    Ok(closed)
}

/// Active coupon discounts for a set of products, joined with the coupon's
/// terms. One round trip for a whole catalog page.
pub async fn active_coupon_discounts(
    conn: &mut SqliteConnection,
    product_ids: &[i64],
) -> DbResult<Vec<ActiveCouponDiscount>> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; product_ids.len()].join(", ");
    let sql = format!(
        "SELECT a.product_id, a.coupon_id, c.kind, c.value, a.applied_at
         FROM product_coupon_applications a
         JOIN coupons c ON c.id = a.coupon_id
         WHERE a.removed_at IS NULL AND a.product_id IN ({placeholders})"
    );

    let mut query = sqlx::query_as::<_, ActiveCouponDiscount>(&sql);
    for id in product_ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(conn).await?)
}

/// Active direct discounts for a set of products.
pub async fn active_direct_discounts(
    conn: &mut SqliteConnection,
    product_ids: &[i64],
) -> DbResult<Vec<ProductDirectDiscountApplication>> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; product_ids.len()].join(", ");
    let sql = format!(
        "SELECT id, product_id, percent, applied_at, removed_at
         FROM product_direct_discount_applications
         WHERE removed_at IS NULL AND product_id IN ({placeholders})"
    );

    let mut query = sqlx::query_as::<_, ProductDirectDiscountApplication>(&sql);
    for id in product_ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(conn).await?)
}

// =============================================================================
// Unit Tests
// =============================================================================
