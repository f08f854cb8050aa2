//! # Coupon Repository
//!
//! SQL for the `coupons` table, including the guarded usage-counter updates
//! that keep `uses_count` honest under concurrent application attempts.
//!
//! ## Guarded Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  increment_uses re-states the capacity rule in its WHERE clause:        │
//! │                                                                         │
//! │    one_shot   → only rows with uses_count = 0                           │
//! │    max_uses   → only rows with uses_count < max_uses                    │
//! │                                                                         │
//! │  Two racing appliers both pass the read-side usability check, but only  │
//! │  one UPDATE matches. The loser sees 0 rows affected and reports a       │
//! │  conflict; the counter never exceeds the cap.                           │
//! │                                                                         │
//! │  decrement_uses symmetrically refuses to drive the counter negative;    │
//! │  0 rows there means the stored state is inconsistent.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use catalog_core::{Coupon, CouponAttrs};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;

const COUPON_COLUMNS: &str = "id, code, kind, value, one_shot, max_uses, uses_count,
    valid_from, valid_until, created_at, updated_at, deleted_at";

/// Fetches a coupon by id, deleted or not.
pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(coupon)
}

/// Fetches a coupon by its normalized code, deleted or not.
pub async fn get_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?"
    ))
    .bind(code)
    .fetch_optional(conn)
    .await?;

    Ok(coupon)
}

/// True when another coupon (deleted ones included) already owns this code.
/// Pass `exclude_id = -1` when creating.
pub async fn code_taken(
    conn: &mut SqliteConnection,
    code: &str,
    exclude_id: i64,
) -> DbResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM coupons WHERE code = ? AND id <> ?")
            .bind(code)
            .bind(exclude_id)
            .fetch_one(conn)
            .await?;

    Ok(count > 0)
}

/// Inserts a new coupon with `uses_count = 0` and returns its id.
pub async fn insert(
    conn: &mut SqliteConnection,
    attrs: &CouponAttrs,
    created_at: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(code = %attrs.code, "Inserting coupon");

    let result = sqlx::query(
        "INSERT INTO coupons (code, kind, value, one_shot, max_uses, valid_from, valid_until, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&attrs.code)
    .bind(attrs.kind)
    .bind(attrs.value)
    .bind(attrs.one_shot)
    .bind(attrs.max_uses)
    .bind(attrs.valid_from)
    .bind(attrs.valid_until)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Persists every mutable column of an existing coupon.
///
/// `uses_count` is deliberately excluded: the counter only moves through
/// [`increment_uses`] / [`decrement_uses`] so concurrent edits cannot
/// clobber it with a stale read.
pub async fn update(conn: &mut SqliteConnection, coupon: &Coupon) -> DbResult<()> {
    debug!(id = coupon.id, "Updating coupon");

    sqlx::query(
        "UPDATE coupons
         SET code = ?, kind = ?, value = ?, one_shot = ?, max_uses = ?,
             valid_from = ?, valid_until = ?, updated_at = ?, deleted_at = ?
         WHERE id = ?",
    )
    .bind(&coupon.code)
    .bind(coupon.kind)
    .bind(coupon.value)
    .bind(coupon.one_shot)
    .bind(coupon.max_uses)
    .bind(coupon.valid_from)
    .bind(coupon.valid_until)
    .bind(coupon.updated_at)
    .bind(coupon.deleted_at)
    .bind(coupon.id)
    .execute(conn)
    .await?;

    Ok(())
}

/// All coupons, newest first, deleted ones included.
pub async fn list_all(conn: &mut SqliteConnection) -> DbResult<Vec<Coupon>> {
    let coupons = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(conn)
    .await?;

    Ok(coupons)
}

/// Coupons currently usable at `now`: not deleted, inside the half-open
/// validity window, with usage capacity remaining.
pub async fn list_valid(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<Vec<Coupon>> {
    let coupons = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons
         WHERE deleted_at IS NULL
           AND valid_from <= ?1
           AND valid_until > ?1
           AND CASE
                 WHEN one_shot THEN uses_count = 0
                 WHEN max_uses IS NOT NULL THEN uses_count < max_uses
                 ELSE 1
               END
         ORDER BY code ASC"
    ))
    .bind(now)
    .fetch_all(conn)
    .await?;

    Ok(coupons)
}

/// Atomically claims one use of the coupon.
///
/// Returns `false` when the coupon no longer has capacity (or was deleted
/// meanwhile); the caller reports that as a conflict.
pub async fn increment_uses(conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE coupons
         SET uses_count = uses_count + 1
         WHERE id = ?
           AND deleted_at IS NULL
           AND CASE
                 WHEN one_shot THEN uses_count = 0
                 WHEN max_uses IS NOT NULL THEN uses_count < max_uses
                 ELSE 1
               END",
    )
    .bind(id)
    .execute(conn)
    .await?;

    debug!(id, claimed = result.rows_affected() > 0, "Coupon use claim");
    Ok(result.rows_affected() > 0)
}

/// Atomically releases `by` uses of the coupon.
///
/// Returns `false` when the counter would go negative, which means the
/// stored state is inconsistent; the caller must fail loudly and roll back.
pub async fn decrement_uses(conn: &mut SqliteConnection, id: i64, by: i64) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE coupons
         SET uses_count = uses_count - ?1
         WHERE id = ?2 AND uses_count >= ?1",
    )
    .bind(by)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use catalog_core::CouponKind;
    use chrono::Duration;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn attrs(code: &str) -> CouponAttrs {
        let now = Utc::now();
        CouponAttrs {
            code: code.to_string(),
            kind: CouponKind::Percent,
            value: 10,
            one_shot: false,
            max_uses: None,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();

        let id = insert(&mut conn, &attrs("promo10"), Utc::now()).await.unwrap();

        let by_id = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "promo10");
        assert_eq!(by_id.uses_count, 0);

        let by_code = get_by_code(&mut conn, "promo10").await.unwrap().unwrap();
        assert_eq!(by_code.id, id);

        assert!(code_taken(&mut conn, "promo10", -1).await.unwrap());
        assert!(!code_taken(&mut conn, "promo10", id).await.unwrap());
    }

    #[tokio::test]
    async fn test_one_shot_increment_claims_once() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();

        let mut a = attrs("single");
        a.one_shot = true;
        let id = insert(&mut conn, &a, Utc::now()).await.unwrap();

        assert!(increment_uses(&mut conn, id).await.unwrap());
        // Second claim loses
        assert!(!increment_uses(&mut conn, id).await.unwrap());

        let coupon = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(coupon.uses_count, 1);
    }

    #[tokio::test]
    async fn test_capped_increment_stops_at_max() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();

        let mut a = attrs("cap2");
        a.max_uses = Some(2);
        let id = insert(&mut conn, &a, Utc::now()).await.unwrap();

        assert!(increment_uses(&mut conn, id).await.unwrap());
        assert!(increment_uses(&mut conn, id).await.unwrap());
        assert!(!increment_uses(&mut conn, id).await.unwrap());

        let coupon = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(coupon.uses_count, 2);
    }

    #[tokio::test]
    async fn test_decrement_refuses_to_go_negative() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();

        let id = insert(&mut conn, &attrs("promo10"), Utc::now()).await.unwrap();

        assert!(!decrement_uses(&mut conn, id, 1).await.unwrap());

        assert!(increment_uses(&mut conn, id).await.unwrap());
        assert!(decrement_uses(&mut conn, id, 1).await.unwrap());

        let coupon = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(coupon.uses_count, 0);
    }

    #[tokio::test]
    async fn test_list_valid_excludes_exhausted_and_expired() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();
        let now = Utc::now();

        insert(&mut conn, &attrs("open"), now).await.unwrap();

        let mut expired = attrs("expired");
        expired.valid_from = now - Duration::days(10);
        expired.valid_until = now - Duration::days(1);
        insert(&mut conn, &expired, now).await.unwrap();

        let mut used_up = attrs("usedup");
        used_up.one_shot = true;
        let used_id = insert(&mut conn, &used_up, now).await.unwrap();
        assert!(increment_uses(&mut conn, used_id).await.unwrap());

        let valid = list_valid(&mut conn, now).await.unwrap();
        let codes: Vec<&str> = valid.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["open"]);

        // list_all still sees everything
        assert_eq!(list_all(&mut conn).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_does_not_touch_uses_count() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();

        let id = insert(&mut conn, &attrs("promo10"), Utc::now()).await.unwrap();
        assert!(increment_uses(&mut conn, id).await.unwrap());

        let mut coupon = get_by_id(&mut conn, id).await.unwrap().unwrap();
        coupon.value = 20;
        coupon.uses_count = 999; // stale in-memory value must not persist
        update(&mut conn, &coupon).await.unwrap();

        let reloaded = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(reloaded.value, 20);
        assert_eq!(reloaded.uses_count, 1);
    }
}
