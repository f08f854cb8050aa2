//! # Product Repository
//!
//! SQL for the `products` table. Functions take a `&mut SqliteConnection` so
//! they compose inside a caller-owned transaction.

use catalog_core::{Product, ProductAttrs};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Filters
// =============================================================================

/// Storage-side catalog filters.
///
/// `has_discount` and `with_coupon_applied` are *not* evaluated here; the
/// catalog assembler applies them in memory to the fetched page, after the
/// discount decoration it alone can compute.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case- and accent-insensitive substring match over name and description.
    pub search: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    /// Include soft-deleted products. Default: active only.
    pub include_deleted: bool,
    pub only_out_of_stock: bool,
    /// Post-filter: keep only products with (or without) an active discount.
    pub has_discount: Option<bool>,
    /// Post-filter: keep only products with (or without) an active coupon.
    pub with_coupon_applied: Option<bool>,
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    builder.push(" WHERE 1 = 1");

    if !filter.include_deleted {
        builder.push(" AND deleted_at IS NULL");
    }

    if let Some(search) = &filter.search {
        // Two patterns so each side compares like-for-like: the folded one
        // against the accent-stripped normalized_name, the merely lowercased
        // one against lower(name)/lower(description), which keep accents
        let folded = format!("%{}%", catalog_core::normalize(search));
        let lowered = format!("%{}%", search.trim().to_lowercase());
        builder
            .push(" AND (normalized_name LIKE ")
            .push_bind(folded)
            .push(" OR lower(name) LIKE ")
            .push_bind(lowered.clone())
            .push(" OR lower(coalesce(description, '')) LIKE ")
            .push_bind(lowered)
            .push(")");
    }

    if let Some(min) = filter.min_price_cents {
        builder.push(" AND price_cents >= ").push_bind(min);
    }

    if let Some(max) = filter.max_price_cents {
        builder.push(" AND price_cents <= ").push_bind(max);
    }

    if filter.only_out_of_stock {
        builder.push(" AND stock <= 0");
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Fetches a product by id, deleted or not.
pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT id, name, normalized_name, description, price_cents, stock,
                created_at, updated_at, deleted_at
         FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// True when another product (deleted ones included) already owns this
/// normalized name. Pass `exclude_id = -1` when creating.
pub async fn normalized_name_taken(
    conn: &mut SqliteConnection,
    normalized_name: &str,
    exclude_id: i64,
) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM products WHERE normalized_name = ? AND id <> ?",
    )
    .bind(normalized_name)
    .bind(exclude_id)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Inserts a new product and returns its id.
pub async fn insert(
    conn: &mut SqliteConnection,
    attrs: &ProductAttrs,
    normalized_name: &str,
    created_at: DateTime<Utc>,
) -> DbResult<i64> {
    debug!(name = %attrs.name, "Inserting product");

    let result = sqlx::query(
        "INSERT INTO products (name, normalized_name, description, price_cents, stock, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&attrs.name)
    .bind(normalized_name)
    .bind(&attrs.description)
    .bind(attrs.price_cents)
    .bind(attrs.stock)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Persists every mutable column of an existing product.
pub async fn update(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = product.id, "Updating product");

    sqlx::query(
        "UPDATE products
         SET name = ?, normalized_name = ?, description = ?, price_cents = ?,
             stock = ?, updated_at = ?, deleted_at = ?
         WHERE id = ?",
    )
    .bind(&product.name)
    .bind(&product.normalized_name)
    .bind(&product.description)
    .bind(product.price_cents)
    .bind(product.stock)
    .bind(product.updated_at)
    .bind(product.deleted_at)
    .bind(product.id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches one page of products matching the storage-side filters, plus the
/// total row count *before* pagination.
///
/// Ordered by normalized name for a stable, human-sensible listing.
pub async fn page(
    conn: &mut SqliteConnection,
    filter: &ProductFilter,
    page: u32,
    page_size: u32,
) -> DbResult<(Vec<Product>, i64)> {
    debug!(?filter, page, page_size, "Querying product page");

    let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
    push_filters(&mut count_builder, filter);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await?;

    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, name, normalized_name, description, price_cents, stock,
                created_at, updated_at, deleted_at
         FROM products",
    );
    push_filters(&mut builder, filter);
    builder
        .push(" ORDER BY normalized_name ASC LIMIT ")
        .push_bind(page_size as i64)
        .push(" OFFSET ")
        .push_bind(page as i64 * page_size as i64);

    let products = builder
        .build_query_as::<Product>()
        .fetch_all(&mut *conn)
        .await?;

    Ok((products, total))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use catalog_core::{normalize, Money};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn attrs(name: &str, cents: i64, stock: i64) -> ProductAttrs {
        ProductAttrs {
            name: name.to_string(),
            description: None,
            price_cents: Money::from_cents(cents),
            stock,
        }
    }

    async fn seed(db: &Database, name: &str, cents: i64, stock: i64) -> i64 {
        let mut conn = db.acquire().await.unwrap();
        insert(&mut conn, &attrs(name, cents, stock), &normalize(name), Utc::now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let id = seed(&db, "Café com Leite", 1200, 5).await;

        let mut conn = db.acquire().await.unwrap();
        let product = get_by_id(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(product.name, "Café com Leite");
        assert_eq!(product.normalized_name, "cafe com leite");
        assert_eq!(product.price_cents.cents(), 1200);
        assert!(product.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_normalized_name_taken() {
        let db = test_db().await;
        let id = seed(&db, "Espresso", 900, 3).await;

        let mut conn = db.acquire().await.unwrap();
        assert!(normalized_name_taken(&mut conn, "espresso", -1).await.unwrap());
        // A product does not collide with itself
        assert!(!normalized_name_taken(&mut conn, "espresso", id).await.unwrap());
        assert!(!normalized_name_taken(&mut conn, "latte", -1).await.unwrap());
    }

    #[tokio::test]
    async fn test_page_filters_and_count() {
        let db = test_db().await;
        seed(&db, "Espresso", 900, 3).await;
        seed(&db, "Latte", 1400, 0).await;
        seed(&db, "Mocha", 1600, 2).await;

        let mut conn = db.acquire().await.unwrap();

        // Price range
        let filter = ProductFilter {
            min_price_cents: Some(1000),
            ..Default::default()
        };
        let (items, total) = page(&mut conn, &filter, 0, 10).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items.len(), 2);

        // Out of stock only
        let filter = ProductFilter {
            only_out_of_stock: true,
            ..Default::default()
        };
        let (items, total) = page(&mut conn, &filter, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "Latte");

        // Pagination: total reflects all matches, not the page
        let (items, total) = page(&mut conn, &ProductFilter::default(), 0, 2).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);
        let (items, _) = page(&mut conn, &ProductFilter::default(), 1, 2).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_search_is_accent_insensitive() {
        let db = test_db().await;
        seed(&db, "Pão de Queijo", 800, 4).await;

        let mut conn = db.acquire().await.unwrap();
        let filter = ProductFilter {
            search: Some("PAO".to_string()),
            ..Default::default()
        };
        let (items, _) = page(&mut conn, &filter, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Pão de Queijo");
    }

    #[tokio::test]
    async fn test_search_matches_accented_description() {
        let db = test_db().await;
        let mut conn = db.acquire().await.unwrap();

        let attrs = ProductAttrs {
            name: "Snack Mix".to_string(),
            description: Some("Pão de queijo tradicional".to_string()),
            price_cents: Money::from_cents(800),
            stock: 4,
        };
        insert(&mut conn, &attrs, &normalize("Snack Mix"), Utc::now())
            .await
            .unwrap();

        // Accented query against accented description text
        let filter = ProductFilter {
            search: Some("Pão".to_string()),
            ..Default::default()
        };
        let (items, _) = page(&mut conn, &filter, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);

        // An unaccented word from the description still matches
        let filter = ProductFilter {
            search: Some("queijo".to_string()),
            ..Default::default()
        };
        let (items, _) = page(&mut conn, &filter, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_products_hidden_by_default() {
        let db = test_db().await;
        let id = seed(&db, "Espresso", 900, 3).await;

        let mut conn = db.acquire().await.unwrap();
        let mut product = get_by_id(&mut conn, id).await.unwrap().unwrap();
        product.deleted_at = Some(Utc::now());
        update(&mut conn, &product).await.unwrap();

        let (items, total) = page(&mut conn, &ProductFilter::default(), 0, 10).await.unwrap();
        assert_eq!(total, 0);
        assert!(items.is_empty());

        let filter = ProductFilter {
            include_deleted: true,
            ..Default::default()
        };
        let (items, _) = page(&mut conn, &filter, 0, 10).await.unwrap();
        assert_eq!(items.len(), 1);
    }
}
