//! # Catalog Query Assembler
//!
//! Read-only paged catalog listing: storage-side filters and pagination,
//! then discount decoration, then the two discount-aware post-filters.
//!
//! ## Post-Filter Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  hasDiscount / withCouponApplied depend on the decoration step, so      │
//! │  they run in memory on the already-fetched page:                        │
//! │                                                                         │
//! │    SQL filters ─► page slice ─► decorate ─► post-filter ─► items        │
//! │                      │                                                  │
//! │                      └──────────► total_elements (pre-post-filter)      │
//! │                                                                         │
//! │  A post-filtered page can therefore hold fewer than page_size items     │
//! │  while total_elements still reports the pre-filter match count.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use catalog_core::{AppliedDiscount, CouponKind, DomainResult, Page, ProductDiscountView};
use tracing::debug;

use crate::pool::Database;
use crate::repository::application;
use crate::repository::product::{self, ProductFilter};

/// Largest admissible page size; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when the caller passes zero.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Read-only catalog queries.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    /// Lists one page of products, each decorated with its active discount.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: u32,
        page_size: u32,
    ) -> DomainResult<Page<ProductDiscountView>> {
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };

        let mut conn = self.db.acquire().await?;
        let (products, total) = product::page(&mut conn, filter, page, page_size).await?;

        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        let coupon_discounts = application::active_coupon_discounts(&mut conn, &ids).await?;
        let direct_discounts = application::active_direct_discounts(&mut conn, &ids).await?;

        let coupons_by_product: HashMap<i64, AppliedDiscount> = coupon_discounts
            .into_iter()
            .map(|d| {
                (
                    d.product_id,
                    AppliedDiscount {
                        kind: d.kind,
                        value: d.value,
                        applied_at: d.applied_at,
                    },
                )
            })
            .collect();
        let directs_by_product: HashMap<i64, AppliedDiscount> = direct_discounts
            .into_iter()
            .map(|d| {
                (
                    d.product_id,
                    AppliedDiscount {
                        kind: CouponKind::Percent,
                        value: d.percent,
                        applied_at: d.applied_at,
                    },
                )
            })
            .collect();

        let mut items: Vec<ProductDiscountView> = products
            .iter()
            .map(|p| {
                // A coupon application wins if both are somehow present
                if let Some(applied) = coupons_by_product.get(&p.id) {
                    ProductDiscountView::decorate(p, Some(*applied), true)
                } else if let Some(applied) = directs_by_product.get(&p.id) {
                    ProductDiscountView::decorate(p, Some(*applied), false)
                } else {
                    ProductDiscountView::decorate(p, None, false)
                }
            })
            .collect();

        if let Some(want) = filter.has_discount {
            items.retain(|view| view.has_discount() == want);
        }
        if let Some(want) = filter.with_coupon_applied {
            items.retain(|view| view.has_coupon_applied == want);
        }

        debug!(
            page,
            page_size,
            total,
            returned = items.len(),
            "Catalog page assembled"
        );

        Ok(Page {
            items,
            page,
            page_size,
            total_elements: total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::service::coupon::CouponService;
    use crate::service::product::ProductService;
    use catalog_core::{CouponDraft, ProductDraft};
    use chrono::{Duration, Utc};

    async fn services() -> (CatalogService, ProductService, CouponService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (
            CatalogService::new(db.clone()),
            ProductService::new(db.clone()),
            CouponService::new(db),
        )
    }

    fn product_draft(name: &str, cents: i64) -> ProductDraft {
        ProductDraft {
            name: Some(name.to_string()),
            description: None,
            price_cents: Some(cents),
            stock: Some(10),
        }
    }

    fn coupon_draft(code: &str, value: i64) -> CouponDraft {
        let now = Utc::now();
        CouponDraft {
            code: Some(code.to_string()),
            kind: Some(CouponKind::Percent),
            value: Some(value),
            one_shot: Some(false),
            max_uses: None,
            valid_from: Some(now - Duration::days(1)),
            valid_until: Some(now + Duration::days(30)),
        }
    }

    /// Three products: one coupon-discounted, one direct-discounted, one bare.
    async fn seed() -> (CatalogService, ProductService, CouponService) {
        let (catalog, products, coupons) = services().await;

        let espresso = products.create(product_draft("Espresso", 10000)).await.unwrap();
        let latte = products.create(product_draft("Latte", 12000)).await.unwrap();
        products.create(product_draft("Mocha", 16000)).await.unwrap();

        coupons.create(coupon_draft("promo10", 10)).await.unwrap();
        products.apply_coupon_discount(espresso.id, "promo10").await.unwrap();
        products.apply_direct_discount(latte.id, 25).await.unwrap();

        (catalog, products, coupons)
    }

    #[tokio::test]
    async fn test_page_is_decorated() {
        let (catalog, _, _) = seed().await;

        let page = catalog.list(&ProductFilter::default(), 0, 10).await.unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.items.len(), 3);

        let espresso = page.items.iter().find(|v| v.name == "Espresso").unwrap();
        assert_eq!(espresso.final_price_cents.cents(), 9000);
        assert!(espresso.has_coupon_applied);

        let latte = page.items.iter().find(|v| v.name == "Latte").unwrap();
        assert_eq!(latte.final_price_cents.cents(), 9000); // $120 at 25% off
        assert!(latte.has_discount());
        assert!(!latte.has_coupon_applied);

        let mocha = page.items.iter().find(|v| v.name == "Mocha").unwrap();
        assert!(!mocha.has_discount());
        assert_eq!(mocha.final_price_cents, mocha.price_cents);
    }

    #[tokio::test]
    async fn test_post_filters_run_on_page_slice() {
        let (catalog, _, _) = seed().await;

        let filter = ProductFilter {
            has_discount: Some(true),
            ..Default::default()
        };
        let page = catalog.list(&filter, 0, 10).await.unwrap();
        assert_eq!(page.items.len(), 2);
        // Pre-post-filter count: the storage-side filters matched all three
        assert_eq!(page.total_elements, 3);

        let filter = ProductFilter {
            with_coupon_applied: Some(true),
            ..Default::default()
        };
        let page = catalog.list(&filter, 0, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Espresso");

        let filter = ProductFilter {
            has_discount: Some(false),
            ..Default::default()
        };
        let page = catalog.list(&filter, 0, 10).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Mocha");
    }

    #[tokio::test]
    async fn test_storage_filters_combine_with_post_filters() {
        let (catalog, _, _) = seed().await;

        // min price $110 matches Latte and Mocha; only Latte is discounted
        let filter = ProductFilter {
            min_price_cents: Some(11000),
            has_discount: Some(true),
            ..Default::default()
        };
        let page = catalog.list(&filter, 0, 10).await.unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Latte");
    }

    #[tokio::test]
    async fn test_page_size_clamping() {
        let (catalog, _, _) = seed().await;

        let page = catalog.list(&ProductFilter::default(), 0, 0).await.unwrap();
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);

        let page = catalog.list(&ProductFilter::default(), 0, 10_000).await.unwrap();
        assert_eq!(page.page_size, MAX_PAGE_SIZE);

        let page = catalog.list(&ProductFilter::default(), 0, 2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_elements, 3);
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let (catalog, _, _) = services().await;

        let page = catalog.list(&ProductFilter::default(), 0, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_elements, 0);
    }
}
