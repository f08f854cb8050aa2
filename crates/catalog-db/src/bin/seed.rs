//! Seeds a local catalog database with sample products and coupons.
//!
//! ```text
//! RUST_LOG=info cargo run -p catalog-db --bin seed
//! ```
//!
//! Re-running against an existing database reports the duplicates and
//! moves on, so the seed stays idempotent in effect.

use catalog_core::{CouponDraft, CouponKind, DomainError, ProductDraft};
use catalog_db::{
    CatalogService, CouponService, Database, DbConfig, ProductFilter, ProductService,
};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db = Database::new(DbConfig::new("./catalog.db")).await?;
    let products = ProductService::new(db.clone());
    let coupons = CouponService::new(db.clone());
    let catalog = CatalogService::new(db.clone());

    let now = Utc::now();

    let sample_products: [(&str, Option<&str>, i64, i64); 4] = [
        ("Espresso Beans 1kg", Some("Dark roast, whole beans"), 4990, 40),
        ("Pão de Queijo Mix", Some("Just add water"), 1250, 120),
        ("Cold Brew Bottle", None, 899, 0),
        ("Moka Pot 6-cup", Some("Aluminium stovetop brewer"), 7500, 15),
    ];

    for (name, description, cents, stock) in sample_products {
        let draft = ProductDraft {
            name: Some(name.to_string()),
            description: description.map(str::to_string),
            price_cents: Some(cents),
            stock: Some(stock),
        };
        match products.create(draft).await {
            Ok(created) => info!(id = created.id, name, "Seeded product"),
            Err(DomainError::Conflict(_)) => warn!(name, "Product already seeded"),
            Err(err) => return Err(err.into()),
        }
    }

    let sample_coupons: [(&str, CouponKind, i64, bool, Option<i64>); 3] = [
        ("welcome10", CouponKind::Percent, 10, false, None),
        ("bigspender", CouponKind::Fixed, 1500, false, Some(50)),
        ("vip", CouponKind::Percent, 30, true, None),
    ];

    for (code, kind, value, one_shot, max_uses) in sample_coupons {
        let draft = CouponDraft {
            code: Some(code.to_string()),
            kind: Some(kind),
            value: Some(value),
            one_shot: Some(one_shot),
            max_uses,
            valid_from: Some(now),
            valid_until: Some(now + Duration::days(90)),
        };
        match coupons.create(draft).await {
            Ok(created) => info!(id = created.id, code, "Seeded coupon"),
            Err(DomainError::Conflict(_)) => warn!(code, "Coupon already seeded"),
            Err(err) => return Err(err.into()),
        }
    }

    let page = catalog.list(&ProductFilter::default(), 0, 10).await?;
    info!(
        products = page.total_elements,
        "Seed complete, catalog ready"
    );

    db.close().await;
    Ok(())
}
