//! # catalog-db: Storage and Services for the Discount Catalog
//!
//! SQLite persistence plus the three transactional services built on it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        catalog-db                                       │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        service/                                  │  │
//! │  │   CouponService      ProductService       CatalogService         │  │
//! │  │   (lifecycle)        (discount state)     (paged queries)        │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 │ one transaction per operation         │
//! │  ┌──────────────────────────────▼───────────────────────────────────┐  │
//! │  │                      repository/                                 │  │
//! │  │   product            coupon               application            │  │
//! │  │   (plain SQL over &mut SqliteConnection)                         │  │
//! │  └──────────────────────────────┬───────────────────────────────────┘  │
//! │                                 │                                      │
//! │  ┌──────────────────────────────▼───────────────────────────────────┐  │
//! │  │   pool (WAL SQLite)          migrations (embedded)               │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Business rules live in catalog-core; this crate decides *when* they run
//! and makes the outcome durable.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::ProductFilter;
pub use service::{CatalogService, CouponService, ProductService};
