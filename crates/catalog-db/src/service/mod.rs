//! # Service Layer
//!
//! The three stateful services. Each holds a [`crate::pool::Database`] clone
//! and runs every mutating operation as a single transaction, applying the
//! pure rules from catalog-core.

pub mod catalog;
pub mod coupon;
pub mod product;

pub use catalog::CatalogService;
pub use coupon::CouponService;
pub use product::ProductService;
