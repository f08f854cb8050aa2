//! # Repository Layer
//!
//! Plain SQL functions over `&mut SqliteConnection`, one module per table
//! family. No business rules live here; services compose these inside a
//! transaction and apply the rules from catalog-core.

pub mod application;
pub mod coupon;
pub mod product;

pub use product::ProductFilter;
