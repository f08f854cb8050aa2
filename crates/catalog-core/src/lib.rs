//! # catalog-core: Pure Business Logic for the Discount Catalog
//!
//! This crate is the **heart** of the catalog. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Catalog Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              External HTTP layer (not in this repo)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              catalog-db (services + SQLite storage)             │   │
//! │  │    CouponService · ProductService · CatalogService              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ catalog-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  discount  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ final_price│  │   rules   │  │   │
//! │  │   │  Coupon   │  │  (cents)  │  │ floor check│  │  collect  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐                 │   │
//! │  │   │ normalize │  │   patch   │  │coupon_rules│                 │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK READS • PURE FUNCTIONS       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - callers pass `now`
//! 2. **Integer Money**: All monetary values are cents (i64), no floats
//! 3. **Explicit Errors**: One `DomainError` taxonomy, never strings or panics
//! 4. **Accumulating Validation**: every field violation is reported at once

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon_rules;
pub mod discount;
pub mod error;
pub mod money;
pub mod normalize;
pub mod patch;
pub mod types;
pub mod validation;
pub mod views;

// =============================================================================
// Re-exports for ergonomic use
// =============================================================================

pub use coupon_rules::{usability, validate_coupon, CouponAttrs, CouponDraft, CouponUnusable};
pub use discount::{check_floor, final_price, Discount};
pub use error::{DomainError, DomainResult, FieldErrors};
pub use money::Money;
pub use normalize::normalize;
pub use types::{
    Coupon, CouponKind, Product, ProductCouponApplication, ProductDirectDiscountApplication,
};
pub use validation::{validate_product, ProductAttrs, ProductDraft};
pub use views::{
    AppliedDiscount, CouponDetails, CouponSummary, Page, ProductDiscountView, ProductSummary,
};
