//! # Product Validation
//!
//! Business rule validation for product create and patch candidates.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE - business rule validation                       │
//! │  ├── Evaluates EVERY rule, accumulating field → message violations     │
//! │  └── Raises once, so clients can fix all fields at once                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraint on normalized_name                              │
//! │                                                                         │
//! │  Defense in depth: both layers stay in agreement                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult, FieldErrors};
use crate::money::{Money, MAX_PRICE, MIN_PRICE};
use crate::normalize::collapse_whitespace;

/// Name length bounds (characters, after whitespace collapsing).
pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 100;

/// Maximum description length.
pub const DESCRIPTION_MAX_LEN: usize = 300;

/// Stock bounds.
pub const STOCK_MAX: i64 = 999_999;

/// A product candidate under construction, from a create input or a patched
/// snapshot. All fields optional so validation reports what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub stock: Option<i64>,
}

/// A fully validated set of product attributes, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductAttrs {
    /// Display name: trimmed, internal whitespace collapsed.
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Money,
    pub stock: i64,
}

/// Characters a product name may contain besides letters and digits.
fn is_allowed_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == ',' || c == '.'
}

/// Validates a product candidate, accumulating every violation.
///
/// Rules:
/// - name required, 3–100 characters, letters/digits/space/`-_,.` only
/// - description at most 300 characters
/// - stock required, 0–999999
/// - price required, $0.01–$1,000,000.00
///
/// Normalized-name *uniqueness* is a store concern checked by the
/// orchestrator, not here.
pub fn validate_product(draft: &ProductDraft) -> DomainResult<ProductAttrs> {
    let mut errors = FieldErrors::new();

    let name = draft
        .name
        .as_deref()
        .map(collapse_whitespace)
        .unwrap_or_default();
    if name.is_empty() {
        errors.push("name", "name is required");
    } else {
        let len = name.chars().count();
        if len < NAME_MIN_LEN {
            errors.push(
                "name",
                format!("name must be at least {NAME_MIN_LEN} characters"),
            );
        } else if len > NAME_MAX_LEN {
            errors.push(
                "name",
                format!("name must be at most {NAME_MAX_LEN} characters"),
            );
        }
        if !name.chars().all(is_allowed_name_char) {
            errors.push(
                "name",
                "name may only contain letters, digits, spaces, and -_,.",
            );
        }
    }

    if let Some(description) = &draft.description {
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            errors.push(
                "description",
                format!("description must be at most {DESCRIPTION_MAX_LEN} characters"),
            );
        }
    }

    match draft.stock {
        None => errors.push("stock", "stock is required"),
        Some(stock) if !(0..=STOCK_MAX).contains(&stock) => {
            errors.push("stock", format!("stock must be between 0 and {STOCK_MAX}"));
        }
        _ => {}
    }

    match draft.price_cents {
        None => errors.push("price_cents", "price is required"),
        Some(cents) => {
            let price = Money::from_cents(cents);
            if price < MIN_PRICE || price > MAX_PRICE {
                errors.push(
                    "price_cents",
                    format!("price must be between {MIN_PRICE} and {MAX_PRICE}"),
                );
            }
        }
    }

    match (draft.price_cents, draft.stock) {
        (Some(cents), Some(stock)) if errors.is_empty() => Ok(ProductAttrs {
            name,
            description: draft.description.clone(),
            price_cents: Money::from_cents(cents),
            stock,
        }),
        _ => Err(DomainError::Validation(errors)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
