//! # Error Types
//!
//! Domain-specific error taxonomy for the discount catalog.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  catalog-core errors (this file)                                       │
//! │  ├── DomainError     - The caller-visible taxonomy                     │
//! │  └── FieldErrors     - Accumulated field → message violations          │
//! │                                                                         │
//! │  catalog-db errors (separate crate)                                    │
//! │  └── DbError         - Database operation failures                     │
//! │                                                                         │
//! │  Flow: FieldErrors → DomainError::Validation → caller                  │
//! │        sqlx::Error → DbError → DomainError::{Conflict,Storage}         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every service operation fails with exactly one `DomainError` kind
//! 3. Multi-field validation accumulates *all* violations before raising,
//!    so a caller can fix every field at once
//! 4. `Integrity` means a programming or data-corruption bug: fatal to the
//!    operation, never silently corrected

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Field Error Accumulator
// =============================================================================

/// An ordered map of `field → violation message`.
///
/// Built by validators that never return early: every applicable rule is
/// evaluated and recorded, then the whole set is raised once.
///
/// ## Example
/// ```rust
/// use catalog_core::error::FieldErrors;
///
/// let mut errors = FieldErrors::new();
/// errors.push("name", "name must be at least 3 characters");
/// errors.push("price", "price must be positive");
///
/// assert_eq!(errors.len(), 2);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        FieldErrors(BTreeMap::new())
    }

    /// Records a violation for a field.
    ///
    /// The first message recorded for a field wins; later rules for the same
    /// field do not overwrite it.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Returns the message recorded for a field, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// True when no violation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Raises `DomainError::Validation` if any violation was recorded.
    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }

    /// Iterates over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

// =============================================================================
// Domain Error
// =============================================================================

/// The caller-visible error taxonomy.
///
/// Every public catalog operation fails with exactly one of these kinds.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced id or code is absent.
    #[error("{entity} '{id}' not found")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// Uniqueness collision, mutual-exclusivity violation, or contention
    /// over a scarce coupon. Safe for the caller to retry after resolving.
    #[error("{0}")]
    Conflict(String),

    /// A single business rule violated.
    #[error("{0}")]
    BusinessRule(String),

    /// One or many field-level violations, reported together.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// A computed price fell below the $0.01 floor.
    ///
    /// A distinct class because it signals a pricing concern rather than
    /// malformed input.
    #[error("{0}")]
    InvalidPrice(String),

    /// An invariant was violated in a way that indicates a programming or
    /// data-corruption bug (e.g. a usage counter about to go negative).
    /// Always fatal to the current operation.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience type alias for Results with DomainError.
pub type DomainResult<T> = Result<T, DomainError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_accumulate() {
        let mut errors = FieldErrors::new();
        errors.push("name", "name is required");
        errors.push("price", "price must be positive");
        errors.push("name", "overwritten message is ignored");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name"), Some("name is required"));
        assert_eq!(errors.get("price"), Some("price must be positive"));
    }

    #[test]
    fn test_field_errors_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::new();
        errors.push("stock", "stock must be between 0 and 999999");
        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_field_errors_display_is_ordered() {
        let mut errors = FieldErrors::new();
        errors.push("value", "value is required");
        errors.push("kind", "kind is required");

        // BTreeMap keeps field order stable
        assert_eq!(errors.to_string(), "kind: kind is required; value: value is required");
    }

    #[test]
    fn test_not_found_message() {
        let err = DomainError::not_found("Product", 42);
        assert_eq!(err.to_string(), "Product '42' not found");
    }
}
