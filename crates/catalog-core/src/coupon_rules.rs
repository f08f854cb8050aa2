//! # Coupon Rules
//!
//! Two pure concerns live here:
//!
//! 1. **Usability**: can this coupon be applied right now? Evaluated in a
//!    fixed order, failing closed: soft-delete, usage capacity, validity
//!    window. Capacity failures represent contention over a scarce resource,
//!    so orchestrators promote them to `Conflict` rather than a bare rule
//!    violation.
//! 2. **Validation**: is this coupon candidate (from create or patch) well
//!    formed? Every applicable rule is evaluated and the full field-to-message
//!    set is raised at once, so clients can fix all fields in one round trip.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DomainError, DomainResult, FieldErrors};
use crate::normalize::normalize;
use crate::types::{Coupon, CouponKind};

/// Codes that can never be claimed by a coupon.
pub const RESERVED_CODES: [&str; 4] = ["admin", "auth", "null", "undefined"];

/// Maximum coupon code length after normalization.
pub const MAX_CODE_LEN: usize = 20;

/// How far `valid_until` may extend past `valid_from`: five calendar years,
/// added in UTC (not a fixed number of days).
const VALIDITY_WINDOW_YEARS_IN_MONTHS: u32 = 60;

// =============================================================================
// Usability
// =============================================================================

/// Why a coupon cannot be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CouponUnusable {
    #[error("coupon is deleted and cannot be applied")]
    Deleted,

    #[error("coupon is one-shot and has already been used")]
    OneShotUsed,

    #[error("coupon has reached its maximum usage limit")]
    UsageLimitReached,

    #[error("coupon is not valid for the current date")]
    OutsideWindow,
}

impl CouponUnusable {
    /// Capacity failures are contention over a scarce resource; callers
    /// surface them as `Conflict` instead of `BusinessRule`.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            CouponUnusable::OneShotUsed | CouponUnusable::UsageLimitReached
        )
    }
}

/// Evaluates whether `coupon` can be applied at `now`.
///
/// Checks, in order:
/// 1. Not soft-deleted.
/// 2. `one_shot` ⇒ unused; else `max_uses` ⇒ under the cap.
/// 3. `valid_from <= now < valid_until`.
///
/// ## Example
/// ```rust,ignore
/// match usability(&coupon, Utc::now()) {
///     Ok(()) => { /* proceed to apply */ }
///     Err(reason) if reason.is_contention() => return Err(DomainError::Conflict(reason.to_string())),
///     Err(reason) => return Err(DomainError::BusinessRule(reason.to_string())),
/// }
/// ```
pub fn usability(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), CouponUnusable> {
    if coupon.is_deleted() {
        return Err(CouponUnusable::Deleted);
    }

    if coupon.one_shot {
        if coupon.uses_count != 0 {
            return Err(CouponUnusable::OneShotUsed);
        }
    } else if let Some(max_uses) = coupon.max_uses {
        if coupon.uses_count >= max_uses {
            return Err(CouponUnusable::UsageLimitReached);
        }
    }

    if now < coupon.valid_from || now >= coupon.valid_until {
        return Err(CouponUnusable::OutsideWindow);
    }

    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

/// A coupon candidate under construction, from a create input or from a
/// patched snapshot. All fields optional so that validation, not
/// deserialization, reports what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CouponDraft {
    pub code: Option<String>,
    pub kind: Option<CouponKind>,
    pub value: Option<i64>,
    pub one_shot: Option<bool>,
    pub max_uses: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

/// A fully validated set of coupon attributes, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponAttrs {
    /// Normalized code.
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub one_shot: bool,
    pub max_uses: Option<i64>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Validates a coupon candidate, accumulating every violation.
///
/// `uses_count` is the coupon's current usage (0 for a brand-new coupon);
/// a `max_uses` below it is rejected, and `one_shot` discards `max_uses`
/// entirely. Code *uniqueness* is a store concern and is checked by the
/// lifecycle manager, not here.
///
/// Temporal rules (when both dates are present):
/// - `valid_from < valid_until` (strict)
/// - `valid_until` strictly in the future at `now`
/// - `valid_until <= valid_from + 5 calendar years` (UTC year addition)
pub fn validate_coupon(
    draft: &CouponDraft,
    uses_count: i64,
    now: DateTime<Utc>,
) -> DomainResult<CouponAttrs> {
    let mut errors = FieldErrors::new();

    let code = draft.code.as_deref().map(normalize).unwrap_or_default();
    if code.is_empty() {
        errors.push("code", "code is required");
    } else if RESERVED_CODES.contains(&code.as_str()) {
        errors.push("code", format!("code '{code}' is reserved"));
    } else if code.len() > MAX_CODE_LEN {
        errors.push(
            "code",
            format!("code must be at most {MAX_CODE_LEN} characters"),
        );
    }

    if draft.kind.is_none() {
        errors.push("kind", "type is required");
    }

    match draft.value {
        None => errors.push("value", "value is required"),
        Some(value) => match draft.kind {
            Some(CouponKind::Percent) if !(1..=80).contains(&value) => {
                errors.push("value", "for percent type, value must be between 1 and 80");
            }
            Some(CouponKind::Fixed) if value <= 0 => {
                errors.push("value", "for fixed type, value must be positive");
            }
            _ => {}
        },
    }

    // A one-shot coupon has an implicit cap of 1; an explicit max_uses is
    // discarded rather than rejected
    let one_shot = draft.one_shot.unwrap_or(false);
    let max_uses = if one_shot { None } else { draft.max_uses };
    if let Some(max_uses) = max_uses {
        if max_uses < uses_count {
            errors.push(
                "max_uses",
                format!("max uses cannot be set below the current usage count ({uses_count})"),
            );
        }
    }

    if draft.valid_from.is_none() {
        errors.push("valid_from", "valid from date is required");
    }
    if draft.valid_until.is_none() {
        errors.push("valid_until", "valid until date is required");
    }
    if let (Some(valid_from), Some(valid_until)) = (draft.valid_from, draft.valid_until) {
        if valid_until <= now {
            errors.push("valid_until", "valid until date must be in the future");
        }
        if valid_from >= valid_until {
            errors.push("valid_from", "valid from date must be before valid until date");
        }
        if let Some(window_end) =
            valid_from.checked_add_months(Months::new(VALIDITY_WINDOW_YEARS_IN_MONTHS))
        {
            if valid_until > window_end {
                errors.push(
                    "valid_until",
                    "valid until date must be within 5 years of valid from date",
                );
            }
        }
    }

    match (draft.kind, draft.value, draft.valid_from, draft.valid_until) {
        (Some(kind), Some(value), Some(valid_from), Some(valid_until)) if errors.is_empty() => {
            Ok(CouponAttrs {
                code,
                kind,
                value,
                one_shot,
                max_uses,
                valid_from,
                valid_until,
            })
        }
        _ => Err(DomainError::Validation(errors)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn usable_coupon(now: DateTime<Utc>) -> Coupon {
        Coupon {
            id: 1,
            code: "promo10".into(),
            kind: CouponKind::Percent,
            value: 10,
            one_shot: false,
            max_uses: None,
            uses_count: 0,
            valid_from: now - chrono::Duration::days(1),
            valid_until: now + chrono::Duration::days(10),
            created_at: now - chrono::Duration::days(1),
            updated_at: None,
            deleted_at: None,
        }
    }

    fn valid_draft(now: DateTime<Utc>) -> CouponDraft {
        CouponDraft {
            code: Some("PROMO10".into()),
            kind: Some(CouponKind::Percent),
            value: Some(10),
            one_shot: Some(false),
            max_uses: None,
            valid_from: Some(now + chrono::Duration::days(1)),
            valid_until: Some(now + chrono::Duration::days(10)),
        }
    }

    // -------------------------------------------------------------------------
    // Usability
    // -------------------------------------------------------------------------

    #[test]
    fn test_usable_coupon_passes() {
        let now = at(2026, 6, 1);
        assert_eq!(usability(&usable_coupon(now), now), Ok(()));
    }

    #[test]
    fn test_deleted_checked_before_everything_else() {
        let now = at(2026, 6, 1);
        let mut coupon = usable_coupon(now);
        coupon.deleted_at = Some(now);
        coupon.one_shot = true;
        coupon.uses_count = 1;

        assert_eq!(usability(&coupon, now), Err(CouponUnusable::Deleted));
    }

    #[test]
    fn test_one_shot_used() {
        let now = at(2026, 6, 1);
        let mut coupon = usable_coupon(now);
        coupon.one_shot = true;
        coupon.uses_count = 1;

        let err = usability(&coupon, now).unwrap_err();
        assert_eq!(err, CouponUnusable::OneShotUsed);
        assert!(err.is_contention());
    }

    #[test]
    fn test_usage_limit_reached() {
        let now = at(2026, 6, 1);
        let mut coupon = usable_coupon(now);
        coupon.max_uses = Some(3);
        coupon.uses_count = 3;

        let err = usability(&coupon, now).unwrap_err();
        assert_eq!(err, CouponUnusable::UsageLimitReached);
        assert!(err.is_contention());
    }

    #[test]
    fn test_window_is_half_open() {
        let now = at(2026, 6, 1);
        let mut coupon = usable_coupon(now);

        // valid_from == now: usable (inclusive lower bound)
        coupon.valid_from = now;
        assert_eq!(usability(&coupon, now), Ok(()));

        // valid_until == now: not usable (exclusive upper bound)
        coupon.valid_from = now - chrono::Duration::days(5);
        coupon.valid_until = now;
        assert_eq!(usability(&coupon, now), Err(CouponUnusable::OutsideWindow));
    }

    #[test]
    fn test_not_yet_valid() {
        let now = at(2026, 6, 1);
        let mut coupon = usable_coupon(now);
        coupon.valid_from = now + chrono::Duration::days(1);

        assert_eq!(usability(&coupon, now), Err(CouponUnusable::OutsideWindow));
        assert!(!CouponUnusable::OutsideWindow.is_contention());
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    #[test]
    fn test_valid_draft_produces_attrs() {
        let now = at(2026, 6, 1);
        let attrs = validate_coupon(&valid_draft(now), 0, now).unwrap();
        assert_eq!(attrs.code, "promo10");
        assert_eq!(attrs.kind, CouponKind::Percent);
        assert_eq!(attrs.value, 10);
        assert!(!attrs.one_shot);
    }

    #[test]
    fn test_all_violations_reported_at_once() {
        let now = at(2026, 6, 1);
        let draft = CouponDraft {
            code: Some("admin".into()),
            kind: Some(CouponKind::Percent),
            value: Some(90),
            one_shot: Some(true),
            max_uses: Some(5),
            valid_from: None,
            valid_until: None,
        };

        let err = validate_coupon(&draft, 0, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation, got {err:?}");
        };
        assert!(errors.get("code").unwrap().contains("reserved"));
        assert!(errors.get("value").unwrap().contains("between 1 and 80"));
        assert!(errors.get("valid_from").is_some());
        assert!(errors.get("valid_until").is_some());
    }

    #[test]
    fn test_one_shot_discards_max_uses() {
        let now = at(2026, 6, 1);
        let mut draft = valid_draft(now);
        draft.one_shot = Some(true);
        draft.max_uses = Some(5);

        let attrs = validate_coupon(&draft, 0, now).unwrap();
        assert!(attrs.one_shot);
        assert_eq!(attrs.max_uses, None);
    }

    #[test]
    fn test_missing_everything() {
        let now = at(2026, 6, 1);
        let err = validate_coupon(&CouponDraft::default(), 0, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation");
        };
        for field in ["code", "kind", "value", "valid_from", "valid_until"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn test_fixed_value_must_be_positive() {
        let now = at(2026, 6, 1);
        let mut draft = valid_draft(now);
        draft.kind = Some(CouponKind::Fixed);
        draft.value = Some(0);

        let err = validate_coupon(&draft, 0, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation");
        };
        assert!(errors.get("value").unwrap().contains("positive"));
    }

    #[test]
    fn test_max_uses_below_current_usage() {
        let now = at(2026, 6, 1);
        let mut draft = valid_draft(now);
        draft.max_uses = Some(2);

        assert!(validate_coupon(&draft, 2, now).is_ok());

        let err = validate_coupon(&draft, 3, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation");
        };
        assert!(errors.get("max_uses").unwrap().contains("usage count (3)"));
    }

    #[test]
    fn test_valid_until_must_be_future() {
        let now = at(2026, 6, 1);
        let mut draft = valid_draft(now);
        draft.valid_from = Some(now - chrono::Duration::days(10));
        draft.valid_until = Some(now);

        let err = validate_coupon(&draft, 0, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation");
        };
        assert!(errors.get("valid_until").unwrap().contains("future"));
    }

    #[test]
    fn test_valid_from_must_precede_valid_until() {
        let now = at(2026, 6, 1);
        let mut draft = valid_draft(now);
        draft.valid_from = Some(now + chrono::Duration::days(10));
        draft.valid_until = Some(now + chrono::Duration::days(10));

        let err = validate_coupon(&draft, 0, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation");
        };
        assert!(errors.get("valid_from").unwrap().contains("before"));
    }

    #[test]
    fn test_five_year_window_is_calendar_aware() {
        let now = at(2025, 1, 1);

        // 2025-06-29 → 2031-06-27 exceeds five calendar years: rejected
        let mut draft = valid_draft(now);
        draft.valid_from = Some(at(2025, 6, 29));
        draft.valid_until = Some(at(2031, 6, 27));
        let err = validate_coupon(&draft, 0, now).unwrap_err();
        let DomainError::Validation(errors) = err else {
            panic!("expected Validation");
        };
        assert!(errors.get("valid_until").unwrap().contains("5 years"));

        // Exactly five calendar years is allowed
        let mut draft = valid_draft(now);
        draft.valid_from = Some(at(2025, 6, 29));
        draft.valid_until = Some(at(2030, 6, 29));
        assert!(validate_coupon(&draft, 0, now).is_ok());
    }

    #[test]
    fn test_code_is_normalized() {
        let now = at(2026, 6, 1);
        let mut draft = valid_draft(now);
        draft.code = Some("  Verão  2026 ".into());

        let attrs = validate_coupon(&draft, 0, now).unwrap();
        assert_eq!(attrs.code, "verao 2026");
    }
}
