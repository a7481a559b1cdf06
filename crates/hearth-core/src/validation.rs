//! # Validation Module
//!
//! Input validation for standing orders and manual order requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  └── Type validation (deserialization, unknown recurrence kinds)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Non-empty items, sane quantities and prices                       │
//! │  ├── Recurrence that can actually fire                                 │
//! │  └── End date not already in the past                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage                                                      │
//! │  └── UNIQUE (template, delivery date) for generated instances          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The evaluator itself tolerates degenerate descriptors that slipped into
//! storage through older paths. New input is held to a stricter bar here.
//!
//! ## Usage
//! ```rust
//! use hearth_core::validation::{validate_quantity, validate_recurrence};
//! use hearth_core::Recurrence;
//!
//! validate_quantity(12).unwrap();
//! assert!(validate_recurrence(&Recurrence::every(0)).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{
    LineItem, ManualOrderRequest, Recurrence, TemplateDraft, TemplateDuration, TemplatePatch,
};
use crate::{MAX_LINE_QUANTITY, MAX_TEMPLATE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates an identifier reference such as a customer or product id.
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a list of line items.
///
/// ## Rules
/// - At least one item, at most [`MAX_TEMPLATE_ITEMS`]
/// - Each product id present
/// - Each quantity in range
/// - Unit price not negative (complimentary lines are allowed)
pub fn validate_items(items: &[LineItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    if items.len() > MAX_TEMPLATE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_TEMPLATE_ITEMS,
        });
    }

    for item in items {
        validate_id("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;
        if item.unit_price.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "unit_price".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
    }

    Ok(())
}

/// Validates a recurrence descriptor for new input.
pub fn validate_recurrence(recurrence: &Recurrence) -> ValidationResult<()> {
    match recurrence {
        Recurrence::WeeklyDays { days } if days.is_empty() => Err(ValidationError::InvalidFormat {
            field: "days".to_string(),
            reason: "at least one weekday (0 = Monday .. 6 = Sunday) is required".to_string(),
        }),
        Recurrence::Interval { every_n_days } if *every_n_days <= 0 => {
            Err(ValidationError::must_be_positive("every_n_days"))
        }
        _ => Ok(()),
    }
}

/// Validates a duration against the current reference-zone date.
///
/// An end date of today is allowed; the horizon starts tomorrow, so it
/// simply produces nothing and completes at the next batch run.
pub fn validate_duration(duration: &TemplateDuration, today: NaiveDate) -> ValidationResult<()> {
    match duration.end_date() {
        Some(end) if end < today => Err(ValidationError::DateInPast {
            field: "end_date".to_string(),
            date: end.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a new standing order.
pub fn validate_draft(draft: &TemplateDraft, today: NaiveDate) -> ValidationResult<()> {
    validate_id("customer_id", &draft.customer_id)?;
    validate_items(&draft.items)?;
    validate_recurrence(&draft.recurrence)?;
    validate_duration(&draft.duration, today)?;
    Ok(())
}

/// Validates the fields a patch actually touches.
pub fn validate_patch(patch: &TemplatePatch, today: NaiveDate) -> ValidationResult<()> {
    if let Some(items) = &patch.items {
        validate_items(items)?;
    }
    if let Some(recurrence) = &patch.recurrence {
        validate_recurrence(recurrence)?;
    }
    if let Some(duration) = &patch.duration {
        validate_duration(duration, today)?;
    }
    Ok(())
}

/// Validates a customer's manual order submission.
pub fn validate_manual_request(request: &ManualOrderRequest) -> ValidationResult<()> {
    validate_id("customer_id", &request.customer_id)?;
    validate_items(&request.items)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::PaymentStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn bun(qty: i64) -> LineItem {
        LineItem::new("bun", "Milk Bun", qty, Money::from_paise(1500))
    }

    fn draft() -> TemplateDraft {
        TemplateDraft {
            customer_id: "cust-1".into(),
            items: vec![bun(12)],
            recurrence: Recurrence::weekly([0, 2, 4]),
            duration: TemplateDuration::Indefinite,
            notes: None,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_items() {
        assert_eq!(validate_items(&[]), Err(ValidationError::required("items")));
        assert!(validate_items(&[bun(3)]).is_ok());

        let free = LineItem::new("bun", "Milk Bun", 1, Money::zero());
        assert!(validate_items(&[free]).is_ok());

        let refund = LineItem::new("bun", "Milk Bun", 1, Money::from_paise(-100));
        assert!(matches!(
            validate_items(&[refund]),
            Err(ValidationError::OutOfRange { .. })
        ));

        let nameless = LineItem::new("  ", "Mystery", 1, Money::from_paise(100));
        assert_eq!(
            validate_items(&[nameless]),
            Err(ValidationError::required("product_id"))
        );

        let too_many: Vec<LineItem> = (0..=MAX_TEMPLATE_ITEMS).map(|_| bun(1)).collect();
        assert!(matches!(
            validate_items(&too_many),
            Err(ValidationError::TooMany { .. })
        ));
    }

    #[test]
    fn test_validate_recurrence() {
        assert!(validate_recurrence(&Recurrence::weekly([6])).is_ok());
        assert!(validate_recurrence(&Recurrence::every(1)).is_ok());
        assert!(matches!(
            validate_recurrence(&Recurrence::weekly([9])),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert_eq!(
            validate_recurrence(&Recurrence::every(0)),
            Err(ValidationError::must_be_positive("every_n_days"))
        );
    }

    #[test]
    fn test_validate_duration() {
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert!(validate_duration(&TemplateDuration::Indefinite, today()).is_ok());
        assert!(validate_duration(&TemplateDuration::EndDate { date: today() }, today()).is_ok());
        assert!(matches!(
            validate_duration(&TemplateDuration::EndDate { date: yesterday }, today()),
            Err(ValidationError::DateInPast { .. })
        ));
    }

    #[test]
    fn test_validate_draft() {
        assert!(validate_draft(&draft(), today()).is_ok());

        let mut bad = draft();
        bad.customer_id = String::new();
        assert_eq!(
            validate_draft(&bad, today()),
            Err(ValidationError::required("customer_id"))
        );
    }

    #[test]
    fn test_validate_patch_only_checks_present_fields() {
        assert!(validate_patch(&TemplatePatch::default(), today()).is_ok());

        let patch = TemplatePatch {
            recurrence: Some(Recurrence::every(-1)),
            ..Default::default()
        };
        assert!(validate_patch(&patch, today()).is_err());
    }

    #[test]
    fn test_validate_manual_request() {
        let request = ManualOrderRequest {
            customer_id: "cust-1".into(),
            items: vec![bun(2)],
            payment_status: PaymentStatus::Pending,
            notes: None,
        };
        assert!(validate_manual_request(&request).is_ok());

        let empty = ManualOrderRequest {
            items: vec![],
            ..request
        };
        assert!(validate_manual_request(&empty).is_err());
    }
}
