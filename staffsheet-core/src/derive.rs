//! Billing amount derivation from hours and billing rate.

use crate::model::AmountSource;
use rust_decimal::Decimal;

/// Final billing amount of a row and how it was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derivation {
    pub billing_amount: Decimal,
    pub source: AmountSource,
    /// Provided amount differs from hours x rate beyond tolerance
    pub inconsistent: bool,
    /// hours x rate, when both are positive
    pub expected: Option<Decimal>,
}

/// Fill in or check the billing amount.
///
/// An absent or zero amount is replaced by `work_hours * billing_rate` when
/// both are positive. A provided amount is never overridden; it is only
/// flagged when it differs from the product by more than
/// `tolerance * product`.
pub fn derive_billing_amount(
    work_hours: Option<Decimal>,
    billing_rate: Option<Decimal>,
    provided: Option<Decimal>,
    tolerance: Decimal,
) -> Derivation {
    let expected = match (work_hours, billing_rate) {
        (Some(hours), Some(rate)) if hours > Decimal::ZERO && rate > Decimal::ZERO => {
            hours.checked_mul(rate)
        }
        _ => None,
    };

    match (provided, expected) {
        (Some(amount), _) if !amount.is_zero() => {
            // An unrepresentable tolerance band never flags
            let inconsistent = expected.is_some_and(|expected| {
                tolerance
                    .checked_mul(expected)
                    .is_some_and(|band| (amount - expected).abs() > band)
            });
            Derivation {
                billing_amount: amount,
                source: AmountSource::Provided,
                inconsistent,
                expected,
            }
        }
        (_, Some(expected)) => Derivation {
            billing_amount: expected,
            source: AmountSource::Derived,
            inconsistent: false,
            expected: Some(expected),
        },
        (Some(zero), None) => Derivation {
            billing_amount: zero,
            source: AmountSource::Provided,
            inconsistent: false,
            expected: None,
        },
        (None, None) => Derivation {
            billing_amount: Decimal::ZERO,
            source: AmountSource::Absent,
            inconsistent: false,
            expected: None,
        },
    }
}
