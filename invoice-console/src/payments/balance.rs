//! Invoice balance arithmetic and partial-amount bounds.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::InvoiceStatus;

/// Smallest amount a payer may enter for a partial payment.
pub const MIN_PAYMENT_AMOUNT: Decimal = Decimal::from_parts(100, 0, 0, false, 2);

pub fn remaining_amount(total: Decimal, paid: Decimal) -> Decimal {
    total - paid
}

pub fn can_pay(status: InvoiceStatus, total: Decimal, paid: Decimal) -> bool {
    !status.blocks_payment() && remaining_amount(total, paid) > Decimal::ZERO
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount must be between ${} and ${}", bound(.min), bound(.remaining))]
    OutOfBounds { min: Decimal, remaining: Decimal },
}

/// `MIN ≤ amount ≤ remaining`. Both bounds inclusive.
pub fn validate_partial_amount(amount: Decimal, remaining: Decimal) -> Result<(), AmountError> {
    if amount < MIN_PAYMENT_AMOUNT || amount > remaining {
        return Err(AmountError::OutOfBounds {
            min: MIN_PAYMENT_AMOUNT,
            remaining,
        });
    }
    Ok(())
}

fn bound(amount: &Decimal) -> String {
    dollars(*amount)
}

/// Two-decimal rendering without a currency symbol or grouping.
pub fn dollars(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn remaining_is_total_minus_paid() {
        assert_eq!(remaining_amount(d(10000), d(3000)), d(7000));
        assert_eq!(remaining_amount(d(10000), d(12000)), d(-2000));
    }

    #[test]
    fn can_pay_respects_status_and_balance() {
        assert!(can_pay(InvoiceStatus::Partial, d(10000), d(3000)));
        assert!(can_pay(InvoiceStatus::Overdue, d(10000), Decimal::ZERO));
        assert!(!can_pay(InvoiceStatus::Paid, d(10000), d(3000)));
        assert!(!can_pay(InvoiceStatus::Cancelled, d(10000), d(3000)));
        assert!(!can_pay(InvoiceStatus::Sent, d(10000), d(10000)));
        assert!(!can_pay(InvoiceStatus::Sent, d(10000), d(10500)));
    }

    #[test]
    fn partial_amount_bounds_are_inclusive() {
        let remaining = d(7000);
        assert!(validate_partial_amount(d(5000), remaining).is_ok());
        assert!(validate_partial_amount(d(100), remaining).is_ok());
        assert!(validate_partial_amount(remaining, remaining).is_ok());
        assert!(validate_partial_amount(d(50), remaining).is_err());
        assert!(validate_partial_amount(d(8000), remaining).is_err());
    }

    #[test]
    fn out_of_bounds_message_names_both_limits() {
        let err = validate_partial_amount(d(8000), d(7000)).unwrap_err();
        assert_eq!(err.to_string(), "Amount must be between $1.00 and $70.00");
    }
}
