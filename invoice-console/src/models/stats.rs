//! Per-party invoice statistics shown on customer and business owner pages.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::invoice::{Invoice, InvoiceStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceStats {
    pub total_invoices: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_paid: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub pending_amount: Decimal,
    pub paid_invoices: usize,
    pub overdue_invoices: usize,
    pub draft_invoices: usize,
    /// Share of invoices in `paid` status, rounded to a whole percent.
    pub paid_percentage: u32,
}

impl InvoiceStats {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        let total_invoices = invoices.len();
        let total_amount: Decimal = invoices.iter().map(|i| i.total_amount).sum();
        let total_paid: Decimal = invoices.iter().map(|i| i.amount_paid).sum();
        let count = |status: InvoiceStatus| invoices.iter().filter(|i| i.status == status).count();
        let paid_invoices = count(InvoiceStatus::Paid);

        let paid_percentage = if total_invoices > 0 {
            (Decimal::from(paid_invoices as u64) * Decimal::ONE_HUNDRED
                / Decimal::from(total_invoices as u64))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .unwrap_or(0)
        } else {
            0
        };

        Self {
            total_invoices,
            total_amount,
            total_paid,
            pending_amount: total_amount - total_paid,
            paid_invoices,
            overdue_invoices: count(InvoiceStatus::Overdue),
            draft_invoices: count(InvoiceStatus::Draft),
            paid_percentage,
        }
    }
}
