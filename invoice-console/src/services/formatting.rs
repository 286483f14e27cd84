//! Money and payment-link text shown by the console.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::Invoice;
use crate::payments::balance::dollars;

fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency.to_ascii_uppercase().as_str() {
        "CAD" | "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        _ => None,
    }
}

fn group_thousands(whole: &str) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// `$1,234.56`, `-$5.00`, or `JPY 1,000.00` for currencies without a known symbol.
pub fn format_currency(amount: Decimal, currency: &str) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    let grouped = group_thousands(whole);

    let body = match currency_symbol(currency) {
        Some(symbol) => format!("{}{}.{}", symbol, grouped, fraction),
        None => format!("{} {}.{}", currency.to_ascii_uppercase(), grouped, fraction),
    };

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{}", body)
    } else {
        body
    }
}

pub fn payment_link(public_url: &str, invoice_id: &str) -> String {
    format!("{}/pay/{}", public_url.trim_end_matches('/'), invoice_id)
}

/// Shareable text asking the customer to pay the outstanding balance.
pub fn payment_request_message(invoice: &Invoice, public_url: &str) -> String {
    format!(
        "Payment Request - Invoice #{}\n\nAmount Due: {}\n\nPay securely online: {}",
        invoice.invoice_number,
        format_currency(invoice.remaining(), invoice.currency_code()),
        payment_link(public_url, &invoice.id)
    )
}

pub fn pay_button_label(partial: bool, amount: Decimal, remaining: Decimal) -> String {
    if partial {
        format!("Pay ${}", dollars(amount))
    } else {
        format!("Pay Full Amount (${})", dollars(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_grouping_and_symbol() {
        assert_eq!(format_currency(Decimal::new(123456, 2), "CAD"), "$1,234.56");
        assert_eq!(format_currency(Decimal::new(100000000, 2), "usd"), "$1,000,000.00");
        assert_eq!(format_currency(Decimal::new(-500, 2), "CAD"), "-$5.00");
        assert_eq!(format_currency(Decimal::new(995, 1), "EUR"), "€99.50");
        assert_eq!(format_currency(Decimal::new(1000, 0), "JPY"), "JPY 1,000.00");
        assert_eq!(format_currency(Decimal::ZERO, "CAD"), "$0.00");
    }

    #[test]
    fn payment_message_names_invoice_balance_and_link() {
        let invoice: Invoice = serde_json::from_value(serde_json::json!({
            "id": "inv-1",
            "invoice_number": "INV-0042",
            "total_amount": "1500.00",
            "amount_paid": "250.00",
            "status": "partial"
        }))
        .unwrap();

        assert_eq!(
            payment_request_message(&invoice, "https://console.example.com/"),
            "Payment Request - Invoice #INV-0042\n\nAmount Due: $1,250.00\n\nPay securely online: https://console.example.com/pay/inv-1"
        );
    }

    #[test]
    fn button_label_tracks_partial_flag() {
        let remaining = Decimal::new(7000, 2);
        assert_eq!(pay_button_label(true, Decimal::new(50, 0), remaining), "Pay $50.00");
        assert_eq!(pay_button_label(false, Decimal::new(50, 0), remaining), "Pay Full Amount ($70.00)");
        assert_eq!(pay_button_label(true, Decimal::ZERO, remaining), "Pay $0.00");
    }
}
