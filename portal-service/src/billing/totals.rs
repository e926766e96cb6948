//! Invoice totals arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

/// The amounts of a single line that feed into invoice totals.
#[derive(Debug, Clone)]
pub struct LineAmounts {
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Percentage, 0-100.
    pub tax_rate: Decimal,
}

/// Computed invoice totals. Invariant: `total_amount == subtotal + tax_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute subtotal, tax and total from line items.
///
/// Rounding happens once per aggregate (round-half-up to 2 decimal places),
/// not per line. The total is the sum of the two rounded aggregates rather
/// than a third independent rounding, so `total_amount == subtotal +
/// tax_amount` holds exactly for every input.
pub fn calc_invoice_totals(lines: &[LineAmounts]) -> InvoiceTotals {
    let mut subtotal = Decimal::ZERO;
    let mut tax_amount = Decimal::ZERO;

    for line in lines {
        let line_total = Decimal::from(line.quantity) * line.unit_price;
        subtotal += line_total;
        tax_amount += line_total * line.tax_rate / Decimal::ONE_HUNDRED;
    }

    let subtotal = round_money(subtotal);
    let tax_amount = round_money(tax_amount);

    InvoiceTotals {
        subtotal,
        tax_amount,
        total_amount: subtotal + tax_amount,
    }
}

/// The line total shown on the invoice: `quantity * unit_price`.
///
/// Tax is an invoice-level aggregate and is intentionally absent here.
pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(quantity: i32, unit_price: &str, tax_rate: &str) -> LineAmounts {
        LineAmounts {
            quantity,
            unit_price: d(unit_price),
            tax_rate: d(tax_rate),
        }
    }

    #[test]
    fn empty_line_list_is_all_zero() {
        let totals = calc_invoice_totals(&[]);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn two_line_invoice_golden_values() {
        // 2 x 500 @ 18% plus 1 x 1000 @ 0%.
        let totals = calc_invoice_totals(&[line(2, "500", "18"), line(1, "1000", "0")]);
        assert_eq!(totals.subtotal, d("2000.00"));
        assert_eq!(totals.tax_amount, d("180.00"));
        assert_eq!(totals.total_amount, d("2180.00"));
    }

    #[test]
    fn total_equals_subtotal_plus_tax() {
        let cases = vec![
            vec![line(3, "33.33", "18"), line(7, "0.07", "12.5")],
            vec![line(1, "0.005", "0"), line(1, "0.005", "100")],
            vec![
                line(13, "99.99", "28"),
                line(2, "1.01", "5"),
                line(1, "0.49", "0"),
            ],
        ];
        for lines in cases {
            let totals = calc_invoice_totals(&lines);
            assert_eq!(totals.total_amount, totals.subtotal + totals.tax_amount);
            assert!(totals.subtotal.scale() <= 2);
            assert!(totals.tax_amount.scale() <= 2);
            assert!(totals.total_amount.scale() <= 2);
        }
    }

    #[test]
    fn rounds_aggregates_not_lines() {
        // Each line's raw tax is 0.0045; per-line rounding would give 0.00
        // twice, aggregate rounding gives round(0.009) = 0.01.
        let totals = calc_invoice_totals(&[line(1, "0.03", "15"), line(1, "0.03", "15")]);
        assert_eq!(totals.tax_amount, d("0.01"));
    }

    #[test]
    fn half_values_round_up() {
        // Subtotal 0.125 sits exactly on the midpoint.
        let totals = calc_invoice_totals(&[line(1, "0.125", "0")]);
        assert_eq!(totals.subtotal, d("0.13"));
    }

    #[test]
    fn line_total_excludes_tax() {
        assert_eq!(line_total(4, d("12.50")), d("50.00"));
    }
}
