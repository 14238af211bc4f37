use std::collections::HashMap;

use crate::model::ReimbursementRow;
use crate::money::div_round_half_up;

/// Estimate a per-SKU unit value (cents) from reimbursement history.
///
/// Groups by SKU, summing amount and quantity; SKUs where both sums are
/// strictly positive get amount ÷ quantity, rounded half-up. Entries are
/// advisory defaults: explicit per-row prices always win at detection time,
/// and absent SKUs fall back to the configured default.
pub fn estimate_sku_values(reimbursements: &[ReimbursementRow]) -> HashMap<String, i64> {
    let mut totals: HashMap<&str, (i64, i64)> = HashMap::new();
    for row in reimbursements {
        if row.sku.is_empty() {
            continue;
        }
        let entry = totals.entry(&row.sku).or_insert((0, 0));
        entry.0 += row.amount_cents;
        entry.1 += row.quantity;
    }

    let values: HashMap<String, i64> = totals
        .into_iter()
        .filter(|&(_, (amount, quantity))| amount > 0 && quantity > 0)
        .map(|(sku, (amount, quantity))| (sku.to_string(), div_round_half_up(amount, quantity)))
        .collect();

    log::info!("estimated unit values for {} SKUs", values.len());
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reimbursement(sku: &str, amount_cents: i64, quantity: i64) -> ReimbursementRow {
        ReimbursementRow {
            reimbursement_id: String::new(),
            case_id: String::new(),
            sku: sku.into(),
            fnsku: String::new(),
            asin: String::new(),
            reason: String::new(),
            quantity,
            amount_cents,
            approval_date: None,
            currency: "EUR".into(),
        }
    }

    #[test]
    fn aggregates_before_dividing() {
        // (100.00, 10) + (50.00, 5) => 150.00 / 15 = 10.00
        let rows = vec![reimbursement("A", 10000, 10), reimbursement("A", 5000, 5)];
        let values = estimate_sku_values(&rows);
        assert_eq!(values.get("A"), Some(&1000));
    }

    #[test]
    fn rounds_half_up() {
        // 10.00 / 3 = 3.333… → 3.33;  5.00 / 8 = 0.625 → 0.63
        let rows = vec![reimbursement("A", 1000, 3), reimbursement("B", 500, 8)];
        let values = estimate_sku_values(&rows);
        assert_eq!(values.get("A"), Some(&333));
        assert_eq!(values.get("B"), Some(&63));
    }

    #[test]
    fn zero_quantity_sku_excluded() {
        let rows = vec![reimbursement("A", 1000, 0)];
        let values = estimate_sku_values(&rows);
        assert!(values.is_empty());
    }

    #[test]
    fn empty_sku_excluded() {
        let rows = vec![reimbursement("", 1000, 2)];
        let values = estimate_sku_values(&rows);
        assert!(values.is_empty());
    }
}
