use std::collections::HashSet;

use super::{DetectContext, LossDetector};
use crate::model::{Detection, LossCandidate, LossCategory, NormalizedReports};

/// Platform adjustment reason codes that map to a claimable loss category.
/// Codes outside this table (gains, transfers, corrections) are skipped and
/// counted; an unmapped loss-like code showing up in the skip counter is
/// the signal to extend the table.
const REASON_CATEGORIES: &[(&str, LossCategory)] = &[
    ("M", LossCategory::LostWarehouse),
    ("L", LossCategory::LostWarehouse),
    ("E", LossCategory::DamagedWarehouse),
    ("D", LossCategory::DamagedWarehouse),
    ("K", LossCategory::Destroyed),
    ("G", LossCategory::CustomerReturnDamaged),
    ("H", LossCategory::CustomerReturnDamaged),
];

/// Human-readable descriptions for the adjustment reason codes we recognize,
/// carried onto records for claim narratives.
const REASON_DESCRIPTIONS: &[(&str, &str)] = &[
    ("M", "Unrecoverable inventory - missing"),
    ("L", "Lost"),
    ("E", "Warehouse damage"),
    ("D", "Damaged"),
    ("K", "Destroyed"),
    ("G", "Customer damaged"),
    ("H", "Defective - customer return"),
    ("F", "Expired"),
    ("Q", "Quality issue"),
];

pub fn category_for_reason(code: &str) -> Option<LossCategory> {
    REASON_CATEGORIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|&(_, category)| category)
}

fn describe_reason(code: &str) -> &'static str {
    REASON_DESCRIPTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|&(_, description)| description)
        .unwrap_or("")
}

/// Detects inventory decreases in the adjustments ledger that were never
/// covered by a reimbursement.
pub struct WarehouseAdjustments;

impl LossDetector for WarehouseAdjustments {
    fn name(&self) -> &'static str {
        "warehouse_adjustments"
    }

    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection {
        let mut out = Detection::default();

        if reports.adjustments.is_empty() {
            return out;
        }

        // Simple reimbursement lookup: (sku, approval date) pairs.
        let reimbursed: HashSet<(&str, chrono::NaiveDate)> = reports
            .reimbursements
            .iter()
            .filter_map(|r| r.approval_date.map(|d| (r.sku.as_str(), d)))
            .collect();

        for row in &reports.adjustments {
            // Positive adjustments are gains, not losses.
            if row.quantity >= 0 {
                continue;
            }

            let Some(category) = category_for_reason(&row.reason_code) else {
                log::debug!(
                    "adjustment {}: unmapped reason code '{}', skipped",
                    row.transaction_id,
                    row.reason_code
                );
                out.skipped.unmapped_reason += 1;
                continue;
            };

            let Some(incident_date) = row.adjusted_date else {
                out.skipped.missing_date += 1;
                continue;
            };
            if !ctx.is_claimable(incident_date) {
                out.skipped.too_recent += 1;
                continue;
            }
            if reimbursed.contains(&(row.sku.as_str(), incident_date)) {
                out.skipped.already_reimbursed += 1;
                continue;
            }

            let quantity = row.quantity.abs();
            let unit_value_cents = ctx.unit_value(&row.sku);

            out.candidates.push(LossCandidate {
                sku: row.sku.clone(),
                fnsku: row.fnsku.clone(),
                asin: row.asin.clone(),
                category,
                quantity,
                unit_value_cents,
                total_value_cents: unit_value_cents * quantity,
                incident_date,
                transaction_ref: row.transaction_id.clone(),
                order_id: String::new(),
                fulfillment_center: row.fulfillment_center.clone(),
                reason_code: row.reason_code.clone(),
                reason_note: describe_reason(&row.reason_code).to_string(),
            });
        }

        log::info!(
            "warehouse adjustments: {} losses from {} rows ({} reimbursed, {} too recent, {} unmapped)",
            out.candidates.len(),
            reports.adjustments.len(),
            out.skipped.already_reimbursed,
            out.skipped.too_recent,
            out.skipped.unmapped_reason,
        );
        out
    }
}
