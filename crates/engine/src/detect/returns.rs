use super::{DetectContext, LossDetector};
use crate::model::{Detection, LossCandidate, LossCategory, NormalizedReports};

/// Status tokens that mark a customer return as problematic.
const ISSUE_TOKENS: &[&str] = &["DAMAGED", "DEFECTIVE", "LOST", "DISPOSED"];

/// Detects customer returns whose disposition indicates the unit came back
/// damaged, defective, or never made it back into sellable stock.
pub struct ReturnDiscrepancies;

impl LossDetector for ReturnDiscrepancies {
    fn name(&self) -> &'static str {
        "return_discrepancies"
    }

    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection {
        let mut out = Detection::default();

        for row in &reports.returns {
            let status = row.status.to_uppercase();
            if !ISSUE_TOKENS.iter().any(|token| status.contains(token)) {
                continue;
            }

            let Some(incident_date) = row.return_date else {
                out.skipped.missing_date += 1;
                continue;
            };
            if !ctx.is_claimable(incident_date) {
                out.skipped.too_recent += 1;
                continue;
            }

            let category = if status.contains("DAMAGED") || status.contains("DEFECTIVE") {
                LossCategory::CustomerReturnDamaged
            } else {
                LossCategory::CustomerReturnLost
            };

            let unit_value_cents = ctx.unit_value(&row.sku);
            out.candidates.push(LossCandidate {
                sku: row.sku.clone(),
                fnsku: row.fnsku.clone(),
                asin: row.asin.clone(),
                category,
                quantity: row.quantity,
                unit_value_cents,
                total_value_cents: unit_value_cents * row.quantity,
                incident_date,
                transaction_ref: format!("RET_{}", row.order_id),
                order_id: row.order_id.clone(),
                fulfillment_center: String::new(),
                reason_code: "R".into(),
                reason_note: format!("Return issue: {status}"),
            });
        }

        log::info!(
            "return discrepancies: {} losses from {} returns",
            out.candidates.len(),
            reports.returns.len()
        );
        out
    }
}

/// Detects returns the customer sent back that were never credited to the
/// merchant: status shows "returned" but never reached "completed".
pub struct UnreimbursedReturns;

impl LossDetector for UnreimbursedReturns {
    fn name(&self) -> &'static str {
        "unreimbursed_returns"
    }

    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection {
        let mut out = Detection::default();

        for row in &reports.returns {
            let status = row.status.to_lowercase();
            if !status.contains("returned") || status.contains("completed") {
                continue;
            }

            let Some(incident_date) = row.return_date else {
                out.skipped.missing_date += 1;
                continue;
            };
            if !ctx.is_claimable(incident_date) {
                out.skipped.too_recent += 1;
                continue;
            }

            let quantity = row.quantity.max(1);
            let unit_value_cents = ctx
                .sku_values
                .get(&row.sku)
                .copied()
                .unwrap_or(ctx.config.return_unit_value_cents);

            out.candidates.push(LossCandidate {
                sku: row.sku.clone(),
                fnsku: row.fnsku.clone(),
                asin: row.asin.clone(),
                category: LossCategory::NoReimbursement,
                quantity,
                unit_value_cents,
                total_value_cents: unit_value_cents * quantity,
                incident_date,
                transaction_ref: format!("RET_UNREIM_{}", row.order_id),
                order_id: row.order_id.clone(),
                fulfillment_center: String::new(),
                reason_code: "RETURN_NOT_REIMBURSED".into(),
                reason_note: format!("Customer return not credited - order {}", row.order_id),
            });
        }

        log::info!(
            "unreimbursed returns: {} losses from {} returns",
            out.candidates.len(),
            reports.returns.len()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{context_fixture, old_date, return_row};
    use super::*;
    use crate::config::EngineConfig;
    use std::collections::HashMap;

    fn config() -> EngineConfig {
        EngineConfig {
            merchant_id: "M1".into(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn damaged_and_lost_statuses_classified() {
        let config = config();
        let sku_values = HashMap::new();
        let ctx = context_fixture(&config, &sku_values);

        let mut reports = NormalizedReports::default();
        reports
            .returns
            .push(return_row("A1", "O1", "CUSTOMER_DAMAGED", Some(old_date())));
        reports
            .returns
            .push(return_row("A2", "O2", "Disposed", Some(old_date())));
        reports
            .returns
            .push(return_row("A3", "O3", "SELLABLE", Some(old_date())));

        let detection = ReturnDiscrepancies.detect(&reports, &ctx);
        assert_eq!(detection.candidates.len(), 2);
        assert_eq!(
            detection.candidates[0].category,
            LossCategory::CustomerReturnDamaged
        );
        assert_eq!(
            detection.candidates[1].category,
            LossCategory::CustomerReturnLost
        );
        assert_eq!(detection.candidates[0].transaction_ref, "RET_O1");
    }

    #[test]
    fn returned_but_not_completed_is_unreimbursed() {
        let config = config();
        let sku_values = HashMap::new();
        let ctx = context_fixture(&config, &sku_values);

        let mut reports = NormalizedReports::default();
        reports
            .returns
            .push(return_row("A1", "O1", "Returned to fulfillment center", Some(old_date())));
        reports
            .returns
            .push(return_row("A2", "O2", "Returned - completed", Some(old_date())));

        let detection = UnreimbursedReturns.detect(&reports, &ctx);
        assert_eq!(detection.candidates.len(), 1);
        let c = &detection.candidates[0];
        assert_eq!(c.category, LossCategory::NoReimbursement);
        assert_eq!(c.transaction_ref, "RET_UNREIM_O1");
        // Fallback for returns is the dedicated (higher) default.
        assert_eq!(c.unit_value_cents, 1500);
    }

    #[test]
    fn recent_returns_counted_not_emitted() {
        let config = config();
        let sku_values = HashMap::new();
        let ctx = context_fixture(&config, &sku_values);
        let recent = ctx.as_of - chrono::Duration::days(10);

        let mut reports = NormalizedReports::default();
        reports
            .returns
            .push(return_row("A1", "O1", "DAMAGED", Some(recent)));
        reports
            .returns
            .push(return_row("A2", "O2", "Returned", Some(recent)));

        assert_eq!(ReturnDiscrepancies.detect(&reports, &ctx).skipped.too_recent, 1);
        assert_eq!(UnreimbursedReturns.detect(&reports, &ctx).skipped.too_recent, 1);
    }

    #[test]
    fn dateless_returns_never_defaulted() {
        let config = config();
        let sku_values = HashMap::new();
        let ctx = context_fixture(&config, &sku_values);

        let mut reports = NormalizedReports::default();
        reports.returns.push(return_row("A1", "O1", "Returned", None));

        let detection = UnreimbursedReturns.detect(&reports, &ctx);
        assert!(detection.candidates.is_empty());
        assert_eq!(detection.skipped.missing_date, 1);
    }

    #[test]
    fn overlapping_row_fires_both_detectors() {
        // "Returned damaged" qualifies for both heuristics; dedup at
        // persistence is the defense, not the detectors.
        let config = config();
        let sku_values = HashMap::new();
        let ctx = context_fixture(&config, &sku_values);

        let mut reports = NormalizedReports::default();
        reports
            .returns
            .push(return_row("A1", "O1", "Returned damaged", Some(old_date())));

        assert_eq!(ReturnDiscrepancies.detect(&reports, &ctx).candidates.len(), 1);
        assert_eq!(UnreimbursedReturns.detect(&reports, &ctx).candidates.len(), 1);
    }
}
