//! Detection orchestration: normalize, estimate, detect, summarize.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::detect::{all_detectors, DetectContext};
use crate::model::{DetectionRun, RunStats};
use crate::normalize::normalize_reports;
use crate::table::ReportTable;
use crate::values::estimate_sku_values;

/// Run a full detection pass over a batch of tagged report tables.
///
/// Candidates come back merged across detectors, undeduplicated: persistence
/// owns the hash-based double-count defense.
pub fn run_detection(
    config: &EngineConfig,
    tables: &HashMap<String, ReportTable>,
    as_of: NaiveDate,
) -> DetectionRun {
    let reports = normalize_reports(tables);
    log::info!(
        "normalized {} rows across {} report file(s)",
        reports.row_count(),
        tables.len()
    );

    let sku_values = estimate_sku_values(&reports.reimbursements);
    let ctx = DetectContext::new(config, &sku_values, as_of);

    let mut stats = RunStats {
        rows_analyzed: reports.row_count(),
        ..RunStats::default()
    };
    let mut candidates = Vec::new();

    for detector in all_detectors() {
        let detection = detector.detect(&reports, &ctx);
        stats.skipped.absorb(detection.skipped);
        *stats
            .by_detector
            .entry(detector.name().to_string())
            .or_insert(0) += detection.candidates.len();
        candidates.extend(detection.candidates);
    }

    for candidate in &candidates {
        stats.total_value_cents += candidate.total_value_cents;
        *stats
            .by_category
            .entry(candidate.category.as_str().to_string())
            .or_insert(0) += 1;
    }
    stats.losses_detected = candidates.len();

    log::info!(
        "detection pass complete: {} candidates, estimated value {} cents ({} too recent, {} reimbursed, {} unmapped)",
        stats.losses_detected,
        stats.total_value_cents,
        stats.skipped.too_recent,
        stats.skipped.already_reimbursed,
        stats.skipped.unmapped_reason,
    );

    DetectionRun { candidates, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LossCategory;

    fn table(headers: &[&str], rows: &[&[&str]]) -> ReportTable {
        ReportTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn config() -> EngineConfig {
        EngineConfig {
            merchant_id: "M1".into(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn old_adjustment_detected_end_to_end() {
        let mut tables = HashMap::new();
        tables.insert(
            "LEDGER_ADJUSTMENTS".to_string(),
            table(
                &["sku", "quantity", "reason", "date", "transaction-item-id"],
                &[&["A1", "-5", "M", "2025-08-13", "TXN1"]],
            ),
        );

        let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let run = run_detection(&config(), &tables, as_of);

        assert_eq!(run.candidates.len(), 1);
        let c = &run.candidates[0];
        assert_eq!(c.category, LossCategory::LostWarehouse);
        assert_eq!(c.quantity, 5);
        assert_eq!(c.total_value_cents, 5000);
        assert_eq!(run.stats.losses_detected, 1);
        assert_eq!(run.stats.by_category.get("lost_warehouse"), Some(&1));
        assert_eq!(run.stats.by_detector.get("warehouse_adjustments"), Some(&1));
    }

    #[test]
    fn recent_incident_produces_nothing() {
        let mut tables = HashMap::new();
        tables.insert(
            "LEDGER_ADJUSTMENTS".to_string(),
            table(
                &["sku", "quantity", "reason", "date", "transaction-item-id"],
                &[&["A1", "-5", "M", "2026-02-19", "TXN1"]],
            ),
        );

        let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let run = run_detection(&config(), &tables, as_of);

        assert!(run.candidates.is_empty());
        assert_eq!(run.stats.skipped.too_recent, 1);
    }

    #[test]
    fn reimbursement_history_prices_the_loss() {
        let mut tables = HashMap::new();
        tables.insert(
            "LEDGER_ADJUSTMENTS".to_string(),
            table(
                &["sku", "quantity", "reason", "date", "transaction-item-id"],
                &[&["A1", "-2", "M", "2025-08-13", "TXN1"]],
            ),
        );
        tables.insert(
            "REIMBURSEMENTS".to_string(),
            table(
                &["sku", "amount-total", "quantity-reimbursed-cash", "approval-date"],
                &[
                    &["A1", "100.00", "10", "2025-01-01"],
                    &["A1", "50.00", "5", "2025-02-01"],
                ],
            ),
        );

        let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let run = run_detection(&config(), &tables, as_of);

        // 150.00 over 15 units -> 10.00 per unit
        assert_eq!(run.candidates.len(), 1);
        assert_eq!(run.candidates[0].unit_value_cents, 1000);
        assert_eq!(run.candidates[0].total_value_cents, 2000);
    }

    #[test]
    fn unknown_tags_are_ignored() {
        let mut tables = HashMap::new();
        tables.insert(
            "SETTLEMENT_REPORT".to_string(),
            table(&["col"], &[&["x"]]),
        );

        let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let run = run_detection(&config(), &tables, as_of);
        assert!(run.candidates.is_empty());
        assert_eq!(run.stats.rows_analyzed, 0);
    }
}
