//! Pure claim-case grouping.
//!
//! Loss records that survived dedup and the eligibility window get bundled
//! into one claim case per (SKU, category) pair. Everything here is pure;
//! the store decides which records are candidates and commits the links.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::model::LossCategory;
use crate::money::format_cents;

/// The slice of a stored loss record that grouping needs.
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub id: i64,
    pub sku: String,
    pub category: LossCategory,
    pub quantity: i64,
    pub total_value_cents: i64,
    pub incident_date: NaiveDate,
}

/// One claim case draft: a (SKU, category) bundle with aggregated figures
/// and the narrative text to submit.
#[derive(Debug, Clone)]
pub struct CaseGroup {
    pub sku: String,
    pub category: LossCategory,
    pub record_ids: Vec<i64>,
    pub quantity: i64,
    pub total_value_cents: i64,
    pub earliest_incident: NaiveDate,
    pub latest_incident: NaiveDate,
}

impl CaseGroup {
    pub fn item_count(&self) -> usize {
        self.record_ids.len()
    }

    pub fn title(&self) -> String {
        format!("{} - {} units of {}", self.category.label(), self.quantity, self.sku)
    }
}

/// Group records by (SKU, category) and aggregate quantity, value, and the
/// incident-date span. Groups come back ordered by descending aggregate
/// value so the most valuable claims are filed first.
pub fn group_records(records: &[CaseRecord]) -> Vec<CaseGroup> {
    let mut groups: BTreeMap<(String, LossCategory), CaseGroup> = BTreeMap::new();

    for record in records {
        let key = (record.sku.clone(), record.category);
        let group = groups.entry(key).or_insert_with(|| CaseGroup {
            sku: record.sku.clone(),
            category: record.category,
            record_ids: Vec::new(),
            quantity: 0,
            total_value_cents: 0,
            earliest_incident: record.incident_date,
            latest_incident: record.incident_date,
        });
        group.record_ids.push(record.id);
        group.quantity += record.quantity;
        group.total_value_cents += record.total_value_cents;
        group.earliest_incident = group.earliest_incident.min(record.incident_date);
        group.latest_incident = group.latest_incident.max(record.incident_date);
    }

    let mut ordered: Vec<CaseGroup> = groups.into_values().collect();
    // BTreeMap iteration already breaks value ties by (sku, category).
    ordered.sort_by(|a, b| b.total_value_cents.cmp(&a.total_value_cents));
    ordered
}

/// Deterministic case reference: `CAS-YYYYMMDD-XXXXXX`. The suffix hashes
/// the bundled record ids along with the group key, so regrouping the same
/// bundle reproduces the reference while a later same-day bundle for the
/// same (SKU, category) gets a distinct one.
pub fn case_reference(as_of: NaiveDate, group: &CaseGroup) -> String {
    let mut hasher = Sha256::new();
    hasher.update(group.sku.as_bytes());
    hasher.update(b"|");
    hasher.update(group.category.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(as_of.to_string().as_bytes());
    for id in &group.record_ids {
        hasher.update(b"|");
        hasher.update(id.to_string().as_bytes());
    }
    let digest = format!("{:X}", hasher.finalize());
    format!("CAS-{}-{}", as_of.format("%Y%m%d"), &digest[..6])
}

/// Submittable claim narrative, templated per category family.
pub fn claim_text(group: &CaseGroup) -> String {
    let value = format_cents(group.total_value_cents);
    let span = if group.earliest_incident == group.latest_incident {
        format!("on {}", group.earliest_incident)
    } else {
        format!(
            "between {} and {}",
            group.earliest_incident, group.latest_incident
        )
    };

    match group.category {
        LossCategory::LostInbound | LossCategory::LostWarehouse => format!(
            "Our records show {qty} unit(s) of SKU {sku} were lost while under \
your custody {span} and have not been reimbursed. Across {n} ledger event(s) \
the missing inventory is valued at {value}. Please investigate and reimburse \
the lost units.",
            qty = group.quantity,
            sku = group.sku,
            span = span,
            n = group.item_count(),
        ),
        LossCategory::DamagedWarehouse | LossCategory::Destroyed => format!(
            "Our records show {qty} unit(s) of SKU {sku} were damaged or \
destroyed in the fulfillment center {span} without reimbursement. Across {n} \
ledger event(s) the affected inventory is valued at {value}. Please \
investigate and reimburse the damaged units.",
            qty = group.quantity,
            sku = group.sku,
            span = span,
            n = group.item_count(),
        ),
        LossCategory::CustomerReturnLost
        | LossCategory::CustomerReturnDamaged
        | LossCategory::NoReimbursement => format!(
            "Our records show {qty} customer-returned unit(s) of SKU {sku} \
{span} that were never restored to sellable inventory or credited back. \
Across {n} return event(s) the outstanding value is {value}. Please \
investigate these returns and issue the corresponding reimbursement.",
            qty = group.quantity,
            sku = group.sku,
            span = span,
            n = group.item_count(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        id: i64,
        sku: &str,
        category: LossCategory,
        quantity: i64,
        value: i64,
        date: (i32, u32, u32),
    ) -> CaseRecord {
        CaseRecord {
            id,
            sku: sku.into(),
            category,
            quantity,
            total_value_cents: value,
            incident_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        }
    }

    #[test]
    fn groups_by_sku_and_category() {
        let records = vec![
            record(1, "A", LossCategory::LostWarehouse, 2, 2000, (2025, 6, 1)),
            record(2, "A", LossCategory::LostWarehouse, 3, 3000, (2025, 7, 1)),
            record(3, "A", LossCategory::DamagedWarehouse, 1, 1000, (2025, 6, 1)),
            record(4, "B", LossCategory::LostWarehouse, 1, 9000, (2025, 6, 1)),
        ];

        let groups = group_records(&records);
        assert_eq!(groups.len(), 3);

        let a_lost = groups
            .iter()
            .find(|g| g.sku == "A" && g.category == LossCategory::LostWarehouse)
            .unwrap();
        assert_eq!(a_lost.record_ids, vec![1, 2]);
        assert_eq!(a_lost.quantity, 5);
        assert_eq!(a_lost.total_value_cents, 5000);
        assert_eq!(
            a_lost.earliest_incident,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert_eq!(
            a_lost.latest_incident,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
    }

    #[test]
    fn groups_ordered_by_descending_value() {
        let records = vec![
            record(1, "A", LossCategory::LostWarehouse, 1, 1000, (2025, 6, 1)),
            record(2, "B", LossCategory::LostWarehouse, 1, 9000, (2025, 6, 1)),
            record(3, "C", LossCategory::Destroyed, 1, 4000, (2025, 6, 1)),
        ];

        let values: Vec<i64> = group_records(&records)
            .iter()
            .map(|g| g.total_value_cents)
            .collect();
        assert_eq!(values, vec![9000, 4000, 1000]);
    }

    #[test]
    fn group_value_equals_sum_of_records() {
        let records = vec![
            record(1, "A", LossCategory::LostWarehouse, 2, 2500, (2025, 6, 1)),
            record(2, "A", LossCategory::LostWarehouse, 1, 1750, (2025, 6, 2)),
        ];
        let groups = group_records(&records);
        let record_sum: i64 = records.iter().map(|r| r.total_value_cents).sum();
        assert_eq!(groups[0].total_value_cents, record_sum);
    }

    #[test]
    fn reference_is_deterministic_and_day_scoped() {
        let records = vec![record(1, "A", LossCategory::LostWarehouse, 1, 1000, (2025, 6, 1))];
        let group = &group_records(&records)[0];
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

        let reference = case_reference(day, group);
        assert!(reference.starts_with("CAS-20260301-"));
        assert_eq!(reference.len(), "CAS-20260301-".len() + 6);
        assert_eq!(reference, case_reference(day, group));
        assert_ne!(
            reference,
            case_reference(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), group)
        );
    }

    #[test]
    fn same_key_different_bundle_gets_distinct_reference() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let first = vec![record(1, "A", LossCategory::LostWarehouse, 1, 1000, (2025, 6, 1))];
        let second = vec![record(2, "A", LossCategory::LostWarehouse, 1, 1000, (2025, 6, 1))];

        assert_ne!(
            case_reference(day, &group_records(&first)[0]),
            case_reference(day, &group_records(&second)[0])
        );
    }

    #[test]
    fn claim_text_carries_figures() {
        let records = vec![
            record(1, "SKU-9", LossCategory::LostWarehouse, 2, 2000, (2025, 6, 1)),
            record(2, "SKU-9", LossCategory::LostWarehouse, 3, 3000, (2025, 7, 15)),
        ];
        let text = claim_text(&group_records(&records)[0]);
        assert!(text.contains("5 unit(s)"));
        assert!(text.contains("SKU-9"));
        assert!(text.contains("50.00"));
        assert!(text.contains("between 2025-06-01 and 2025-07-15"));
    }

    #[test]
    fn return_categories_use_return_template() {
        let records = vec![record(1, "R1", LossCategory::NoReimbursement, 1, 1500, (2025, 6, 1))];
        let text = claim_text(&group_records(&records)[0]);
        assert!(text.contains("customer-returned"));
        assert!(text.contains("on 2025-06-01"));
    }
}
