//! Claim-case creation and export.
//!
//! Case selection and linking happen here; the grouping arithmetic and
//! narrative templates live in the engine crate and stay pure.

use chrono::NaiveDate;
use rusqlite::params;

use recoup_engine::cases::{case_reference, claim_text, group_records, CaseRecord};
use recoup_engine::LossCategory;
use recoup_engine::money::format_cents;

use crate::error::StoreError;
use crate::store::LossStore;

/// One persisted claim case.
#[derive(Debug, Clone)]
pub struct ClaimCase {
    pub id: i64,
    pub reference: String,
    pub merchant_id: String,
    pub sku: String,
    pub category: LossCategory,
    pub title: String,
    pub quantity: i64,
    pub total_value_cents: i64,
    pub earliest_incident: NaiveDate,
    pub latest_incident: NaiveDate,
    pub item_count: i64,
    pub claim_text: String,
}

impl LossStore {
    /// Bundle the audit run's unlinked, unreimbursed, window-eligible loss
    /// records into one claim case per (SKU, category) and link the records,
    /// atomically.
    ///
    /// Re-running for the same audit is a no-op: linked records leave the
    /// selection, so an empty second pass creates nothing.
    pub fn create_cases(
        &mut self,
        run_id: &str,
        merchant_id: &str,
        as_of: NaiveDate,
        cutoff: NaiveDate,
    ) -> Result<Vec<ClaimCase>, StoreError> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let tx = self.conn().transaction()?;
        let mut cases = Vec::new();

        let candidates: Vec<CaseRecord> = {
            let mut stmt = tx.prepare(
                "SELECT id, sku, category, quantity, total_value_cents, incident_date \
                 FROM loss_records \
                 WHERE run_id = ?1 AND merchant_id = ?2 AND case_id IS NULL \
                   AND is_reimbursed = 0 AND incident_date < ?3 \
                 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![run_id, merchant_id, cutoff.to_string()], |row| {
                let category_token: String = row.get(2)?;
                let date_text: String = row.get(5)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    category_token,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    date_text,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, sku, category_token, quantity, total_value_cents, date_text) = row?;
                let Some(category) = LossCategory::parse(&category_token) else {
                    log::warn!("record {id}: unknown category '{category_token}', not grouped");
                    continue;
                };
                let Ok(incident_date) = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d") else {
                    log::warn!("record {id}: bad incident date '{date_text}', not grouped");
                    continue;
                };
                records.push(CaseRecord {
                    id,
                    sku,
                    category,
                    quantity,
                    total_value_cents,
                    incident_date,
                });
            }
            records
        };

        for group in group_records(&candidates) {
            let reference = case_reference(as_of, &group);
            let text = claim_text(&group);
            tx.execute(
                "INSERT INTO claim_cases (reference, merchant_id, sku, category, title, \
                 quantity, total_value_cents, earliest_incident, latest_incident, item_count, \
                 claim_text, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    reference,
                    merchant_id,
                    group.sku,
                    group.category.as_str(),
                    group.title(),
                    group.quantity,
                    group.total_value_cents,
                    group.earliest_incident.to_string(),
                    group.latest_incident.to_string(),
                    group.item_count() as i64,
                    text,
                    created_at,
                ],
            )?;
            let case_id = tx.last_insert_rowid();

            {
                let mut link = tx.prepare("UPDATE loss_records SET case_id = ?1 WHERE id = ?2")?;
                for record_id in &group.record_ids {
                    link.execute(params![case_id, record_id])?;
                }
            }

            cases.push(ClaimCase {
                id: case_id,
                reference,
                merchant_id: merchant_id.to_string(),
                sku: group.sku.clone(),
                category: group.category,
                title: group.title(),
                quantity: group.quantity,
                total_value_cents: group.total_value_cents,
                earliest_incident: group.earliest_incident,
                latest_incident: group.latest_incident,
                item_count: group.item_count() as i64,
                claim_text: text,
            });
        }

        tx.commit()?;
        log::info!(
            "run {run_id}: created {} claim cases for merchant {merchant_id}",
            cases.len()
        );
        Ok(cases)
    }

    pub fn cases_for_merchant(&self, merchant_id: &str) -> Result<Vec<ClaimCase>, StoreError> {
        let mut stmt = self.conn_ref().prepare(
            "SELECT id, reference, merchant_id, sku, category, title, quantity, \
             total_value_cents, earliest_incident, latest_incident, item_count, claim_text \
             FROM claim_cases WHERE merchant_id = ?1 ORDER BY total_value_cents DESC, id",
        )?;
        let rows = stmt.query_map(params![merchant_id], |row| {
            let category_token: String = row.get(4)?;
            let earliest: String = row.get(8)?;
            let latest: String = row.get(9)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                category_token,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
                earliest,
                latest,
                row.get::<_, i64>(10)?,
                row.get::<_, String>(11)?,
            ))
        })?;

        let mut cases = Vec::new();
        for row in rows {
            let (
                id,
                reference,
                merchant,
                sku,
                category_token,
                title,
                quantity,
                total_value_cents,
                earliest,
                latest,
                item_count,
                text,
            ) = row?;
            let Some(category) = LossCategory::parse(&category_token) else {
                log::warn!("case {id}: unknown category '{category_token}', skipped");
                continue;
            };
            let (Ok(earliest_incident), Ok(latest_incident)) = (
                NaiveDate::parse_from_str(&earliest, "%Y-%m-%d"),
                NaiveDate::parse_from_str(&latest, "%Y-%m-%d"),
            ) else {
                log::warn!("case {id}: bad incident dates, skipped");
                continue;
            };
            cases.push(ClaimCase {
                id,
                reference,
                merchant_id: merchant,
                sku,
                category,
                title,
                quantity,
                total_value_cents,
                earliest_incident,
                latest_incident,
                item_count,
                claim_text: text,
            });
        }
        Ok(cases)
    }
}

/// Render a case as the submittable plain-text document.
pub fn export_case_text(case: &ClaimCase) -> String {
    let mut out = String::new();
    out.push_str("==========================================\n");
    out.push_str("        INVENTORY REIMBURSEMENT CLAIM\n");
    out.push_str("==========================================\n\n");
    out.push_str(&format!("Case reference:   {}\n", case.reference));
    out.push_str(&format!("Claim type:       {}\n", case.category.label()));
    out.push_str(&format!("SKU:              {}\n", case.sku));
    out.push_str(&format!("Units affected:   {}\n", case.quantity));
    out.push_str(&format!("Ledger events:    {}\n", case.item_count));
    out.push_str(&format!(
        "Incident window:  {} to {}\n",
        case.earliest_incident, case.latest_incident
    ));
    out.push_str(&format!(
        "Claimed value:    {}\n\n",
        format_cents(case.total_value_cents)
    ));
    out.push_str(&case.claim_text);
    out.push('\n');
    out
}
