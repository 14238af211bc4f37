//! SQLite-backed loss record store.
//!
//! `unique_hash` (the engine's content hash) carries the idempotency
//! guarantee: a candidate whose hash is already present, in any earlier run,
//! is counted as a duplicate and not written again.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use recoup_engine::{candidate_hash, LossCandidate, LossCategory};

use crate::error::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS loss_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    merchant_id TEXT NOT NULL,
    sku TEXT NOT NULL,
    fnsku TEXT NOT NULL DEFAULT '',
    asin TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_value_cents INTEGER NOT NULL,
    total_value_cents INTEGER NOT NULL,
    incident_date TEXT NOT NULL,        -- ISO-8601, sorts chronologically
    transaction_ref TEXT NOT NULL,
    order_id TEXT NOT NULL DEFAULT '',
    fulfillment_center TEXT NOT NULL DEFAULT '',
    reason_code TEXT NOT NULL DEFAULT '',
    reason_note TEXT NOT NULL DEFAULT '',
    unique_hash TEXT NOT NULL UNIQUE,
    is_reimbursed INTEGER NOT NULL DEFAULT 0,
    case_id INTEGER REFERENCES claim_cases(id),
    detected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_loss_records_sku ON loss_records(sku);
CREATE INDEX IF NOT EXISTS idx_loss_records_category ON loss_records(category);
CREATE INDEX IF NOT EXISTS idx_loss_records_run ON loss_records(run_id);

CREATE TABLE IF NOT EXISTS claim_cases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reference TEXT NOT NULL UNIQUE,
    merchant_id TEXT NOT NULL,
    sku TEXT NOT NULL,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    total_value_cents INTEGER NOT NULL,
    earliest_incident TEXT NOT NULL,
    latest_incident TEXT NOT NULL,
    item_count INTEGER NOT NULL,
    claim_text TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// One persisted loss record.
#[derive(Debug, Clone)]
pub struct LossRecord {
    pub id: i64,
    pub run_id: String,
    pub merchant_id: String,
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    pub category: LossCategory,
    pub quantity: i64,
    pub unit_value_cents: i64,
    pub total_value_cents: i64,
    pub incident_date: NaiveDate,
    pub transaction_ref: String,
    pub order_id: String,
    pub fulfillment_center: String,
    pub reason_code: String,
    pub reason_note: String,
    pub unique_hash: String,
    pub is_reimbursed: bool,
    pub case_id: Option<i64>,
}

/// Outcome of one `save_batch` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: usize,
    pub duplicates_skipped: usize,
}

pub struct LossStore {
    conn: Connection,
}

const RECORD_COLUMNS: &str = "id, run_id, merchant_id, sku, fnsku, asin, category, quantity, \
     unit_value_cents, total_value_cents, incident_date, transaction_ref, order_id, \
     fulfillment_center, reason_code, reason_note, unique_hash, is_reimbursed, case_id";

fn text_error(detail: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, detail.into())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<LossRecord> {
    let category_token: String = row.get("category")?;
    let category = LossCategory::parse(&category_token)
        .ok_or_else(|| text_error(format!("unknown loss category '{category_token}'")))?;
    let date_text: String = row.get("incident_date")?;
    let incident_date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d")
        .map_err(|e| text_error(format!("bad incident date '{date_text}': {e}")))?;

    Ok(LossRecord {
        id: row.get("id")?,
        run_id: row.get("run_id")?,
        merchant_id: row.get("merchant_id")?,
        sku: row.get("sku")?,
        fnsku: row.get("fnsku")?,
        asin: row.get("asin")?,
        category,
        quantity: row.get("quantity")?,
        unit_value_cents: row.get("unit_value_cents")?,
        total_value_cents: row.get("total_value_cents")?,
        incident_date,
        transaction_ref: row.get("transaction_ref")?,
        order_id: row.get("order_id")?,
        fulfillment_center: row.get("fulfillment_center")?,
        reason_code: row.get("reason_code")?,
        reason_note: row.get("reason_note")?,
        unique_hash: row.get("unique_hash")?,
        is_reimbursed: row.get("is_reimbursed")?,
        case_id: row.get("case_id")?,
    })
}

impl LossStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub(crate) fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Persist one batch of candidates atomically. Every candidate whose
    /// content hash is new is inserted; already-seen hashes, including ones
    /// written earlier in the same batch, count as duplicates. Any failure
    /// rolls the whole batch back.
    pub fn save_batch(
        &mut self,
        run_id: &str,
        merchant_id: &str,
        candidates: &[LossCandidate],
    ) -> Result<SaveOutcome, StoreError> {
        let detected_at = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut outcome = SaveOutcome::default();

        {
            let mut seen = tx.prepare(
                "SELECT EXISTS(SELECT 1 FROM loss_records WHERE unique_hash = ?1)",
            )?;
            let mut insert = tx.prepare(
                "INSERT INTO loss_records (run_id, merchant_id, sku, fnsku, asin, category, \
                 quantity, unit_value_cents, total_value_cents, incident_date, transaction_ref, \
                 order_id, fulfillment_center, reason_code, reason_note, unique_hash, \
                 is_reimbursed, detected_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, 0, ?17)",
            )?;

            for candidate in candidates {
                let hash = candidate_hash(merchant_id, candidate);
                let exists: bool = seen.query_row(params![hash], |row| row.get(0))?;
                if exists {
                    outcome.duplicates_skipped += 1;
                    continue;
                }
                insert.execute(params![
                    run_id,
                    merchant_id,
                    candidate.sku,
                    candidate.fnsku,
                    candidate.asin,
                    candidate.category.as_str(),
                    candidate.quantity,
                    candidate.unit_value_cents,
                    candidate.total_value_cents,
                    candidate.incident_date.to_string(),
                    candidate.transaction_ref,
                    candidate.order_id,
                    candidate.fulfillment_center,
                    candidate.reason_code,
                    candidate.reason_note,
                    hash,
                    detected_at,
                ])?;
                outcome.saved += 1;
            }
        }

        tx.commit()?;
        log::info!(
            "run {run_id}: saved {} loss records, {} duplicates skipped",
            outcome.saved,
            outcome.duplicates_skipped
        );
        Ok(outcome)
    }

    pub fn records_for_run(&self, run_id: &str) -> Result<Vec<LossRecord>, StoreError> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM loss_records WHERE run_id = ?1 ORDER BY id"),
            params![run_id],
        )
    }

    pub fn records_for_sku(&self, sku: &str) -> Result<Vec<LossRecord>, StoreError> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM loss_records WHERE sku = ?1 ORDER BY id"),
            params![sku],
        )
    }

    pub fn records_by_category(
        &self,
        category: LossCategory,
    ) -> Result<Vec<LossRecord>, StoreError> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM loss_records WHERE category = ?1 ORDER BY id"),
            params![category.as_str()],
        )
    }

    pub fn unreimbursed_records(&self) -> Result<Vec<LossRecord>, StoreError> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM loss_records WHERE is_reimbursed = 0 ORDER BY id"
            ),
            params![],
        )
    }

    /// Flag a record as reimbursed so it drops out of case selection.
    pub fn mark_reimbursed(&mut self, record_id: i64) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE loss_records SET is_reimbursed = 1 WHERE id = ?1",
            params![record_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: record_id });
        }
        Ok(())
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LossRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, record_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
