use chrono::NaiveDate;
use recoup_engine::{LossCandidate, LossCategory};
use recoup_store::{LossStore, SaveOutcome};

fn candidate(sku: &str, transaction_ref: &str, quantity: i64) -> LossCandidate {
    LossCandidate {
        sku: sku.into(),
        fnsku: String::new(),
        asin: String::new(),
        category: LossCategory::LostWarehouse,
        quantity,
        unit_value_cents: 1000,
        total_value_cents: 1000 * quantity,
        incident_date: NaiveDate::from_ymd_opt(2025, 8, 13).unwrap(),
        transaction_ref: transaction_ref.into(),
        order_id: String::new(),
        fulfillment_center: String::new(),
        reason_code: "M".into(),
        reason_note: String::new(),
    }
}

#[test]
fn dedup_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("losses.db");
    let batch = vec![candidate("A1", "TXN1", 5), candidate("A2", "TXN2", 2)];

    {
        let mut store = LossStore::open(&path).unwrap();
        let outcome = store.save_batch("run-1", "M1", &batch).unwrap();
        assert_eq!(outcome, SaveOutcome { saved: 2, duplicates_skipped: 0 });
    }

    // Same data through a fresh connection: hashes persist, nothing is saved
    // twice.
    let mut store = LossStore::open(&path).unwrap();
    let outcome = store.save_batch("run-2", "M1", &batch).unwrap();
    assert_eq!(outcome, SaveOutcome { saved: 0, duplicates_skipped: 2 });

    assert_eq!(store.records_for_run("run-1").unwrap().len(), 2);
    assert!(store.records_for_run("run-2").unwrap().is_empty());
}

#[test]
fn cases_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("losses.db");
    let as_of = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let cutoff = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();

    {
        let mut store = LossStore::open(&path).unwrap();
        store
            .save_batch("run-1", "M1", &[candidate("A1", "TXN1", 5)])
            .unwrap();
        assert_eq!(store.create_cases("run-1", "M1", as_of, cutoff).unwrap().len(), 1);
    }

    let mut store = LossStore::open(&path).unwrap();
    let cases = store.cases_for_merchant("M1").unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].quantity, 5);

    // Linked records stay linked across connections.
    assert!(store.create_cases("run-1", "M1", as_of, cutoff).unwrap().is_empty());
}
