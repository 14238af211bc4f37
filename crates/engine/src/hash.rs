use sha2::{Digest, Sha256};

use crate::model::LossCandidate;

/// Content hash identifying one physical loss event across audit runs.
///
/// The tuple (merchant, SKU, incident date, transaction reference, quantity,
/// category) is the single idempotency key: re-running reconciliation over
/// the same underlying data, or two detectors firing on the same row, must
/// always produce the same digest.
pub fn candidate_hash(merchant_id: &str, candidate: &LossCandidate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(merchant_id.as_bytes());
    for field in [
        candidate.sku.as_str(),
        &candidate.incident_date.to_string(),
        &candidate.transaction_ref,
        &candidate.quantity.to_string(),
        candidate.category.as_str(),
    ] {
        hasher.update(b"|");
        hasher.update(field.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
