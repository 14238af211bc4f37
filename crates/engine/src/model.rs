use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Report categories
// ---------------------------------------------------------------------------

/// The report categories the engine knows how to normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Adjustments,
    Reimbursements,
    Returns,
    Shipments,
    /// Raw inventory snapshot (not the adjustments ledger).
    Inventory,
}

impl ReportKind {
    /// Classify a free-form report tag. Tags come from the external report
    /// retrieval layer and vary by marketplace, so matching is by substring
    /// on the upper-cased tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let upper = tag.to_uppercase();
        if upper.contains("ADJUSTMENT") {
            Some(Self::Adjustments)
        } else if upper.contains("REIMBURSEMENT") {
            Some(Self::Reimbursements)
        } else if upper.contains("RETURN") {
            Some(Self::Returns)
        } else if upper.contains("SHIPMENT") || upper.contains("FULFILLED") {
            Some(Self::Shipments)
        } else if upper.contains("INVENTORY") {
            Some(Self::Inventory)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adjustments => write!(f, "adjustments"),
            Self::Reimbursements => write!(f, "reimbursements"),
            Self::Returns => write!(f, "returns"),
            Self::Shipments => write!(f, "shipments"),
            Self::Inventory => write!(f, "inventory"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical rows
// ---------------------------------------------------------------------------

/// One inventory adjustment. Zero-quantity rows are dropped at
/// normalization; `adjusted_date` stays `None` for unparseable dates and the
/// row is then ignored by detection.
#[derive(Debug, Clone)]
pub struct AdjustmentRow {
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    pub quantity: i64,
    pub reason: String,
    /// First character of the reason, upper-cased.
    pub reason_code: String,
    pub adjusted_date: Option<NaiveDate>,
    pub fulfillment_center: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone)]
pub struct ReimbursementRow {
    pub reimbursement_id: String,
    pub case_id: String,
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    pub reason: String,
    pub quantity: i64,
    pub amount_cents: i64,
    pub approval_date: Option<NaiveDate>,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct ReturnRow {
    pub order_id: String,
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    /// Defaults to 1 when the report omits it.
    pub quantity: i64,
    pub status: String,
    pub reason: String,
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ShipmentRow {
    pub shipment_id: String,
    pub order_id: String,
    pub sku: String,
    pub fnsku: String,
    pub quantity_shipped: i64,
    pub quantity_received: i64,
    pub status: String,
    pub shipment_date: Option<NaiveDate>,
    pub item_price_cents: Option<i64>,
}

impl ShipmentRow {
    /// Units shipped into the facility but never booked as received.
    pub fn quantity_discrepancy(&self) -> i64 {
        self.quantity_shipped - self.quantity_received
    }
}

/// One row of a raw inventory snapshot. The snapshot carries no event date.
#[derive(Debug, Clone)]
pub struct InventoryRow {
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    pub inbound_shipped: i64,
    pub total_quantity: i64,
    pub inbound_receiving: i64,
    pub price_cents: Option<i64>,
}

/// All normalized tables for one reconciliation batch.
#[derive(Debug, Default)]
pub struct NormalizedReports {
    pub adjustments: Vec<AdjustmentRow>,
    pub reimbursements: Vec<ReimbursementRow>,
    pub returns: Vec<ReturnRow>,
    pub shipments: Vec<ShipmentRow>,
    pub inventory: Vec<InventoryRow>,
}

impl NormalizedReports {
    pub fn row_count(&self) -> usize {
        self.adjustments.len()
            + self.reimbursements.len()
            + self.returns.len()
            + self.shipments.len()
            + self.inventory.len()
    }
}

// ---------------------------------------------------------------------------
// Loss categories
// ---------------------------------------------------------------------------

/// Fixed set of claimable discrepancy categories. The `as_str` token is
/// stable: it feeds the dedup hash and the store, so variants must never be
/// renamed without a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCategory {
    LostInbound,
    LostWarehouse,
    DamagedWarehouse,
    Destroyed,
    CustomerReturnLost,
    CustomerReturnDamaged,
    NoReimbursement,
}

impl LossCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LostInbound => "lost_inbound",
            Self::LostWarehouse => "lost_warehouse",
            Self::DamagedWarehouse => "damaged_warehouse",
            Self::Destroyed => "destroyed",
            Self::CustomerReturnLost => "return_lost",
            Self::CustomerReturnDamaged => "return_damaged",
            Self::NoReimbursement => "no_reimbursement",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "lost_inbound" => Some(Self::LostInbound),
            "lost_warehouse" => Some(Self::LostWarehouse),
            "damaged_warehouse" => Some(Self::DamagedWarehouse),
            "destroyed" => Some(Self::Destroyed),
            "return_lost" => Some(Self::CustomerReturnLost),
            "return_damaged" => Some(Self::CustomerReturnDamaged),
            "no_reimbursement" => Some(Self::NoReimbursement),
            _ => None,
        }
    }

    /// Human-readable label used in case titles and claim documents.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LostInbound => "Lost during inbound",
            Self::LostWarehouse => "Lost in warehouse",
            Self::DamagedWarehouse => "Damaged in warehouse",
            Self::Destroyed => "Destroyed by the platform",
            Self::CustomerReturnLost => "Customer return never received",
            Self::CustomerReturnDamaged => "Customer return damaged",
            Self::NoReimbursement => "Return not reimbursed",
        }
    }
}

impl std::fmt::Display for LossCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Loss candidates
// ---------------------------------------------------------------------------

/// One detected discrepancy, not yet deduplicated or persisted.
#[derive(Debug, Clone, Serialize)]
pub struct LossCandidate {
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    pub category: LossCategory,
    pub quantity: i64,
    pub unit_value_cents: i64,
    pub total_value_cents: i64,
    pub incident_date: NaiveDate,
    /// Source transaction / order reference; part of the dedup identity.
    pub transaction_ref: String,
    pub order_id: String,
    pub fulfillment_center: String,
    pub reason_code: String,
    pub reason_note: String,
}

// ---------------------------------------------------------------------------
// Detection output
// ---------------------------------------------------------------------------

/// Rows a detector looked at but deliberately did not turn into candidates.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    /// Incident not yet strictly older than the claim cutoff.
    pub too_recent: usize,
    /// Matched an existing reimbursement.
    pub already_reimbursed: usize,
    /// Adjustment reason code with no category mapping.
    pub unmapped_reason: usize,
    /// Row had no parseable incident date.
    pub missing_date: usize,
}

impl SkipCounts {
    pub fn absorb(&mut self, other: SkipCounts) {
        self.too_recent += other.too_recent;
        self.already_reimbursed += other.already_reimbursed;
        self.unmapped_reason += other.unmapped_reason;
        self.missing_date += other.missing_date;
    }
}

/// Result of one detector invocation.
#[derive(Debug, Default)]
pub struct Detection {
    pub candidates: Vec<LossCandidate>,
    pub skipped: SkipCounts,
}

/// Result of a full detection pass, before persistence.
#[derive(Debug)]
pub struct DetectionRun {
    pub candidates: Vec<LossCandidate>,
    pub stats: RunStats,
}

#[derive(Debug, Default, Serialize)]
pub struct RunStats {
    pub rows_analyzed: usize,
    pub losses_detected: usize,
    pub skipped: SkipCounts,
    pub total_value_cents: i64,
    pub by_category: BTreeMap<String, usize>,
    pub by_detector: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counts surfaced to the external notification layer after persistence.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub merchant_id: String,
    pub as_of: NaiveDate,
    pub losses_detected: usize,
    pub losses_saved: usize,
    pub duplicates_skipped: usize,
    pub too_recent_skipped: usize,
    pub already_reimbursed_skipped: usize,
    pub unmapped_reason_skipped: usize,
    pub cases_created: usize,
    pub total_value_cents: i64,
    pub by_category: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_kind_from_tag() {
        assert_eq!(
            ReportKind::from_tag("GET_LEDGER_SUMMARY_ADJUSTMENTS"),
            Some(ReportKind::Adjustments)
        );
        assert_eq!(
            ReportKind::from_tag("fba_reimbursements_data"),
            Some(ReportKind::Reimbursements)
        );
        assert_eq!(
            ReportKind::from_tag("CUSTOMER_RETURNS"),
            Some(ReportKind::Returns)
        );
        assert_eq!(
            ReportKind::from_tag("AMAZON_FULFILLED_SHIPMENTS"),
            Some(ReportKind::Shipments)
        );
        assert_eq!(
            ReportKind::from_tag("FBA_MYI_INVENTORY"),
            Some(ReportKind::Inventory)
        );
        assert_eq!(ReportKind::from_tag("SETTLEMENT_REPORT"), None);
    }

    #[test]
    fn adjustment_tag_wins_over_inventory() {
        // "INVENTORY_ADJUSTMENTS" must land on the adjustments ledger, not
        // the raw snapshot.
        assert_eq!(
            ReportKind::from_tag("INVENTORY_ADJUSTMENTS"),
            Some(ReportKind::Adjustments)
        );
    }

    #[test]
    fn category_token_round_trip() {
        for cat in [
            LossCategory::LostInbound,
            LossCategory::LostWarehouse,
            LossCategory::DamagedWarehouse,
            LossCategory::Destroyed,
            LossCategory::CustomerReturnLost,
            LossCategory::CustomerReturnDamaged,
            LossCategory::NoReimbursement,
        ] {
            assert_eq!(LossCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(LossCategory::parse("overcharged_fee"), None);
    }

    #[test]
    fn shipment_discrepancy() {
        let row = ShipmentRow {
            shipment_id: "FBA1".into(),
            order_id: String::new(),
            sku: "X".into(),
            fnsku: String::new(),
            quantity_shipped: 30,
            quantity_received: 28,
            status: String::new(),
            shipment_date: None,
            item_price_cents: None,
        };
        assert_eq!(row.quantity_discrepancy(), 2);
    }
}
