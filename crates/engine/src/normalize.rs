//! Report normalization: maps the heterogeneous column names used by the
//! different report types onto canonical typed rows.
//!
//! Each canonical column is satisfied by the first matching alias; matching
//! is case-insensitive with `-`, `_` and spaces treated as the same
//! separator. Malformed cells exclude the affected field (or row), never the
//! whole table.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{
    AdjustmentRow, InventoryRow, NormalizedReports, ReimbursementRow, ReportKind, ReturnRow,
    ShipmentRow,
};
use crate::money::{parse_cents, parse_quantity};
use crate::table::ReportTable;

// ---------------------------------------------------------------------------
// Alias tables
// ---------------------------------------------------------------------------

type AliasTable = &'static [(&'static str, &'static [&'static str])];

const ADJUSTMENT_ALIASES: AliasTable = &[
    ("adjusted_date", &["adjusted-date", "date"]),
    ("sku", &["sku", "seller-sku", "msku"]),
    ("fnsku", &["fnsku", "fn-sku"]),
    ("asin", &["asin"]),
    ("reason", &["reason"]),
    ("quantity", &["quantity", "qty"]),
    (
        "fulfillment_center",
        &["fulfillment-center-id", "fc-id", "warehouse"],
    ),
    ("transaction_id", &["transaction-item-id", "transaction-id"]),
];

const REIMBURSEMENT_ALIASES: AliasTable = &[
    ("reimbursement_id", &["reimbursement-id"]),
    ("case_id", &["case-id"]),
    ("approval_date", &["approval-date", "date"]),
    ("sku", &["sku", "seller-sku"]),
    ("fnsku", &["fnsku"]),
    ("asin", &["asin"]),
    ("reason", &["reason"]),
    ("quantity", &["quantity-reimbursed-cash", "quantity", "qty"]),
    ("amount", &["amount-total", "amount", "reimbursement-amount"]),
    ("currency", &["currency-unit", "currency"]),
];

const RETURN_ALIASES: AliasTable = &[
    ("return_date", &["return-date", "date"]),
    ("order_id", &["order-id", "amazon-order-id"]),
    ("sku", &["sku", "seller-sku"]),
    ("asin", &["asin"]),
    ("fnsku", &["fnsku"]),
    ("quantity", &["quantity", "qty"]),
    ("status", &["status", "detailed-disposition"]),
    ("reason", &["reason", "customer-reason"]),
];

const SHIPMENT_ALIASES: AliasTable = &[
    ("shipment_id", &["shipment-id", "fba-shipment-id"]),
    ("shipment_date", &["shipment-date", "ship-date"]),
    ("order_id", &["amazon-order-id", "order-id"]),
    ("sku", &["sku", "seller-sku"]),
    ("fnsku", &["fnsku"]),
    ("quantity_shipped", &["quantity-shipped", "shipped-quantity"]),
    (
        "quantity_received",
        &["quantity-received", "received-quantity"],
    ),
    ("quantity", &["quantity", "qty"]),
    ("status", &["shipment-status", "status"]),
    ("item_price", &["item-price", "price"]),
];

const INVENTORY_ALIASES: AliasTable = &[
    ("sku", &["sku", "seller-sku"]),
    ("fnsku", &["fnsku"]),
    ("asin", &["asin"]),
    (
        "inbound_shipped",
        &["afn-inbound-shipped-quantity", "inbound-shipped-quantity", "inbound-shipped"],
    ),
    (
        "total_quantity",
        &["afn-total-quantity", "total-quantity"],
    ),
    (
        "inbound_receiving",
        &["afn-inbound-receiving-quantity", "inbound-receiving-quantity"],
    ),
    ("price", &["your-price", "price"]),
];

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Lower-case and unify `-`/`_`/space so `Adjusted_Date`, `adjusted-date`
/// and `adjusted date` all resolve to the same name.
fn canonical_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c == ' ' { '-' } else { c })
        .collect()
}

struct Columns<'t> {
    table: &'t ReportTable,
    index: HashMap<&'static str, usize>,
}

impl<'t> Columns<'t> {
    fn resolve(table: &'t ReportTable, kind: ReportKind, aliases: AliasTable) -> Self {
        let headers: Vec<String> = table.headers.iter().map(|h| canonical_name(h)).collect();

        let mut index = HashMap::new();
        for (canonical, names) in aliases {
            let found = names
                .iter()
                .find_map(|name| headers.iter().position(|h| *h == canonical_name(name)));
            match found {
                Some(pos) => {
                    index.insert(*canonical, pos);
                }
                None => {
                    log::debug!("{kind}: no source column for '{canonical}'");
                }
            }
        }
        Self { table, index }
    }

    fn text(&self, row: usize, name: &str) -> String {
        self.index
            .get(name)
            .map(|&col| self.table.cell(row, col).trim().to_string())
            .unwrap_or_default()
    }

    fn date(&self, row: usize, name: &str) -> Option<NaiveDate> {
        parse_report_date(&self.text(row, name))
    }

    fn quantity(&self, row: usize, name: &str) -> Option<i64> {
        parse_quantity(&self.text(row, name))
    }

    fn cents(&self, row: usize, name: &str) -> Option<i64> {
        parse_cents(&self.text(row, name))
    }
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];

/// Parse a report date. ISO datetimes ("2025-11-03T04:00:00+00:00") are
/// accepted via their leading date part. Unparseable input yields `None`;
/// callers must then drop the row from detection, never default to today.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let head = trimmed.get(..10).unwrap_or(trimmed);
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(head, format) {
            return Some(date);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Per-category normalizers
// ---------------------------------------------------------------------------

/// Adjustments ledger. Rows with zero or unparseable net quantity are
/// dropped here so detectors never see a silently-coerced zero.
pub fn normalize_adjustments(table: &ReportTable) -> Vec<AdjustmentRow> {
    let cols = Columns::resolve(table, ReportKind::Adjustments, ADJUSTMENT_ALIASES);
    let mut rows = Vec::new();

    for i in 0..table.len() {
        let quantity = match cols.quantity(i, "quantity") {
            Some(0) | None => continue,
            Some(q) => q,
        };
        let reason = cols.text(i, "reason");
        let reason_code = reason
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default();
        let mut transaction_id = cols.text(i, "transaction_id");
        if transaction_id.is_empty() {
            transaction_id = format!("ADJ_{i}");
        }

        rows.push(AdjustmentRow {
            sku: cols.text(i, "sku"),
            fnsku: cols.text(i, "fnsku"),
            asin: cols.text(i, "asin"),
            quantity,
            reason,
            reason_code,
            adjusted_date: cols.date(i, "adjusted_date"),
            fulfillment_center: cols.text(i, "fulfillment_center"),
            transaction_id,
        });
    }

    log::debug!(
        "adjustments: {} of {} rows kept after zero-quantity filter",
        rows.len(),
        table.len()
    );
    rows
}

/// Reimbursement history. Only strictly-positive amounts are kept; the rest
/// carry no value signal.
pub fn normalize_reimbursements(table: &ReportTable) -> Vec<ReimbursementRow> {
    let cols = Columns::resolve(table, ReportKind::Reimbursements, REIMBURSEMENT_ALIASES);
    let mut rows = Vec::new();

    for i in 0..table.len() {
        let amount_cents = match cols.cents(i, "amount") {
            Some(a) if a > 0 => a,
            _ => continue,
        };
        rows.push(ReimbursementRow {
            reimbursement_id: cols.text(i, "reimbursement_id"),
            case_id: cols.text(i, "case_id"),
            sku: cols.text(i, "sku"),
            fnsku: cols.text(i, "fnsku"),
            asin: cols.text(i, "asin"),
            reason: cols.text(i, "reason"),
            quantity: cols.quantity(i, "quantity").unwrap_or(0),
            amount_cents,
            approval_date: cols.date(i, "approval_date"),
            currency: cols.text(i, "currency"),
        });
    }
    rows
}

pub fn normalize_returns(table: &ReportTable) -> Vec<ReturnRow> {
    let cols = Columns::resolve(table, ReportKind::Returns, RETURN_ALIASES);
    let mut rows = Vec::new();

    for i in 0..table.len() {
        rows.push(ReturnRow {
            order_id: cols.text(i, "order_id"),
            sku: cols.text(i, "sku"),
            fnsku: cols.text(i, "fnsku"),
            asin: cols.text(i, "asin"),
            quantity: cols.quantity(i, "quantity").unwrap_or(1),
            status: cols.text(i, "status"),
            reason: cols.text(i, "reason"),
            return_date: cols.date(i, "return_date"),
        });
    }
    rows
}

pub fn normalize_shipments(table: &ReportTable) -> Vec<ShipmentRow> {
    let cols = Columns::resolve(table, ReportKind::Shipments, SHIPMENT_ALIASES);
    let mut rows = Vec::new();

    for i in 0..table.len() {
        let mut quantity_shipped = cols.quantity(i, "quantity_shipped").unwrap_or(0);
        if quantity_shipped == 0 {
            // Outbound/fulfillment reports carry a plain quantity column.
            quantity_shipped = cols.quantity(i, "quantity").unwrap_or(0);
        }
        let mut shipment_id = cols.text(i, "shipment_id");
        if shipment_id.is_empty() {
            shipment_id = format!("SHIP_{i}");
        }

        rows.push(ShipmentRow {
            shipment_id,
            order_id: cols.text(i, "order_id"),
            sku: cols.text(i, "sku"),
            fnsku: cols.text(i, "fnsku"),
            quantity_shipped,
            quantity_received: cols.quantity(i, "quantity_received").unwrap_or(0),
            status: cols.text(i, "status"),
            shipment_date: cols.date(i, "shipment_date"),
            item_price_cents: cols.cents(i, "item_price"),
        });
    }
    rows
}

pub fn normalize_inventory(table: &ReportTable) -> Vec<InventoryRow> {
    let cols = Columns::resolve(table, ReportKind::Inventory, INVENTORY_ALIASES);
    let mut rows = Vec::new();

    for i in 0..table.len() {
        rows.push(InventoryRow {
            sku: cols.text(i, "sku"),
            fnsku: cols.text(i, "fnsku"),
            asin: cols.text(i, "asin"),
            inbound_shipped: cols.quantity(i, "inbound_shipped").unwrap_or(0),
            total_quantity: cols.quantity(i, "total_quantity").unwrap_or(0),
            inbound_receiving: cols.quantity(i, "inbound_receiving").unwrap_or(0),
            price_cents: cols.cents(i, "price"),
        });
    }
    rows
}

// ---------------------------------------------------------------------------
// Batch dispatch
// ---------------------------------------------------------------------------

/// Normalize all tagged tables of one reconciliation batch. Tables with an
/// unknown category tag are ignored with a warning; the detectors that
/// would have consumed them simply see empty input.
pub fn normalize_reports(tables: &HashMap<String, ReportTable>) -> NormalizedReports {
    let mut out = NormalizedReports::default();

    for (tag, table) in tables {
        match ReportKind::from_tag(tag) {
            Some(ReportKind::Adjustments) => {
                out.adjustments.extend(normalize_adjustments(table));
            }
            Some(ReportKind::Reimbursements) => {
                out.reimbursements.extend(normalize_reimbursements(table));
            }
            Some(ReportKind::Returns) => out.returns.extend(normalize_returns(table)),
            Some(ReportKind::Shipments) => out.shipments.extend(normalize_shipments(table)),
            Some(ReportKind::Inventory) => out.inventory.extend(normalize_inventory(table)),
            None => {
                log::warn!(
                    "unknown report category '{tag}': {} rows not analyzed",
                    table.len()
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ReportTable;

    fn table(csv: &str) -> ReportTable {
        ReportTable::from_delimited("test", csv, b',').unwrap()
    }

    #[test]
    fn dates_parse_common_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        assert_eq!(parse_report_date("2025-11-03"), Some(expected));
        assert_eq!(
            parse_report_date("2025-11-03T04:00:00+00:00"),
            Some(expected)
        );
        assert_eq!(parse_report_date("03/11/2025"), Some(expected));
        assert_eq!(parse_report_date(""), None);
        assert_eq!(parse_report_date("soon"), None);
    }

    #[test]
    fn alias_matching_ignores_case_and_separators() {
        let t = table("Seller_SKU,Adjusted Date,Quantity,Reason\nS1,2025-01-10,-3,M\n");
        let rows = normalize_adjustments(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sku, "S1");
        assert_eq!(rows[0].quantity, -3);
        assert_eq!(
            rows[0].adjusted_date,
            NaiveDate::from_ymd_opt(2025, 1, 10)
        );
    }

    #[test]
    fn first_alias_wins() {
        // Both "amount-total" and "amount" present: amount-total is listed
        // first and must win.
        let t = table("sku,quantity,amount,amount-total\nS1,2,1.00,9.00\n");
        let rows = normalize_reimbursements(&t);
        assert_eq!(rows[0].amount_cents, 900);
    }

    #[test]
    fn zero_quantity_adjustments_dropped() {
        let t = table(
            "sku,adjusted-date,quantity,reason\nS1,2025-01-10,0,M\nS2,2025-01-10,-2,M\nS3,2025-01-10,oops,M\n",
        );
        let rows = normalize_adjustments(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sku, "S2");
    }

    #[test]
    fn unparseable_date_becomes_none() {
        let t = table("sku,adjusted-date,quantity,reason\nS1,pending,-2,M\n");
        let rows = normalize_adjustments(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].adjusted_date, None);
    }

    #[test]
    fn reason_code_is_first_character_uppercased() {
        let t = table("sku,adjusted-date,quantity,reason\nS1,2025-01-10,-2,m-missing\n");
        let rows = normalize_adjustments(&t);
        assert_eq!(rows[0].reason_code, "M");
    }

    #[test]
    fn missing_transaction_id_gets_row_fallback() {
        let t = table("sku,adjusted-date,quantity,reason\nS1,2025-01-10,-2,M\n");
        let rows = normalize_adjustments(&t);
        assert_eq!(rows[0].transaction_id, "ADJ_0");
    }

    #[test]
    fn non_positive_reimbursements_dropped() {
        let t = table(
            "sku,quantity,amount\nS1,2,20.00\nS2,1,0\nS3,1,-5.00\nS4,1,n/a\n",
        );
        let rows = normalize_reimbursements(&t);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sku, "S1");
        assert_eq!(rows[0].amount_cents, 2000);
    }

    #[test]
    fn return_quantity_defaults_to_one() {
        let t = table("order-id,sku,detailed-disposition\nO1,S1,SELLABLE\n");
        let rows = normalize_returns(&t);
        assert_eq!(rows[0].quantity, 1);
        assert_eq!(rows[0].status, "SELLABLE");
    }

    #[test]
    fn shipment_falls_back_to_plain_quantity() {
        let t = table("sku,quantity,shipment-status\nS1,3,Lost in transit\n");
        let rows = normalize_shipments(&t);
        assert_eq!(rows[0].quantity_shipped, 3);
        assert_eq!(rows[0].status, "Lost in transit");
    }

    #[test]
    fn inventory_snapshot_columns() {
        let t = table(
            "sku,afn-inbound-shipped-quantity,afn-total-quantity,afn-inbound-receiving-quantity,your-price\nS1,25,0,0,12.00\n",
        );
        let rows = normalize_inventory(&t);
        assert_eq!(rows[0].inbound_shipped, 25);
        assert_eq!(rows[0].total_quantity, 0);
        assert_eq!(rows[0].inbound_receiving, 0);
        assert_eq!(rows[0].price_cents, Some(1200));
    }

    #[test]
    fn unknown_tag_is_ignored() {
        let mut tables = HashMap::new();
        tables.insert(
            "SETTLEMENT_REPORT".to_string(),
            table("sku,quantity\nS1,1\n"),
        );
        let normalized = normalize_reports(&tables);
        assert_eq!(normalized.row_count(), 0);
    }

    #[test]
    fn dispatch_routes_by_tag() {
        let mut tables = HashMap::new();
        tables.insert(
            "FBA_INVENTORY_ADJUSTMENTS".to_string(),
            table("sku,adjusted-date,quantity,reason\nS1,2025-01-10,-2,M\n"),
        );
        tables.insert(
            "FBA_REIMBURSEMENTS".to_string(),
            table("sku,quantity,amount\nS1,2,20.00\n"),
        );
        let normalized = normalize_reports(&tables);
        assert_eq!(normalized.adjustments.len(), 1);
        assert_eq!(normalized.reimbursements.len(), 1);
    }
}
