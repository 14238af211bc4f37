use super::{DetectContext, LossDetector};
use crate::model::{Detection, LossCandidate, LossCategory, NormalizedReports};

/// Detects inbound shipments where fewer units were received than shipped.
pub struct InboundShipments;

impl LossDetector for InboundShipments {
    fn name(&self) -> &'static str {
        "inbound_shipments"
    }

    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection {
        let mut out = Detection::default();

        for row in &reports.shipments {
            let missing = row.quantity_discrepancy();
            if missing <= 0 {
                continue;
            }

            let Some(incident_date) = row.shipment_date else {
                out.skipped.missing_date += 1;
                continue;
            };
            if !ctx.is_claimable(incident_date) {
                out.skipped.too_recent += 1;
                continue;
            }

            let unit_value_cents = ctx.unit_value(&row.sku);
            out.candidates.push(LossCandidate {
                sku: row.sku.clone(),
                fnsku: row.fnsku.clone(),
                asin: String::new(),
                category: LossCategory::LostInbound,
                quantity: missing,
                unit_value_cents,
                total_value_cents: unit_value_cents * missing,
                incident_date,
                transaction_ref: format!("SHIP_{}", row.shipment_id),
                order_id: String::new(),
                fulfillment_center: String::new(),
                reason_code: "I".into(),
                reason_note: format!("Inbound shipment discrepancy: {}", row.shipment_id),
            });
        }

        log::info!(
            "inbound shipments: {} losses from {} rows",
            out.candidates.len(),
            reports.shipments.len()
        );
        out
    }
}

/// Detects inventory-snapshot anomalies: units shipped into the facility
/// that never appear as received or in stock. The snapshot carries no event
/// date, so the incident date is estimated from the run date.
pub struct InventoryInbound;

impl LossDetector for InventoryInbound {
    fn name(&self) -> &'static str {
        "inventory_inbound"
    }

    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection {
        let mut out = Detection::default();
        let incident_date = ctx.estimated_snapshot_date();

        for row in &reports.inventory {
            if row.inbound_shipped <= 0 || row.total_quantity != 0 || row.inbound_receiving != 0 {
                continue;
            }
            if !ctx.is_claimable(incident_date) {
                out.skipped.too_recent += 1;
                continue;
            }

            // Listed price wins over the reimbursement-derived estimate.
            let unit_value_cents = match row.price_cents {
                Some(price) if price > 0 => price,
                _ => ctx.unit_value(&row.sku),
            };

            out.candidates.push(LossCandidate {
                sku: row.sku.clone(),
                fnsku: row.fnsku.clone(),
                asin: row.asin.clone(),
                category: LossCategory::LostInbound,
                quantity: row.inbound_shipped,
                unit_value_cents,
                total_value_cents: unit_value_cents * row.inbound_shipped,
                incident_date,
                transaction_ref: format!("INV_INBOUND_{}", row.sku),
                order_id: String::new(),
                fulfillment_center: String::new(),
                reason_code: "INBOUND_LOST".into(),
                reason_note: format!(
                    "{} units shipped inbound but 0 in stock and 0 receiving",
                    row.inbound_shipped
                ),
            });
        }

        log::info!(
            "inventory inbound: {} losses from {} snapshot rows",
            out.candidates.len(),
            reports.inventory.len()
        );
        out
    }
}
