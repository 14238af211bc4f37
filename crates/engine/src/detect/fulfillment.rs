use super::{DetectContext, LossDetector};
use crate::model::{Detection, LossCandidate, LossCategory, NormalizedReports};
use crate::money::div_round_half_up;

/// Detects fulfillment/transit losses from shipment status: units lost in
/// transit or damaged in the warehouse while being fulfilled.
pub struct FulfillmentLosses;

impl LossDetector for FulfillmentLosses {
    fn name(&self) -> &'static str {
        "fulfillment_losses"
    }

    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection {
        let mut out = Detection::default();

        for row in &reports.shipments {
            let status = row.status.to_lowercase().replace(' ', "_");
            let damaged = status.contains("damaged");
            if !damaged && !status.contains("lost") {
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

            let category = if damaged {
                LossCategory::DamagedWarehouse
            } else {
                LossCategory::LostWarehouse
            };
            let quantity = row.quantity_shipped.max(1);

            // Explicit line-item price is the shipped total; derive the unit
            // value from it when present, else fall back to the SKU map.
            let (unit_value_cents, total_value_cents) = match row.item_price_cents {
                Some(price) if price > 0 => (div_round_half_up(price, quantity), price),
                _ => {
                    let unit = ctx.unit_value(&row.sku);
                    (unit, unit * quantity)
                }
            };

            out.candidates.push(LossCandidate {
                sku: row.sku.clone(),
                fnsku: row.fnsku.clone(),
                asin: String::new(),
                category,
                quantity,
                unit_value_cents,
                total_value_cents,
                incident_date,
                transaction_ref: format!("FULFILL_{}", row.order_id),
                order_id: row.order_id.clone(),
                fulfillment_center: String::new(),
                reason_code: status.to_uppercase(),
                reason_note: format!("Fulfillment issue: {status}"),
            });
        }

        log::info!(
            "fulfillment losses: {} losses from {} shipment rows",
            out.candidates.len(),
            reports.shipments.len()
        );
        out
    }
}
