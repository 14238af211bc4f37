//! Loss-detection heuristics.
//!
//! Each detector is a pure strategy over the normalized tables: it never
//! mutates its input and never persists. Overlap between detectors on the
//! same physical row is accepted; content-hash dedup at persistence time is
//! the sole double-count defense, so every detector must derive the same
//! identity tuple for the same event.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::model::{Detection, NormalizedReports};

mod fulfillment;
mod inbound;
mod returns;
mod warehouse;

pub use fulfillment::FulfillmentLosses;
pub use inbound::{InboundShipments, InventoryInbound};
pub use returns::{ReturnDiscrepancies, UnreimbursedReturns};
pub use warehouse::{category_for_reason, WarehouseAdjustments};

/// Shared read-only context for one detection pass.
pub struct DetectContext<'a> {
    pub as_of: NaiveDate,
    /// Claim cutoff: only incidents strictly older than this are claimable.
    pub cutoff: NaiveDate,
    pub sku_values: &'a HashMap<String, i64>,
    pub config: &'a EngineConfig,
}

impl<'a> DetectContext<'a> {
    pub fn new(
        config: &'a EngineConfig,
        sku_values: &'a HashMap<String, i64>,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            as_of,
            cutoff: config.claim_cutoff(as_of),
            sku_values,
            config,
        }
    }

    /// Eligibility-window rule: an incident dated exactly at the cutoff is
    /// still too recent; only strictly older dates qualify.
    pub fn is_claimable(&self, incident_date: NaiveDate) -> bool {
        incident_date < self.cutoff
    }

    /// Estimated unit value for a SKU, falling back to the configured
    /// default when reimbursement history gave us nothing.
    pub fn unit_value(&self, sku: &str) -> i64 {
        self.sku_values
            .get(sku)
            .copied()
            .unwrap_or(self.config.default_unit_value_cents)
    }

    /// Estimated incident date for inventory-snapshot anomalies, which carry
    /// no event date of their own.
    pub fn estimated_snapshot_date(&self) -> NaiveDate {
        self.as_of - chrono::Duration::days(i64::from(self.config.inventory_backdate_days))
    }
}

/// Common interface for the detection strategies.
pub trait LossDetector {
    fn name(&self) -> &'static str;
    fn detect(&self, reports: &NormalizedReports, ctx: &DetectContext) -> Detection;
}

/// The closed set of detection strategies, in run order.
pub fn all_detectors() -> Vec<Box<dyn LossDetector>> {
    vec![
        Box::new(WarehouseAdjustments),
        Box::new(ReturnDiscrepancies),
        Box::new(UnreimbursedReturns),
        Box::new(InboundShipments),
        Box::new(InventoryInbound),
        Box::new(FulfillmentLosses),
    ]
}
