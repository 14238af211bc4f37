use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::error::EngineError;

/// Engine configuration. Explicit: passed in at construction time, never
/// read from ambient globals. Every knob has a policy default so a missing
/// config file is not an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Merchant/account identifier scoping the dedup hash and all records.
    pub merchant_id: String,
    /// Minimum age (days) an incident must reach before it may be claimed.
    /// Mirrors the platform's own reimbursement-eligibility rule.
    pub window_days: u32,
    /// Historical lookback used to suggest the report date range.
    pub lookback_months: u32,
    /// Fallback unit value (cents) for SKUs absent from the value map.
    pub default_unit_value_cents: i64,
    /// Fallback unit value (cents) for unreimbursed-return candidates.
    pub return_unit_value_cents: i64,
    /// Estimated incident age (days) for inventory-snapshot anomalies,
    /// which carry no event date of their own.
    pub inventory_backdate_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            window_days: 45,
            lookback_months: 18,
            default_unit_value_cents: 1000,
            return_unit_value_cents: 1500,
            inventory_backdate_days: 60,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config = Self::parse_toml(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without validating, for callers that overlay values (e.g. a
    /// merchant id from the command line) before calling `validate`.
    pub fn parse_toml(input: &str) -> Result<Self, EngineError> {
        toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.merchant_id.is_empty() {
            return Err(EngineError::ConfigValidation(
                "merchant_id must not be empty".into(),
            ));
        }
        if self.window_days == 0 || self.window_days > 365 {
            return Err(EngineError::ConfigValidation(format!(
                "window_days must be in 1..=365, got {}",
                self.window_days
            )));
        }
        if self.lookback_months == 0 {
            return Err(EngineError::ConfigValidation(
                "lookback_months must be at least 1".into(),
            ));
        }
        if self.default_unit_value_cents < 0 || self.return_unit_value_cents < 0 {
            return Err(EngineError::ConfigValidation(
                "fallback unit values must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Claim cutoff for a run dated `as_of`. A loss is eligible only when
    /// its incident date is strictly older than this.
    pub fn claim_cutoff(&self, as_of: NaiveDate) -> NaiveDate {
        as_of - chrono::Duration::days(i64::from(self.window_days))
    }

    /// Suggested report date range: ends at the claim cutoff (anything newer
    /// is unclaimable anyway), starts `lookback_months` earlier, snapped to
    /// the first of the month.
    pub fn report_date_range(&self, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = self.claim_cutoff(as_of);
        let start = (end - chrono::Duration::days(i64::from(self.lookback_months) * 30))
            .with_day(1)
            .unwrap_or(end);
        (start, end)
    }
}
