//! `recoup-engine` — FBA loss detection and reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded report tables, returns detected
//! loss candidates and case groupings. No storage or CLI dependencies.

pub mod cases;
pub mod config;
pub mod detect;
pub mod error;
pub mod hash;
pub mod model;
pub mod money;
pub mod normalize;
pub mod run;
pub mod table;
pub mod values;

pub use config::EngineConfig;
pub use error::EngineError;
pub use hash::candidate_hash;
pub use model::{DetectionRun, LossCandidate, LossCategory, RunStats, RunSummary};
pub use run::run_detection;
pub use table::ReportTable;
