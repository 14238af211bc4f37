//! `recoup-store` — SQLite persistence for detected losses and claim cases.

pub mod cases;
pub mod error;
pub mod store;

pub use cases::{export_case_text, ClaimCase};
pub use error::StoreError;
pub use store::{LossRecord, LossStore, SaveOutcome};
