//! Monitoring, reporting and verification

pub mod mrv;

pub use mrv::{AuditFinding, AuditReport, MrvAgent};
