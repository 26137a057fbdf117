//! Lookup-table checks run before a batch.

pub mod validate;

pub use validate::{validate_tables, ValidationDiagnostic, ValidationReport, ValidationSeverity};
