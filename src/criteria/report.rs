//! Batch summary of predicates that degraded to `Unknown`.
//!
//! After a game patch new predicate vocabulary shows up here first, so the summary
//! groups by raw text and counts how many records each one touched.

use std::collections::BTreeMap;
use std::io;

use serde::Serialize;

use crate::criteria::parser::ParseDiagnostic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissEntry {
    pub raw: String,
    pub reason: &'static str,
    pub occurrences: usize,
    /// First record the predicate was seen on.
    pub example_record: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MissSummary {
    entries: BTreeMap<String, MissEntry>,
    by_reason: BTreeMap<&'static str, usize>,
    total: usize,
}

impl MissSummary {
    pub fn record(&mut self, diagnostic: &ParseDiagnostic) {
        let reason = diagnostic.miss.reason();
        self.total += 1;
        *self.by_reason.entry(reason).or_default() += 1;
        self.entries
            .entry(diagnostic.raw.clone())
            .and_modify(|entry| entry.occurrences += 1)
            .or_insert_with(|| MissEntry {
                raw: diagnostic.raw.clone(),
                reason,
                occurrences: 1,
                example_record: diagnostic.record_id.clone(),
            });
    }

    pub fn extend<'a>(&mut self, diagnostics: impl IntoIterator<Item = &'a ParseDiagnostic>) {
        for diagnostic in diagnostics {
            self.record(diagnostic);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count_for_reason(&self, reason: &str) -> usize {
        self.by_reason.get(reason).copied().unwrap_or(0)
    }

    /// Entries ordered by descending occurrence count, then raw text.
    pub fn ranked(&self) -> Vec<&MissEntry> {
        let mut entries: Vec<&MissEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then_with(|| a.raw.cmp(&b.raw)));
        entries
    }

    /// Write the ranked entries as CSV with a header row.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for entry in self.ranked() {
            csv_writer.serialize(entry)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
