//! Voice-line criteria: parses indentation-structured condition dumps from the
//! game-data extractor into a typed [Condition] tree.
//!
//! Unrecognised predicates degrade to `Unknown` leaves and are reported through
//! [ParseOutcome::diagnostics]; only structural damage and, under
//! [ReferencePolicy::Strict], missing table entries abort a parse.

mod classifier;
mod condition;
mod error;
mod parser;
mod report;
mod tables;

pub use classifier::{classify, Classification, Miss, UNDESCRIBED_SCRIPT};
pub use condition::{
    Condition, Gender, HeroTarget, MissionTarget, NestedGroup, Predicate, SingleCondition, Team,
};
pub use error::{CriteriaError, ReferenceKind, TablesError};
pub use parser::{
    parse, CriteriaParser, ParseDiagnostic, ParseOutcome, ParserOptions, DEFAULT_INDENT_WIDTH,
    MAX_NESTING_DEPTH,
};
pub use report::{MissEntry, MissSummary};
pub use tables::{load_tables, LookupTables, ParseContext, ReferencePolicy, DEFAULT_TABLES_PATH};
