//! Recursive-descent parser over indentation-structured criteria dumps.
//!
//! A dump is a tree of lines: `Nested - k/n Required:` headers own every following
//! line indented deeper than themselves; any other line is a leaf predicate,
//! optionally wrapped as `NOT (...)`. There is no tokenizer stage, only a line cursor.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::criteria::classifier::{classify, Miss};
use crate::criteria::condition::{Condition, NestedGroup};
use crate::criteria::error::CriteriaError;
use crate::criteria::tables::{ParseContext, ReferencePolicy};

pub const DEFAULT_INDENT_WIDTH: usize = 4;
/// Deepest group nesting accepted before the dump is rejected.
pub const MAX_NESTING_DEPTH: usize = 64;
const NESTED_MARKER: &str = "Nested - ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Leading whitespace characters per indentation level.
    pub indent_width: usize,
    /// Collapse a top-level `Nested - 1/1` group into its only child.
    pub unwrap_single_group: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            indent_width: DEFAULT_INDENT_WIDTH,
            unwrap_single_group: false,
        }
    }
}

/// A leaf that degraded to `Unknown` instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub record_id: String,
    /// 1-based line number in the raw text.
    pub line_number: usize,
    /// Predicate text with any `NOT (...)` wrapper removed.
    pub raw: String,
    pub miss: Miss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub condition: Condition,
    pub diagnostics: Vec<ParseDiagnostic>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CriteriaParser {
    options: ParserOptions,
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
    indent: usize,
}

struct Cursor<'a, 'c> {
    lines: Vec<Line<'a>>,
    pos: usize,
    ctx: &'c ParseContext<'c>,
    diagnostics: Vec<ParseDiagnostic>,
}

fn nested_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^Nested - (?<needed>\d+)/(?<total>\d+) Required:")
            .expect("nested header pattern compiles")
    })
}

fn negation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^NOT \((?<inner>.+)\)$").expect("negation pattern compiles")
    })
}

/// Parse with default options.
pub fn parse(raw: &str, ctx: &ParseContext<'_>) -> Result<Condition, CriteriaError> {
    CriteriaParser::default()
        .parse(raw, ctx)
        .map(|outcome| outcome.condition)
}

impl CriteriaParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn parse(&self, raw: &str, ctx: &ParseContext<'_>) -> Result<ParseOutcome, CriteriaError> {
        let width = self.options.indent_width.max(1);
        let lines: Vec<Line<'_>> = raw
            .split('\n')
            .enumerate()
            .map(|(index, text)| {
                let text = text.trim_end();
                Line {
                    number: index + 1,
                    text,
                    indent: indentation(text, width),
                }
            })
            .filter(|line| !line.text.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(CriteriaError::EmptyInput {
                record_id: ctx.record_id.to_string(),
            });
        }

        let mut cursor = Cursor {
            lines,
            pos: 0,
            ctx,
            diagnostics: Vec::new(),
        };
        let condition = cursor.parse_node(0)?;
        if let Some(extra) = cursor.lines.get(cursor.pos) {
            return Err(CriteriaError::TrailingLines {
                record_id: ctx.record_id.to_string(),
                line_number: extra.number,
                line: extra.text.to_string(),
            });
        }

        let condition = if self.options.unwrap_single_group {
            condition.unwrap_single()
        } else {
            condition
        };
        Ok(ParseOutcome {
            condition,
            diagnostics: cursor.diagnostics,
        })
    }
}

/// Indentation level: leading whitespace characters divided by the unit width.
fn indentation(line: &str, width: usize) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count() / width
}

impl<'a, 'c> Cursor<'a, 'c> {
    fn parse_node(&mut self, depth: usize) -> Result<Condition, CriteriaError> {
        let line = self.lines[self.pos];
        self.pos += 1;
        let trimmed = line.text.trim_start();
        if trimmed.starts_with(NESTED_MARKER) {
            if depth >= MAX_NESTING_DEPTH {
                return Err(CriteriaError::NestingTooDeep {
                    record_id: self.ctx.record_id.to_string(),
                    line_number: line.number,
                    line: line.text.to_string(),
                    limit: MAX_NESTING_DEPTH,
                });
            }
            self.parse_group(line, trimmed, depth)
        } else {
            self.parse_leaf(line)
        }
    }

    fn parse_group(
        &mut self,
        header: Line<'a>,
        trimmed: &str,
        depth: usize,
    ) -> Result<Condition, CriteriaError> {
        let record_id = self.ctx.record_id;
        let malformed = || CriteriaError::MalformedNested {
            record_id: record_id.to_string(),
            line_number: header.number,
            line: header.text.to_string(),
        };
        let caps = nested_pattern().captures(trimmed).ok_or_else(malformed)?;
        let needed: usize = caps["needed"].parse().map_err(|_| malformed())?;
        let total: usize = caps["total"].parse().map_err(|_| malformed())?;
        if needed > total {
            return Err(CriteriaError::NeededExceedsTotal {
                record_id: record_id.to_string(),
                line_number: header.number,
                line: header.text.to_string(),
                needed,
                total,
            });
        }

        // The header count is untrusted; only lines actually present can become children.
        let remaining = self.lines.len() - self.pos;
        let mut children = Vec::with_capacity(total.min(remaining));
        while let Some(next) = self.lines.get(self.pos) {
            if next.indent <= header.indent {
                break;
            }
            children.push(self.parse_node(depth + 1)?);
        }

        if children.len() != total {
            return Err(CriteriaError::ChildCountMismatch {
                record_id: record_id.to_string(),
                line_number: header.number,
                line: header.text.to_string(),
                declared: total,
                found: children.len(),
            });
        }
        Ok(Condition::Nested(NestedGroup {
            total,
            needed,
            children,
        }))
    }

    fn parse_leaf(&mut self, line: Line<'a>) -> Result<Condition, CriteriaError> {
        let text = line.text.trim();
        let (inner, negative) = match negation_pattern().captures(text) {
            Some(caps) => match caps.name("inner") {
                Some(inner) => (inner.as_str().trim(), true),
                None => (text, false),
            },
            None => (text, false),
        };

        let miss = match classify(inner, self.ctx.tables) {
            Ok(predicate) => return Ok(Condition::single(predicate, negative)),
            Err(miss) => miss,
        };

        if let Miss::Unresolved { kind, name } = &miss {
            if self.ctx.policy == ReferencePolicy::Strict {
                return Err(CriteriaError::UnresolvedReference {
                    record_id: self.ctx.record_id.to_string(),
                    line_number: line.number,
                    line: text.to_string(),
                    kind: *kind,
                    name: name.clone(),
                });
            }
            warn!(
                record = self.ctx.record_id,
                line = line.number,
                "unresolved {kind} '{name}', keeping as unknown"
            );
        } else {
            debug!(
                record = self.ctx.record_id,
                line = line.number,
                reason = miss.reason(),
                "unclassified predicate: {inner}"
            );
        }

        self.diagnostics.push(ParseDiagnostic {
            record_id: self.ctx.record_id.to_string(),
            line_number: line.number,
            raw: inner.to_string(),
            miss,
        });
        Ok(Condition::unknown(inner, negative))
    }
}
