use std::collections::HashMap;
use std::fmt;

use crate::criteria::{classify, LookupTables, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

const CATEGORY_GUID_LEN: usize = 4;
const SCRIPT_ID_LEN: usize = 6;

/// Sanity checks over lookup tables before a batch run.
pub fn validate_tables(tables: &LookupTables) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_non_empty(&mut report, "hero_keys", &tables.hero_keys);
    validate_non_empty(&mut report, "hero_aliases", &tables.hero_aliases);
    validate_non_empty(&mut report, "hero_tags", &tables.hero_tags);
    validate_non_empty(&mut report, "celebrations", &tables.celebrations);
    validate_categories(&mut report, &tables.categories);
    validate_scripts(&mut report, &tables.scripts);
    validate_aliases(&mut report, tables);
    validate_shadowed_names(&mut report, tables);

    for prefix in &tables.opaque_prefixes {
        if prefix.trim().is_empty() {
            report.push(
                ValidationSeverity::Error,
                "opaque_prefixes",
                "empty prefix would mark every predicate as opaque",
            );
        }
    }

    report
}

fn validate_non_empty(report: &mut ValidationReport, table: &str, map: &HashMap<String, String>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        if key.trim().is_empty() {
            report.push(ValidationSeverity::Error, table, "empty key");
        } else if map[key].trim().is_empty() {
            report.push(
                ValidationSeverity::Error,
                format!("{table}['{key}']"),
                "empty value",
            );
        }
    }
}

fn validate_categories(report: &mut ValidationReport, categories: &HashMap<String, String>) {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut guids: Vec<&String> = categories.keys().collect();
    guids.sort();
    for guid in guids {
        let name = categories[guid].as_str();
        let context = format!("categories['{guid}']");
        if guid.len() != CATEGORY_GUID_LEN || !guid.chars().all(|c| c.is_ascii_hexdigit()) {
            report.push(
                ValidationSeverity::Error,
                context.clone(),
                format!("category guid must be {CATEGORY_GUID_LEN} hex digits"),
            );
        }
        if name.trim().is_empty() {
            report.push(ValidationSeverity::Error, context, "empty category name");
            continue;
        }
        if let Some(first) = seen.insert(name, guid.as_str()) {
            report.push(
                ValidationSeverity::Error,
                context,
                format!("duplicate category name '{name}' (also used by '{first}')"),
            );
        }
    }
}

fn validate_scripts(report: &mut ValidationReport, scripts: &HashMap<String, String>) {
    let mut ids: Vec<&String> = scripts.keys().collect();
    ids.sort();
    for id in ids {
        if id.len() != SCRIPT_ID_LEN {
            report.push(
                ValidationSeverity::Error,
                format!("scripts['{id}']"),
                format!("script id must be {SCRIPT_ID_LEN} characters (zero padded)"),
            );
        }
        if scripts[id].is_empty() {
            report.push(
                ValidationSeverity::Info,
                format!("scripts['{id}']"),
                "known but undescribed",
            );
        }
    }
}

fn validate_aliases(report: &mut ValidationReport, tables: &LookupTables) {
    let known_keys: Vec<&String> = tables.hero_keys.values().collect();
    let mut aliases: Vec<(&String, &String)> = tables.hero_aliases.iter().collect();
    aliases.sort();
    for (alias, key) in aliases {
        if !known_keys.contains(&key) {
            report.push(
                ValidationSeverity::Warning,
                format!("hero_aliases['{alias}']"),
                format!("points at hero key '{key}' that no hero page declares"),
            );
        }
    }
}

/// A tag named like a hero is unreachable from `Hero Interaction:` lines.
fn validate_shadowed_names(report: &mut ValidationReport, tables: &LookupTables) {
    let mut tags: Vec<&String> = tables.hero_tags.keys().collect();
    tags.sort();
    for tag in tags {
        if tables.hero_aliases.contains_key(tag) {
            report.push(
                ValidationSeverity::Warning,
                format!("hero_tags['{tag}']"),
                "shadowed by a hero alias of the same name",
            );
            continue;
        }
        let sample = format!("Hero Interaction: {tag}");
        if matches!(classify(&sample, tables), Ok(Predicate::Unknown { .. })) {
            report.push(
                ValidationSeverity::Warning,
                format!("hero_tags['{tag}']"),
                "shadowed by the opaque-code deny-list",
            );
        }
    }
}
