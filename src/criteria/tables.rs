//! Lookup tables the classifier resolves names against, and the per-call parse context.
//!
//! Tables are loaded once per batch run from a YAML or JSON file and are read-only
//! afterwards, so a single `LookupTables` can be shared across rayon workers.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::criteria::condition::{Gender, Team};
use crate::criteria::error::TablesError;

pub const DEFAULT_TABLES_PATH: &str = "data/criteria-tables.yaml";

/// Opaque internal codes that always classify as unknown.
const DEFAULT_OPAQUE_PREFIXES: &[&str] = &["STU_9665B416", "STU_A9B89EC9", "STU_E6EBD07B"];
const DEFAULT_OPAQUE_EXACT: &[&str] = &[
    "Unknown: STU_B1A2B57D",
    "Hero Interaction: Unknown664",
    "Hero Interaction: Unknown81B",
    "Hero Interaction: UnknownE41",
    "Hero Interaction: Unknown1071",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupTables {
    /// Hero display name -> hero key (one entry per hero data page).
    #[serde(default)]
    pub hero_keys: HashMap<String, String>,
    /// Name as it appears in the dump -> hero key, checked before `hero_keys`.
    #[serde(default)]
    pub hero_aliases: HashMap<String, String>,
    /// Dump tag name -> tag key.
    #[serde(default)]
    pub hero_tags: HashMap<String, String>,
    /// Six-character script id -> description. Empty description means known but undescribed.
    #[serde(default)]
    pub scripts: HashMap<String, String>,
    #[serde(default)]
    pub celebrations: HashMap<String, String>,
    #[serde(default = "default_genders")]
    pub genders: HashMap<String, Gender>,
    #[serde(default = "default_teams")]
    pub teams: HashMap<String, Team>,
    #[serde(default = "default_opaque_prefixes")]
    pub opaque_prefixes: Vec<String>,
    #[serde(default = "default_opaque_exact")]
    pub opaque_exact: Vec<String>,
    /// Four-hex category guid -> category path (`Group/Sub/Name`).
    #[serde(default)]
    pub categories: HashMap<String, String>,
}

impl Default for LookupTables {
    fn default() -> Self {
        Self {
            hero_keys: HashMap::new(),
            hero_aliases: HashMap::new(),
            hero_tags: HashMap::new(),
            scripts: HashMap::new(),
            celebrations: HashMap::new(),
            genders: default_genders(),
            teams: default_teams(),
            opaque_prefixes: default_opaque_prefixes(),
            opaque_exact: default_opaque_exact(),
            categories: HashMap::new(),
        }
    }
}

fn default_genders() -> HashMap<String, Gender> {
    HashMap::from([
        ("Male".to_string(), Gender::Male),
        ("Female".to_string(), Gender::Female),
        ("Neutral".to_string(), Gender::Neutral),
    ])
}

fn default_teams() -> HashMap<String, Team> {
    HashMap::from([
        ("TeamRed".to_string(), Team::Attack),
        ("TeamBlue".to_string(), Team::Defense),
    ])
}

fn default_opaque_prefixes() -> Vec<String> {
    DEFAULT_OPAQUE_PREFIXES.iter().map(|s| s.to_string()).collect()
}

fn default_opaque_exact() -> Vec<String> {
    DEFAULT_OPAQUE_EXACT.iter().map(|s| s.to_string()).collect()
}

/// A hero data page; only the two fields needed for name resolution.
#[derive(Debug, Deserialize)]
struct HeroPage {
    name: String,
    key: String,
}

impl LookupTables {
    /// True when the text is one of the opaque codes that are never parsed further.
    pub fn is_opaque(&self, text: &str) -> bool {
        self.opaque_exact.iter().any(|code| code == text)
            || self.opaque_prefixes.iter().any(|prefix| text.starts_with(prefix.as_str()))
    }

    /// Merge `{name, key}` hero pages from every `*.json` file in `dir`.
    /// Returns the number of pages merged.
    pub fn merge_hero_pages(&mut self, dir: impl AsRef<Path>) -> Result<usize, TablesError> {
        let dir = dir.as_ref();
        let mut merged = 0;
        for entry in fs::read_dir(dir).map_err(|source| TablesError::Read {
            path: dir.display().to_string(),
            source,
        })? {
            let path = entry
                .map_err(|source| TablesError::Read {
                    path: dir.display().to_string(),
                    source,
                })?
                .path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let raw = fs::read_to_string(&path).map_err(|source| TablesError::Read {
                path: path.display().to_string(),
                source,
            })?;
            let page: HeroPage = serde_json::from_str(&raw).map_err(|source| TablesError::Json {
                path: path.display().to_string(),
                source,
            })?;
            self.hero_keys.insert(page.name, page.key);
            merged += 1;
        }
        Ok(merged)
    }
}

/// Load tables from `.yaml`/`.yml` or `.json`, chosen by extension.
pub fn load_tables(path: impl AsRef<Path>) -> Result<LookupTables, TablesError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| TablesError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path.extension().map_or(false, |ext| ext == "json");
    if is_json {
        serde_json::from_str(&raw).map_err(|source| TablesError::Json {
            path: path.display().to_string(),
            source,
        })
    } else {
        serde_yaml::from_str(&raw).map_err(|source| TablesError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }
}

/// What to do when a hero, tag or script reference is missing from the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// Abort the record: a missing table entry would silently corrupt primary hero data.
    Strict,
    /// Degrade the leaf to `Unknown`.
    #[default]
    Lenient,
}

/// Everything one parse call needs besides the raw text.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub tables: &'a LookupTables,
    /// Record the criteria belongs to; used only in diagnostics.
    pub record_id: &'a str,
    pub policy: ReferencePolicy,
}

impl<'a> ParseContext<'a> {
    pub fn new(tables: &'a LookupTables, record_id: &'a str) -> Self {
        Self {
            tables,
            record_id,
            policy: ReferencePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }
}
