//! Leaf classifier: ordered, prefix-based dispatch over single predicate lines.
//!
//! The first rule whose prefix matches owns the line; later rules are never tried.
//! Order matters: `Is Hero:` is rewritten onto the `Hero Interaction:` extractor and
//! the opaque-code deny-list is consulted before any rule.

use std::sync::OnceLock;

use regex::Regex;

use crate::criteria::condition::{HeroTarget, MissionTarget, Predicate};
use crate::criteria::error::ReferenceKind;
use crate::criteria::tables::LookupTables;

/// Placeholder description for scripts that are known but undescribed.
pub const UNDESCRIBED_SCRIPT: &str = "未知";
const SCRIPT_ID_WIDTH: usize = 6;
const UNKNOWN_ID_PREFIX: &str = "Unknown";

/// Why a line could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// No rule prefix matched.
    NoMatch,
    /// A rule matched but its trailing text did not fit the rule's pattern.
    Malformed { rule: &'static str },
    /// A fixed-vocabulary value (gender, team) was not recognised.
    Vocabulary { rule: &'static str, value: String },
    /// A name or id was missing from the lookup tables.
    Unresolved { kind: ReferenceKind, name: String },
}

impl Miss {
    /// Short stable label used when summarising misses.
    pub fn reason(&self) -> &'static str {
        match self {
            Miss::NoMatch => "no-match",
            Miss::Malformed { .. } => "malformed",
            Miss::Vocabulary { .. } => "vocabulary",
            Miss::Unresolved { .. } => "unresolved",
        }
    }
}

pub type Classification = Result<Predicate, Miss>;

type Extractor = fn(&str, &LookupTables) -> Classification;

struct Rule {
    prefix: &'static str,
    extract: Extractor,
}

const RULES: &[Rule] = &[
    Rule { prefix: "Scripted Event:", extract: scripted },
    Rule { prefix: "Is Hero:", extract: to_hero },
    Rule { prefix: "Hero Interaction:", extract: to_hero },
    Rule { prefix: "Hero On Team:", extract: hero_on_team },
    Rule { prefix: "Tag On Teammate:", extract: tag_on_teammate },
    Rule { prefix: "Required Gender:", extract: gender },
    Rule { prefix: "On Team Number:", extract: team },
    Rule { prefix: "On Map:", extract: map },
    Rule { prefix: "Active Celebration:", extract: celebration },
    Rule { prefix: "On Game Mode:", extract: game_mode },
    Rule { prefix: "On Mission:", extract: mission },
    Rule { prefix: "On Mission Objective:", extract: mission_objective },
    Rule { prefix: "Has Talent:", extract: talent },
];

/// Classify one un-negated, non-nested predicate line.
pub fn classify(text: &str, tables: &LookupTables) -> Classification {
    if tables.is_opaque(text) {
        return Ok(Predicate::Unknown {
            raw: text.to_string(),
        });
    }
    for rule in RULES {
        if let Some(rest) = text.strip_prefix(rule.prefix) {
            return (rule.extract)(rest, tables);
        }
    }
    Err(Miss::NoMatch)
}

fn map_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?<map>\S.*)\. Allow Event Variants: (?<allow>true|false)$")
            .expect("map pattern compiles")
    })
}

fn paren_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\((?<id>.*)\)").expect("id pattern compiles")
    })
}

/// Trimmed text after the prefix; `None` when nothing follows.
fn trailing(rest: &str) -> Option<&str> {
    let value = rest.trim();
    (!value.is_empty()).then_some(value)
}

/// Id from `Unknown<hex>` or from the parenthesised suffix of `Name (id)`.
fn embedded_id(value: &str) -> Option<&str> {
    if let Some(hex) = value.strip_prefix(UNKNOWN_ID_PREFIX) {
        return Some(hex);
    }
    paren_pattern()
        .captures(value)
        .and_then(|caps| caps.name("id"))
        .map(|m| m.as_str())
}

fn scripted(rest: &str, tables: &LookupTables) -> Classification {
    let rule = "Scripted Event:";
    let value = trailing(rest).ok_or(Miss::Malformed { rule })?;
    let id = embedded_id(value).ok_or(Miss::Malformed { rule })?;
    let script = format!("{id:0>width$}", width = SCRIPT_ID_WIDTH);
    let Some(desc) = tables.scripts.get(&script) else {
        return Err(Miss::Unresolved {
            kind: ReferenceKind::Script,
            name: script,
        });
    };
    let script_desc = if desc.is_empty() {
        UNDESCRIBED_SCRIPT.to_string()
    } else {
        desc.clone()
    };
    Ok(Predicate::Scripted {
        script,
        script_desc,
    })
}

fn to_hero(rest: &str, tables: &LookupTables) -> Classification {
    let name = trailing(rest).ok_or(Miss::Malformed {
        rule: "Hero Interaction:",
    })?;
    let target = if let Some(key) = tables.hero_aliases.get(name) {
        HeroTarget::Hero(key.clone())
    } else if let Some(tag) = tables.hero_tags.get(name) {
        HeroTarget::HeroTag(tag.clone())
    } else if let Some(key) = tables.hero_keys.get(name) {
        HeroTarget::Hero(key.clone())
    } else {
        return Err(Miss::Unresolved {
            kind: ReferenceKind::Hero,
            name: name.to_string(),
        });
    };
    Ok(Predicate::ToHero { target })
}

fn hero_on_team(rest: &str, tables: &LookupTables) -> Classification {
    let name = trailing(rest).ok_or(Miss::Malformed {
        rule: "Hero On Team:",
    })?;
    match tables.hero_keys.get(name) {
        Some(key) => Ok(Predicate::WithHero {
            target: HeroTarget::Hero(key.clone()),
        }),
        None => Err(Miss::Unresolved {
            kind: ReferenceKind::Hero,
            name: name.to_string(),
        }),
    }
}

fn tag_on_teammate(rest: &str, tables: &LookupTables) -> Classification {
    let name = trailing(rest).ok_or(Miss::Malformed {
        rule: "Tag On Teammate:",
    })?;
    match tables.hero_tags.get(name) {
        Some(tag) => Ok(Predicate::WithHero {
            target: HeroTarget::HeroTag(tag.clone()),
        }),
        None => Err(Miss::Unresolved {
            kind: ReferenceKind::HeroTag,
            name: name.to_string(),
        }),
    }
}

fn gender(rest: &str, tables: &LookupTables) -> Classification {
    let rule = "Required Gender:";
    let value = rest.trim();
    match tables.genders.get(value) {
        Some(gender) => Ok(Predicate::ToGender { gender: *gender }),
        None => Err(Miss::Vocabulary {
            rule,
            value: value.to_string(),
        }),
    }
}

fn team(rest: &str, tables: &LookupTables) -> Classification {
    let rule = "On Team Number:";
    let value = rest.trim();
    let team = rest
        .strip_prefix(' ')
        .and_then(|literal| literal.strip_suffix(". UnkBool: True"))
        .and_then(|name| tables.teams.get(name));
    match team {
        Some(team) => Ok(Predicate::Team { team: *team }),
        None => Err(Miss::Vocabulary {
            rule,
            value: value.to_string(),
        }),
    }
}

fn map(rest: &str, _tables: &LookupTables) -> Classification {
    let rule = "On Map:";
    let caps = map_pattern().captures(rest).ok_or(Miss::Malformed { rule })?;
    let map = caps
        .name("map")
        .map(|m| m.as_str().trim())
        .filter(|m| !m.is_empty())
        .ok_or(Miss::Malformed { rule })?;
    let not_event_variants = caps.name("allow").map(|m| m.as_str()) == Some("false");
    Ok(Predicate::Map {
        map: map.to_string(),
        not_event_variants,
    })
}

fn celebration(rest: &str, tables: &LookupTables) -> Classification {
    let value = trailing(rest).ok_or(Miss::Malformed {
        rule: "Active Celebration:",
    })?;
    let id = embedded_id(value).unwrap_or(value);
    let celebration = tables
        .celebrations
        .get(id)
        .cloned()
        .unwrap_or_else(|| format!("未知节日（{id}）"));
    Ok(Predicate::Celebration { celebration })
}

fn game_mode(rest: &str, _tables: &LookupTables) -> Classification {
    let game_mode = trailing(rest).ok_or(Miss::Malformed {
        rule: "On Game Mode:",
    })?;
    Ok(Predicate::GameMode {
        game_mode: game_mode.to_string(),
    })
}

fn mission(rest: &str, _tables: &LookupTables) -> Classification {
    let mission = trailing(rest).ok_or(Miss::Malformed { rule: "On Mission:" })?;
    Ok(Predicate::Mission {
        target: MissionTarget::Mission(mission.to_string()),
    })
}

fn mission_objective(rest: &str, _tables: &LookupTables) -> Classification {
    let objective = trailing(rest).ok_or(Miss::Malformed {
        rule: "On Mission Objective:",
    })?;
    Ok(Predicate::Mission {
        target: MissionTarget::Objective(objective.to_string()),
    })
}

fn talent(rest: &str, _tables: &LookupTables) -> Classification {
    let talent = trailing(rest).ok_or(Miss::Malformed { rule: "Has Talent:" })?;
    Ok(Predicate::Talent {
        talent: talent.to_string(),
    })
}
