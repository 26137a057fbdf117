//! Condition tree produced by the criteria parser.
//!
//! The JSON form matches the strings stored on wiki quote records:
//! `{"type":"nested","total":2,"needed":1,"conditions":[...]}` for groups and
//! `{"type":"toHero","hero":"tracer","negative":true}` for leaves.

use serde::{Deserialize, Serialize};

/// A parsed voice-line criteria: either an N-of-M group or a single predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Nested(NestedGroup),
    Single(SingleCondition),
}

/// Satisfied when at least `needed` of the `total` children hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "nested")]
pub struct NestedGroup {
    pub total: usize,
    pub needed: usize,
    #[serde(rename = "conditions")]
    pub children: Vec<Condition>,
}

/// A leaf predicate, optionally wrapped in `NOT (...)` on its dump line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleCondition {
    #[serde(flatten)]
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "is_false")]
    pub negative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Predicate {
    /// Addressed at a specific hero or at any hero bearing a tag.
    ToHero {
        #[serde(flatten)]
        target: HeroTarget,
    },
    /// The hero or tag group is present on the speaker's team.
    WithHero {
        #[serde(flatten)]
        target: HeroTarget,
    },
    Map {
        map: String,
        #[serde(
            rename = "notEventVariants",
            default,
            skip_serializing_if = "is_false"
        )]
        not_event_variants: bool,
    },
    Team {
        team: Team,
    },
    ToGender {
        gender: Gender,
    },
    Scripted {
        script: String,
        #[serde(rename = "scriptDesc")]
        script_desc: String,
    },
    Celebration {
        celebration: String,
    },
    GameMode {
        #[serde(rename = "gameMode")]
        game_mode: String,
    },
    Mission {
        #[serde(flatten)]
        target: MissionTarget,
    },
    Talent {
        talent: String,
    },
    /// Unrecognized or deliberately ignored predicate text.
    Unknown {
        raw: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeroTarget {
    Hero(String),
    HeroTag(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissionTarget {
    Mission(String),
    Objective(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Attack,
    Defense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Condition {
    pub fn single(predicate: Predicate, negative: bool) -> Self {
        Condition::Single(SingleCondition {
            predicate,
            negative,
        })
    }

    pub fn unknown(raw: impl Into<String>, negative: bool) -> Self {
        Self::single(Predicate::Unknown { raw: raw.into() }, negative)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(
            self,
            Condition::Single(SingleCondition {
                predicate: Predicate::Unknown { .. },
                ..
            })
        )
    }

    /// Collapse a group with exactly one declared child into that child.
    /// Only the outermost node is inspected.
    pub fn unwrap_single(self) -> Condition {
        match self {
            Condition::Nested(mut group) if group.total == 1 && group.children.len() == 1 => {
                group.children.remove(0)
            }
            other => other,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
