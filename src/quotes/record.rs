//! Hero quote records as stored on the wiki data pages.

use serde::{Deserialize, Serialize};

pub const DATA_TYPE: &str = "HeroQuote";
/// Hero key assigned to speakers that have no hero page.
pub const NPC_HERO_KEY: &str = "npc";
const DEFAULT_SKIN: &str = "Default";
const CATEGORY_DIR_PREFIX: &str = "Unknown/";
const CATEGORY_GUID_WIDTH: usize = 4;
const FILE_ID_HEX_LEN: usize = 12;
const FILE_ID_SUFFIX: &str = ".0B2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroQuote {
    #[serde(rename = "_dataType", default = "default_data_type")]
    pub data_type: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(rename = "fileId_n")]
    pub file_id_n: u64,
    pub hero: String,
    #[serde(rename = "heroName")]
    pub hero_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin: Option<String>,
    pub category: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub subtitle_en: String,
    /// Compact JSON of the parsed criteria condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// `<conversation id>#<position>` tags, sorted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<String>,
}

fn default_data_type() -> String {
    DATA_TYPE.to_string()
}

/// Voice-line file id, e.g. `00000000A1B2.0B2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceLineId {
    id: String,
    numeric: u64,
}

impl VoiceLineId {
    /// Parse the id from the start of a file name (`<12 hex>.0B2...`).
    pub fn from_file_name(name: &str) -> Option<Self> {
        let hex = name.get(..FILE_ID_HEX_LEN)?;
        if !hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)) {
            return None;
        }
        let rest = &name[FILE_ID_HEX_LEN..];
        if !rest.starts_with(FILE_ID_SUFFIX) {
            return None;
        }
        let numeric = u64::from_str_radix(hex, 16).ok()?;
        Some(Self {
            id: format!("{hex}{FILE_ID_SUFFIX}"),
            numeric,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn numeric(&self) -> u64 {
        self.numeric
    }
}

impl std::fmt::Display for VoiceLineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// `None` for the default skin.
pub fn normalize_skin(skin: &str) -> Option<String> {
    (skin != DEFAULT_SKIN).then(|| skin.to_string())
}

/// Category guid from an extractor directory such as `Unknown/1F3.078`:
/// the text between `Unknown/` and the four-character type suffix, zero padded.
/// Returns `None` when the directory was not produced by the extractor.
pub fn category_guid(category_dir: &str) -> Option<String> {
    let rest = category_dir.strip_prefix(CATEGORY_DIR_PREFIX)?;
    let end = rest.len().checked_sub(4)?;
    let guid = rest.get(..end)?;
    if guid.is_empty() {
        return None;
    }
    Some(format!("{guid:0>width$}", width = CATEGORY_GUID_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_line_id_parses_prefix_and_numeric_value() {
        let id = VoiceLineId::from_file_name("00000000A1B2.0B2-Hello there.txt").unwrap();
        assert_eq!(id.as_str(), "00000000A1B2.0B2");
        assert_eq!(id.numeric(), 0xA1B2);
        assert!(VoiceLineId::from_file_name("00000000a1b2.0B2.txt").is_none());
        assert!(VoiceLineId::from_file_name("00000000A1B2.0B3.txt").is_none());
        assert!(VoiceLineId::from_file_name("short.txt").is_none());
    }

    #[test]
    fn category_guid_strips_prefix_and_suffix() {
        assert_eq!(category_guid("Unknown/1F3.078"), Some("01F3".to_string()));
        assert_eq!(category_guid("Unknown/ABCD.078"), Some("ABCD".to_string()));
        assert_eq!(category_guid("Combat/Kill"), None);
        assert_eq!(category_guid("Unknown/.078"), None);
    }

    #[test]
    fn quote_json_uses_wiki_field_names() {
        let quote = HeroQuote {
            data_type: DATA_TYPE.to_string(),
            file_id: "00000000A1B2.0B2".to_string(),
            file_id_n: 0xA1B2,
            hero: "tracer".to_string(),
            hero_name: "Tracer".to_string(),
            skin: normalize_skin("Default"),
            category: "Combat/Kill".to_string(),
            subtitle: "x".to_string(),
            subtitle_en: "y".to_string(),
            criteria: None,
            weight: Some(2.0),
            conversations: Some(vec!["0000000001A2.0D0#1".to_string()]),
            added: Some("2.21".to_string()),
            removed: None,
        };
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["_dataType"], "HeroQuote");
        assert_eq!(json["fileId_n"], 0xA1B2);
        assert_eq!(json["heroName"], "Tracer");
        assert!(json.get("skin").is_none());
        assert!(json.get("removed").is_none());
        assert_eq!(json["conversations"][0], "0000000001A2.0D0#1");
    }
}
