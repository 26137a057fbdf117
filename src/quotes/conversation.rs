//! Conversation folders (`extract/HeroConvo/<group>/<id>.0D0`) and the extractor's
//! conversation list, linked back onto the quote records that take part in them.
//!
//! Each folder holds `<index>-<speaker>-<file id>...` files, where `index` is the
//! 1-based slot in the listed conversation's voice lines.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::criteria::LookupTables;
use crate::quotes::error::GenerateError;
use crate::quotes::generate::QuotesByHero;
use crate::quotes::record::NPC_HERO_KEY;

pub const CONVERSATION_DIR: &str = "extract/HeroConvo";
pub const CONVERSATION_LIST: &str = "json/conversations.json";
const CONVERSATION_SUFFIX: &str = ".0D0";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedConversation {
    #[serde(rename = "GUID")]
    guid: String,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    voicelines: Vec<ListedLine>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListedLine {
    #[serde(rename = "VoicelineGUID")]
    voice_line_guid: String,
    #[serde(rename = "Position")]
    position: serde_json::Number,
}

/// One slot of a conversation. `file_id` and `speaker` are only known when the
/// folder contains a file for the slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationLine {
    pub voice_line_guid: String,
    pub position: String,
    pub file_id: Option<String>,
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: String,
    pub weight: Option<f64>,
    pub lines: Vec<ConversationLine>,
}

impl Conversation {
    /// Tag stored on a quote record, e.g. `0000000001A2.0D0#3`.
    pub fn tag(&self, line: &ConversationLine) -> String {
        format!("{}#{}", self.id, line.position)
    }
}

fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?<index>\d+)-").expect("index pattern compiles"))
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?<index>\d+)-(?<speaker>\S+)-(?<file_id>\w{12}\.0B2)")
            .expect("conversation line pattern compiles")
    })
}

/// Read every conversation folder in the dump. A dump without conversation
/// folders yields none and does not need the conversation list.
pub fn load_conversations(raw_data_dir: &Path) -> Result<Vec<Conversation>, GenerateError> {
    let root = raw_data_dir.join(CONVERSATION_DIR);
    if !root.is_dir() {
        debug!("conversation directory not found: {}", root.display());
        return Ok(Vec::new());
    }

    let mut folders = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| GenerateError::Io {
            path: root.display().to_string(),
            source: err.into(),
        })?;
        let is_conversation = entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(CONVERSATION_SUFFIX));
        if is_conversation {
            folders.push(entry.into_path());
        }
    }
    if folders.is_empty() {
        return Ok(Vec::new());
    }

    let listed = load_list(&raw_data_dir.join(CONVERSATION_LIST))?;
    folders
        .iter()
        .map(|folder| read_conversation(folder, &listed))
        .collect()
}

fn load_list(path: &Path) -> Result<HashMap<String, ListedConversation>, GenerateError> {
    let raw = fs::read_to_string(path).map_err(|source| GenerateError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let list: Vec<ListedConversation> =
        serde_json::from_str(&raw).map_err(|source| GenerateError::ConversationList {
            path: path.display().to_string(),
            source,
        })?;
    Ok(list
        .into_iter()
        .map(|item| (item.guid.clone(), item))
        .collect())
}

fn read_conversation(
    folder: &Path,
    listed: &HashMap<String, ListedConversation>,
) -> Result<Conversation, GenerateError> {
    let id = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(item) = listed.get(&id) else {
        return Err(GenerateError::UnknownConversation {
            id,
            path: folder.display().to_string(),
        });
    };

    let io_err = |source| GenerateError::Io {
        path: folder.display().to_string(),
        source,
    };
    let mut by_index: BTreeMap<usize, String> = BTreeMap::new();
    for entry in fs::read_dir(folder).map_err(io_err)? {
        let name = entry.map_err(io_err)?.file_name().to_string_lossy().into_owned();
        let index = index_pattern()
            .captures(&name)
            .and_then(|caps| caps["index"].parse::<usize>().ok())
            .ok_or_else(|| GenerateError::InvalidConversationFile {
                path: folder.join(&name).display().to_string(),
            })?;
        by_index.insert(index, name);
    }

    let mut lines = Vec::with_capacity(item.voicelines.len());
    for (slot, listed_line) in item.voicelines.iter().enumerate() {
        let mut line = ConversationLine {
            voice_line_guid: listed_line.voice_line_guid.clone(),
            position: listed_line.position.to_string(),
            file_id: None,
            speaker: None,
        };
        if let Some(name) = by_index.get(&(slot + 1)) {
            let caps = line_pattern().captures(name).ok_or_else(|| {
                GenerateError::InvalidConversationFile {
                    path: folder.join(name).display().to_string(),
                }
            })?;
            line.file_id = Some(caps["file_id"].to_string());
            line.speaker = Some(caps["speaker"].to_string());
        }
        lines.push(line);
    }

    Ok(Conversation {
        id,
        weight: item.weight,
        lines,
    })
}

/// Add `<conversation>#<position>` tags to every quote that appears in a conversation.
/// Speakers without a hero key are looked up among the NPC quotes. Returns how many
/// tags were added.
pub fn link_conversations(
    conversations: &[Conversation],
    tables: &LookupTables,
    quotes: &mut QuotesByHero,
) -> usize {
    let mut linked = 0;
    for conversation in conversations {
        for line in &conversation.lines {
            let (Some(file_id), Some(speaker)) = (&line.file_id, &line.speaker) else {
                continue;
            };
            let hero = tables
                .hero_keys
                .get(speaker)
                .map(String::as_str)
                .unwrap_or(NPC_HERO_KEY);
            let Some(quote) = quotes.get_mut(hero).and_then(|by_id| by_id.get_mut(file_id))
            else {
                debug!(conversation = %conversation.id, %file_id, "conversation line has no quote");
                continue;
            };
            let tags = quote.conversations.get_or_insert_with(Vec::new);
            let tag = conversation.tag(line);
            if !tags.contains(&tag) {
                tags.push(tag);
                tags.sort();
                linked += 1;
            }
        }
    }
    linked
}
