//! Subtitle listings dumped by the extractor's `list-subtitles-real` mode.
//!
//! Format: `<12 hex>.05F: <voice line id> - <text>`; lines that match nothing are
//! continuation lines of the previous subtitle, and `[`-prefixed lines are log noise.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::quotes::error::GenerateError;

pub const ZH_SUBTITLES_LOG: &str = "logs/list-subtitles-real-1.log";
pub const EN_SUBTITLES_LOG: &str = "logs/list-subtitles-real-2.log";

pub type Subtitles = HashMap<String, String>;

fn subtitle_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9A-F]{12}\.05F: (?<id>[0-9A-F]{12}\.0B2) - (?<subtitle>.*)$")
            .expect("subtitle pattern compiles")
    })
}

pub fn parse_subtitles(text: &str) -> Subtitles {
    let mut subtitles = Subtitles::new();
    let mut last_id: Option<String> = None;
    for line in text.lines() {
        if line.starts_with('[') {
            continue;
        }
        if let Some(caps) = subtitle_pattern().captures(line) {
            let id = caps["id"].to_string();
            subtitles.insert(id.clone(), caps["subtitle"].to_string());
            last_id = Some(id);
        } else if let Some(subtitle) = last_id.as_ref().and_then(|id| subtitles.get_mut(id)) {
            subtitle.push('\n');
            subtitle.push_str(line);
        }
    }
    for subtitle in subtitles.values_mut() {
        let trimmed = subtitle.trim();
        if trimmed.len() != subtitle.len() {
            *subtitle = trimmed.to_string();
        }
    }
    subtitles
}

/// Load a subtitle log. Every dump carries both logs, so a missing one is an error.
pub fn load_subtitles(path: &Path) -> Result<Subtitles, GenerateError> {
    if !path.is_file() {
        return Err(GenerateError::MissingSubtitles {
            path: path.display().to_string(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| GenerateError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_subtitles(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_lines_join_previous_subtitle() {
        let text = "[Info] listing\n\
                    000000000001.05F: 00000000A1B2.0B2 - Cheers, love!\n\
                    The cavalry's here!\n\
                    000000000002.05F: 00000000A1B3.0B2 - Ooh, fancy. \n";
        let subtitles = parse_subtitles(text);
        assert_eq!(
            subtitles.get("00000000A1B2.0B2").map(String::as_str),
            Some("Cheers, love!\nThe cavalry's here!")
        );
        assert_eq!(
            subtitles.get("00000000A1B3.0B2").map(String::as_str),
            Some("Ooh, fancy.")
        );
    }

    #[test]
    fn missing_log_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_subtitles(&dir.path().join(ZH_SUBTITLES_LOG)).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MissingSubtitles { path } if path.ends_with("list-subtitles-real-1.log")
        ));
    }

    #[test]
    fn text_before_first_entry_is_dropped() {
        let subtitles = parse_subtitles("stray line\n000000000001.05F: 00000000A1B2.0B2 - Hi");
        assert_eq!(subtitles.len(), 1);
    }
}
