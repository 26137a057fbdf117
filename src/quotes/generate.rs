//! Builds hero quote records from an extractor dump and merges them with the previous run.
//!
//! Layout under the raw data directory:
//!   `extract/HeroVoice/<hero>/<skin>/<category...>/<id>...txt`
//!   `extract/NPCVoice/<npc>/<category...>/<id>...txt`
//!   `extract/HeroConvo/<group>/<conversation>.0D0/<index>-<speaker>-<id>...`
//!   `json/conversations.json`
//!   `logs/list-subtitles-real-{1,2}.log`
//!
//! Criteria sidecars are parsed in parallel. Lines spoken by a known hero are parsed
//! with the strict reference policy; everything else is lenient.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::criteria::{
    CriteriaParser, LookupTables, MissSummary, ParseContext, ParseDiagnostic, ParserOptions,
    ReferencePolicy,
};
use crate::parallel::WorkerPool;
use crate::quotes::conversation::{link_conversations, load_conversations};
use crate::quotes::error::GenerateError;
use crate::quotes::record::{
    category_guid, normalize_skin, HeroQuote, VoiceLineId, DATA_TYPE, NPC_HERO_KEY,
};
use crate::quotes::sidecar::{criteria_path, is_sidecar, read_sidecar, read_weight, weight_path};
use crate::quotes::subtitles::{load_subtitles, Subtitles, EN_SUBTITLES_LOG, ZH_SUBTITLES_LOG};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceSource {
    Hero,
    Npc,
}

impl VoiceSource {
    pub fn relative_dir(&self) -> &'static str {
        match self {
            Self::Hero => "extract/HeroVoice",
            Self::Npc => "extract/NPCVoice",
        }
    }
}

/// One discovered voice-line text file.
#[derive(Debug, Clone)]
pub struct VoiceLineFile {
    pub source: VoiceSource,
    pub path: PathBuf,
    pub id: VoiceLineId,
    pub speaker: String,
    pub skin: Option<String>,
    /// Remaining directory segments joined with `/`, e.g. `Unknown/1F3.078`.
    pub category_dir: String,
}

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub raw_data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub data_version: String,
    pub parser: ParserOptions,
    pub pool: WorkerPool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub generated_at: String,
    pub data_version: String,
    pub hero_lines: usize,
    pub npc_lines: usize,
    pub with_criteria: usize,
    /// Records from the previous run that no longer exist in the dump.
    pub retained_removed: usize,
    pub conversations: usize,
    /// Conversation tags added to quote records.
    pub conversation_links: usize,
    pub total_records: usize,
    pub files_written: usize,
    pub misses: MissSummary,
}

struct BuiltRecord {
    quote: HeroQuote,
    diagnostics: Vec<ParseDiagnostic>,
}

struct Shared<'a> {
    tables: &'a LookupTables,
    parser: CriteriaParser,
    zh_subtitles: &'a Subtitles,
    en_subtitles: &'a Subtitles,
}

/// Quote records keyed by hero key, then file id.
pub type QuotesByHero = BTreeMap<String, BTreeMap<String, HeroQuote>>;

pub fn generate(
    options: &GenerateOptions,
    tables: &LookupTables,
) -> Result<GenerateReport, GenerateError> {
    let raw = options.raw_data_dir.as_path();
    let zh_subtitles = load_subtitles(&raw.join(ZH_SUBTITLES_LOG))?;
    let en_subtitles = load_subtitles(&raw.join(EN_SUBTITLES_LOG))?;
    info!(
        zh = zh_subtitles.len(),
        en = en_subtitles.len(),
        "loaded subtitles"
    );

    let mut files = discover_voice_lines(raw, VoiceSource::Hero)?;
    files.extend(discover_voice_lines(raw, VoiceSource::Npc)?);
    info!(
        "processing {} voice line files on {} threads",
        files.len(),
        options.pool.thread_count()
    );

    let shared = Shared {
        tables,
        parser: CriteriaParser::new(options.parser),
        zh_subtitles: &zh_subtitles,
        en_subtitles: &en_subtitles,
    };
    let built = options.pool.install(|| {
        files
            .par_iter()
            .map(|file| build_record(file, &shared))
            .collect::<Result<Vec<_>, _>>()
    })??;

    let mut misses = MissSummary::default();
    let mut hero_lines = 0;
    let mut npc_lines = 0;
    let mut with_criteria = 0;
    let mut quotes = Vec::with_capacity(built.len());
    for (file, record) in files.iter().zip(built) {
        match file.source {
            VoiceSource::Hero => hero_lines += 1,
            VoiceSource::Npc => npc_lines += 1,
        }
        if record.quote.criteria.is_some() {
            with_criteria += 1;
        }
        misses.extend(&record.diagnostics);
        quotes.push(record.quote);
    }

    let conversations = load_conversations(raw)?;
    let previous = load_previous(&options.output_dir)?;
    let (mut merged, retained_removed) =
        merge_with_previous(previous, quotes, &options.data_version);
    let conversation_links = link_conversations(&conversations, tables, &mut merged);
    info!(
        conversations = conversations.len(),
        conversation_links, "linked conversations"
    );
    let total_records = merged.values().map(BTreeMap::len).sum();
    let files_written = write_output(&options.output_dir, &merged)?;

    if !misses.is_empty() {
        warn!(
            total = misses.total(),
            distinct = misses.distinct(),
            "predicates degraded to unknown"
        );
    }
    info!(total_records, files_written, "generation finished");

    Ok(GenerateReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        data_version: options.data_version.clone(),
        hero_lines,
        npc_lines,
        with_criteria,
        retained_removed,
        conversations: conversations.len(),
        conversation_links,
        total_records,
        files_written,
        misses,
    })
}

/// Find voice-line text files for one source, sorted by path. A missing source
/// directory yields no files.
pub fn discover_voice_lines(
    raw_data_dir: &Path,
    source: VoiceSource,
) -> Result<Vec<VoiceLineFile>, GenerateError> {
    let root = raw_data_dir.join(source.relative_dir());
    if !root.is_dir() {
        warn!("voice directory not found: {}", root.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|err| GenerateError::Io {
            path: err
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string()),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        if !file_name.ends_with(".txt") || is_sidecar(file_name) {
            continue;
        }
        files.push(describe_voice_line(&root, entry.path(), file_name, source)?);
    }
    debug!("{} files under {}", files.len(), root.display());
    Ok(files)
}

fn describe_voice_line(
    root: &Path,
    path: &Path,
    file_name: &str,
    source: VoiceSource,
) -> Result<VoiceLineFile, GenerateError> {
    let display = || path.display().to_string();
    let id = VoiceLineId::from_file_name(file_name)
        .ok_or_else(|| GenerateError::InvalidFileName { path: display() })?;

    let mut segments: Vec<String> = path
        .strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .map(|dir| {
            dir.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    let min_segments = match source {
        VoiceSource::Hero => 3,
        VoiceSource::Npc => 2,
    };
    if segments.len() < min_segments {
        return Err(GenerateError::InvalidDirectory { path: display() });
    }
    let speaker = segments.remove(0);
    let skin = match source {
        VoiceSource::Hero => normalize_skin(&segments.remove(0)),
        VoiceSource::Npc => None,
    };

    Ok(VoiceLineFile {
        source,
        path: path.to_path_buf(),
        id,
        speaker,
        skin,
        category_dir: segments.join("/"),
    })
}

fn build_record(file: &VoiceLineFile, shared: &Shared<'_>) -> Result<BuiltRecord, GenerateError> {
    let tables = shared.tables;
    let guid = category_guid(&file.category_dir).ok_or_else(|| {
        GenerateError::UncategorisedDirectory {
            path: file.path.display().to_string(),
            category: file.category_dir.clone(),
        }
    })?;
    let category = tables
        .categories
        .get(&guid)
        .cloned()
        .unwrap_or_else(|| format!("Unknown/{guid}"));

    let hero = tables
        .hero_keys
        .get(&file.speaker)
        .cloned()
        .unwrap_or_else(|| NPC_HERO_KEY.to_string());
    let file_id = file.id.as_str();

    let mut quote = HeroQuote {
        data_type: DATA_TYPE.to_string(),
        file_id: file_id.to_string(),
        file_id_n: file.id.numeric(),
        hero,
        hero_name: file.speaker.clone(),
        skin: file.skin.clone(),
        category,
        subtitle: shared.zh_subtitles.get(file_id).cloned().unwrap_or_default(),
        subtitle_en: shared.en_subtitles.get(file_id).cloned().unwrap_or_default(),
        criteria: None,
        weight: None,
        conversations: None,
        added: None,
        removed: None,
    };

    let dir = file.path.parent().unwrap_or_else(|| Path::new("."));
    let mut diagnostics = Vec::new();
    let criteria_file = criteria_path(dir, file_id);
    if let Some(text) = read_sidecar(&criteria_file)? {
        let record_id = format!("{}/{}", quote.hero, file_id);
        let policy = if quote.hero == NPC_HERO_KEY {
            ReferencePolicy::Lenient
        } else {
            ReferencePolicy::Strict
        };
        let ctx = ParseContext::new(tables, &record_id).with_policy(policy);
        let outcome = shared
            .parser
            .parse(&text, &ctx)
            .map_err(|source| GenerateError::Criteria {
                path: criteria_file.display().to_string(),
                source,
            })?;
        quote.criteria = Some(outcome.condition.to_json()?);
        diagnostics = outcome.diagnostics;
    }
    quote.weight = read_weight(&weight_path(dir, file_id))?;

    Ok(BuiltRecord { quote, diagnostics })
}

/// Load every `<hero>.json` quote list written by a previous run.
pub fn load_previous(output_dir: &Path) -> Result<QuotesByHero, GenerateError> {
    let mut by_hero = QuotesByHero::new();
    if !output_dir.is_dir() {
        return Ok(by_hero);
    }
    let io_err = |path: &Path, source| GenerateError::Io {
        path: path.display().to_string(),
        source,
    };
    for entry in fs::read_dir(output_dir).map_err(|e| io_err(output_dir, e))? {
        let path = entry.map_err(|e| io_err(output_dir, e))?.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let quotes: Vec<HeroQuote> =
            serde_json::from_str(&raw).map_err(|source| GenerateError::PreviousOutput {
                path: path.display().to_string(),
                source,
            })?;
        for quote in quotes {
            by_hero
                .entry(quote.hero.clone())
                .or_default()
                .insert(quote.file_id.clone(), quote);
        }
    }
    Ok(by_hero)
}

/// Carry `added` over from the previous run and mark vanished records as removed.
/// Returns the merged records and how many of them are removed leftovers.
pub fn merge_with_previous(
    previous: QuotesByHero,
    current: Vec<HeroQuote>,
    data_version: &str,
) -> (QuotesByHero, usize) {
    let mut merged = previous;
    for quotes in merged.values_mut() {
        for quote in quotes.values_mut() {
            quote.removed.get_or_insert_with(|| data_version.to_string());
        }
    }

    for mut quote in current {
        let slot = merged.entry(quote.hero.clone()).or_default();
        let added = slot
            .get(&quote.file_id)
            .and_then(|old| old.added.clone())
            .unwrap_or_else(|| data_version.to_string());
        quote.added = Some(added);
        quote.removed = None;
        slot.insert(quote.file_id.clone(), quote);
    }

    let retained_removed = merged
        .values()
        .flat_map(BTreeMap::values)
        .filter(|quote| quote.removed.is_some())
        .count();
    (merged, retained_removed)
}

/// Write one pretty JSON array per hero, sorted by numeric file id.
pub fn write_output(output_dir: &Path, merged: &QuotesByHero) -> Result<usize, GenerateError> {
    fs::create_dir_all(output_dir).map_err(|source| GenerateError::Io {
        path: output_dir.display().to_string(),
        source,
    })?;
    let mut written = 0;
    for (hero, quotes) in merged {
        let mut list: Vec<&HeroQuote> = quotes.values().collect();
        list.sort_by_key(|quote| quote.file_id_n);
        let path = output_dir.join(format!("{hero}.json"));
        let payload = format!("{}\n", serde_json::to_string_pretty(&list)?);
        fs::write(&path, payload).map_err(|source| GenerateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        written += 1;
    }
    Ok(written)
}
