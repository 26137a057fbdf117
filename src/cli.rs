use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use crate::config::{load_config, PipelineConfig};
use crate::criteria::{
    load_tables, CriteriaParser, LookupTables, ParseContext, ParserOptions, ReferencePolicy,
    TablesError, DEFAULT_TABLES_PATH,
};
use crate::data::validate::{validate_tables, ValidationSeverity};
use crate::logging;
use crate::parallel::WorkerPool;
use crate::quotes::sidecar::decode_text;
use crate::quotes::{generate, GenerateOptions};

#[derive(Debug, Parser)]
#[command(name = "owwiki", about = "Hero quote data tools for the wiki")]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse one criteria dump and print the condition JSON.
    Parse(ParseArgs),
    /// Generate hero quote data pages from an extractor dump.
    Generate(GenerateArgs),
    /// Check lookup tables for inconsistencies.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Criteria text file, or `-` for stdin.
    #[arg(default_value = "-")]
    pub input: String,
    #[arg(long)]
    pub tables: Option<PathBuf>,
    /// Record id used in diagnostics.
    #[arg(long)]
    pub record: Option<String>,
    /// Fail on hero, tag or script names missing from the tables.
    #[arg(long)]
    pub strict: bool,
    #[arg(long)]
    pub unwrap_single: bool,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub raw_data: Option<PathBuf>,
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long)]
    pub tables: Option<PathBuf>,
    #[arg(long)]
    pub heroes: Option<PathBuf>,
    #[arg(long)]
    pub data_version: Option<String>,
    #[arg(long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub unwrap_single: bool,
    /// Write the unknown-predicate summary as CSV.
    #[arg(long)]
    pub misses_csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long)]
    pub tables: Option<PathBuf>,
    #[arg(long)]
    pub heroes: Option<PathBuf>,
}

/// Run the CLI and return the process exit code: 0 ok, 1 failure, 2 usage.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 2 } else { 0 };
            let _ = err.print();
            return code;
        }
    };
    logging::init(cli.verbose);

    match cli.command {
        Command::Parse(args) => handle_parse(&args),
        Command::Generate(args) => handle_generate(&args),
        Command::Validate(args) => handle_validate(&args),
    }
}

fn handle_parse(args: &ParseArgs) -> i32 {
    let tables = match resolve_tables(args.tables.as_deref(), None) {
        Ok(tables) => tables,
        Err(err) => {
            eprintln!("failed to load lookup tables: {err}");
            return 1;
        }
    };
    let raw = match read_input(&args.input) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("failed to read '{}': {err}", args.input);
            return 1;
        }
    };

    let record_id = args.record.clone().unwrap_or_else(|| args.input.clone());
    let policy = if args.strict {
        ReferencePolicy::Strict
    } else {
        ReferencePolicy::Lenient
    };
    let ctx = ParseContext::new(&tables, &record_id).with_policy(policy);
    let parser = CriteriaParser::new(ParserOptions {
        unwrap_single_group: args.unwrap_single,
        ..ParserOptions::default()
    });

    let outcome = match parser.parse(&raw, &ctx) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("{err}");
            eprintln!("parse failed: {err}");
            return 1;
        }
    };
    for diag in &outcome.diagnostics {
        eprintln!(
            "unknown predicate at line {} ({}): {}",
            diag.line_number,
            diag.miss.reason(),
            diag.raw
        );
    }

    let payload = if args.pretty {
        serde_json::to_string_pretty(&outcome.condition)
    } else {
        outcome.condition.to_json()
    };
    match payload {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize condition: {err}");
            1
        }
    }
}

fn handle_generate(args: &GenerateArgs) -> i32 {
    let config = match build_config(args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };
    let tables = match resolve_tables(Some(&config.tables_path), config.heroes_dir.as_deref()) {
        Ok(tables) => tables,
        Err(err) => {
            eprintln!("failed to load lookup tables: {err}");
            return 1;
        }
    };
    let validation = validate_tables(&tables);
    for diag in &validation.diagnostics {
        warn!("{diag}");
    }
    if validation.has_errors() {
        for diag in validation
            .diagnostics
            .iter()
            .filter(|diag| diag.severity == ValidationSeverity::Error)
        {
            eprintln!("- {diag}");
        }
        eprintln!(
            "generation aborted: lookup tables failed validation with {} issue(s)",
            validation.count(ValidationSeverity::Error)
        );
        return 1;
    }

    let options = GenerateOptions {
        raw_data_dir: config.raw_data_dir.clone(),
        output_dir: config.output_dir.clone(),
        data_version: config.data_version.clone(),
        parser: config.parser_options(),
        pool: WorkerPool::with_workers(config.workers),
    };
    info!(
        raw = %options.raw_data_dir.display(),
        output = %options.output_dir.display(),
        version = %options.data_version,
        "generating hero quotes"
    );

    let report = match generate(&options, &tables) {
        Ok(report) => report,
        Err(err) => {
            error!("{err}");
            eprintln!("generation failed: {err}");
            return 1;
        }
    };

    if let Some(path) = &args.misses_csv {
        let written = File::create(path)
            .map_err(csv::Error::from)
            .and_then(|file| report.misses.write_csv(file));
        if let Err(err) = written {
            eprintln!("failed to write '{}': {err}", path.display());
            return 1;
        }
    }

    match serde_json::to_string_pretty(&report) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize generation report: {err}");
            1
        }
    }
}

fn handle_validate(args: &ValidateArgs) -> i32 {
    let path = args
        .tables
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TABLES_PATH));
    let mut tables = match load_tables(&path) {
        Ok(tables) => tables,
        Err(err) => {
            eprintln!("validation failed: {err}");
            return 1;
        }
    };
    if let Some(dir) = &args.heroes {
        if let Err(err) = tables.merge_hero_pages(dir) {
            eprintln!("validation failed: {err}");
            return 1;
        }
    }

    let report = validate_tables(&tables);
    for diag in &report.diagnostics {
        eprintln!("- {diag}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} issue(s)",
            report.count(ValidationSeverity::Error)
        );
        1
    } else {
        println!("validation passed: {}", path.display());
        0
    }
}

/// Config file, then environment, then flags.
fn build_config(args: &GenerateArgs) -> Result<PipelineConfig, String> {
    build_config_from(args, |name| std::env::var(name).ok())
}

fn build_config_from<F>(args: &GenerateArgs, env: F) -> Result<PipelineConfig, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = load_config(args.config.as_deref()).map_err(|err| err.to_string())?;
    config.apply_env_from(env).map_err(|err| err.to_string())?;
    if let Some(dir) = &args.raw_data {
        config.raw_data_dir = dir.clone();
    }
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }
    if let Some(path) = &args.tables {
        config.tables_path = path.clone();
    }
    if let Some(dir) = &args.heroes {
        config.heroes_dir = Some(dir.clone());
    }
    if let Some(version) = &args.data_version {
        config.data_version = version.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.unwrap_single {
        config.unwrap_single_group = true;
    }
    Ok(config)
}

/// Load tables from `path`. Without an explicit path, a missing default file falls
/// back to the built-in tables.
fn resolve_tables(
    path: Option<&Path>,
    heroes_dir: Option<&Path>,
) -> Result<LookupTables, TablesError> {
    let mut tables = match path {
        Some(path) => load_tables(path)?,
        None if Path::new(DEFAULT_TABLES_PATH).is_file() => load_tables(DEFAULT_TABLES_PATH)?,
        None => {
            warn!("{DEFAULT_TABLES_PATH} not found, using built-in tables");
            LookupTables::default()
        }
    };
    if let Some(dir) = heroes_dir {
        let merged = tables.merge_hero_pages(dir)?;
        info!("merged {merged} hero pages from {}", dir.display());
    }
    Ok(tables)
}

fn read_input(input: &str) -> io::Result<String> {
    let bytes = if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(input)?
    };
    Ok(decode_text(&bytes))
}
