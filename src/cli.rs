//! Command-line interface for svcs.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::classify::{find_rule, EventType, Rule, CATALOG};
use crate::config::Config;
use crate::engine::{Engine, FileChange, FileDiff};
use crate::error::SvcsError;
use crate::report;
use crate::sink::{EventSink, JsonLinesSink};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Path that stands for an absent side of a diff.
const NULL_PATH: &str = "/dev/null";

/// Semantic diff - classify what changed in meaning between two revisions.
///
/// Parses both versions of a source file, pairs functions and classes by
/// qualified name, and reports typed semantic events: complexity shifts,
/// error handling introduced or removed, functional style adopted, type
/// annotations added, and more.
#[derive(Parser)]
#[command(name = "svcs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diff two versions of one file
    Diff(DiffArgs),
    /// Diff every changed source file between two directory trees
    Tree(TreeArgs),
    /// List classifier rules and the events they emit
    Catalog(CatalogArgs),
}

/// Output options shared by diff commands.
#[derive(Args)]
pub struct OutputArgs {
    /// Output format: pretty, json, or jsonl
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Also append events as JSON Lines to this file
    #[arg(long)]
    pub append: Option<PathBuf>,
}

/// Arguments for the diff command.
#[derive(Parser)]
pub struct DiffArgs {
    /// Before version (/dev/null for a new file)
    pub before: PathBuf,

    /// After version (/dev/null for a deleted file)
    pub after: PathBuf,

    /// Logical path recorded on events (default: the after path)
    #[arg(short, long)]
    pub path: Option<String>,

    /// Revision identifier recorded on events
    #[arg(short, long, default_value = "working")]
    pub revision: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the tree command.
#[derive(Parser)]
pub struct TreeArgs {
    /// Directory holding the before revision
    pub before_dir: PathBuf,

    /// Directory holding the after revision
    pub after_dir: PathBuf,

    /// Revision identifier recorded on events
    #[arg(short, long, default_value = "working")]
    pub revision: String,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for the catalog command.
#[derive(Parser)]
pub struct CatalogArgs {
    /// Show only this rule, with the features it reads
    pub rule: Option<String>,
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over `-v`.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "svcs=warn",
        1 => "svcs=debug",
        _ => "svcs=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn validate_format(format: &str) -> bool {
    matches!(format, "pretty" | "json" | "jsonl")
}

fn build_engine(config_path: Option<&Path>) -> Result<Engine, i32> {
    let config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Err(EXIT_ERROR);
        }
    };
    Engine::with_config(config).map_err(|e| {
        eprintln!("Error: {}", e);
        EXIT_ERROR
    })
}

/// Read one side of a diff; `/dev/null` and missing files are absent.
fn read_side(path: &Path) -> io::Result<Option<String>> {
    if path == Path::new(NULL_PATH) || !path.exists() {
        return Ok(None);
    }
    fs::read_to_string(path).map(Some)
}

fn emit(output: &OutputArgs, diffs: &[FileDiff]) -> anyhow::Result<i32> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match output.format.as_str() {
        "json" => report::write_json(&mut out, diffs)?,
        "jsonl" => report::write_jsonl(&mut out, diffs)?,
        _ => report::write_pretty(&mut out, diffs)?,
    }
    out.flush()?;

    if let Some(path) = &output.append {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut sink = JsonLinesSink::new(BufWriter::new(file));
        for diff in diffs {
            sink.append(diff.events())?;
        }
        sink.flush()?;
        tracing::debug!(path = %path.display(), events = sink.written(), "appended events");
    }

    if diffs.iter().any(|d| d.result.is_err()) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the diff command.
pub fn run_diff(cli: &Cli, args: &DiffArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.output.format) {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'jsonl'",
            args.output.format
        );
        return Ok(EXIT_ERROR);
    }

    let engine = match build_engine(cli.config.as_deref()) {
        Ok(e) => e,
        Err(code) => return Ok(code),
    };

    for side in [&args.before, &args.after] {
        if side.as_path() != Path::new(NULL_PATH) && !side.exists() {
            eprintln!("Error: no such file: {}", side.display());
            return Ok(EXIT_ERROR);
        }
    }

    let before = read_side(&args.before)
        .with_context(|| format!("failed to read {}", args.before.display()))?;
    let after = read_side(&args.after)
        .with_context(|| format!("failed to read {}", args.after.display()))?;
    if before.is_none() && after.is_none() {
        eprintln!("Error: neither side exists");
        return Ok(EXIT_ERROR);
    }

    let file_path = args.path.clone().unwrap_or_else(|| {
        let named = if after.is_some() { &args.after } else { &args.before };
        named.to_string_lossy().to_string()
    });

    let change = FileChange {
        file_path,
        before,
        after,
        revision_id: args.revision.clone(),
    };
    let diff = engine.diff_change(&change);
    if let Err(e) = &diff.result {
        if !e.is_parse_error() {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    }

    emit(&args.output, &[diff])
}

/// Relative paths of source files under `root` the engine handles.
fn collect_files(root: &Path, engine: &Engine) -> anyhow::Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    if !root.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories and virtualenvs
            !(e.file_type().is_dir()
                && e.depth() > 0
                && (name.starts_with('.') || name == "__pycache__" || name == "venv"))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root)?.to_path_buf();
        if engine.supports(&rel.to_string_lossy()) {
            files.insert(rel);
        }
    }

    Ok(files)
}

/// Changed files between two trees, plus files that could not be read.
#[derive(Debug, Default)]
pub struct TreeChanges {
    pub changes: Vec<FileChange>,
    /// Failed entries for unreadable sources (e.g. not UTF-8).
    pub unreadable: Vec<FileDiff>,
}

/// Build changes for every file that differs between the two trees.
pub fn collect_changes(
    before_dir: &Path,
    after_dir: &Path,
    revision: &str,
    engine: &Engine,
) -> anyhow::Result<TreeChanges> {
    let mut paths = collect_files(before_dir, engine)?;
    paths.extend(collect_files(after_dir, engine)?);

    let mut collected = TreeChanges::default();
    for rel in paths {
        let file_path = rel.to_string_lossy().replace('\\', "/");
        let sides = read_side(&before_dir.join(&rel))
            .and_then(|before| Ok((before, read_side(&after_dir.join(&rel))?)));
        match sides {
            Ok((before, after)) if before == after => {}
            Ok((before, after)) => collected.changes.push(FileChange {
                file_path,
                before,
                after,
                revision_id: revision.to_string(),
            }),
            Err(e) => {
                tracing::warn!(file = %file_path, error = %e, "failed to read source file");
                collected.unreadable.push(FileDiff {
                    file_path,
                    result: Err(SvcsError::Io(e)),
                });
            }
        }
    }
    Ok(collected)
}

/// Run the tree command.
pub fn run_tree(cli: &Cli, args: &TreeArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.output.format) {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'jsonl'",
            args.output.format
        );
        return Ok(EXIT_ERROR);
    }

    for dir in [&args.before_dir, &args.after_dir] {
        if !dir.is_dir() {
            eprintln!("Error: not a directory: {}", dir.display());
            return Ok(EXIT_ERROR);
        }
    }

    let engine = match build_engine(cli.config.as_deref()) {
        Ok(e) => e,
        Err(code) => return Ok(code),
    };

    let TreeChanges { changes, unreadable } =
        collect_changes(&args.before_dir, &args.after_dir, &args.revision, &engine)?;
    if changes.is_empty() && unreadable.is_empty() {
        eprintln!("Warning: no changed source files");
        return Ok(EXIT_SUCCESS);
    }

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(changes.len() as u64)
    };
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} files")
            .map_err(|e| anyhow::anyhow!("invalid progress template: {}", e))?
            .progress_chars("=> "),
    );

    let mut diffs: Vec<FileDiff> = changes
        .par_iter()
        .progress_with(progress.clone())
        .map(|change| engine.diff_change(change))
        .collect();
    progress.finish_and_clear();

    diffs.extend(unreadable);
    diffs.sort_by(|a, b| a.file_path.cmp(&b.file_path));

    emit(&args.output, &diffs)
}

/// Run the catalog command.
pub fn run_catalog(cli: &Cli, args: &CatalogArgs) -> anyhow::Result<i32> {
    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let disabled = config.disabled();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match &args.rule {
        Some(name) => {
            let Some((index, rule)) = find_rule(name) else {
                eprintln!("Error: unknown rule {:?}", name);
                return Ok(EXIT_ERROR);
            };
            write_rule(&mut out, index, rule, &disabled, true)?;
        }
        None => {
            writeln!(out, "Classifier rules (in execution order):")?;
            writeln!(out)?;
            for (i, rule) in CATALOG.iter().enumerate() {
                write_rule(&mut out, i, rule, &disabled, false)?;
            }
            writeln!(out)?;
            writeln!(out, "{} rules, {} event types", CATALOG.len(), EventType::ALL.len())?;
        }
    }
    out.flush()?;

    Ok(EXIT_SUCCESS)
}

fn write_rule<W: Write>(
    out: &mut W,
    index: usize,
    rule: &Rule,
    disabled: &[EventType],
    with_reads: bool,
) -> io::Result<()> {
    let kinds: Vec<&str> = rule.kinds.iter().map(|k| k.as_str()).collect();
    writeln!(
        out,
        "  {:>2}. {:<22} {:<8} {}",
        index + 1,
        rule.name,
        rule.scope.as_str(),
        kinds.join(", ")
    )?;
    if with_reads {
        let reads: Vec<&str> = rule.reads.iter().map(|f| f.as_str()).collect();
        writeln!(out, "      reads: {}", reads.join(", "))?;
    }
    for event in rule.emits {
        if disabled.contains(event) {
            writeln!(out, "        {} (disabled)", event)?;
        } else {
            writeln!(out, "        {}", event)?;
        }
    }
    Ok(())
}
