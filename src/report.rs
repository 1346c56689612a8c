//! Output formatting for semantic diff results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: one structured document for programmatic consumption
//! - JSON Lines: one event per line, the same shape the JSON Lines sink writes

use std::io::Write;

use colored::*;
use serde::{Deserialize, Serialize};

use crate::classify::{Details, EventType, SemanticEvent};
use crate::engine::FileDiff;
use crate::sink::{EventSink, JsonLinesSink};

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report.
#[derive(Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub files_diffed: usize,
    pub files_failed: usize,
    pub event_count: usize,
    pub files: Vec<JsonFile>,
}

/// Per-file section of the JSON report.
#[derive(Serialize, Deserialize)]
pub struct JsonFile {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<SemanticEvent>,
}

impl JsonReport {
    pub fn from_diffs(diffs: &[FileDiff]) -> Self {
        let files: Vec<JsonFile> = diffs
            .iter()
            .map(|d| JsonFile {
                file: d.file_path.clone(),
                error: d.result.as_ref().err().map(|e| e.to_string()),
                events: d.events().to_vec(),
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            files_diffed: diffs.len(),
            files_failed: files.iter().filter(|f| f.error.is_some()).count(),
            event_count: files.iter().map(|f| f.events.len()).sum(),
            files,
        }
    }
}

/// Write results as a single pretty-printed JSON document.
pub fn write_json<W: Write>(out: &mut W, diffs: &[FileDiff]) -> anyhow::Result<()> {
    let report = JsonReport::from_diffs(diffs);
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

/// Write every successfully computed event, one JSON object per line.
pub fn write_jsonl<W: Write>(out: &mut W, diffs: &[FileDiff]) -> anyhow::Result<()> {
    let mut sink = JsonLinesSink::new(out);
    for diff in diffs {
        sink.append(diff.events())?;
    }
    sink.flush()
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty<W: Write>(out: &mut W, diffs: &[FileDiff]) -> anyhow::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {} v{}", "svcs".cyan().bold(), env!("CARGO_PKG_VERSION"))?;
    writeln!(out)?;

    for diff in diffs {
        match &diff.result {
            Ok(events) if events.is_empty() => {
                writeln!(out, "  {}  {}", diff.file_path.blue(), "no semantic changes".dimmed())?;
            }
            Ok(events) => {
                writeln!(out, "  {} ({}):", diff.file_path.blue(), events.len())?;
                for event in events {
                    write_event(out, event)?;
                }
            }
            Err(e) => {
                writeln!(out, "  {}  {} {}", diff.file_path.blue(), "ERROR".red(), e)?;
            }
        }
        writeln!(out)?;
    }

    write_summary(out, diffs)
}

fn write_event<W: Write>(out: &mut W, event: &SemanticEvent) -> anyhow::Result<()> {
    write!(out, "    ")?;
    write_event_type(out, event.event_type)?;
    write!(out, " {}", event.qualified_key.as_str().bold())?;
    if !event.details.is_empty() {
        write!(out, "  {}", format_details(&event.details).dimmed())?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_event_type<W: Write>(out: &mut W, event_type: EventType) -> anyhow::Result<()> {
    let name = format!("{:<32}", event_type.as_str());
    let colored = match tone(event_type) {
        Tone::Gain => name.green(),
        Tone::Loss => name.red(),
        Tone::Shift => name.yellow(),
    };
    write!(out, "{}", colored)?;
    Ok(())
}

enum Tone {
    Gain,
    Loss,
    Shift,
}

fn tone(event_type: EventType) -> Tone {
    let name = event_type.as_str();
    if name.ends_with("_added")
        || name.ends_with("_introduced")
        || name.ends_with("_adopted")
        || name == "function_made_async"
    {
        Tone::Gain
    } else if name.ends_with("_removed") || name == "function_made_sync" {
        Tone::Loss
    } else {
        Tone::Shift
    }
}

/// `from=1 to=3` style rendering of a detail map.
pub fn format_details(details: &Details) -> String {
    details
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_summary<W: Write>(out: &mut W, diffs: &[FileDiff]) -> anyhow::Result<()> {
    let failed = diffs.iter().filter(|d| d.result.is_err()).count();
    let events: usize = diffs.iter().map(|d| d.events().len()).sum();
    let plural = if events != 1 { "s" } else { "" };

    write!(
        out,
        "  {}",
        format!("{} file(s), {} event{}", diffs.len(), events, plural).dimmed()
    )?;
    if failed > 0 {
        write!(out, "  {}", format!("{} failed", failed).red())?;
    }
    writeln!(out)?;
    Ok(())
}
