//! The semantic diff engine.
//!
//! One call handles one file transition: parse both sides, pair nodes by
//! qualified key, run the classifier catalog over each pair and assemble the
//! ordered event list. Calls share no mutable state, so callers may fan out
//! across files freely; [`Engine::diff_batch`] does so with rayon.

use std::path::Path;

use globset::GlobSet;
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{all_adapters, get_adapter, match_units, LanguageAdapter, SourceUnit};
use crate::classify::{
    assemble, classify_pair, contexts, validate_catalog, NodeSide, PairContext, RuleOutput,
    SemanticEvent,
};
use crate::config::Config;
use crate::error::{SvcsError, SvcsResult};

static DEFAULT_ENGINE: OnceCell<Engine> = OnceCell::new();

/// Diff one file with the default engine.
///
/// See [`Engine::diff_semantics`].
pub fn diff_semantics(
    file_path: &str,
    before: Option<&str>,
    after: Option<&str>,
    revision_id: &str,
) -> SvcsResult<Vec<SemanticEvent>> {
    DEFAULT_ENGINE
        .get_or_try_init(Engine::new)?
        .diff_semantics(file_path, before, after, revision_id)
}

/// One file transition in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    /// Absent for a newly added file.
    pub before: Option<String>,
    /// Absent for a deleted file.
    pub after: Option<String>,
    pub revision_id: String,
}

/// Outcome of diffing one file in a batch.
#[derive(Debug)]
pub struct FileDiff {
    pub file_path: String,
    pub result: SvcsResult<Vec<SemanticEvent>>,
}

impl FileDiff {
    pub fn events(&self) -> &[SemanticEvent] {
        self.result.as_deref().unwrap_or(&[])
    }
}

/// Semantic diff engine.
///
/// Construction validates the classifier catalog against every registered
/// extractor vocabulary, so a constructed engine never raises
/// [`SvcsError::Vocabulary`] for a well-formed snapshot.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    exclusions: GlobSet,
}

impl Engine {
    /// Engine with the default configuration.
    pub fn new() -> SvcsResult<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> SvcsResult<Self> {
        config
            .validate()
            .map_err(|e| SvcsError::Config(format!("{:#}", e)))?;
        let exclusions = config
            .exclusions()
            .map_err(|e| SvcsError::Config(format!("{:#}", e)))?;

        for adapter in all_adapters() {
            validate_catalog(adapter.vocabulary())?;
        }

        Ok(Self { config, exclusions })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether `file_path` matches one of the configured exclusions.
    pub fn is_excluded(&self, file_path: &str) -> bool {
        self.exclusions.is_match(file_path)
    }

    /// Whether the engine handles this file at all.
    pub fn supports(&self, file_path: &str) -> bool {
        self.adapter_for(file_path).is_ok()
    }

    fn adapter_for(&self, file_path: &str) -> SvcsResult<&'static dyn LanguageAdapter> {
        let ext = Path::new(file_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if !self.config.handles_extension(ext) {
            return Err(SvcsError::UnsupportedFile(file_path.to_string()));
        }
        get_adapter(ext).ok_or_else(|| SvcsError::UnsupportedFile(file_path.to_string()))
    }

    /// Compute the ordered semantic events for one file transition.
    ///
    /// - `before` absent: the file is new; only addition-safe events
    ///   (`node_added` per function and class) are emitted.
    /// - `after` absent: the file was deleted; the result is empty, file
    ///   removal is the caller's to report.
    /// - Both present: full pipeline.
    ///
    /// Fails with [`SvcsError::Parse`] if either side does not parse and
    /// with [`SvcsError::UnsupportedFile`] if no adapter handles the path.
    pub fn diff_semantics(
        &self,
        file_path: &str,
        before: Option<&str>,
        after: Option<&str>,
        revision_id: &str,
    ) -> SvcsResult<Vec<SemanticEvent>> {
        if before.is_none() && after.is_none() {
            return Ok(Vec::new());
        }
        let adapter = self.adapter_for(file_path)?;
        if self.is_excluded(file_path) {
            tracing::warn!(file = file_path, "skipping excluded path");
            return Ok(Vec::new());
        }

        let events = match (before, after) {
            (Some(before), Some(after)) => {
                let before = adapter.parse(file_path, revision_id, before)?;
                let after = adapter.parse(file_path, revision_id, after)?;
                self.diff_units(&before, &after)?
            }
            (None, Some(after)) => {
                let after = adapter.parse(file_path, revision_id, after)?;
                self.added_unit(&after)?
            }
            _ => {
                tracing::debug!(file = file_path, "file deleted, no events");
                Vec::new()
            }
        };
        Ok(events)
    }

    /// Diff two already-parsed units of the same file.
    pub fn diff_units(&self, before: &SourceUnit, after: &SourceUnit) -> SvcsResult<Vec<SemanticEvent>> {
        let pairs = match_units(before, after);
        let mut outputs = Vec::new();
        for ctx in contexts(before, after, &pairs) {
            outputs.extend(classify_pair(&ctx)?);
        }
        let events = self.finish(&after.file_path, &after.revision_id, outputs);
        tracing::debug!(
            file = %after.file_path,
            pairs = pairs.len(),
            events = events.len(),
            "diffed file"
        );
        Ok(events)
    }

    fn added_unit(&self, after: &SourceUnit) -> SvcsResult<Vec<SemanticEvent>> {
        let mut outputs = Vec::new();
        for node in after.nodes() {
            let ctx = PairContext {
                key: &node.key,
                kind: node.kind,
                before: None,
                after: Some(NodeSide { unit: after, node }),
            };
            outputs.extend(classify_pair(&ctx)?);
        }
        let events = self.finish(&after.file_path, &after.revision_id, outputs);
        tracing::debug!(file = %after.file_path, events = events.len(), "diffed new file");
        Ok(events)
    }

    /// Assemble, drop disabled event types, and renumber.
    fn finish(
        &self,
        file_path: &str,
        revision_id: &str,
        outputs: Vec<RuleOutput>,
    ) -> Vec<SemanticEvent> {
        let mut events = assemble(file_path, revision_id, outputs);
        if !self.config.disabled_events.is_empty() {
            events.retain(|e| self.config.is_event_enabled(e.event_type));
            for (order, event) in events.iter_mut().enumerate() {
                event.order = order;
            }
        }
        events
    }

    /// Diff many files in parallel. Results follow input order; a failing
    /// file is reported in its own [`FileDiff`] and never aborts the batch.
    pub fn diff_batch(&self, changes: &[FileChange]) -> Vec<FileDiff> {
        changes
            .par_iter()
            .map(|change| self.diff_change(change))
            .collect()
    }

    /// Diff one batch entry.
    pub fn diff_change(&self, change: &FileChange) -> FileDiff {
        let result = self.diff_semantics(
            &change.file_path,
            change.before.as_deref(),
            change.after.as_deref(),
            &change.revision_id,
        );
        if let Err(e) = &result {
            tracing::warn!(file = %change.file_path, error = %e, "failed to diff file");
        }
        FileDiff {
            file_path: change.file_path.clone(),
            result,
        }
    }
}
