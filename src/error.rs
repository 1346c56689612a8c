//! Error types for the semantic diff engine.

use crate::analysis::FeatureKind;

/// Failure to turn source text into a [`SourceUnit`](crate::analysis::SourceUnit).
///
/// Raised eagerly while parsing; the engine never classifies a unit that
/// produced one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{path}:{line}:{column}: syntax error")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
    },

    #[error("{path}:{line}: duplicate definition of `{key}` (first defined on line {first_line})")]
    DuplicateKey {
        path: String,
        key: String,
        first_line: usize,
        line: usize,
    },

    #[error("failed to load {language} grammar: {message}")]
    Grammar {
        language: &'static str,
        message: String,
    },

    #[error("parser produced no tree for {path}")]
    Aborted { path: String },
}

/// A classifier asked for a feature the extractor does not publish, or asked
/// for it with the wrong accessor. Always a programming defect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("feature `{feature}` requested as {expected} but extractor vocabulary v{version} has {}", found.map(|k| k.as_str()).unwrap_or("nothing"))]
pub struct VocabularyMismatchError {
    pub feature: &'static str,
    pub expected: FeatureKind,
    pub found: Option<FeatureKind>,
    pub version: u32,
}

/// Top-level error for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SvcsError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyMismatchError),

    #[error("no language adapter for {0}")]
    UnsupportedFile(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SvcsError {
    /// Whether this failure is a parse failure the caller may skip past.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, SvcsError::Parse(_))
    }
}

pub type SvcsResult<T> = Result<T, SvcsError>;
