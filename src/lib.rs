//! svcs - semantic version control.
//!
//! Instead of line diffs, svcs compares two revisions of a source file
//! structurally and reports typed semantic events: a function's complexity
//! changed, error handling was introduced, a class gained a base, a module
//! dropped a dependency.
//!
//! # Architecture
//!
//! - `analysis`: tree-sitter parsing into keyed structural nodes, node
//!   matching, and feature extraction
//! - `classify`: the fixed-order rule catalog and event assembler
//! - `engine`: the `diff_semantics` entry point and parallel batches
//! - `config`: YAML configuration (disabled events, excluded paths)
//! - `sink`: append interface for persisting events
//! - `report`: output formatting (pretty, JSON, JSON Lines)
//!
//! # Example
//!
//! ```
//! let events = svcs::diff_semantics(
//!     "app.py",
//!     Some("def f(x): return x+1\n"),
//!     Some("def f(x):\n  try:\n    return x+1\n  except: pass\n"),
//!     "rev2",
//! )
//! .unwrap();
//! assert_eq!(events[0].event_type.as_str(), "error_handling_introduced");
//! ```

pub mod analysis;
pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod sink;

pub use analysis::{
    get_adapter, Feature, FeatureSnapshot, LanguageAdapter, MatchedPair, NodeKind, QualifiedKey,
    SourceUnit, StructuralNode,
};
pub use classify::{DetailValue, Details, EventType, SemanticEvent, CATALOG};
pub use config::Config;
pub use engine::{diff_semantics, Engine, FileChange, FileDiff};
pub use error::{ParseError, SvcsError, SvcsResult, VocabularyMismatchError};
pub use sink::{EventSink, JsonLinesSink, MemorySink};
